//! Per-message segment rendering.
//!
//! Each message becomes one normalized 1920x1080 yuv420p segment so the
//! final assembly can concatenate with stream copy.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use lumina_models::Orientation;

use crate::error::MediaResult;
use crate::transcoder::MediaTranscoder;

/// Display duration of a text-only slide.
pub const TEXT_SLIDE_SECS: f64 = 5.0;

/// Deterministic segment path, numbered in playback order.
pub fn segment_path(scratch: &Path, index: usize) -> PathBuf {
    scratch.join(format!("segment_{}.mp4", index))
}

/// Turns rendered slides and fetched media into segments.
pub struct SegmentRenderer {
    transcoder: Arc<dyn MediaTranscoder>,
}

impl SegmentRenderer {
    pub fn new(transcoder: Arc<dyn MediaTranscoder>) -> Self {
        Self { transcoder }
    }

    /// A text message: its slide held on screen for a fixed duration.
    pub async fn render_text_segment(
        &self,
        slide: &Path,
        scratch: &Path,
        index: usize,
    ) -> MediaResult<PathBuf> {
        let out = segment_path(scratch, index);
        self.transcoder
            .loop_image_to_video(slide, TEXT_SLIDE_SECS, &out)
            .await?;
        debug!(index, segment = %out.display(), "Rendered text segment");
        Ok(out)
    }

    /// An audio message: its slide shown for the length of the recording.
    pub async fn render_audio_segment(
        &self,
        slide: &Path,
        audio: &Path,
        scratch: &Path,
        index: usize,
    ) -> MediaResult<PathBuf> {
        let out = segment_path(scratch, index);
        self.transcoder
            .still_image_with_audio(slide, audio, &out)
            .await?;
        debug!(index, segment = %out.display(), "Rendered audio segment");
        Ok(out)
    }

    /// A video message: the source scaled and framed over its info slide.
    pub async fn render_video_segment(
        &self,
        video: &Path,
        slide: &Path,
        orientation: Orientation,
        scratch: &Path,
        index: usize,
    ) -> MediaResult<PathBuf> {
        let out = segment_path(scratch, index);
        self.transcoder
            .overlay_video_on_slide(video, slide, orientation, &out)
            .await?;
        debug!(index, ?orientation, segment = %out.display(), "Rendered video segment");
        Ok(out)
    }
}
