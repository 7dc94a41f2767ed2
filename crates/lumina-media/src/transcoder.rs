//! Video transcoding capability.
//!
//! Segment assembly talks to the `MediaTranscoder` trait; the shipped
//! implementation drives FFmpeg through [`FfmpegCommand`].

use std::path::Path;

use async_trait::async_trait;

use lumina_models::Orientation;

use crate::command::FfmpegCommand;
use crate::error::MediaResult;

/// Output canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 1920;
/// Output canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 1080;

/// Transcoding engine for segment production.
#[async_trait]
pub trait MediaTranscoder: Send + Sync {
    /// Loop a still image into a silent video of `seconds` duration.
    async fn loop_image_to_video(
        &self,
        image: &Path,
        seconds: f64,
        out: &Path,
    ) -> MediaResult<()>;

    /// Pair a still image with an audio track, ending with the audio.
    async fn still_image_with_audio(
        &self,
        image: &Path,
        audio: &Path,
        out: &Path,
    ) -> MediaResult<()>;

    /// Scale a source video and overlay it on a full-canvas slide, keeping
    /// the video's own audio.
    async fn overlay_video_on_slide(
        &self,
        video: &Path,
        slide: &Path,
        orientation: Orientation,
        out: &Path,
    ) -> MediaResult<()>;

    /// Concatenate pre-normalized segments without re-encoding.
    async fn concat_stream_copy(&self, list_file: &Path, out: &Path) -> MediaResult<()>;
}

/// FFmpeg-backed transcoder.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder;

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self
    }
}

/// Overlay filter graph for a source video on a slide background.
///
/// Vertical sources fill the right half of the canvas edge to edge;
/// horizontal sources sit boxed over the slide's lower region so the
/// contributor caption above stays visible.
fn overlay_filter(orientation: Orientation) -> String {
    let (scale, position) = match orientation {
        Orientation::Vertical => ("960:1080", "960:0"),
        Orientation::Horizontal => ("1344:756", "288:250"),
    };
    format!(
        "[0:v]scale={scale}[scaled_video];[1:v]scale={cw}:{ch}[bg];[bg][scaled_video]overlay={position}[out]",
        cw = CANVAS_WIDTH,
        ch = CANVAS_HEIGHT,
    )
}

#[async_trait]
impl MediaTranscoder for FfmpegTranscoder {
    async fn loop_image_to_video(
        &self,
        image: &Path,
        seconds: f64,
        out: &Path,
    ) -> MediaResult<()> {
        FfmpegCommand::new(out)
            .input_with_args(["-loop", "1"], image)
            .duration(seconds)
            .video_filter(format!("scale={}:{}", CANVAS_WIDTH, CANVAS_HEIGHT))
            .pix_fmt("yuv420p")
            .run()
            .await
    }

    async fn still_image_with_audio(
        &self,
        image: &Path,
        audio: &Path,
        out: &Path,
    ) -> MediaResult<()> {
        FfmpegCommand::new(out)
            .input_with_args(["-loop", "1"], image)
            .input(audio)
            .map("0:v")
            .map("1:a")
            .video_filter(format!("scale={}:{}", CANVAS_WIDTH, CANVAS_HEIGHT))
            .pix_fmt("yuv420p")
            .shortest()
            .run()
            .await
    }

    async fn overlay_video_on_slide(
        &self,
        video: &Path,
        slide: &Path,
        orientation: Orientation,
        out: &Path,
    ) -> MediaResult<()> {
        FfmpegCommand::new(out)
            .input(video)
            .input_with_args(["-loop", "1"], slide)
            .filter_complex(overlay_filter(orientation))
            .map("[out]")
            .map("0:a?")
            .pix_fmt("yuv420p")
            .shortest()
            .run()
            .await
    }

    async fn concat_stream_copy(&self, list_file: &Path, out: &Path) -> MediaResult<()> {
        FfmpegCommand::new(out)
            .input_with_args(["-f", "concat", "-safe", "0"], list_file)
            .output_args(["-c", "copy"])
            .run()
            .await
    }
}
