//! Capsule assembly pipeline.
//!
//! One run turns a capsule's messages into the published final video:
//! fetch records, prepare parts, render segments, concatenate, upload,
//! and record the public URL.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use lumina_media::{
    concatenate, ImageCompositor, MediaError, MediaTranscoder, SegmentRenderer, SlideRenderer,
};
use lumina_models::{CapsuleInfo, MediaPart, RenderCapsuleJob};
use lumina_storage::StorageClient;
use lumina_store::StoreClient;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::parts::{prepare_media_parts, render_fallback_slide, VIDEO_CAPTION};

/// Assembles one capsule per call; engines are injected so tests can run
/// the whole pipeline without FFmpeg or ImageMagick on the host.
pub struct CapsulePipeline {
    store: StoreClient,
    storage: StorageClient,
    slides: SlideRenderer,
    segments: SegmentRenderer,
    transcoder: Arc<dyn MediaTranscoder>,
    http: reqwest::Client,
    work_dir: PathBuf,
    debug_dir: Option<PathBuf>,
}

impl CapsulePipeline {
    pub fn new(
        store: StoreClient,
        storage: StorageClient,
        compositor: Arc<dyn ImageCompositor>,
        transcoder: Arc<dyn MediaTranscoder>,
        http: reqwest::Client,
        work_dir: PathBuf,
        backgrounds_dir: PathBuf,
        debug_dir: Option<PathBuf>,
    ) -> Self {
        let slides = SlideRenderer::new(compositor, http.clone(), backgrounds_dir);
        let segments = SegmentRenderer::new(Arc::clone(&transcoder));
        Self {
            store,
            storage,
            slides,
            segments,
            transcoder,
            http,
            work_dir,
            debug_dir,
        }
    }

    /// Build with the shipped ImageMagick and FFmpeg engines.
    pub fn from_config(config: &WorkerConfig) -> WorkerResult<Self> {
        Ok(Self::new(
            StoreClient::new(config.store.clone())?,
            StorageClient::new(config.storage.clone())?,
            Arc::new(lumina_media::MagickCompositor::new()),
            Arc::new(lumina_media::FfmpegTranscoder::new()),
            reqwest::Client::new(),
            config.work_dir.clone(),
            config.backgrounds_dir.clone(),
            config.debug_dir.clone(),
        ))
    }

    /// Run the full assembly for one job; returns the published video URL.
    pub async fn process(&self, job: &RenderCapsuleJob) -> WorkerResult<String> {
        let capsule_id = &job.capsule_id;
        info!(job_id = %job.job_id, capsule_id = %capsule_id, "Processing capsule");

        let messages = self.store.fetch_messages(capsule_id).await?;
        let capsule = self.store.fetch_capsule_info(capsule_id).await?;

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let scratch = tempfile::Builder::new()
            .prefix(&format!("capsule_{}_", capsule_id))
            .tempdir_in(&self.work_dir)?;
        let scratch_path = scratch.path();

        let parts =
            prepare_media_parts(&self.http, &self.slides, scratch_path, &capsule, &messages)
                .await?;

        let mut segment_files = Vec::with_capacity(parts.len() + 1);

        // Title slide opens every capsule.
        let title_slide = self.slides.render_title_slide(scratch_path, &capsule).await?;
        segment_files.push(
            self.segments
                .render_text_segment(&title_slide, scratch_path, 0)
                .await?,
        );

        for (i, part) in parts.iter().enumerate() {
            let index = i + 1;
            let segment = match self
                .render_part_segment(part, &capsule, scratch_path, index)
                .await
            {
                Ok(path) => path,
                Err(e) if is_fatal_segment_error(&e) => return Err(e.into()),
                Err(e) => {
                    warn!(index, error = %e, "Segment failed, substituting fallback slide");
                    let contributor = part_contributor(part);
                    let slide =
                        render_fallback_slide(&self.slides, scratch_path, &capsule, contributor)
                            .await?;
                    self.segments
                        .render_text_segment(&slide, scratch_path, index)
                        .await?
                }
            };
            segment_files.push(segment);
        }

        let final_video = concatenate(
            self.transcoder.as_ref(),
            &segment_files,
            scratch_path,
            capsule_id,
        )
        .await?;

        self.copy_debug_artifact(&final_video, capsule_id).await;

        let key = StorageClient::final_video_key(capsule_id);
        self.storage
            .upload_file(&final_video, &key, "video/mp4")
            .await?;

        let url = self.storage.public_url(&key);
        self.store.set_final_video_url(capsule_id, &url).await?;

        info!(
            job_id = %job.job_id,
            capsule_id = %capsule_id,
            segments = segment_files.len(),
            url,
            "Capsule published"
        );
        Ok(url)
    }

    async fn render_part_segment(
        &self,
        part: &MediaPart,
        capsule: &CapsuleInfo,
        scratch: &std::path::Path,
        index: usize,
    ) -> Result<PathBuf, MediaError> {
        match part {
            MediaPart::Text { slide } => {
                self.segments.render_text_segment(slide, scratch, index).await
            }
            MediaPart::Audio { slide, audio } => {
                self.segments
                    .render_audio_segment(slide, audio, scratch, index)
                    .await
            }
            MediaPart::Video {
                file,
                orientation,
                contributor_name,
            } => {
                let slide = self
                    .slides
                    .render_slide(scratch, capsule, VIDEO_CAPTION, Some(contributor_name))
                    .await?;
                self.segments
                    .render_video_segment(file, &slide, *orientation, scratch, index)
                    .await
            }
        }
    }

    /// Keep a local copy of the final video when a debug directory is set.
    /// Never fails the job.
    async fn copy_debug_artifact(
        &self,
        final_video: &std::path::Path,
        capsule_id: &lumina_models::CapsuleId,
    ) {
        let Some(debug_dir) = &self.debug_dir else {
            return;
        };
        let target = debug_dir.join(format!("capsule_{}.mp4", capsule_id));
        let result = async {
            tokio::fs::create_dir_all(debug_dir).await?;
            tokio::fs::copy(final_video, &target).await
        }
        .await;
        match result {
            Ok(_) => info!(path = %target.display(), "Wrote debug copy of final video"),
            Err(e) => warn!(path = %target.display(), error = %e, "Debug copy failed"),
        }
    }
}

fn part_contributor(part: &MediaPart) -> Option<&str> {
    match part {
        MediaPart::Video {
            contributor_name, ..
        } => Some(contributor_name.as_str()),
        // Text and audio slides were pre-rendered with the name baked in
        _ => None,
    }
}

/// The background asset going missing mid-run cannot be healed by a
/// fallback slide, which needs the same asset.
fn is_fatal_segment_error(e: &MediaError) -> bool {
    matches!(e, MediaError::AssetMissing(_))
}
