//! Branded slide rendering.
//!
//! Every non-video moment in a capsule is a 1920x1080 slide: the shared
//! background, the message or caption text, the contributor's name, and the
//! capsule and admin branding layered on top.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use lumina_models::CapsuleInfo;

use crate::compositor::{Gravity, ImageCompositor, ImagePlacement, TextOverlay};
use crate::download::fetch_to_file;
use crate::error::{MediaError, MediaResult};

/// Background asset every slide is built on.
pub const BACKGROUND_FILE: &str = "text_horizontal.jpg";

const BODY_POINT_SIZE: u32 = 64;
const CONTRIBUTOR_POINT_SIZE: u32 = 48;
const CAPSULE_NAME_POINT_SIZE: u32 = 48;
const ADMIN_NAME_POINT_SIZE: u32 = 32;
const TITLE_POINT_SIZE: u32 = 72;

/// Renders branded slides through an [`ImageCompositor`].
pub struct SlideRenderer {
    compositor: Arc<dyn ImageCompositor>,
    http: reqwest::Client,
    backgrounds_dir: PathBuf,
}

impl SlideRenderer {
    pub fn new(
        compositor: Arc<dyn ImageCompositor>,
        http: reqwest::Client,
        backgrounds_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            compositor,
            http,
            backgrounds_dir: backgrounds_dir.into(),
        }
    }

    fn background_path(&self) -> MediaResult<PathBuf> {
        let path = self.backgrounds_dir.join(BACKGROUND_FILE);
        if path.exists() {
            Ok(path)
        } else {
            Err(MediaError::AssetMissing(path))
        }
    }

    fn stage_path(scratch: &Path) -> PathBuf {
        scratch.join(format!("slide_{}.png", Uuid::new_v4()))
    }

    /// Render a message slide: body text and contributor caption over the
    /// branded background.
    pub async fn render_slide(
        &self,
        scratch: &Path,
        capsule: &CapsuleInfo,
        body: &str,
        contributor_name: Option<&str>,
    ) -> MediaResult<PathBuf> {
        let mut intermediates = Vec::new();
        let result = self
            .render_slide_inner(scratch, capsule, body, contributor_name, &mut intermediates)
            .await;
        cleanup(&intermediates, result.as_ref().ok()).await;
        result
    }

    async fn render_slide_inner(
        &self,
        scratch: &Path,
        capsule: &CapsuleInfo,
        body: &str,
        contributor_name: Option<&str>,
        intermediates: &mut Vec<PathBuf>,
    ) -> MediaResult<PathBuf> {
        let background = self.background_path()?;

        let base = Self::stage_path(scratch);
        self.compositor
            .render_background(&background, 1920, 1080, &base)
            .await?;
        intermediates.push(base.clone());

        let mut texts = vec![TextOverlay::new(
            body,
            Gravity::West,
            BODY_POINT_SIZE,
            150,
            324,
        )];
        if let Some(name) = contributor_name {
            texts.push(TextOverlay::new(
                format!("- {}", name),
                Gravity::West,
                CONTRIBUTOR_POINT_SIZE,
                150,
                424,
            ));
        }
        texts.push(TextOverlay::new(
            capsule.name.as_str(),
            Gravity::North,
            CAPSULE_NAME_POINT_SIZE,
            0,
            50,
        ));

        let annotated = Self::stage_path(scratch);
        self.compositor
            .overlay_text(&base, &texts, &annotated)
            .await?;
        intermediates.push(annotated.clone());

        let mut current = annotated;

        if let Some(image_url) = &capsule.image {
            current = self
                .composite_remote_image(
                    scratch,
                    &current,
                    image_url,
                    ImagePlacement {
                        resize_width: 300,
                        resize_height: 300,
                        gravity: Gravity::NorthWest,
                        x_offset: 50,
                        y_offset: 50,
                    },
                    intermediates,
                )
                .await?;
        }

        current = self
            .composite_admin_branding(scratch, &current, capsule, intermediates)
            .await?;

        debug!(slide = %current.display(), "Rendered message slide");
        Ok(current)
    }

    /// Render the capsule's opening title slide.
    pub async fn render_title_slide(
        &self,
        scratch: &Path,
        capsule: &CapsuleInfo,
    ) -> MediaResult<PathBuf> {
        let mut intermediates = Vec::new();
        let result = self
            .render_title_slide_inner(scratch, capsule, &mut intermediates)
            .await;
        cleanup(&intermediates, result.as_ref().ok()).await;
        result
    }

    async fn render_title_slide_inner(
        &self,
        scratch: &Path,
        capsule: &CapsuleInfo,
        intermediates: &mut Vec<PathBuf>,
    ) -> MediaResult<PathBuf> {
        let background = self.background_path()?;

        let base = Self::stage_path(scratch);
        self.compositor
            .render_background(&background, 1920, 1080, &base)
            .await?;
        intermediates.push(base.clone());

        let mut current = base;

        // The capsule image sits below center; with it present the title
        // moves up to leave room.
        let title_y_offset = if capsule.image.is_some() { -100 } else { 0 };

        if let Some(image_url) = &capsule.image {
            current = self
                .composite_remote_image(
                    scratch,
                    &current,
                    image_url,
                    ImagePlacement {
                        resize_width: 400,
                        resize_height: 400,
                        gravity: Gravity::Center,
                        x_offset: 0,
                        y_offset: 200,
                    },
                    intermediates,
                )
                .await?;
        }

        let texts = vec![TextOverlay::new(
            capsule.name.as_str(),
            Gravity::Center,
            TITLE_POINT_SIZE,
            0,
            title_y_offset,
        )];

        let annotated = Self::stage_path(scratch);
        self.compositor
            .overlay_text(&current, &texts, &annotated)
            .await?;
        intermediates.push(annotated.clone());
        current = annotated;

        current = self
            .composite_admin_branding(scratch, &current, capsule, intermediates)
            .await?;

        debug!(slide = %current.display(), "Rendered title slide");
        Ok(current)
    }

    /// Second pass over the finished slide: admin name bottom-left, then
    /// the logo bottom-right.
    async fn composite_admin_branding(
        &self,
        scratch: &Path,
        current: &Path,
        capsule: &CapsuleInfo,
        intermediates: &mut Vec<PathBuf>,
    ) -> MediaResult<PathBuf> {
        let Some(admin) = &capsule.admin else {
            return Ok(current.to_path_buf());
        };

        let named = Self::stage_path(scratch);
        self.compositor
            .overlay_text(
                current,
                &[TextOverlay::new(
                    admin.name.as_str(),
                    Gravity::SouthWest,
                    ADMIN_NAME_POINT_SIZE,
                    50,
                    50,
                )],
                &named,
            )
            .await?;
        intermediates.push(named.clone());

        match admin.logo_image.as_deref() {
            Some(url) => {
                self.composite_remote_image(
                    scratch,
                    &named,
                    url,
                    ImagePlacement {
                        resize_width: 150,
                        resize_height: 150,
                        gravity: Gravity::SouthEast,
                        x_offset: 50,
                        y_offset: 50,
                    },
                    intermediates,
                )
                .await
            }
            None => Ok(named),
        }
    }

    async fn composite_remote_image(
        &self,
        scratch: &Path,
        base: &Path,
        url: &str,
        placement: ImagePlacement,
        intermediates: &mut Vec<PathBuf>,
    ) -> MediaResult<PathBuf> {
        // Branding images are decoration: a failed fetch degrades the slide
        // rather than the whole job.
        let image = match fetch_to_file(&self.http, url, scratch).await {
            Ok(path) => path,
            Err(e) => {
                warn!(url, error = %e, "Skipping branding image");
                return Ok(base.to_path_buf());
            }
        };
        intermediates.push(image.clone());

        let out = Self::stage_path(scratch);
        self.compositor
            .overlay_image(base, &image, placement, &out)
            .await?;
        intermediates.push(out.clone());
        Ok(out)
    }
}

/// Delete every intermediate except the surviving output.
async fn cleanup(intermediates: &[PathBuf], keep: Option<&PathBuf>) {
    for path in intermediates {
        if Some(path) == keep {
            continue;
        }
        if let Err(e) = tokio::fs::remove_file(path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Could not remove intermediate");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use lumina_models::{AdminInfo, CapsuleId};

    /// Compositor fake that touches output files and records call order.
    struct RecordingCompositor {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingCompositor {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageCompositor for RecordingCompositor {
        async fn render_background(
            &self,
            _background: &Path,
            width: u32,
            height: u32,
            out: &Path,
        ) -> MediaResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("background {}x{}", width, height));
            std::fs::write(out, b"png")?;
            Ok(())
        }

        async fn overlay_text(
            &self,
            _base: &Path,
            texts: &[TextOverlay],
            out: &Path,
        ) -> MediaResult<()> {
            let summary: Vec<String> = texts
                .iter()
                .map(|t| format!("{}@{}", t.text, t.point_size))
                .collect();
            self.calls
                .lock()
                .unwrap()
                .push(format!("text [{}]", summary.join(", ")));
            std::fs::write(out, b"png")?;
            Ok(())
        }

        async fn overlay_image(
            &self,
            _base: &Path,
            _image: &Path,
            placement: ImagePlacement,
            out: &Path,
        ) -> MediaResult<()> {
            self.calls.lock().unwrap().push(format!(
                "image {}x{} {}",
                placement.resize_width,
                placement.resize_height,
                placement.gravity.as_arg()
            ));
            std::fs::write(out, b"png")?;
            Ok(())
        }
    }

    fn renderer_with_background(
        compositor: Arc<RecordingCompositor>,
    ) -> (SlideRenderer, tempfile::TempDir) {
        let backgrounds = tempfile::tempdir().unwrap();
        std::fs::write(backgrounds.path().join(BACKGROUND_FILE), b"jpg").unwrap();
        let renderer = SlideRenderer::new(compositor, reqwest::Client::new(), backgrounds.path());
        (renderer, backgrounds)
    }

    fn capsule() -> CapsuleInfo {
        CapsuleInfo::new(CapsuleId::new(), "In Memory of June")
    }

    #[tokio::test]
    async fn missing_background_is_fatal() {
        let backgrounds = tempfile::tempdir().unwrap();
        let renderer = SlideRenderer::new(
            RecordingCompositor::new(),
            reqwest::Client::new(),
            backgrounds.path(),
        );
        let scratch = tempfile::tempdir().unwrap();

        let err = renderer
            .render_slide(scratch.path(), &capsule(), "text", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::AssetMissing(_)));
    }

    #[tokio::test]
    async fn message_slide_layers_text_over_background() {
        let compositor = RecordingCompositor::new();
        let (renderer, _bg) = renderer_with_background(compositor.clone());
        let scratch = tempfile::tempdir().unwrap();

        let slide = renderer
            .render_slide(scratch.path(), &capsule(), "We miss you", Some("Ana"))
            .await
            .unwrap();

        assert!(slide.exists());
        let calls = compositor.calls();
        assert_eq!(calls[0], "background 1920x1080");
        assert!(calls[1].contains("We miss you@64"));
        assert!(calls[1].contains("- Ana@48"));
        assert!(calls[1].contains("In Memory of June@48"));
    }

    #[tokio::test]
    async fn intermediates_are_removed_after_success() {
        let compositor = RecordingCompositor::new();
        let (renderer, _bg) = renderer_with_background(compositor);
        let scratch = tempfile::tempdir().unwrap();

        let slide = renderer
            .render_slide(scratch.path(), &capsule(), "text", None)
            .await
            .unwrap();

        let remaining: Vec<_> = std::fs::read_dir(scratch.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(remaining, vec![slide]);
    }

    #[tokio::test]
    async fn title_slide_without_image_centers_title() {
        let compositor = RecordingCompositor::new();
        let (renderer, _bg) = renderer_with_background(compositor.clone());
        let scratch = tempfile::tempdir().unwrap();

        let mut info = capsule();
        info.admin = Some(AdminInfo {
            name: "Hillside Home".to_string(),
            logo_image: None,
        });

        renderer
            .render_title_slide(scratch.path(), &info)
            .await
            .unwrap();

        let calls = compositor.calls();
        assert!(calls.iter().any(|c| c.contains("In Memory of June@72")));
        assert!(!calls.iter().any(|c| c.starts_with("image")));
    }

    #[tokio::test]
    async fn admin_branding_is_a_second_pass_over_the_finished_slide() {
        let compositor = RecordingCompositor::new();
        let (renderer, _bg) = renderer_with_background(compositor.clone());
        let scratch = tempfile::tempdir().unwrap();

        let mut info = capsule();
        info.admin = Some(AdminInfo {
            name: "Hillside Home".to_string(),
            logo_image: None,
        });

        renderer
            .render_slide(scratch.path(), &info, "We miss you", Some("Ana"))
            .await
            .unwrap();

        let calls = compositor.calls();
        let text_passes: Vec<&String> = calls.iter().filter(|c| c.starts_with("text")).collect();
        assert_eq!(text_passes.len(), 2);
        assert!(text_passes[0].contains("We miss you@64"));
        assert!(!text_passes[0].contains("Hillside Home"));
        assert_eq!(text_passes[1].as_str(), "text [Hillside Home@32]");
    }
}
