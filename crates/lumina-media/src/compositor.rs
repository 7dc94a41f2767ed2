//! Image compositing capability.
//!
//! Slide production is expressed against the `ImageCompositor` trait so the
//! pipeline stays independent of the concrete engine; the shipped
//! implementation shells out to ImageMagick `convert`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Anchor point for text and image placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    North,
    West,
    Center,
    NorthWest,
    SouthWest,
    SouthEast,
}

impl Gravity {
    pub fn as_arg(&self) -> &'static str {
        match self {
            Gravity::North => "north",
            Gravity::West => "west",
            Gravity::Center => "center",
            Gravity::NorthWest => "northwest",
            Gravity::SouthWest => "southwest",
            Gravity::SouthEast => "southeast",
        }
    }
}

/// One text annotation to draw.
#[derive(Debug, Clone)]
pub struct TextOverlay {
    pub text: String,
    pub gravity: Gravity,
    pub point_size: u32,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl TextOverlay {
    pub fn new(
        text: impl Into<String>,
        gravity: Gravity,
        point_size: u32,
        x_offset: i32,
        y_offset: i32,
    ) -> Self {
        Self {
            text: text.into(),
            gravity,
            point_size,
            x_offset,
            y_offset,
        }
    }

    fn annotate_geometry(&self) -> String {
        format!("{:+}{:+}", self.x_offset, self.y_offset)
    }
}

/// Placement for a composited image.
#[derive(Debug, Clone, Copy)]
pub struct ImagePlacement {
    /// Forced resize applied to the overlay before compositing
    pub resize_width: u32,
    pub resize_height: u32,
    pub gravity: Gravity,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl ImagePlacement {
    fn geometry(&self) -> String {
        format!("{:+}{:+}", self.x_offset, self.y_offset)
    }
}

/// Image compositing engine.
#[async_trait]
pub trait ImageCompositor: Send + Sync {
    /// Resize a background image onto the output canvas.
    async fn render_background(
        &self,
        background: &Path,
        width: u32,
        height: u32,
        out: &Path,
    ) -> MediaResult<()>;

    /// Draw text annotations over a base image.
    async fn overlay_text(&self, base: &Path, texts: &[TextOverlay], out: &Path)
        -> MediaResult<()>;

    /// Resize `image` and composite it over a base image.
    async fn overlay_image(
        &self,
        base: &Path,
        image: &Path,
        placement: ImagePlacement,
        out: &Path,
    ) -> MediaResult<()>;
}

/// Sanitize contributor-supplied text before handing it to the compositor.
///
/// Arguments never pass through a shell, but ImageMagick's annotate reads a
/// leading `@` as "load text from file" and backslash escapes; both are
/// neutralized, along with control characters.
pub fn sanitize_annotation_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\n')
        .collect();
    let escaped = cleaned.replace('\\', "\\\\").replace('"', "\\\"");
    match escaped.strip_prefix('@') {
        Some(rest) => format!("\\@{}", rest),
        None => escaped,
    }
}

/// ImageMagick-backed compositor.
#[derive(Debug, Clone, Default)]
pub struct MagickCompositor;

impl MagickCompositor {
    pub fn new() -> Self {
        Self
    }

    async fn run_convert(args: Vec<String>) -> MediaResult<()> {
        which::which("convert").map_err(|_| MediaError::ConvertNotFound)?;

        debug!("Running convert {}", args.join(" "));

        let output = Command::new("convert")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(MediaError::convert_failed(
                "convert exited with non-zero status",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ))
        }
    }
}

#[async_trait]
impl ImageCompositor for MagickCompositor {
    async fn render_background(
        &self,
        background: &Path,
        width: u32,
        height: u32,
        out: &Path,
    ) -> MediaResult<()> {
        if !background.exists() {
            return Err(MediaError::AssetMissing(background.to_path_buf()));
        }

        let args = vec![
            background.to_string_lossy().to_string(),
            "-resize".to_string(),
            format!("{}x{}", width, height),
            out.to_string_lossy().to_string(),
        ];
        Self::run_convert(args).await
    }

    async fn overlay_text(
        &self,
        base: &Path,
        texts: &[TextOverlay],
        out: &Path,
    ) -> MediaResult<()> {
        let mut args = vec![
            base.to_string_lossy().to_string(),
            "-fill".to_string(),
            "white".to_string(),
        ];
        for overlay in texts {
            args.push("-gravity".to_string());
            args.push(overlay.gravity.as_arg().to_string());
            args.push("-pointsize".to_string());
            args.push(overlay.point_size.to_string());
            args.push("-annotate".to_string());
            args.push(overlay.annotate_geometry());
            args.push(sanitize_annotation_text(&overlay.text));
        }
        args.push(out.to_string_lossy().to_string());
        Self::run_convert(args).await
    }

    async fn overlay_image(
        &self,
        base: &Path,
        image: &Path,
        placement: ImagePlacement,
        out: &Path,
    ) -> MediaResult<()> {
        // Forced resize first, composite second; the resized copy lives next
        // to the output and is removed on both paths.
        let parent = out.parent().unwrap_or_else(|| Path::new("."));
        let resized: PathBuf = parent.join(format!("overlay_{}.png", Uuid::new_v4()));

        let resize_args = vec![
            image.to_string_lossy().to_string(),
            "-resize".to_string(),
            format!("{}x{}!", placement.resize_width, placement.resize_height),
            resized.to_string_lossy().to_string(),
        ];
        Self::run_convert(resize_args).await?;

        let composite_args = vec![
            base.to_string_lossy().to_string(),
            resized.to_string_lossy().to_string(),
            "-gravity".to_string(),
            placement.gravity.as_arg().to_string(),
            "-geometry".to_string(),
            placement.geometry(),
            "-composite".to_string(),
            out.to_string_lossy().to_string(),
        ];
        let result = Self::run_convert(composite_args).await;

        let _ = tokio::fs::remove_file(&resized).await;
        result
    }
}
