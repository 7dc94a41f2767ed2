//! FFprobe dimension and orientation detection.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::warn;

use lumina_models::Orientation;

use crate::error::{MediaError, MediaResult};

/// Detected dimensions of a media file's first visual stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDimensions {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl MediaDimensions {
    /// Full HD horizontal, the safe default when detection fails.
    pub const FALLBACK: MediaDimensions = MediaDimensions {
        width: 1920,
        height: 1080,
    };

    pub fn orientation(&self) -> Orientation {
        Orientation::from_dimensions(self.width, self.height)
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Probe a media file for its visual dimensions.
///
/// Prefers the first video stream; falls back to any stream that carries
/// dimensions (still images probe as such).
pub async fn probe_dimensions(path: impl AsRef<Path>) -> MediaResult<MediaDimensions> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::ProbeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    dimensions_from_streams(&probe.streams).ok_or_else(|| MediaError::ProbeFailed {
        message: "No stream with dimensions found".to_string(),
        stderr: None,
    })
}

fn dimensions_from_streams(streams: &[FfprobeStream]) -> Option<MediaDimensions> {
    let with_dims = |s: &&FfprobeStream| s.width.is_some() && s.height.is_some();

    let stream = streams
        .iter()
        .filter(with_dims)
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .or_else(|| streams.iter().find(with_dims))?;

    Some(MediaDimensions {
        width: stream.width?,
        height: stream.height?,
    })
}

/// Detect orientation, never failing the job over it.
///
/// Orientation is a layout hint: any probe failure (missing ffprobe,
/// unreadable container, no visual stream) falls back to 1920x1080
/// horizontal.
pub async fn detect_orientation(path: impl AsRef<Path>) -> MediaDimensions {
    let path = path.as_ref();
    match probe_dimensions(path).await {
        Ok(dims) => dims,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Could not detect media dimensions, assuming horizontal Full HD"
            );
            MediaDimensions::FALLBACK
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_horizontal_full_hd() {
        assert_eq!(MediaDimensions::FALLBACK.width, 1920);
        assert_eq!(MediaDimensions::FALLBACK.height, 1080);
        assert_eq!(MediaDimensions::FALLBACK.orientation(), Orientation::Horizontal);
    }

    #[test]
    fn vertical_dimensions_classify_vertical() {
        let dims = MediaDimensions {
            width: 1080,
            height: 1920,
        };
        assert_eq!(dims.orientation(), Orientation::Vertical);
    }

    #[test]
    fn prefers_video_stream_over_others() {
        let streams = vec![
            FfprobeStream {
                codec_type: Some("audio".to_string()),
                width: None,
                height: None,
            },
            FfprobeStream {
                codec_type: Some("video".to_string()),
                width: Some(720),
                height: Some(1280),
            },
        ];
        let dims = dimensions_from_streams(&streams).unwrap();
        assert_eq!(dims.width, 720);
        assert_eq!(dims.orientation(), Orientation::Vertical);
    }

    #[test]
    fn falls_back_to_any_stream_with_dimensions() {
        // Still images probe without a "video" codec_type on some builds.
        let streams = vec![FfprobeStream {
            codec_type: Some("image".to_string()),
            width: Some(640),
            height: Some(480),
        }];
        let dims = dimensions_from_streams(&streams).unwrap();
        assert_eq!(dims.orientation(), Orientation::Horizontal);
    }

    #[test]
    fn no_dimensions_yields_none() {
        let streams = vec![FfprobeStream {
            codec_type: Some("audio".to_string()),
            width: None,
            height: None,
        }];
        assert!(dimensions_from_streams(&streams).is_none());
    }

    #[tokio::test]
    async fn detect_orientation_defaults_on_missing_file() {
        let dims = detect_orientation("/nonexistent/clip.mp4").await;
        assert_eq!(dims, MediaDimensions::FALLBACK);
    }
}
