//! Final segment concatenation.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use lumina_models::CapsuleId;

use crate::error::{MediaError, MediaResult};
use crate::transcoder::MediaTranscoder;

/// Concatenate normalized segments into the capsule's final video.
///
/// Segments were all rendered to the same canvas and pixel format, so the
/// join is a stream copy with no re-encode.
pub async fn concatenate(
    transcoder: &dyn MediaTranscoder,
    segments: &[PathBuf],
    scratch: &Path,
    capsule_id: &CapsuleId,
) -> MediaResult<PathBuf> {
    if segments.is_empty() {
        return Err(MediaError::concat_failed("No segments to concatenate"));
    }
    for segment in segments {
        if !segment.exists() {
            return Err(MediaError::concat_failed(format!(
                "Segment missing before concat: {}",
                segment.display()
            )));
        }
    }

    let list_file = scratch.join("concat.txt");
    write_concat_list(&list_file, segments).await?;

    let out = scratch.join(format!("capsule_{}.mp4", capsule_id));
    debug!(segments = segments.len(), list = %list_file.display(), "Concatenating segments");
    transcoder.concat_stream_copy(&list_file, &out).await?;

    info!(capsule_id = %capsule_id, output = %out.display(), "Assembled final video");
    Ok(out)
}

/// FFmpeg concat demuxer list: one `file '...'` line per segment, single
/// quotes escaped the demuxer's way.
async fn write_concat_list(list_file: &Path, segments: &[PathBuf]) -> MediaResult<()> {
    let mut body = String::new();
    for segment in segments {
        let path = segment.to_string_lossy().replace('\'', "'\\''");
        body.push_str(&format!("file '{}'\n", path));
    }

    let mut file = tokio::fs::File::create(list_file).await?;
    file.write_all(body.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ListCapturingTranscoder {
        captured: Mutex<Option<String>>,
    }

    #[async_trait]
    impl MediaTranscoder for ListCapturingTranscoder {
        async fn loop_image_to_video(
            &self,
            _image: &Path,
            _seconds: f64,
            _out: &Path,
        ) -> MediaResult<()> {
            unreachable!("concat never loops images")
        }

        async fn still_image_with_audio(
            &self,
            _image: &Path,
            _audio: &Path,
            _out: &Path,
        ) -> MediaResult<()> {
            unreachable!("concat never renders audio slides")
        }

        async fn overlay_video_on_slide(
            &self,
            _video: &Path,
            _slide: &Path,
            _orientation: lumina_models::Orientation,
            _out: &Path,
        ) -> MediaResult<()> {
            unreachable!("concat never overlays video")
        }

        async fn concat_stream_copy(&self, list_file: &Path, out: &Path) -> MediaResult<()> {
            *self.captured.lock().unwrap() = Some(std::fs::read_to_string(list_file)?);
            std::fs::write(out, b"mp4")?;
            Ok(())
        }
    }

    #[tokio::test]
    async fn list_preserves_segment_order() {
        let scratch = tempfile::tempdir().unwrap();
        let segments: Vec<PathBuf> = (0..3)
            .map(|i| {
                let p = scratch.path().join(format!("segment_{}.mp4", i));
                std::fs::write(&p, b"mp4").unwrap();
                p
            })
            .collect();

        let transcoder = ListCapturingTranscoder {
            captured: Mutex::new(None),
        };
        let out = concatenate(
            &transcoder,
            &segments,
            scratch.path(),
            &CapsuleId::from_string("c9"),
        )
        .await
        .unwrap();

        assert!(out.ends_with("capsule_c9.mp4"));
        let list = transcoder.captured.lock().unwrap().take().unwrap();
        let lines: Vec<&str> = list.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("segment_0.mp4"));
        assert!(lines[2].contains("segment_2.mp4"));
        assert!(lines.iter().all(|l| l.starts_with("file '")));
    }

    #[tokio::test]
    async fn missing_segment_fails_before_invoking_ffmpeg() {
        let scratch = tempfile::tempdir().unwrap();
        let segments = vec![scratch.path().join("segment_0.mp4")];

        let transcoder = ListCapturingTranscoder {
            captured: Mutex::new(None),
        };
        let err = concatenate(
            &transcoder,
            &segments,
            scratch.path(),
            &CapsuleId::from_string("c9"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::ConcatFailed(_)));
        assert!(transcoder.captured.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_segment_list_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let transcoder = ListCapturingTranscoder {
            captured: Mutex::new(None),
        };
        let err = concatenate(
            &transcoder,
            &[],
            scratch.path(),
            &CapsuleId::from_string("c9"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::ConcatFailed(_)));
    }
}
