//! Message-to-part preparation.
//!
//! Each contributor message is classified, its media fetched into the job's
//! scratch directory, and its slide pre-rendered where the layout allows.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use lumina_media::{detect_orientation, fetch_to_file, MediaError, SlideRenderer};
use lumina_models::{CapsuleInfo, MediaPart, Message, MessageKind};

use crate::error::WorkerResult;

/// Caption shown on the slide behind an audio recording when the message
/// carries no text of its own.
pub const AUDIO_CAPTION: &str = "Audio Tribute";

/// Caption shown on the info slide framing a video recording.
pub const VIDEO_CAPTION: &str = "Video Content";

/// Caption substituted when a part's own content cannot be rendered.
pub const FALLBACK_CAPTION: &str = "Content unavailable";

/// Prepare renderable parts for every message, in message order.
///
/// Contentless messages are skipped. Fetch failures and a missing background
/// asset abort the job; any other per-message render failure degrades that
/// message to a fallback slide so one bad part cannot sink the capsule.
pub async fn prepare_media_parts(
    http: &reqwest::Client,
    slides: &SlideRenderer,
    scratch: &Path,
    capsule: &CapsuleInfo,
    messages: &[Message],
) -> WorkerResult<Vec<MediaPart>> {
    let mut parts = Vec::with_capacity(messages.len());

    for message in messages {
        match prepare_part(http, slides, scratch, capsule, message).await {
            Ok(Some(part)) => parts.push(part),
            Ok(None) => {
                debug!(message_id = %message.id, "Skipping contentless message");
            }
            Err(e) if is_fatal(&e) => return Err(e.into()),
            Err(e) => {
                warn!(
                    message_id = %message.id,
                    error = %e,
                    "Message failed to render, substituting fallback slide"
                );
                let slide = render_fallback_slide(
                    slides,
                    scratch,
                    capsule,
                    Some(&message.contributor_name),
                )
                .await?;
                parts.push(MediaPart::Text { slide });
            }
        }
    }

    Ok(parts)
}

async fn prepare_part(
    http: &reqwest::Client,
    slides: &SlideRenderer,
    scratch: &Path,
    capsule: &CapsuleInfo,
    message: &Message,
) -> Result<Option<MediaPart>, MediaError> {
    let part = match message.kind() {
        None => return Ok(None),
        Some(MessageKind::Text) => {
            // kind() guarantees non-empty text here
            let body = message.text.as_deref().unwrap_or_default();
            let slide = slides
                .render_slide(scratch, capsule, body, Some(&message.contributor_name))
                .await?;
            MediaPart::Text { slide }
        }
        Some(MessageKind::Audio) => {
            let url = message.audio_url.as_deref().unwrap_or_default();
            let audio = fetch_to_file(http, url, scratch).await?;

            let caption = message
                .text
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(AUDIO_CAPTION);
            let slide = slides
                .render_slide(scratch, capsule, caption, Some(&message.contributor_name))
                .await?;
            MediaPart::Audio { slide, audio }
        }
        Some(MessageKind::Video) => {
            let url = message.video_url.as_deref().unwrap_or_default();
            let file = fetch_to_file(http, url, scratch).await?;
            let orientation = detect_orientation(&file).await.orientation();
            MediaPart::Video {
                file,
                orientation,
                contributor_name: message.contributor_name.clone(),
            }
        }
    };

    Ok(Some(part))
}

/// Render the stand-in slide for a part whose content failed to render.
pub async fn render_fallback_slide(
    slides: &SlideRenderer,
    scratch: &Path,
    capsule: &CapsuleInfo,
    contributor_name: Option<&str>,
) -> WorkerResult<PathBuf> {
    Ok(slides
        .render_slide(scratch, capsule, FALLBACK_CAPTION, contributor_name)
        .await?)
}

/// Errors that must abort the whole job rather than degrade one part.
fn is_fatal(e: &MediaError) -> bool {
    matches!(
        e,
        MediaError::DownloadFailed { .. } | MediaError::AssetMissing(_)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_and_asset_failures_are_fatal() {
        assert!(is_fatal(&MediaError::download_failed("gone")));
        assert!(is_fatal(&MediaError::AssetMissing(PathBuf::from("bg.jpg"))));
        assert!(!is_fatal(&MediaError::convert_failed("bad font", None)));
        assert!(!is_fatal(&MediaError::ffmpeg_failed("boom", None, Some(1))));
    }
}
