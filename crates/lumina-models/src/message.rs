//! Contributor message records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CapsuleId;

/// Unique identifier for a contributor message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The renderable content class a message resolves to.
///
/// A message carrying more than one content field resolves to the richest
/// one: video wins over audio, audio over text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Audio,
    Video,
}

/// A contributor message belonging to a capsule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message ID
    pub id: MessageId,
    /// Owning capsule
    pub capsule_id: CapsuleId,
    /// Written tribute text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Recorded audio URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Recorded video URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Contributor display name
    pub contributor_name: String,
    /// Submission timestamp; output order is ascending on this field
    pub submitted_at: DateTime<Utc>,
    /// Hidden messages are excluded from every render
    #[serde(default)]
    pub hidden: bool,
}

impl Message {
    /// Classify this message into its renderable kind.
    ///
    /// Returns `None` when the message carries no content at all; such
    /// messages produce no part and are silently skipped.
    pub fn kind(&self) -> Option<MessageKind> {
        if self.video_url.is_some() {
            Some(MessageKind::Video)
        } else if self.audio_url.is_some() {
            Some(MessageKind::Audio)
        } else if self.text.as_deref().is_some_and(|t| !t.is_empty()) {
            Some(MessageKind::Text)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_message() -> Message {
        Message {
            id: MessageId::new(),
            capsule_id: CapsuleId::from_string("c1"),
            text: None,
            audio_url: None,
            video_url: None,
            contributor_name: "Ann".to_string(),
            submitted_at: Utc::now(),
            hidden: false,
        }
    }

    #[test]
    fn classification_prefers_video_over_audio_over_text() {
        let mut msg = base_message();
        msg.text = Some("hello".to_string());
        msg.audio_url = Some("https://example.com/a.m4a".to_string());
        msg.video_url = Some("https://example.com/v.mp4".to_string());
        assert_eq!(msg.kind(), Some(MessageKind::Video));

        msg.video_url = None;
        assert_eq!(msg.kind(), Some(MessageKind::Audio));

        msg.audio_url = None;
        assert_eq!(msg.kind(), Some(MessageKind::Text));
    }

    #[test]
    fn contentless_message_yields_no_kind() {
        let msg = base_message();
        assert_eq!(msg.kind(), None);

        let mut empty_text = base_message();
        empty_text.text = Some(String::new());
        assert_eq!(empty_text.kind(), None);
    }

    #[test]
    fn message_serde_defaults() {
        // Rows fetched through PostgREST omit null columns entirely.
        let json = r#"{
            "id": "m1",
            "capsule_id": "c1",
            "contributor_name": "Ben",
            "submitted_at": "2024-05-01T12:00:00Z"
        }"#;
        let msg: Message = serde_json::from_str(json).expect("deserialize Message");
        assert_eq!(msg.text, None);
        assert!(!msg.hidden);
        assert_eq!(msg.kind(), None);
    }
}
