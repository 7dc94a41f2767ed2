//! Queue job payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CapsuleId;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
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

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job to assemble the final video for one capsule.
///
/// This is the payload carried inside a pgmq message; the queue supplies the
/// message id and delivery count alongside it. Only the capsule id is
/// required on the wire: producers outside this workspace enqueue as little
/// as `{"capsule_id": "..."}`, so the bookkeeping fields are filled in on
/// deserialize when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderCapsuleJob {
    /// Unique job ID
    #[serde(default)]
    pub job_id: JobId,
    /// Capsule to render
    pub capsule_id: CapsuleId,
    /// When the job was enqueued
    #[serde(default = "Utc::now")]
    pub requested_at: DateTime<Utc>,
}

impl RenderCapsuleJob {
    /// Create a new render job for a capsule.
    pub fn new(capsule_id: CapsuleId) -> Self {
        Self {
            job_id: JobId::new(),
            capsule_id,
            requested_at: Utc::now(),
        }
    }
}
