//! Capsule and admin records.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a capsule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapsuleId(pub String);

impl CapsuleId {
    /// Generate a new random capsule ID.
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

impl Default for CapsuleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CapsuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owning-admin branding attached to a capsule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminInfo {
    /// Admin display name
    pub name: String,
    /// Logo image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_image: Option<String>,
}

/// Read-only snapshot of a capsule record, fetched once per job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapsuleInfo {
    /// Capsule ID
    pub id: CapsuleId,
    /// Display name
    pub name: String,
    /// Branding image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Owning admin, when the capsule references one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<AdminInfo>,
}

impl CapsuleInfo {
    /// Create a bare capsule snapshot.
    pub fn new(id: CapsuleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image: None,
            admin: None,
        }
    }

    /// Attach a branding image URL.
    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image = Some(url.into());
        self
    }

    /// Attach admin branding.
    pub fn with_admin(mut self, admin: AdminInfo) -> Self {
        self.admin = Some(admin);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capsule_info_serde_roundtrip() {
        let info = CapsuleInfo::new(CapsuleId::from_string("c1"), "In Memory of June")
            .with_image("https://example.com/june.jpg")
            .with_admin(AdminInfo {
                name: "Willow Home".to_string(),
                logo_image: None,
            });

        let json = serde_json::to_string(&info).expect("serialize CapsuleInfo");
        let decoded: CapsuleInfo = serde_json::from_str(&json).expect("deserialize CapsuleInfo");

        assert_eq!(decoded, info);
        assert!(json.contains("Willow Home"));
        // Absent optional fields are omitted entirely
        assert!(!json.contains("logo_image"));
    }
}
