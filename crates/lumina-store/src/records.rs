//! Record-level operations on the content store.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use lumina_models::{AdminInfo, CapsuleId, CapsuleInfo, Message, MessageId};

use crate::client::StoreClient;
use crate::error::{StoreError, StoreResult};

/// Capsule row as stored.
#[derive(Debug, Deserialize)]
struct CapsuleRow {
    id: String,
    name: String,
    image: Option<String>,
    admin_id: Option<String>,
}

/// Admin row as stored.
#[derive(Debug, Deserialize)]
struct AdminRow {
    name: String,
    logo_image: Option<String>,
}

/// Message row as stored; content columns keep their DB names.
#[derive(Debug, Deserialize)]
struct MessageRow {
    id: String,
    capsule_id: String,
    content_text: Option<String>,
    content_audio_url: Option<String>,
    content_video_url: Option<String>,
    contributor_name: String,
    submitted_at: DateTime<Utc>,
    #[serde(default)]
    hidden: bool,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: MessageId::from_string(row.id),
            capsule_id: CapsuleId::from_string(row.capsule_id),
            text: row.content_text,
            audio_url: row.content_audio_url,
            video_url: row.content_video_url,
            contributor_name: row.contributor_name,
            submitted_at: row.submitted_at,
            hidden: row.hidden,
        }
    }
}

impl StoreClient {
    /// Fetch the capsule snapshot, with nested admin branding when the
    /// capsule references an admin.
    ///
    /// Fails with `NotFound` when the capsule record is absent. A failing
    /// admin lookup is logged and dropped; branding is optional.
    pub async fn fetch_capsule_info(&self, capsule_id: &CapsuleId) -> StoreResult<CapsuleInfo> {
        let id_filter = format!("eq.{}", capsule_id);
        let rows: Vec<CapsuleRow> = self
            .get_rows(
                "capsules",
                &[
                    ("select", "id,name,image,admin_id"),
                    ("id", &id_filter),
                    ("limit", "1"),
                ],
            )
            .await?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::not_found(format!("capsule {}", capsule_id)))?;

        let mut info = CapsuleInfo {
            id: CapsuleId::from_string(row.id),
            name: row.name,
            image: row.image,
            admin: None,
        };

        if let Some(admin_id) = row.admin_id {
            match self.fetch_admin(&admin_id).await {
                Ok(admin) => info.admin = admin,
                Err(e) => {
                    warn!(capsule_id = %capsule_id, admin_id, error = %e, "Admin lookup failed, continuing without branding");
                }
            }
        }

        debug!(capsule_id = %capsule_id, has_admin = info.admin.is_some(), "Fetched capsule info");
        Ok(info)
    }

    async fn fetch_admin(&self, admin_id: &str) -> StoreResult<Option<AdminInfo>> {
        let id_filter = format!("eq.{}", admin_id);
        let rows: Vec<AdminRow> = self
            .get_rows(
                "admins",
                &[
                    ("select", "name,logo_image"),
                    ("admin_id", &id_filter),
                    ("limit", "1"),
                ],
            )
            .await?;

        Ok(rows.into_iter().next().map(|row| AdminInfo {
            name: row.name,
            logo_image: row.logo_image,
        }))
    }

    /// Fetch all non-hidden messages for a capsule, ordered by submission
    /// time ascending.
    ///
    /// Fails with `NotFound` when no non-hidden messages exist; a capsule
    /// with nothing to say has nothing to render.
    pub async fn fetch_messages(&self, capsule_id: &CapsuleId) -> StoreResult<Vec<Message>> {
        let id_filter = format!("eq.{}", capsule_id);
        let rows: Vec<MessageRow> = self
            .get_rows(
                "messages",
                &[
                    (
                        "select",
                        "id,capsule_id,content_text,content_audio_url,content_video_url,contributor_name,submitted_at,hidden",
                    ),
                    ("capsule_id", &id_filter),
                    ("hidden", "eq.false"),
                    ("order", "submitted_at.asc"),
                ],
            )
            .await?;

        if rows.is_empty() {
            return Err(StoreError::not_found(format!(
                "messages for capsule {}",
                capsule_id
            )));
        }

        debug!(capsule_id = %capsule_id, count = rows.len(), "Fetched capsule messages");
        Ok(rows.into_iter().map(Message::from).collect())
    }

    /// Record the published artifact URL on the capsule (publish step).
    pub async fn set_final_video_url(
        &self,
        capsule_id: &CapsuleId,
        video_url: &str,
    ) -> StoreResult<()> {
        let id_filter = format!("eq.{}", capsule_id);
        self.patch_rows(
            "capsules",
            &[("id", &id_filter)],
            &json!({ "final_video_url": video_url }),
        )
        .await?;

        info!(capsule_id = %capsule_id, video_url, "Updated capsule with final video URL");
        Ok(())
    }
}
