//! Supabase Storage client for publishing final artifacts.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info};

use lumina_models::CapsuleId;

use crate::error::{StorageError, StorageResult};

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Supabase project base URL
    pub supabase_url: String,
    /// Service role key (sent as apikey and bearer token)
    pub service_role_key: String,
    /// Bucket holding published media
    pub bucket: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            supabase_url: std::env::var("SUPABASE_URL")
                .map_err(|_| StorageError::config_error("SUPABASE_URL not set"))?,
            service_role_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY")
                .map_err(|_| StorageError::config_error("SUPABASE_SERVICE_ROLE_KEY not set"))?,
            bucket: std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "media".to_string()),
        })
    }
}

/// Blob storage client.
#[derive(Clone)]
pub struct StorageClient {
    http: Client,
    base_url: String,
    bucket: String,
    service_role_key: String,
}

impl StorageClient {
    /// Create a new storage client.
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("lumina-storage/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            bucket: config.bucket,
            service_role_key: config.service_role_key,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(StorageConfig::from_env()?)
    }

    /// Deterministic object key for a capsule's final artifact.
    ///
    /// Re-running the pipeline for the same capsule overwrites the same key.
    pub fn final_video_key(capsule_id: &CapsuleId) -> String {
        format!("capsules/{}/final_video.mp4", capsule_id)
    }

    /// Upload a local file, overwriting any existing object at `key`.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let bytes = tokio::fs::read(path).await?;
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, key);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::upload_failed(format!(
                "{} returned {}: {}",
                key, status, body
            )));
        }

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    /// Public URL of an object in the bucket.
    pub fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> StorageClient {
        StorageClient::new(StorageConfig {
            supabase_url: server.uri(),
            service_role_key: "service-key".to_string(),
            bucket: "media".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn final_video_key_is_deterministic() {
        let id = CapsuleId::from_string("c1");
        assert_eq!(
            StorageClient::final_video_key(&id),
            "capsules/c1/final_video.mp4"
        );
        assert_eq!(
            StorageClient::final_video_key(&id),
            StorageClient::final_video_key(&id)
        );
    }

    #[tokio::test]
    async fn upload_sets_upsert_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/v1/object/media/capsules/c1/final_video.mp4"))
            .and(header("x-upsert", "true"))
            .and(header("Content-Type", "video/mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Key": "media/capsules/c1/final_video.mp4"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("final.mp4");
        std::fs::write(&file, b"fake mp4 bytes").unwrap();

        let client = test_client(&server);
        client
            .upload_file(&file, "capsules/c1/final_video.mp4", "video/mp4")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failed_upload_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("final.mp4");
        std::fs::write(&file, b"bytes").unwrap();

        let client = test_client(&server);
        let err = client
            .upload_file(&file, "capsules/c1/final_video.mp4", "video/mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UploadFailed(_)));
    }

    #[tokio::test]
    async fn public_url_matches_bucket_layout() {
        let server = MockServer::start().await;
        let client = test_client(&server);
        let url = client.public_url("capsules/c1/final_video.mp4");
        assert_eq!(
            url,
            format!(
                "{}/storage/v1/object/public/media/capsules/c1/final_video.mp4",
                server.uri()
            )
        );
    }
}
