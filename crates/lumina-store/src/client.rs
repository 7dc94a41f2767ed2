//! PostgREST client for the capsule content store.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::error::{StoreError, StoreResult};

/// Content store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Supabase project base URL
    pub supabase_url: String,
    /// Service role key (sent as apikey and bearer token)
    pub service_role_key: String,
    /// Request timeout
    pub timeout: Duration,
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self {
            supabase_url: std::env::var("SUPABASE_URL")
                .map_err(|_| StoreError::config_error("SUPABASE_URL not set"))?,
            service_role_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY")
                .map_err(|_| StoreError::config_error("SUPABASE_SERVICE_ROLE_KEY not set"))?,
            timeout: Duration::from_secs(30),
        })
    }
}

/// Content store gateway.
///
/// Read-only over capsule, admin and message records, except for the
/// publish-side update of the capsule's final video URL.
#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    config: StoreConfig,
    rest_base: String,
}

impl StoreClient {
    /// Create a new store client.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("lumina-store/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let rest_base = format!("{}/rest/v1", config.supabase_url.trim_end_matches('/'));

        Ok(Self {
            http,
            config,
            rest_base,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(StoreConfig::from_env()?)
    }

    /// GET rows from a table, decoding the JSON array response.
    pub(crate) async fn get_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, &str)],
    ) -> StoreResult<Vec<T>> {
        let url = format!("{}/{}", self.rest_base, table);
        let response = self
            .http
            .get(&url)
            .query(query)
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(StoreError::api(status.as_u16(), text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    /// PATCH rows matching a filter.
    pub(crate) async fn patch_rows(
        &self,
        table: &str,
        query: &[(&str, &str)],
        body: &serde_json::Value,
    ) -> StoreResult<()> {
        let url = format!("{}/{}", self.rest_base, table);
        let response = self
            .http
            .patch(&url)
            .query(query)
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::api(status.as_u16(), text));
        }
        Ok(())
    }
}
