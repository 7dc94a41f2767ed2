//! Job queue over pgmq, spoken through the Supabase RPC endpoint.
//!
//! The durable queue lives inside Postgres (pgmq); the worker reaches it
//! through `/rest/v1/rpc/pgmq_*` calls with the service-role key. A read
//! takes a visibility-timeout lease; deleting the message acknowledges it,
//! archiving moves it to pgmq's archive table, which serves as the dead
//! letter queue.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use lumina_models::RenderCapsuleJob;

use crate::error::{QueueError, QueueResult};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Supabase project base URL
    pub supabase_url: String,
    /// Service role key (sent as apikey and bearer token)
    pub service_role_key: String,
    /// pgmq queue name
    pub queue_name: String,
    /// Lease granted to each read
    pub visibility_timeout: Duration,
    /// Deliveries after which a message is archived instead of retried
    pub max_read_count: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            service_role_key: String::new(),
            queue_name: "video_jobs_queue".to_string(),
            visibility_timeout: Duration::from_secs(300),
            max_read_count: 5,
        }
    }
}

impl QueueConfig {
    /// Create config from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Ok(Self {
            supabase_url: std::env::var("SUPABASE_URL")
                .map_err(|_| QueueError::config_error("SUPABASE_URL not set"))?,
            service_role_key: std::env::var("SUPABASE_SERVICE_ROLE_KEY")
                .map_err(|_| QueueError::config_error("SUPABASE_SERVICE_ROLE_KEY not set"))?,
            queue_name: std::env::var("QUEUE_NAME")
                .unwrap_or_else(|_| "video_jobs_queue".to_string()),
            visibility_timeout: Duration::from_secs(
                std::env::var("QUEUE_VISIBILITY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            max_read_count: std::env::var("QUEUE_MAX_READ_COUNT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        })
    }
}

/// A leased queue message.
#[derive(Debug, Clone, Deserialize)]
pub struct QueueMessage {
    /// pgmq message id
    pub msg_id: i64,
    /// Delivery count, incremented by pgmq on every read
    pub read_ct: u32,
    /// Opaque job payload
    pub message: serde_json::Value,
}

impl QueueMessage {
    /// Decode the payload into a render job.
    pub fn job(&self) -> QueueResult<RenderCapsuleJob> {
        Ok(serde_json::from_value(self.message.clone())?)
    }

    /// Whether this delivery has exhausted the retry budget.
    pub fn exceeds_reads(&self, max_read_count: u32) -> bool {
        self.read_ct > max_read_count
    }
}

/// Job queue client.
#[derive(Clone)]
pub struct JobQueue {
    http: reqwest::Client,
    config: QueueConfig,
    rpc_base: String,
}

impl JobQueue {
    /// Create a new job queue client.
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let rpc_base = format!("{}/rest/v1/rpc", config.supabase_url.trim_end_matches('/'));
        Ok(Self {
            http,
            config,
            rpc_base,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        Self::new(QueueConfig::from_env()?)
    }

    /// Max deliveries before archiving, from config.
    pub fn max_read_count(&self) -> u32 {
        self.config.max_read_count
    }

    /// Call a pgmq RPC and return the raw response body.
    async fn rpc(&self, name: &str, body: serde_json::Value) -> QueueResult<String> {
        let url = format!("{}/{}", self.rpc_base, name);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(QueueError::api(name, status.as_u16(), text));
        }
        Ok(text)
    }

    /// Read at most one message, taking a visibility-timeout lease on it.
    ///
    /// Returns `None` when the queue is empty.
    pub async fn read(&self) -> QueueResult<Option<QueueMessage>> {
        let body = json!({
            "queue_name": self.config.queue_name,
            "vt": self.config.visibility_timeout.as_secs(),
            "limit": 1,
        });

        let text = self.rpc("pgmq_read", body).await?;
        let mut messages: Vec<QueueMessage> = serde_json::from_str(&text)?;

        match messages.pop() {
            Some(msg) => {
                debug!(
                    msg_id = msg.msg_id,
                    read_ct = msg.read_ct,
                    "Leased message from queue"
                );
                Ok(Some(msg))
            }
            None => Ok(None),
        }
    }

    /// Acknowledge a message by deleting it from the queue.
    pub async fn ack(&self, msg_id: i64) -> QueueResult<()> {
        let body = json!({
            "queue_name": self.config.queue_name,
            "message_id": msg_id,
        });
        self.rpc("pgmq_delete", body).await?;
        debug!(msg_id, "Acknowledged message");
        Ok(())
    }

    /// Move a message to the archive table (dead letter).
    pub async fn archive(&self, msg_id: i64, reason: &str) -> QueueResult<()> {
        let body = json!({
            "queue_name": self.config.queue_name,
            "message_id": msg_id,
        });
        self.rpc("pgmq_archive", body).await?;
        warn!(msg_id, reason, "Archived message to dead letter");
        Ok(())
    }

    /// Enqueue a render job.
    pub async fn send(&self, job: &RenderCapsuleJob) -> QueueResult<i64> {
        let body = json!({
            "queue_name": self.config.queue_name,
            "message": job,
        });
        let text = self.rpc("pgmq_send", body).await?;
        // pgmq_send returns the new message id, either bare or as a one-row array
        let msg_id = serde_json::from_str::<Vec<i64>>(&text)
            .map(|ids| ids.into_iter().next().unwrap_or(0))
            .or_else(|_| serde_json::from_str::<i64>(&text))?;

        info!(job_id = %job.job_id, capsule_id = %job.capsule_id, msg_id, "Enqueued render job");
        Ok(msg_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumina_models::CapsuleId;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> QueueConfig {
        QueueConfig {
            supabase_url: server.uri(),
            service_role_key: "service-key".to_string(),
            queue_name: "video_jobs_queue".to_string(),
            visibility_timeout: Duration::from_secs(120),
            max_read_count: 3,
        }
    }

    #[tokio::test]
    async fn read_leases_one_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/pgmq_read"))
            .and(body_partial_json(serde_json::json!({
                "queue_name": "video_jobs_queue",
                "vt": 120,
                "limit": 1,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{
                "msg_id": 7,
                "read_ct": 2,
                "message": {
                    "job_id": "j1",
                    "capsule_id": "c1",
                    "requested_at": "2024-06-01T00:00:00Z"
                }
            }])))
            .mount(&server)
            .await;

        let queue = JobQueue::new(test_config(&server)).unwrap();
        let msg = queue.read().await.unwrap().expect("one message");

        assert_eq!(msg.msg_id, 7);
        assert_eq!(msg.read_ct, 2);
        assert!(!msg.exceeds_reads(3));
        let job = msg.job().unwrap();
        assert_eq!(job.capsule_id.as_str(), "c1");
    }

    #[tokio::test]
    async fn read_returns_none_on_empty_queue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/pgmq_read"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let queue = JobQueue::new(test_config(&server)).unwrap();
        assert!(queue.read().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ack_deletes_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/pgmq_delete"))
            .and(body_partial_json(serde_json::json!({
                "queue_name": "video_jobs_queue",
                "message_id": 42,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let queue = JobQueue::new(test_config(&server)).unwrap();
        queue.ack(42).await.unwrap();
    }

    #[tokio::test]
    async fn archive_moves_to_dead_letter() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/pgmq_archive"))
            .and(body_partial_json(serde_json::json!({ "message_id": 9 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let queue = JobQueue::new(test_config(&server)).unwrap();
        queue.archive(9, "exceeded max reads").await.unwrap();
    }

    #[tokio::test]
    async fn rpc_error_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/pgmq_read"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let queue = JobQueue::new(test_config(&server)).unwrap();
        let err = queue.read().await.unwrap_err();
        match err {
            QueueError::Api { status, body, .. } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_enqueues_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/rpc/pgmq_send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([11])))
            .mount(&server)
            .await;

        let queue = JobQueue::new(test_config(&server)).unwrap();
        let job = RenderCapsuleJob::new(CapsuleId::from_string("c1"));
        assert_eq!(queue.send(&job).await.unwrap(), 11);
    }

    #[test]
    fn exceeds_reads_boundary() {
        let msg = QueueMessage {
            msg_id: 1,
            read_ct: 3,
            message: serde_json::Value::Null,
        };
        assert!(!msg.exceeds_reads(3));
        assert!(msg.exceeds_reads(2));
    }
}
