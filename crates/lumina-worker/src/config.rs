//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use lumina_queue::QueueConfig;
use lumina_storage::StorageConfig;
use lumina_store::StoreConfig;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Queue client configuration
    pub queue: QueueConfig,
    /// Content store configuration
    pub store: StoreConfig,
    /// Blob storage configuration
    pub storage: StorageConfig,
    /// Root for per-job scratch directories
    pub work_dir: PathBuf,
    /// Directory holding slide background assets
    pub backgrounds_dir: PathBuf,
    /// Sleep between polls of an empty queue
    pub poll_interval: Duration,
    /// Optional directory receiving a local copy of each final video
    pub debug_dir: Option<PathBuf>,
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        Ok(Self {
            queue: QueueConfig::from_env()?,
            store: StoreConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            work_dir: std::env::var("WORKER_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/lumina")),
            backgrounds_dir: std::env::var("WORKER_BACKGROUNDS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("assets/backgrounds")),
            poll_interval: Duration::from_secs(
                std::env::var("WORKER_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            debug_dir: std::env::var("WORKER_DEBUG_DIR").ok().map(PathBuf::from),
        })
    }

    /// Fail fast when required external tools are absent.
    pub fn check_tools(&self) -> WorkerResult<()> {
        lumina_media::check_ffmpeg()?;
        lumina_media::check_ffprobe()?;
        lumina_media::check_convert()?;
        if !self.backgrounds_dir.join(lumina_media::BACKGROUND_FILE).exists() {
            return Err(WorkerError::config_error(format!(
                "Background asset missing: {}",
                self.backgrounds_dir
                    .join(lumina_media::BACKGROUND_FILE)
                    .display()
            )));
        }
        Ok(())
    }
}
