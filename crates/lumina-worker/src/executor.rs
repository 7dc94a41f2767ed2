//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use lumina_queue::{JobQueue, QueueMessage};

use crate::error::WorkerResult;
use crate::pipeline::CapsulePipeline;

/// Pulls render jobs off the queue and runs them one at a time.
///
/// Capsule assembly is FFmpeg-bound; a single sequential loop keeps the
/// host's encoder capacity for the job in flight.
pub struct JobExecutor {
    queue: Arc<JobQueue>,
    pipeline: Arc<CapsulePipeline>,
    poll_interval: Duration,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(queue: JobQueue, pipeline: CapsulePipeline, poll_interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            queue: Arc::new(queue),
            pipeline: Arc::new(pipeline),
            poll_interval,
            shutdown,
        }
    }

    /// Handle used to request a graceful stop.
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown.clone()
    }

    /// Run until shutdown is signalled.
    ///
    /// Shutdown is checked between jobs, never during one: a leased job
    /// always runs to completion and is acknowledged before the loop exits.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Starting job executor"
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            if *shutdown_rx.borrow() {
                info!("Shutdown signal received, stopping executor");
                break;
            }

            match self.step().await {
                Ok(true) => {}
                Ok(false) => self.idle(&mut shutdown_rx).await,
                Err(e) => {
                    error!("Queue poll failed: {}", e);
                    self.idle(&mut shutdown_rx).await;
                }
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Sleep out the poll interval, waking early on shutdown.
    async fn idle(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = shutdown_rx.changed() => {}
            _ = tokio::time::sleep(self.poll_interval) => {}
        }
    }

    /// One lease-process-ack cycle. Returns whether a message was leased.
    pub async fn step(&self) -> WorkerResult<bool> {
        let Some(msg) = self.queue.read().await? else {
            return Ok(false);
        };
        self.handle_message(msg).await;
        Ok(true)
    }

    async fn handle_message(&self, msg: QueueMessage) {
        let msg_id = msg.msg_id;

        if msg.exceeds_reads(self.queue.max_read_count()) {
            if let Err(e) = self.queue.archive(msg_id, "exceeded max read count").await {
                error!(msg_id, "Failed to archive exhausted message: {}", e);
            }
            return;
        }

        let job = match msg.job() {
            Ok(job) => job,
            Err(e) => {
                // A payload that cannot decode will never decode; park it in
                // the archive where it stays inspectable instead of letting
                // it cycle through the retry budget.
                warn!(msg_id, "Archiving malformed job payload: {}", e);
                if let Err(e) = self.queue.archive(msg_id, "malformed payload").await {
                    error!(msg_id, "Failed to archive malformed message: {}", e);
                }
                return;
            }
        };

        match self.pipeline.process(&job).await {
            Ok(url) => {
                info!(msg_id, job_id = %job.job_id, url, "Job completed");
                if let Err(e) = self.queue.ack(msg_id).await {
                    // The work is published; redelivery would only redo it
                    // onto the same storage key.
                    error!(msg_id, "Failed to acknowledge completed job: {}", e);
                }
            }
            Err(e) => {
                error!(
                    msg_id,
                    job_id = %job.job_id,
                    capsule_id = %job.capsule_id,
                    "Job failed, leaving message leased for redelivery: {}", e
                );
            }
        }
    }
}
