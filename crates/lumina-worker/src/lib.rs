//! Capsule assembly worker.
//!
//! This crate provides:
//! - Job executor leasing render jobs from pgmq
//! - The capsule pipeline: fetch, render, concatenate, publish
//! - Message classification and per-part fallback handling
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod parts;
pub mod pipeline;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use pipeline::CapsulePipeline;
