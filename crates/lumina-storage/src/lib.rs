//! Blob storage client for the Lumina worker.
//!
//! This crate provides:
//! - Upsert upload of the final capsule artifact
//! - Deterministic per-capsule object keys
//! - Public URL derivation

pub mod client;
pub mod error;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
