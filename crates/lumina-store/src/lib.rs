//! Content store gateway for the Lumina worker.
//!
//! This crate provides:
//! - Capsule/admin snapshot reads
//! - Ordered non-hidden message reads
//! - The publish-side capsule record update

pub mod client;
pub mod error;
pub mod records;

pub use client::{StoreClient, StoreConfig};
pub use error::{StoreError, StoreResult};
