//! Job queue client for the Lumina worker.
//!
//! This crate provides:
//! - pgmq read/ack/archive/send over the Supabase RPC endpoint
//! - Visibility-timeout leasing
//! - Delivery-count based dead lettering

pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{JobQueue, QueueConfig, QueueMessage};
