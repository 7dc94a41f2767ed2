//! Shared data models for the Lumina backend.
//!
//! This crate provides Serde-serializable types for:
//! - Capsule, admin and message records
//! - Classified media parts and orientation
//! - Queue job payloads

pub mod capsule;
pub mod job;
pub mod message;
pub mod part;

// Re-export common types
pub use capsule::{AdminInfo, CapsuleId, CapsuleInfo};
pub use job::{JobId, RenderCapsuleJob};
pub use message::{Message, MessageId, MessageKind};
pub use part::{MediaPart, Orientation};
