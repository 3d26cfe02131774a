//! Shared data models for the vodmill transcoding service.
//!
//! This crate provides Serde-serializable types for:
//! - Inbound push notifications and their base64-encoded payloads
//! - Validated raw-object names and derived processed keys
//! - Job identity, stages, and terminal outcomes

pub mod job;
pub mod notification;
pub mod object;

// Re-export common types
pub use job::{JobId, JobOutcome, JobStage, TranscodeJob};
pub use notification::{NotificationError, PushEnvelope, PushMessage, VideoUploadPayload};
pub use object::{ObjectName, ObjectNameError, PROCESSED_KEY_PREFIX};
