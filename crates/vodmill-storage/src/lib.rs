//! Object store client for the vodmill pipeline.
//!
//! This crate provides:
//! - Raw video download into local staging
//! - Processed video publishing (upload, then public-read policy)
//! - Presigned upload URL generation for the issuance collaborator
//! - Object deletion and connectivity probes

pub mod client;
pub mod error;
pub mod operations;

pub use client::{ObjectStore, StorageConfig};
pub use error::{StorageError, StorageResult};
pub use operations::content_type_for;
