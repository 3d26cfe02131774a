//! Axum HTTP server and transcode pipeline for vodmill.
//!
//! This crate provides:
//! - The push-notification endpoint driving the transcode pipeline
//! - Local staging with unconditional cleanup at job end
//! - Prometheus metrics and health/readiness probes

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod stage;
pub mod state;

pub use config::{ServiceConfig, StageConfig};
pub use error::{ApiError, ApiResult};
pub use pipeline::{PipelineError, TranscodePipeline};
pub use routes::create_router;
pub use stage::StageStore;
pub use state::AppState;
