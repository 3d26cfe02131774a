//! Transcode job identity and lifecycle types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::object::ObjectName;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pipeline stage a job suspends in.
///
/// Used for state logging and for attributing a deadline expiry to the
/// operation it interrupted. Cleanup is not a stage: it runs unconditionally
/// and never decides the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Fetching the raw object into the raw staging directory
    Download,
    /// Running the engine on the staged raw file
    Transcode,
    /// Publishing the staged processed file
    Upload,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Download => "download",
            JobStage::Transcode => "transcode",
            JobStage::Upload => "upload",
        }
    }

    /// The outcome a job ends with when this stage fails.
    pub fn failure_outcome(&self) -> JobOutcome {
        match self {
            JobStage::Download => JobOutcome::DownloadError,
            JobStage::Transcode => JobOutcome::TranscodeError,
            JobStage::Upload => JobOutcome::UploadError,
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of one transcode job.
///
/// Decides the HTTP response: `Success` acks with 200, `ValidationError`
/// rejects with 400 and is never retried, the rest report 500 so the
/// upstream queue can redeliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    Success,
    ValidationError,
    DownloadError,
    TranscodeError,
    UploadError,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Success => "success",
            JobOutcome::ValidationError => "validation_error",
            JobOutcome::DownloadError => "download_error",
            JobOutcome::TranscodeError => "transcode_error",
            JobOutcome::UploadError => "upload_error",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Success)
    }

    /// Client-caused outcomes are acknowledged without redelivery.
    pub fn is_client_error(&self) -> bool {
        matches!(self, JobOutcome::ValidationError)
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted transcode job, minted after payload validation.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TranscodeJob {
    /// Unique job ID, carried through every log line for the job
    pub id: JobId,

    /// Validated name of the raw object to process
    pub video: ObjectName,

    /// Receipt timestamp
    pub received_at: DateTime<Utc>,
}

impl TranscodeJob {
    /// Mint a job for a validated object name.
    pub fn new(video: ObjectName) -> Self {
        Self {
            id: JobId::new(),
            video,
            received_at: Utc::now(),
        }
    }

    /// Key the processed output is uploaded under.
    pub fn output_key(&self) -> String {
        self.video.processed_key()
    }
}
