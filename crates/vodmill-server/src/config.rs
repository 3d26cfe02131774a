//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use vodmill_media::TranscodeSettings;

/// Local staging directories.
#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Directory raw downloads are staged in
    pub raw_dir: PathBuf,
    /// Directory transcoded outputs are staged in
    pub processed_dir: PathBuf,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("raw-videos"),
            processed_dir: PathBuf::from("processed-videos"),
        }
    }
}

impl StageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            raw_dir: std::env::var("RAW_STAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("raw-videos")),
            processed_dir: std::env::var("PROCESSED_STAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("processed-videos")),
        }
    }
}

/// Service configuration, built once at startup and threaded into each
/// component.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Max request body size; push envelopes are small
    pub max_body_size: usize,
    /// Whether the Prometheus exporter is installed
    pub metrics_enabled: bool,
    /// Local staging directories
    pub stage: StageConfig,
    /// Engine invocation settings
    pub transcode: TranscodeSettings,
    /// Per-job deadline in seconds
    pub job_timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_body_size: 1024 * 1024, // 1MB
            metrics_enabled: true,
            stage: StageConfig::default(),
            transcode: TranscodeSettings::default(),
            job_timeout_secs: 1800,
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let mut transcode = TranscodeSettings::default();
        if let Ok(path) = std::env::var("FFMPEG_PATH") {
            transcode.engine_bin = PathBuf::from(path);
        }

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3000),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(true),
            stage: StageConfig::from_env(),
            transcode,
            job_timeout_secs: std::env::var("JOB_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1800),
        }
    }

    /// Per-job deadline.
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}
