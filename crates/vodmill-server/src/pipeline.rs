//! The transcode pipeline: download, transcode, upload, cleanup.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{error, info, warn};
use vodmill_media::{MediaError, Transcoder};
use vodmill_models::{JobOutcome, JobStage, ObjectName, TranscodeJob};
use vodmill_storage::{ObjectStore, StorageError};

use crate::metrics;
use crate::stage::StageStore;

/// A pipeline failure, attributed to the stage that caused it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("download of {name} failed: {source}")]
    Download {
        name: ObjectName,
        #[source]
        source: StorageError,
    },

    #[error("transcode of {name} failed: {source}")]
    Transcode {
        name: ObjectName,
        #[source]
        source: MediaError,
    },

    #[error("upload of {key} failed: {source}")]
    Upload {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("job deadline expired during {stage}")]
    DeadlineExceeded { stage: JobStage },

    #[error("job cancelled during {stage}: service shutting down")]
    Cancelled { stage: JobStage },
}

impl PipelineError {
    /// Stage the failure is attributed to. Deadline expiry and cancellation
    /// belong to the operation they interrupted.
    pub fn stage(&self) -> JobStage {
        match self {
            PipelineError::Download { .. } => JobStage::Download,
            PipelineError::Transcode { .. } => JobStage::Transcode,
            PipelineError::Upload { .. } => JobStage::Upload,
            PipelineError::DeadlineExceeded { stage } | PipelineError::Cancelled { stage } => {
                *stage
            }
        }
    }

    pub fn outcome(&self) -> JobOutcome {
        self.stage().failure_outcome()
    }
}

/// Wall-clock budget for one job.
///
/// Set when the pipeline starts and consulted before each suspending call,
/// so a job can never outlive its deadline by stacking full per-stage waits.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    expires_at: Instant,
}

impl Deadline {
    fn after(budget: Duration) -> Self {
        Self {
            expires_at: Instant::now() + budget,
        }
    }

    /// Budget left, `None` once expired.
    fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        if now >= self.expires_at {
            None
        } else {
            Some(self.expires_at - now)
        }
    }
}

/// Orchestrates one job through its stages and guarantees that both staged
/// files are deleted on every exit once the pipeline has started.
pub struct TranscodePipeline {
    stage: StageStore,
    store: Arc<ObjectStore>,
    transcoder: Arc<Transcoder>,
    job_timeout: Duration,
}

impl TranscodePipeline {
    pub fn new(
        stage: StageStore,
        store: Arc<ObjectStore>,
        transcoder: Arc<Transcoder>,
        job_timeout: Duration,
    ) -> Self {
        Self {
            stage,
            store,
            transcoder,
            job_timeout,
        }
    }

    /// Run one job to its terminal state.
    ///
    /// Stages run strictly in order; each consumes the previous stage's
    /// output file. Whatever the result, both staged paths are deleted
    /// before it is returned, so a failed job leaves nothing behind.
    pub async fn run(
        &self,
        job: &TranscodeJob,
        cancel: watch::Receiver<bool>,
    ) -> Result<(), PipelineError> {
        let raw_path = self.stage.raw_path(&job.video);
        let output_key = job.output_key();
        let processed_path = self.stage.processed_path(&output_key);

        let deadline = Deadline::after(self.job_timeout);
        let result = self
            .execute(job, &raw_path, &processed_path, &output_key, deadline, cancel)
            .await;

        self.cleanup(job, &raw_path, &processed_path).await;

        match &result {
            Ok(()) => {
                metrics::record_job_outcome(JobOutcome::Success);
                info!(
                    job_id = %job.id,
                    video = %job.video,
                    key = %output_key,
                    "Job complete"
                );
            }
            Err(e) => {
                metrics::record_job_outcome(e.outcome());
                error!(
                    job_id = %job.id,
                    video = %job.video,
                    stage = %e.stage(),
                    outcome = %e.outcome(),
                    error = %e,
                    "Job failed"
                );
                if let PipelineError::Transcode {
                    source:
                        MediaError::FfmpegFailed {
                            stderr: Some(stderr),
                            ..
                        },
                    ..
                } = e
                {
                    error!(job_id = %job.id, "Engine stderr tail:\n{}", stderr);
                }
            }
        }

        result
    }

    async fn execute(
        &self,
        job: &TranscodeJob,
        raw_path: &Path,
        processed_path: &Path,
        output_key: &str,
        deadline: Deadline,
        cancel: watch::Receiver<bool>,
    ) -> Result<(), PipelineError> {
        // Download
        info!(job_id = %job.id, video = %job.video, "Downloading raw video");
        let budget = deadline.remaining().ok_or(PipelineError::DeadlineExceeded {
            stage: JobStage::Download,
        })?;
        let started = Instant::now();
        let mut cancel_rx = cancel.clone();
        tokio::select! {
            res = timeout(budget, self.store.download_raw(&job.video, raw_path)) => {
                res.map_err(|_| PipelineError::DeadlineExceeded {
                    stage: JobStage::Download,
                })?
                .map_err(|source| PipelineError::Download {
                    name: job.video.clone(),
                    source,
                })?;
            }
            _ = shutdown_flagged(&mut cancel_rx) => {
                return Err(PipelineError::Cancelled { stage: JobStage::Download });
            }
        }
        metrics::record_stage_duration(JobStage::Download, started.elapsed().as_secs_f64());

        // Transcode. The runner owns the budget here so it can kill the
        // engine process on expiry or cancellation.
        info!(job_id = %job.id, video = %job.video, "Transcoding staged video");
        let budget = deadline.remaining().ok_or(PipelineError::DeadlineExceeded {
            stage: JobStage::Transcode,
        })?;
        let started = Instant::now();
        self.transcoder
            .downscale(raw_path, processed_path, budget, Some(cancel.clone()))
            .await
            .map_err(|source| match source {
                MediaError::Timeout(_) => PipelineError::DeadlineExceeded {
                    stage: JobStage::Transcode,
                },
                MediaError::Cancelled => PipelineError::Cancelled {
                    stage: JobStage::Transcode,
                },
                source => PipelineError::Transcode {
                    name: job.video.clone(),
                    source,
                },
            })?;
        metrics::record_stage_duration(JobStage::Transcode, started.elapsed().as_secs_f64());

        // Upload
        info!(job_id = %job.id, video = %job.video, key = output_key, "Uploading processed video");
        let budget = deadline.remaining().ok_or(PipelineError::DeadlineExceeded {
            stage: JobStage::Upload,
        })?;
        let started = Instant::now();
        let mut cancel_rx = cancel.clone();
        tokio::select! {
            res = timeout(budget, self.store.upload_processed(processed_path, output_key)) => {
                res.map_err(|_| PipelineError::DeadlineExceeded {
                    stage: JobStage::Upload,
                })?
                .map_err(|source| PipelineError::Upload {
                    key: output_key.to_string(),
                    source,
                })?;
            }
            _ = shutdown_flagged(&mut cancel_rx) => {
                return Err(PipelineError::Cancelled { stage: JobStage::Upload });
            }
        }
        metrics::record_stage_duration(JobStage::Upload, started.elapsed().as_secs_f64());

        Ok(())
    }

    /// Delete both staged files, awaiting both deletions.
    ///
    /// A missing file is a no-op; a file that exists but cannot be removed
    /// is logged without changing the job's already-decided outcome.
    async fn cleanup(&self, job: &TranscodeJob, raw_path: &Path, processed_path: &Path) {
        for path in [raw_path, processed_path] {
            match self.stage.remove_if_present(path).await {
                Ok(true) => {
                    info!(job_id = %job.id, "Removed staged file {}", path.display());
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        job_id = %job.id,
                        "Failed to remove staged file {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
    }
}

/// Pends until the shutdown flag is raised; pends forever if the sender is
/// gone without raising it.
async fn shutdown_flagged(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
