//! The push-notification processing endpoint.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::WithRejection;
use serde::Serialize;
use tracing::{info, warn};
use vodmill_models::{JobId, JobOutcome, ObjectName, PushEnvelope, TranscodeJob};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Success acknowledgement for one processed notification.
#[derive(Serialize)]
pub struct ProcessResponse {
    pub job_id: JobId,
    pub video: ObjectName,
    pub processed_key: String,
    pub outcome: JobOutcome,
}

/// Handle one push notification end to end.
///
/// The response is sent exactly once, after the job reaches its terminal
/// state: 200 on success, 400 for a payload the sender must fix, 500 when a
/// pipeline stage failed and the upstream queue should redeliver.
pub async fn process_video(
    State(state): State<AppState>,
    WithRejection(Json(envelope), _): WithRejection<Json<PushEnvelope>, ApiError>,
) -> ApiResult<Json<ProcessResponse>> {
    let video = match envelope.decode() {
        Ok(name) => name,
        Err(e) => {
            warn!("Rejected push notification: {}", e);
            metrics::record_job_outcome(JobOutcome::ValidationError);
            return Err(e.into());
        }
    };

    let job = TranscodeJob::new(video);
    info!(job_id = %job.id, video = %job.video, "Accepted transcode job");

    state.pipeline.run(&job, state.shutdown_rx()).await?;

    Ok(Json(ProcessResponse {
        processed_key: job.output_key(),
        job_id: job.id,
        video: job.video,
        outcome: JobOutcome::Success,
    }))
}
