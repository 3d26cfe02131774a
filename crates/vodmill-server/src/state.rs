//! Application state.

use std::sync::Arc;

use tokio::sync::watch;
use vodmill_media::Transcoder;
use vodmill_storage::ObjectStore;

use crate::config::ServiceConfig;
use crate::pipeline::TranscodePipeline;
use crate::stage::StageStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub stage: StageStore,
    pub store: Arc<ObjectStore>,
    pub transcoder: Arc<Transcoder>,
    pub pipeline: Arc<TranscodePipeline>,
    /// Raised once at shutdown; every in-flight job watches a receiver.
    shutdown: Arc<watch::Sender<bool>>,
}

impl AppState {
    /// Create new application state from configuration.
    ///
    /// Builds the object store from the environment, creates the staging
    /// directories, and resolves the engine binary so a misconfigured
    /// service fails at startup rather than on its first job.
    pub async fn new(config: ServiceConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store = Arc::new(ObjectStore::from_env().await?);

        let stage = StageStore::new(&config.stage);
        stage.ensure_directories().await?;

        let transcoder = Arc::new(Transcoder::new(config.transcode.clone()));
        let engine = transcoder.check_engine()?;
        tracing::info!("Using transcoding engine at {}", engine.display());

        Ok(Self::from_parts(config, stage, store, transcoder))
    }

    /// Assemble state from already-built components.
    pub fn from_parts(
        config: ServiceConfig,
        stage: StageStore,
        store: Arc<ObjectStore>,
        transcoder: Arc<Transcoder>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let pipeline = TranscodePipeline::new(
            stage.clone(),
            Arc::clone(&store),
            Arc::clone(&transcoder),
            config.job_timeout(),
        );

        Self {
            config,
            stage,
            store,
            transcoder,
            pipeline: Arc::new(pipeline),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Receiver for the shutdown flag, one per job.
    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Raise the shutdown flag, cancelling in-flight jobs.
    pub fn begin_shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
