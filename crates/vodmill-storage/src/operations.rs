//! Pipeline-facing storage operations.

use std::path::Path;
use std::time::Duration;

use tracing::info;
use vodmill_models::ObjectName;

use crate::client::ObjectStore;
use crate::error::StorageResult;

impl ObjectStore {
    /// Fetch a raw video from the raw bucket into a staged local path.
    ///
    /// A failure is terminal for the job; redelivery, if any, belongs to the
    /// upstream queue.
    pub async fn download_raw(
        &self,
        name: &ObjectName,
        dest: impl AsRef<Path>,
    ) -> StorageResult<()> {
        self.download_file(self.raw_bucket(), name.as_str(), dest)
            .await
    }

    /// Publish a processed video: upload to the processed bucket, then set
    /// the public-read policy.
    ///
    /// The policy step failing after a successful transfer surfaces as
    /// [`StorageError::PolicyFailed`](crate::StorageError::PolicyFailed),
    /// never as a silent success.
    pub async fn upload_processed(&self, path: impl AsRef<Path>, key: &str) -> StorageResult<()> {
        let content_type = content_type_for(key);
        self.upload_file(self.processed_bucket(), key, path, content_type)
            .await?;
        self.make_public(self.processed_bucket(), key).await?;

        info!("Published {} as public-read", key);
        Ok(())
    }

    /// Generate a time-limited PUT URL into the raw bucket.
    ///
    /// Consumed by the upload-URL-issuance service, not by the pipeline.
    pub async fn presign_raw_upload(
        &self,
        name: &ObjectName,
        expires_in: Duration,
    ) -> StorageResult<String> {
        self.presign_put(self.raw_bucket(), name.as_str(), expires_in)
            .await
    }
}

/// Content type from the file extension.
pub fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".mp4") || name.ends_with(".m4v") {
        "video/mp4"
    } else if name.ends_with(".mov") {
        "video/quicktime"
    } else if name.ends_with(".webm") {
        "video/webm"
    } else if name.ends_with(".mkv") {
        "video/x-matroska"
    } else {
        "application/octet-stream"
    }
}
