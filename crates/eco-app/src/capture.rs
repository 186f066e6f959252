use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use async_trait::async_trait;
use tracing::{debug, warn};
use eco_core::{CaptureArtifact, CaptureSource, WorkflowError};
use crate::backend::LiveFeed;

const NO_FILE_SELECTED: &str = "Please upload an image of the waste material.";

/// Image chosen by the user from disk.
#[derive(Debug, Default)]
pub struct FileCapture {
    selected: Mutex<Option<PathBuf>>,
}

impl FileCapture {
    pub fn select(&self, path: PathBuf) {
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner) = Some(path);
    }

    pub fn selected(&self) -> Option<PathBuf> {
        self.selected.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl CaptureSource for FileCapture {
    async fn acquire(&self) -> Result<CaptureArtifact, WorkflowError> {
        let path = self
            .selected()
            .ok_or_else(|| WorkflowError::CaptureUnavailable(NO_FILE_SELECTED.into()))?;

        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            WorkflowError::CaptureUnavailable(format!("cannot read {}: {e}", path.display()))
        })?;

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        CaptureArtifact::from_image_bytes(bytes, file_name)
    }

    async fn release(&self) {
        debug!("file capture released");
    }
}

/// Still frame grabbed from the backend's live camera feed. Releasing it
/// turns the camera off.
pub struct FeedCapture {
    feed: LiveFeed,
    frame_timeout: Duration,
}

impl FeedCapture {
    pub fn new(feed: LiveFeed, frame_timeout: Duration) -> Self {
        Self { feed, frame_timeout }
    }
}

#[async_trait]
impl CaptureSource for FeedCapture {
    async fn acquire(&self) -> Result<CaptureArtifact, WorkflowError> {
        let frame = self
            .feed
            .next_frame(self.frame_timeout)
            .await
            .map_err(|e| WorkflowError::CaptureUnavailable(e.to_string()))?;

        CaptureArtifact::from_image_bytes(frame, "capture.jpg")
    }

    async fn release(&self) {
        if let Err(e) = self.feed.stop().await {
            warn!("failed to stop live feed after detection: {e}");
        }
    }
}
