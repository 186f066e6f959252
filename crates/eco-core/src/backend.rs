use async_trait::async_trait;
use crate::capture::CaptureArtifact;
use crate::detection::DetectResponse;
use crate::error::BackendError;
use crate::media::VideoResponse;
use crate::suggestion::SuggestPayload;

/// The remote detection / suggestion / video service, seen as three calls.
///
/// Implementations report transport failures, non-success statuses and bodies
/// that do not match the expected shape as [`BackendError`]s; the workflow
/// maps those onto the failing stage.
#[async_trait]
pub trait WasteBackend: Send + Sync {
    async fn detect(&self, artifact: &CaptureArtifact) -> Result<DetectResponse, BackendError>;

    async fn suggest(&self, object: &str) -> Result<SuggestPayload, BackendError>;

    async fn generate_video(&self, steps: &[String]) -> Result<VideoResponse, BackendError>;
}
