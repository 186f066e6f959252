use std::fmt;
use async_trait::async_trait;
use crate::error::WorkflowError;

/// A single still image, created per detection attempt and dropped after upload.
#[derive(Clone, PartialEq, Eq)]
pub struct CaptureArtifact {
    bytes: Vec<u8>,
    mime_type: String,
    file_name: String,
}

impl CaptureArtifact {
    /// Wraps raw image bytes, sniffing the mime type from the content.
    pub fn from_image_bytes(bytes: Vec<u8>, file_name: impl Into<String>) -> Result<Self, WorkflowError> {
        if bytes.is_empty() {
            return Err(WorkflowError::CaptureUnavailable("captured image is empty".into()));
        }

        let format = image::guess_format(&bytes).map_err(|e| {
            WorkflowError::CaptureUnavailable(format!("not a recognised image: {e}"))
        })?;

        Ok(Self {
            bytes,
            mime_type: format.to_mime_type().to_string(),
            file_name: file_name.into(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for CaptureArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureArtifact")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Where captured images come from: an uploaded file, a camera feed.
///
/// The workflow releases the source once, right after a successful detection.
/// Any other lifecycle (e.g. stopping the feed when a screen closes) belongs
/// to whoever owns the source.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn acquire(&self) -> Result<CaptureArtifact, WorkflowError>;

    async fn release(&self);
}
