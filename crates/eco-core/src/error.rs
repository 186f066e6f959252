use thiserror::Error;
use crate::stage::{Operation, Stage};

pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Failures surfaced by the workflow. One of these is shown to the user per attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Suggestion failed: {0}")]
    SuggestionFailed(String),

    #[error("Not enough suggestions received ({got} of {required})")]
    InsufficientSuggestions { got: usize, required: usize },

    #[error("No steps provided.")]
    EmptySteps,

    #[error("Video generation failed: {0}")]
    GenerationFailed(String),

    #[error("Another operation is still in progress")]
    OperationInProgress,

    #[error("Cannot {operation} while the workflow is {stage}")]
    InvalidTransition { operation: Operation, stage: Stage },

    #[error("Result discarded because the workflow was reset")]
    Superseded,
}

impl WorkflowError {
    /// Whether the error becomes the visible message of the current attempt.
    ///
    /// Guard rejections and stale results never touch the workflow state.
    pub fn is_recorded(&self) -> bool {
        !matches!(
            self,
            Self::OperationInProgress | Self::InvalidTransition { .. } | Self::Superseded
        )
    }
}

/// Errors raised at the HTTP seam, before they are mapped onto a workflow stage.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),
}
