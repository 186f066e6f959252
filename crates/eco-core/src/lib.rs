pub mod backend;
pub mod capture;
pub mod detection;
pub mod error;
pub mod media;
pub mod mjpeg;
pub mod policy;
pub mod stage;
pub mod suggestion;
pub mod workflow;

pub use backend::WasteBackend;
pub use capture::{CaptureArtifact, CaptureSource};
pub use detection::{BoundingBox, DetectResponse, Detection};
pub use error::{BackendError, Result, WorkflowError};
pub use media::{GeneratedMedia, MediaLocator, VideoResponse, DOWNLOAD_FILE_NAME};
pub use mjpeg::MjpegFrames;
pub use policy::{AdvanceMode, SuggestionPolicy, WorkflowPolicy};
pub use stage::{Operation, Stage, STEP_LABELS};
pub use suggestion::{SuggestPayload, SuggestionSet, SuggestionSource};
pub use workflow::{WorkflowController, WorkflowSnapshot};
