use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::WorkflowError;

/// File name offered when the user saves a finished video.
pub const DOWNLOAD_FILE_NAME: &str = "output_final.mp4";

/// Path under which the backend serves generated files.
const FILES_PREFIX: &str = "files";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResponse {
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
}

/// Opaque reference to a generated file: either a bare name served from the
/// backend's file endpoint, or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaLocator(String);

impl MediaLocator {
    /// `None` for blank references.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_absolute(&self) -> bool {
        self.0.starts_with("http://") || self.0.starts_with("https://")
    }

    /// Playable/downloadable URL for this locator against the backend base URL.
    pub fn resolve(&self, base_url: &str) -> String {
        if self.is_absolute() {
            return self.0.clone();
        }

        let base = base_url.trim_end_matches('/');
        let name = self.0.trim_start_matches('/');
        let name = name
            .strip_prefix(FILES_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(name);

        format!("{base}/{FILES_PREFIX}/{name}")
    }
}

/// Instructional video (mandatory) and narration (optional) for a set of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMedia {
    pub video: MediaLocator,
    pub audio: Option<MediaLocator>,
    pub steps: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl GeneratedMedia {
    pub fn from_response(response: VideoResponse, steps: Vec<String>) -> Result<Self, WorkflowError> {
        let video = response
            .video
            .and_then(MediaLocator::new)
            .ok_or_else(|| WorkflowError::GenerationFailed("response did not include a video".into()))?;

        Ok(Self {
            video,
            audio: response.audio.and_then(MediaLocator::new),
            steps,
            generated_at: Utc::now(),
        })
    }
}
