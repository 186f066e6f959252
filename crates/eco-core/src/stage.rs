use std::fmt;
use serde::{Deserialize, Serialize};

/// Labels of the three user-facing steps, in order.
pub const STEP_LABELS: [&str; 3] = [
    "Detect Waste Material",
    "Get Reuse Suggestions",
    "Generate Instructional Video",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    #[default]
    Idle,
    Captured,
    Detected,
    Suggested,
    VideoReady,
}

impl Stage {
    pub fn label(&self) -> &str {
        match self {
            Self::Idle => "Ready",
            Self::Captured => "Image captured",
            Self::Detected => "Object detected",
            Self::Suggested => "Suggestions ready",
            Self::VideoReady => "Video ready!",
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Idle => "📷",
            Self::Captured => "🖼",
            Self::Detected => "🎯",
            Self::Suggested => "♻",
            Self::VideoReady => "🎬",
        }
    }

    /// Index into [`STEP_LABELS`] of the step the user works on next.
    /// Returns `STEP_LABELS.len()` once every step is done.
    pub fn step_index(&self) -> usize {
        match self {
            Self::Idle | Self::Captured => 0,
            Self::Detected => 1,
            Self::Suggested => 2,
            Self::VideoReady => 3,
        }
    }

    pub fn all() -> [Stage; 5] {
        [
            Self::Idle,
            Self::Captured,
            Self::Detected,
            Self::Suggested,
            Self::VideoReady,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Captured => "captured",
            Self::Detected => "detected",
            Self::Suggested => "suggested",
            Self::VideoReady => "video ready",
        };
        f.write_str(name)
    }
}

/// Operations the presentation layer can ask the workflow to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Capture,
    Detect,
    Suggest,
    EditSuggestions,
    Generate,
}

impl Operation {
    /// Forward-only transition table. `reset` is not an operation: it is always allowed.
    pub fn allowed_from(&self, stage: Stage) -> bool {
        match self {
            Self::Capture => true,
            Self::Detect => stage == Stage::Captured,
            Self::Suggest => stage == Stage::Detected,
            Self::EditSuggestions | Self::Generate => {
                matches!(stage, Stage::Suggested | Stage::VideoReady)
            }
        }
    }

    pub fn busy_message(&self) -> &str {
        match self {
            Self::Capture => "Capturing image...",
            Self::Detect => "Detecting waste...",
            Self::Suggest => "Getting reuse suggestions...",
            Self::EditSuggestions => "Updating steps...",
            Self::Generate => "Generating instructional video...",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Capture => "capture",
            Self::Detect => "detect",
            Self::Suggest => "suggest",
            Self::EditSuggestions => "edit suggestions",
            Self::Generate => "generate",
        };
        f.write_str(name)
    }
}
