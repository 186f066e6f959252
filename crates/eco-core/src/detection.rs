use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::error::WorkflowError;

/// Wire shape of a detection response. Every field is optional on the wire;
/// validation happens when converting into a [`Detection`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x1, y1, x2, y2] => Some(Self { x1: *x1, y1: *y1, x2: *x2, y2: *y2 }),
            _ => None,
        }
    }
}

/// A backend-asserted object label for one captured image.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub label: String,
    /// Advisory only, clamped into `[0, 1]`.
    pub confidence: f64,
    pub bbox: Option<BoundingBox>,
    pub detected_at: DateTime<Utc>,
}

impl Detection {
    /// Confidence as shown to the user, e.g. `87.5%`.
    pub fn confidence_percent(&self) -> String {
        format!("{:.1}%", self.confidence * 100.0)
    }

    /// Label with its first letter upper-cased.
    pub fn display_label(&self) -> String {
        let mut chars = self.label.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl TryFrom<DetectResponse> for Detection {
    type Error = WorkflowError;

    fn try_from(response: DetectResponse) -> Result<Self, Self::Error> {
        let label = response
            .label
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .ok_or_else(|| WorkflowError::DetectionFailed("No object detected".into()))?;

        let confidence = response
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);

        let bbox = response.bbox.as_deref().and_then(|values| {
            let bbox = BoundingBox::from_slice(values);
            if bbox.is_none() {
                debug!("ignoring bounding box with {} values", values.len());
            }
            bbox
        });

        Ok(Self {
            label,
            confidence,
            bbox,
            detected_at: Utc::now(),
        })
    }
}
