use std::sync::LazyLock;
use regex::Regex;
use serde::Deserialize;
use crate::error::WorkflowError;
use crate::policy::{dedup_in_order, SuggestionPolicy};

/// How many suggestions are displayed and sent on to generation.
pub const DISPLAY_CAP: usize = 3;

/// Separators inside one line of free text: enumeration markers (`1. `),
/// `•` bullets, and dash bullets at the line start or set off by spaces.
static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\s)\d+\.(?:\s+|$)|•|^\s*-+\s*|\s-+\s").expect("separator pattern is valid")
});

/// An enumeration marker glued to its text, e.g. `1.Wash`. Digits after the
/// dot (`2.5 cm`) do not count.
static GLUED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.(\D)").expect("marker pattern is valid"));

/// The response shapes the suggestion endpoint is known to produce.
///
/// Variants are tried in declaration order, so a `steps` array wins over a
/// `suggestions` field in the same body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SuggestPayload {
    Steps { steps: Vec<String> },
    List { suggestions: Vec<String> },
    FreeText { suggestions: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionSource {
    Steps,
    List,
    FreeText,
    Edited,
}

impl SuggestPayload {
    pub fn from_value(value: serde_json::Value) -> Result<Self, WorkflowError> {
        serde_json::from_value(value).map_err(|_| {
            WorkflowError::SuggestionFailed("unrecognised suggestion response".into())
        })
    }

    pub fn source(&self) -> SuggestionSource {
        match self {
            Self::Steps { .. } => SuggestionSource::Steps,
            Self::List { .. } => SuggestionSource::List,
            Self::FreeText { .. } => SuggestionSource::FreeText,
        }
    }

    /// Flattens the payload into individual suggestions, before any cap.
    pub fn into_items(self) -> Vec<String> {
        match self {
            Self::Steps { steps: items } | Self::List { suggestions: items } => items
                .into_iter()
                .filter(|item| !item.trim().is_empty())
                .collect(),
            Self::FreeText { suggestions } => split_free_text(&suggestions),
        }
    }
}

/// Splits a numbered or bulleted block of text into trimmed, non-empty items.
pub fn split_free_text(text: &str) -> Vec<String> {
    text.split(['\r', '\n'])
        .flat_map(|line| SEPARATOR.split(line))
        .map(|fragment| GLUED_MARKER.replace(fragment.trim(), "$1").trim().to_string())
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Ordered reuse ideas for one detection. Order is display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionSet {
    items: Vec<String>,
    source: SuggestionSource,
}

impl SuggestionSet {
    /// Turns a backend payload into the set shown to the user.
    pub fn normalize(payload: SuggestPayload, policy: SuggestionPolicy) -> Result<Self, WorkflowError> {
        let source = payload.source();
        let mut items = payload.into_items();

        if policy == SuggestionPolicy::Strict {
            dedup_in_order(&mut items);
        }
        policy.ensure_minimum(items.len())?;

        items.truncate(DISPLAY_CAP);
        Ok(Self { items, source })
    }

    /// User-supplied content. Kept verbatim; validation waits for generation.
    pub fn edited(items: Vec<String>) -> Self {
        Self {
            items,
            source: SuggestionSource::Edited,
        }
    }

    /// Parses a multi-line text box, one suggestion per line.
    pub fn from_text(text: &str) -> Self {
        Self::edited(text.lines().map(str::to_string).collect())
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn source(&self) -> SuggestionSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The inverse of [`SuggestionSet::from_text`].
    pub fn to_text(&self) -> String {
        self.items.join("\n")
    }
}
