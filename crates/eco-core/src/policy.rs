use serde::{Deserialize, Serialize};
use crate::error::WorkflowError;

/// Number of distinct steps the strict policy requires.
pub const STRICT_MINIMUM: usize = 3;

/// How many suggestions a screen needs before it may generate a video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPolicy {
    /// At least three distinct, non-empty suggestions.
    Strict,
    /// Whatever the backend returned, as long as generation gets one step.
    #[default]
    Lenient,
}

impl SuggestionPolicy {
    pub fn minimum(&self) -> usize {
        match self {
            Self::Strict => STRICT_MINIMUM,
            Self::Lenient => 0,
        }
    }

    /// Fails when `count` distinct items fall short of [`Self::minimum`].
    pub fn ensure_minimum(&self, count: usize) -> Result<(), WorkflowError> {
        let required = self.minimum();
        if count < required {
            return Err(WorkflowError::InsufficientSuggestions { got: count, required });
        }
        Ok(())
    }

    /// Cleans user-edited steps right before generation.
    ///
    /// Blank lines are dropped and entries trimmed. The strict policy also
    /// drops repeated steps and insists on [`STRICT_MINIMUM`] of them.
    pub fn prepare_steps(&self, steps: &[String]) -> Result<Vec<String>, WorkflowError> {
        let mut cleaned: Vec<String> = steps
            .iter()
            .map(|step| step.trim())
            .filter(|step| !step.is_empty())
            .map(str::to_string)
            .collect();

        if cleaned.is_empty() {
            return Err(WorkflowError::EmptySteps);
        }

        if *self == Self::Strict {
            dedup_in_order(&mut cleaned);
        }
        self.ensure_minimum(cleaned.len())?;

        Ok(cleaned)
    }
}

/// Removes later repeats, keeping the first occurrence of each item in place.
pub(crate) fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

/// Whether a successful detection chains into the following stages on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceMode {
    /// Every stage waits for the user.
    #[default]
    Manual,
    /// Detection immediately asks for suggestions.
    AutoSuggest,
    /// Detection runs suggestions and video generation back to back.
    FullAuto,
}

impl AdvanceMode {
    pub fn chains_suggest(&self) -> bool {
        matches!(self, Self::AutoSuggest | Self::FullAuto)
    }

    pub fn chains_generate(&self) -> bool {
        matches!(self, Self::FullAuto)
    }
}

/// Knobs that differ between presentation variants of the same workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkflowPolicy {
    pub suggestions: SuggestionPolicy,
    pub advance: AdvanceMode,
}

impl WorkflowPolicy {
    /// Upload an image and confirm every step by hand.
    pub fn stepper() -> Self {
        Self {
            suggestions: SuggestionPolicy::Lenient,
            advance: AdvanceMode::Manual,
        }
    }

    /// Live camera page: detection fetches suggestions straight away.
    pub fn scanner() -> Self {
        Self {
            suggestions: SuggestionPolicy::Lenient,
            advance: AdvanceMode::AutoSuggest,
        }
    }

    /// One button from capture to a finished video.
    pub fn full_auto() -> Self {
        Self {
            suggestions: SuggestionPolicy::Strict,
            advance: AdvanceMode::FullAuto,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_steps_rejected_by_both_policies() {
        for policy in [SuggestionPolicy::Strict, SuggestionPolicy::Lenient] {
            assert_eq!(policy.prepare_steps(&[]), Err(WorkflowError::EmptySteps));
            assert_eq!(
                policy.prepare_steps(&strings(&["", "   "])),
                Err(WorkflowError::EmptySteps)
            );
        }
    }

    #[test]
    fn test_lenient_accepts_a_single_step() {
        let steps = SuggestionPolicy::Lenient
            .prepare_steps(&strings(&["  Rinse the jar  ", ""]))
            .unwrap();
        assert_eq!(steps, strings(&["Rinse the jar"]));
    }

    #[test]
    fn test_strict_requires_three_distinct_steps() {
        let err = SuggestionPolicy::Strict
            .prepare_steps(&strings(&["Cut", "Cut", "Glue"]))
            .unwrap_err();
        assert_eq!(err, WorkflowError::InsufficientSuggestions { got: 2, required: 3 });

        let steps = SuggestionPolicy::Strict
            .prepare_steps(&strings(&["Cut", "Paint", "Cut", "Glue"]))
            .unwrap();
        assert_eq!(steps, strings(&["Cut", "Paint", "Glue"]));
    }

    #[test]
    fn test_presets() {
        assert_eq!(WorkflowPolicy::default(), WorkflowPolicy::stepper());
        assert!(WorkflowPolicy::scanner().advance.chains_suggest());
        assert!(!WorkflowPolicy::scanner().advance.chains_generate());
        assert!(WorkflowPolicy::full_auto().advance.chains_generate());
        assert_eq!(WorkflowPolicy::full_auto().suggestions.minimum(), 3);
    }

    #[test]
    fn test_minimum_follows_policy() {
        assert_eq!(SuggestionPolicy::Lenient.ensure_minimum(0), Ok(()));
        assert_eq!(SuggestionPolicy::Strict.ensure_minimum(3), Ok(()));
        assert_eq!(
            SuggestionPolicy::Strict.ensure_minimum(2),
            Err(WorkflowError::InsufficientSuggestions { got: 2, required: STRICT_MINIMUM })
        );
    }
}
