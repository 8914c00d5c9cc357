//! Stage outcomes and published values.
//!
//! Every stage reports either a fresh value or `Unchanged`; a `Published`
//! cell only ever moves from one complete value to another.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stages, in upstream-to-downstream order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Source,
    Syntax,
    PropDefinitions,
    CanDependencies,
    Synthesis,
    Dependencies,
    Graphs,
}

impl Stage {
    /// Get all stages in pipeline order
    pub fn all() -> [Stage; 7] {
        [
            Stage::Source,
            Stage::Syntax,
            Stage::PropDefinitions,
            Stage::CanDependencies,
            Stage::Synthesis,
            Stage::Dependencies,
            Stage::Graphs,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Source => "source",
            Stage::Syntax => "syntax",
            Stage::PropDefinitions => "prop_definitions",
            Stage::CanDependencies => "can_dependencies",
            Stage::Synthesis => "synthesis",
            Stage::Dependencies => "dependencies",
            Stage::Graphs => "graphs",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of running one stage once
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    /// The stage produced a complete new value
    Updated(T),
    /// The stage produced nothing; the previously published value stays
    Unchanged,
}

impl<T> StageOutcome<T> {
    pub fn is_updated(&self) -> bool {
        matches!(self, StageOutcome::Updated(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            StageOutcome::Updated(value) => Some(value),
            StageOutcome::Unchanged => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageOutcome<U> {
        match self {
            StageOutcome::Updated(value) => StageOutcome::Updated(f(value)),
            StageOutcome::Unchanged => StageOutcome::Unchanged,
        }
    }
}

impl<T> From<Option<T>> for StageOutcome<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => StageOutcome::Updated(value),
            None => StageOutcome::Unchanged,
        }
    }
}

/// The current value of one stage: empty until the first success
#[derive(Debug, Clone)]
pub struct Published<T> {
    value: Option<T>,
    revision: u64,
}

impl<T> Default for Published<T> {
    fn default() -> Self {
        Self {
            value: None,
            revision: 0,
        }
    }
}

impl<T: PartialEq> Published<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an outcome. Returns `true` only when the published value actually
    /// changed, which is what downstream stages react to.
    pub fn publish(&mut self, outcome: StageOutcome<T>) -> bool {
        match outcome {
            StageOutcome::Unchanged => false,
            StageOutcome::Updated(value) => {
                if self.value.as_ref() == Some(&value) {
                    return false;
                }
                self.value = Some(value);
                self.revision += 1;
                true
            }
        }
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Number of times the value changed
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unchanged_keeps_previous_value() {
        let mut cell = Published::new();
        assert!(cell.publish(StageOutcome::Updated(1)));
        assert!(!cell.publish(StageOutcome::Unchanged));
        assert_eq!(cell.get(), Some(&1));
        assert_eq!(cell.revision(), 1);
    }

    #[test]
    fn test_equal_value_is_not_a_change() {
        let mut cell = Published::new();
        assert!(cell.publish(StageOutcome::Updated("a".to_string())));
        assert!(!cell.publish(StageOutcome::Updated("a".to_string())));
        assert!(cell.publish(StageOutcome::Updated("b".to_string())));
        assert_eq!(cell.revision(), 2);
    }

    #[test]
    fn test_empty_until_first_success() {
        let mut cell: Published<u32> = Published::new();
        assert!(!cell.publish(StageOutcome::Unchanged));
        assert!(cell.get().is_none());
    }

    #[test]
    fn test_outcome_helpers() {
        let outcome: StageOutcome<u32> = Some(3).into();
        assert!(outcome.is_updated());
        assert_eq!(outcome.map(|v| v * 2).into_option(), Some(6));
        assert_eq!(StageOutcome::<u32>::Unchanged.into_option(), None);
    }
}
