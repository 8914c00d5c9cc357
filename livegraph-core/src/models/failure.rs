//! Failure taxonomy for the analysis stages.
//!
//! None of these reach the user: each is turned into `StageOutcome::Unchanged`
//! at the stage boundary and logged at debug level.

use crate::eval::EvalError;
use crate::synth::SynthesisError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisFailure {
    /// Source text is not a syntactically complete module
    #[error("parse failed at {line}:{column} near `{kind}`")]
    Parse {
        line: usize,
        column: usize,
        kind: String,
    },

    /// Tree parsed but lacks the expected shape
    #[error("structural mismatch: {0}")]
    StructuralMismatch(String),

    /// Class could not be built from the description
    #[error("synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),

    /// Instance could not be constructed or introspected
    #[error("introspection failed: {0}")]
    Introspection(#[from] EvalError),
}

impl AnalysisFailure {
    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::StructuralMismatch(message.into())
    }

    /// Short category name used in logs and events
    pub fn category(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::StructuralMismatch(_) => "structural_mismatch",
            Self::Synthesis(_) => "synthesis",
            Self::Introspection(_) => "introspection",
        }
    }
}
