//! Structural extractors over a parsed module.
//!
//! Each extractor is a pure derivation from the current [`SyntaxTree`]. A
//! tree that does not have the expected shape is not an error for the
//! pipeline: [`TreeExtractor::extract_outcome`] turns it into
//! [`StageOutcome::Unchanged`] so the previous value stays published.

pub mod dependencies;
pub mod imports;
pub mod properties;

pub use dependencies::get_dependencies;
pub use imports::ImportsExtractor;
pub use properties::PropDefinitionsExtractor;

use crate::models::{AnalysisFailure, StageOutcome};
use crate::syntax::SyntaxTree;

/// Base trait for extractors that read one value out of a syntax tree
pub trait TreeExtractor {
    type Output;

    /// Extract the value, or report why the tree has the wrong shape
    fn extract(&self, tree: &SyntaxTree) -> Result<Self::Output, AnalysisFailure>;

    /// Extractor name used in logs
    fn extractor_type(&self) -> &'static str;

    /// Extract, converting any failure into "no update"
    fn extract_outcome(&self, tree: &SyntaxTree) -> StageOutcome<Self::Output> {
        match self.extract(tree) {
            Ok(value) => StageOutcome::Updated(value),
            Err(e) => {
                tracing::debug!(
                    extractor = self.extractor_type(),
                    category = e.category(),
                    "extraction skipped: {}",
                    e
                );
                StageOutcome::Unchanged
            }
        }
    }
}

/// The `index`-th top-level statement, or a mismatch naming what was expected
pub(crate) fn statement<'t>(
    tree: &'t SyntaxTree,
    index: usize,
    expected: &str,
) -> Result<tree_sitter::Node<'t>, AnalysisFailure> {
    tree.statements()
        .get(index)
        .copied()
        .ok_or_else(|| AnalysisFailure::mismatch(format!("no statement {} ({})", index + 1, expected)))
}
