//! LiveGraph Core - Analysis Engine and Data Structures
//!
//! This crate turns in-progress class definitions into per-property
//! dependency graphs:
//! - Parsing and structural extraction over tree-sitter syntax trees
//! - Class synthesis from property descriptions, with a sandboxed evaluator
//! - Dependency extraction from live instances
//! - Graph construction and cycle detection
//!
//! Timing (debounce, async drivers) lives in `livegraph-realtime`; everything
//! here is synchronous except base-class resolution.

#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // Often necessary for clarity
)]

pub mod constants;
pub mod eval;
pub mod extractors;
pub mod graph;
pub mod models;
pub mod pipeline;
pub mod syntax;
pub mod synth;

pub use constants::{DEFAULT_BASE_CLASS, DEFAULT_BASE_MODULE, DEFAULT_DEBOUNCE_MS, DEFAULT_SOURCE};
pub use eval::{evaluate_user_expression, EvalError, Value};
pub use graph::{build_graph, build_property_graphs, Edge, Graph, LayoutDirection, Node, PropertyGraph};
pub use models::{AnalysisFailure, DependencyMap, Published, Stage, StageOutcome};
pub use pipeline::{analyze_once, AnalysisReport, PipelineState, StageEvent};
pub use synth::{BuiltinResolver, ModuleResolver, SynthesisError, SynthesizedClass};
pub use syntax::SyntaxTree;

use livegraph_utils::config::ValidateConfig;
use std::time::Duration;

/// Result type used throughout LiveGraph core
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for LiveGraph core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stage could not produce a value
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisFailure),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Utility error
    #[error("Utility error: {0}")]
    Util(#[from] livegraph_utils::UtilError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SynthesisError> for Error {
    fn from(e: SynthesisError) -> Self {
        Error::Analysis(AnalysisFailure::Synthesis(e))
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Error::Analysis(AnalysisFailure::Introspection(e))
    }
}

/// Global configuration for a LiveGraph pipeline
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LiveGraphConfig {
    /// Quiet period before an edit is treated as stable
    pub debounce_ms: u64,
    /// Module the base classes are resolved from
    pub base_module: String,
    /// Class the property description extends
    pub base_class: String,
    /// Names bound before any import statement has been seen
    pub default_imports: Vec<String>,
    /// Maximum nesting of getter evaluation
    pub max_eval_depth: usize,
    /// Artificial delay added to every base-module resolution
    pub resolver_latency_ms: Option<u64>,
    /// Layout hint passed to renderers
    pub layout_direction: LayoutDirection,
}

impl Default for LiveGraphConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            base_module: DEFAULT_BASE_MODULE.to_string(),
            base_class: DEFAULT_BASE_CLASS.to_string(),
            default_imports: vec![DEFAULT_BASE_CLASS.to_string()],
            max_eval_depth: constants::DEFAULT_MAX_EVAL_DEPTH,
            resolver_latency_ms: None,
            layout_direction: LayoutDirection::default(),
        }
    }
}

impl LiveGraphConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The module resolver this configuration describes
    pub fn resolver(&self) -> BuiltinResolver {
        match self.resolver_latency_ms {
            Some(ms) => BuiltinResolver::new().with_latency(Duration::from_millis(ms)),
            None => BuiltinResolver::new(),
        }
    }
}

impl ValidateConfig for LiveGraphConfig {
    fn validate(&self) -> livegraph_utils::Result<()> {
        let invalid = |message: &str| Err(livegraph_utils::UtilError::Config(message.to_string()));
        if self.base_module.trim().is_empty() {
            return invalid("base_module must not be empty");
        }
        if self.base_class.trim().is_empty() {
            return invalid("base_class must not be empty");
        }
        if self.max_eval_depth == 0 {
            return invalid("max_eval_depth must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livegraph_utils::config::ConfigBuilder;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = LiveGraphConfig::default();
        assert_eq!(config.debounce(), Duration::from_millis(500));
        assert_eq!(config.default_imports, vec!["DefineMap"]);
        assert_eq!(config.layout_direction, LayoutDirection::Rl);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "debounce_ms = 250\nlayout_direction = \"LR\"").unwrap();

        let config = ConfigBuilder::<LiveGraphConfig>::new()
            .load_file(file.path())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.layout_direction, LayoutDirection::Lr);
        assert_eq!(config.base_class, "DefineMap");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = LiveGraphConfig {
            max_eval_depth: 0,
            ..LiveGraphConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_analyze_default_source() {
        let config = LiveGraphConfig::default();
        let resolver = config.resolver();
        let report = analyze_once(DEFAULT_SOURCE, &resolver, config).await;
        assert!(report.skipped.is_empty());
        assert_eq!(report.graphs.len(), 3);
        let name = &report.graphs[2];
        assert_eq!(name.root, "name");
        assert_eq!(
            name.graph.nodes.iter().map(|n| n.label.as_str()).collect::<Vec<_>>(),
            vec!["name", "first", "last"]
        );
    }
}
