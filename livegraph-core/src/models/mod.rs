//! Data models module for LiveGraph core
//!
//! Stage bookkeeping shared by every pipeline stage, the failure taxonomy,
//! and the dependency map produced by introspection.

pub mod stage;
pub mod failure;
pub mod dependency_map;

pub use stage::{Published, Stage, StageOutcome};
pub use failure::AnalysisFailure;
pub use dependency_map::DependencyMap;
