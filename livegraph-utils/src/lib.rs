//! LiveGraph Utilities - logging and configuration helpers
//!
//! This crate provides the ambient pieces shared by every LiveGraph crate:
//! tracing-based logging with named loggers, and configuration loading
//! from TOML, JSON or YAML files.

//#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod config;
pub mod logging;

/// Re-export commonly used utilities
pub use config::{load_config, merge_configs, ConfigBuilder, ConfigFormat, ValidateConfig};
pub use logging::{get_logger, LogLevel, Logger};

/// Result type used throughout LiveGraph utilities
pub type Result<T> = std::result::Result<T, UtilError>;

/// Error types for utility operations
#[derive(Debug, thiserror::Error)]
pub enum UtilError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// File extensions accepted as live class definitions
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "jsx"];

/// Check whether a path looks like a JavaScript module we can analyze
pub fn is_source_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SOURCE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_source_file_detection() {
        assert!(is_source_file(&PathBuf::from("view-model.js")));
        assert!(is_source_file(&PathBuf::from("model.MJS")));
        assert!(!is_source_file(&PathBuf::from("model.ts")));
        assert!(!is_source_file(&PathBuf::from("Makefile")));
    }
}
