//! Logging utilities
//!
//! Thin layer over the tracing ecosystem: a one-call subscriber setup and
//! named `Logger` handles so each pipeline area logs under its own name
//! (`livegraph.realtime.source`, `livegraph.core.synth`, ...).

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log levels accepted by the configuration file and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace = 0,
    Debug = 10,
    Info = 20,
    Warning = 30,
    Error = 40,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warning => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for LogLevel {
    type Err = crate::UtilError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            _ => Err(crate::UtilError::Config(format!(
                "Invalid log level: '{s}'. Valid options: trace, debug, info, warning, error"
            ))),
        }
    }
}

impl LogLevel {
    /// Map a `-v` repetition count onto a level (0 = warning, 1 = info, 2 = debug, 3+ = trace)
    pub fn from_verbosity(count: u8) -> Self {
        match count {
            0 => Self::Warning,
            1 => Self::Info,
            2 => Self::Debug,
            _ => Self::Trace,
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub include_location: bool,
    pub include_thread_id: bool,
    pub colored_output: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            include_location: false,
            include_thread_id: false,
            colored_output: true,
        }
    }
}

/// Initialize the global tracing subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: LoggerConfig) -> crate::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(Level::from(config.level).into())
        .from_env_lossy();

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_thread_ids(config.include_thread_id)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_ansi(config.colored_output);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| crate::UtilError::Config(format!("Failed to initialize logging: {}", e)))?;

    Ok(())
}

/// Initialize logging with defaults at the given level
pub fn basic_config(level: Option<LogLevel>) -> crate::Result<()> {
    let config = LoggerConfig {
        level: level.unwrap_or(LogLevel::Info),
        ..Default::default()
    };
    init_logging(config)
}

/// Named logger handle; every event carries the logger name as a structured field
#[derive(Debug, Clone)]
pub struct Logger {
    name: String,
    level: LogLevel,
}

impl Logger {
    /// Create a new logger with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            level: LogLevel::Trace,
        }
    }

    /// Logger name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set a per-logger floor on top of the global filter
    pub fn set_level(&mut self, level: LogLevel) {
        self.level = level;
    }

    /// Get the current logging level
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Check if a level is enabled
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level >= self.level
    }

    pub fn trace(&self, message: &str) {
        if self.is_enabled(LogLevel::Trace) {
            tracing::trace!(logger = %self.name, "{}", message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.is_enabled(LogLevel::Debug) {
            tracing::debug!(logger = %self.name, "{}", message);
        }
    }

    pub fn info(&self, message: &str) {
        if self.is_enabled(LogLevel::Info) {
            tracing::info!(logger = %self.name, "{}", message);
        }
    }

    pub fn warning(&self, message: &str) {
        if self.is_enabled(LogLevel::Warning) {
            tracing::warn!(logger = %self.name, "{}", message);
        }
    }

    pub fn error(&self, message: &str) {
        if self.is_enabled(LogLevel::Error) {
            tracing::error!(logger = %self.name, "{}", message);
        }
    }

    /// Log an error value with context
    pub fn exception(&self, message: &str, error: &dyn std::error::Error) {
        if self.is_enabled(LogLevel::Error) {
            tracing::error!(logger = %self.name, error = %error, "{}", message);
        }
    }
}

/// Get a logger by name
pub fn get_logger(name: &str) -> Logger {
    Logger::new(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_log_levels() {
        assert!(LogLevel::Error > LogLevel::Warning);
        assert!(LogLevel::Warning > LogLevel::Info);
        assert!(LogLevel::Info > LogLevel::Debug);
        assert!(LogLevel::Debug > LogLevel::Trace);
    }

    #[test]
    fn test_logger_creation() {
        let logger = get_logger("livegraph.test");
        assert_eq!(logger.name(), "livegraph.test");
        assert_eq!(logger.level(), LogLevel::Trace);
    }

    #[test]
    fn test_logger_level_filtering() {
        let mut logger = Logger::new("test");
        logger.set_level(LogLevel::Warning);

        assert!(!logger.is_enabled(LogLevel::Debug));
        assert!(!logger.is_enabled(LogLevel::Info));
        assert!(logger.is_enabled(LogLevel::Warning));
        assert!(logger.is_enabled(LogLevel::Error));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(LogLevel::from_verbosity(0), LogLevel::Warning);
        assert_eq!(LogLevel::from_verbosity(2), LogLevel::Debug);
        assert_eq!(LogLevel::from_verbosity(9), LogLevel::Trace);
    }

    proptest! {
        #[test]
        fn prop_more_verbosity_never_raises_the_level(count in 0u8..=254) {
            prop_assert!(LogLevel::from_verbosity(count + 1) <= LogLevel::from_verbosity(count));
        }

        #[test]
        fn prop_level_display_parses_back(level in prop_oneof![
            Just(LogLevel::Trace),
            Just(LogLevel::Debug),
            Just(LogLevel::Info),
            Just(LogLevel::Warning),
            Just(LogLevel::Error),
        ]) {
            prop_assert_eq!(level.to_string().parse::<LogLevel>().unwrap(), level);
        }
    }
}
