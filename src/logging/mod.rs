//! Structured logging configuration for processes embedding Canopy

use std::str::FromStr;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

pub mod sink;

pub use sink::{NullSink, RecordingSink, TracingSink, WarningSink};

use crate::CanopyError;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,
    /// Log format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_source: bool,
}

/// Log levels supported by Canopy
#[derive(Debug, Clone, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl LogLevel {
    fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// Compact format for production
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            include_source: false,
        }
    }
}

impl LogConfig {
    /// Load configuration from `CANOPY_LOG_*` environment variables,
    /// falling back to defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = std::env::var("CANOPY_LOG_LEVEL") {
            if let Ok(parsed) = LogLevel::from_str(&level) {
                config.level = parsed;
            }
        }

        if let Ok(format) = std::env::var("CANOPY_LOG_FORMAT") {
            if let Ok(parsed) = LogFormat::from_str(&format) {
                config.format = parsed;
            }
        }

        if let Ok(source) = std::env::var("CANOPY_LOG_SOURCE") {
            config.include_source = source.to_lowercase() == "true";
        }

        config
    }
}

/// Initialize the global tracing subscriber with the given configuration.
///
/// Intended for binaries embedding the store; libraries and tests should
/// leave subscriber installation to the host process.
pub fn init_logging(config: &LogConfig) -> crate::Result<()> {
    let filter = create_filter(config);
    let layer = create_stdout_layer(config);

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(|e| {
            CanopyError::ConfigurationError(format!("Failed to initialize logging: {}", e))
        })?;

    Ok(())
}

/// Create an environment filter based on the configuration
fn create_filter(config: &LogConfig) -> EnvFilter {
    let filter_str = format!("canopy={}", config.level.as_directive());

    // Allow environment override
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str))
}

/// Create a stdout logging layer
fn create_stdout_layer(
    config: &LogConfig,
) -> Box<dyn Layer<tracing_subscriber::Registry> + Send + Sync> {
    match config.format {
        LogFormat::Pretty => Box::new(
            fmt::layer()
                .pretty()
                .with_timer(UtcTime::rfc_3339())
                .with_file(config.include_source)
                .with_line_number(config.include_source),
        ),
        LogFormat::Compact => Box::new(
            fmt::layer()
                .compact()
                .with_timer(UtcTime::rfc_3339())
                .with_file(config.include_source)
                .with_line_number(config.include_source),
        ),
        LogFormat::Json => Box::new(
            fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .with_file(config.include_source)
                .with_line_number(config.include_source),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("PRETTY").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Compact);
        assert!(!config.include_source);
    }
}
