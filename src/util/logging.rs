//! Structured logging setup for rpmbox
//!
//! Logging goes through the `tracing` ecosystem. Output is written to stderr so
//! that the container engine's own output (inherited on stdout/stderr) and the
//! build summary on stdout stay readable.
//!
//! # Example
//!
//! ```no_run
//! use rpmbox::util::{init_logging, LoggingConfig};
//! use tracing::Level;
//!
//! init_logging(LoggingConfig::with_level(Level::DEBUG).json_from_env());
//!
//! use tracing::{info, warn};
//!
//! info!(platform = "el7", "Building image");
//! warn!("Teardown failed");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Ensures logging is only initialized once
static INIT: Once = Once::new();

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum log level to display
    pub level: Level,

    /// Use JSON output format (for CI log collectors)
    pub use_json: bool,

    /// Include the module target (e.g., rpmbox::pipeline) in logs
    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Creates a logging configuration with the specified level
    ///
    /// ```
    /// use rpmbox::util::LoggingConfig;
    /// use tracing::Level;
    ///
    /// let config = LoggingConfig::with_level(Level::DEBUG);
    /// assert_eq!(config.level, Level::DEBUG);
    /// ```
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Applies `RPMBOX_LOG_JSON` on top of this configuration.
    pub fn json_from_env(mut self) -> Self {
        if let Some(use_json) = env::var("RPMBOX_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            self.use_json = use_json;
        }
        self
    }
}

/// Parses a log level from a string
///
/// Unknown values fall back to `Level::INFO` with a warning on stderr.
///
/// ```
/// use rpmbox::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("INFO"), Level::INFO);
/// assert_eq!(parse_level("invalid"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Builds the filter: `RUST_LOG` wins when set, otherwise the crate is logged at
/// the configured level and everything else at `warn`.
fn build_filter(level: Level) -> EnvFilter {
    match env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => EnvFilter::new(format!("warn,rpmbox={}", level)),
    }
}

/// Initializes the logging system with the provided configuration
///
/// Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}
