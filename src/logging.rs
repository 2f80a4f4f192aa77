//! Logging bootstrap.
//!
//! The library logs through `tracing`. Applications that don't install their
//! own subscriber can call [`init`], which reads:
//!
//! - `LAPSE_DEBUG=1` - Enable debug logging
//! - `LAPSE_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `LAPSE_LOG_FORMAT=pretty|compact|json` - Set output format
//!
//! `RUST_LOG`, when set, overrides the level with a full filter directive.
//!
//! ```no_run
//! lapse::logging::init();
//! tracing::info!("sessions ready");
//! ```

use std::env;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Trace level (most verbose)
    Trace,
    /// Debug level
    Debug,
    /// Info level
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
    /// No logging
    Off,
}

impl Level {
    /// Parse a level name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Filter directive for this level.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Single-line output
    Compact,
    /// One JSON object per line
    Json,
}

impl Format {
    /// Parse a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            format: Format::Compact,
        }
    }
}

impl LogConfig {
    /// Read configuration from the `LAPSE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let debug = lookup("LAPSE_DEBUG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let level = lookup("LAPSE_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("LAPSE_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Compact);

        Self { level, format }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_directive()))
    }

    /// Install a global subscriber for this configuration.
    ///
    /// Fails if a global subscriber is already set.
    pub fn try_init(&self) -> Result<(), TryInitError> {
        let registry = tracing_subscriber::registry().with(self.filter());
        match self.format {
            Format::Pretty => registry.with(fmt::layer().pretty()).try_init()?,
            Format::Compact => registry.with(fmt::layer().compact()).try_init()?,
            Format::Json => registry.with(fmt::layer().json()).try_init()?,
        }

        tracing::debug!(level = ?self.level, format = ?self.format, "Logging initialized");
        Ok(())
    }
}

/// Install a subscriber configured from the environment.
///
/// Does nothing if a global subscriber is already set.
pub fn init() {
    let _ = try_init();
}

/// Install a subscriber configured from the environment, reporting failure.
pub fn try_init() -> Result<(), TryInitError> {
    LogConfig::from_env().try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> LogConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        LogConfig::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Trace < Level::Debug);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Error < Level::Off);
    }

    #[test]
    fn test_level_parse() {
        assert_eq!(Level::parse("DEBUG"), Some(Level::Debug));
        assert_eq!(Level::parse("warning"), Some(Level::Warn));
        assert_eq!(Level::parse("none"), Some(Level::Off));
        assert_eq!(Level::parse("loud"), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(Format::parse("json"), Some(Format::Json));
        assert_eq!(Format::parse("Pretty"), Some(Format::Pretty));
        assert_eq!(Format::parse("xml"), None);
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(config_from(&[]), LogConfig::default());
    }

    #[test]
    fn test_debug_flag_lowers_level() {
        let config = config_from(&[("LAPSE_DEBUG", "true")]);
        assert_eq!(config.level, Level::Debug);

        let config = config_from(&[("LAPSE_DEBUG", "1"), ("LAPSE_LOG_LEVEL", "error")]);
        assert_eq!(config.level, Level::Error);
    }

    #[test]
    fn test_format_from_env() {
        let config = config_from(&[("LAPSE_LOG_FORMAT", "json"), ("LAPSE_LOG_LEVEL", "bogus")]);
        assert_eq!(config.format, Format::Json);
        assert_eq!(config.level, Level::Info);
    }
}
