//! Logging setup for applications using reportdb.
//!
//! The runtime logs through `tracing` and never installs a subscriber on its
//! own. Applications that have none can call [`init`], which reads:
//!
//! - `REPORTDB_DEBUG=true|1|yes` - debug-level logging
//! - `REPORTDB_LOG_LEVEL=trace|debug|info|warn|error` - explicit level
//! - `REPORTDB_LOG_FORMAT=json|pretty|compact` - output format (default: json)
//!
//! `init` needs the `tracing-subscriber` feature; without it only the
//! settings are parsed.
//!
//! ```rust
//! use reportdb_query::logging::{LogFormat, LogSettings};
//!
//! let settings = LogSettings::from_lookup(|name| match name {
//!     "REPORTDB_DEBUG" => Some("1".to_string()),
//!     _ => None,
//! });
//! assert_eq!(settings.level, "debug");
//! assert_eq!(settings.format, LogFormat::Json);
//! ```

use std::env;
use std::sync::Once;

static INIT: Once = Once::new();

/// Enables debug logging.
pub const DEBUG_VAR: &str = "REPORTDB_DEBUG";
/// Overrides the log level.
pub const LEVEL_VAR: &str = "REPORTDB_LOG_LEVEL";
/// Selects the output format.
pub const FORMAT_VAR: &str = "REPORTDB_LOG_FORMAT";

/// Crates whose output the installed filter lets through.
const TARGETS: &[&str] = &["reportdb", "reportdb_query", "reportdb_schema", "reportdb_codegen"];

/// Subscriber output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// Logging settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Whether any logging was requested.
    pub enabled: bool,
    /// Level applied to the reportdb crates.
    pub level: &'static str,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Read the settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read the settings through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug = lookup(DEBUG_VAR)
            .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        let explicit = lookup(LEVEL_VAR).and_then(|level| parse_level(&level));
        let level = explicit.unwrap_or(if debug { "debug" } else { "warn" });
        Self {
            enabled: debug || explicit.is_some(),
            level,
            format: lookup(FORMAT_VAR).map(|f| LogFormat::parse(&f)).unwrap_or_default(),
        }
    }

    /// The `EnvFilter` directive for these settings.
    pub fn directive(&self) -> String {
        TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

fn parse_level(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

/// Whether `REPORTDB_DEBUG` is set.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// Install a global subscriber according to the environment.
///
/// Does nothing when no logging variable is set, and on every call after the
/// first.
pub fn init() {
    init_with(LogSettings::from_env());
}

/// Install a global subscriber with explicit settings.
pub fn init_with(settings: LogSettings) {
    INIT.call_once(|| {
        if !settings.enabled {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(settings.directive()).unwrap_or_else(|_| EnvFilter::new("warn"));
            let registry = tracing_subscriber::registry().with(filter);
            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };
            if installed.is_ok() {
                tracing::info!(level = settings.level, format = ?settings.format, "Logging initialized");
            }
        }
    });
}

/// `debug!` that only fires when `REPORTDB_DEBUG` is set.
#[macro_export]
macro_rules! reportdb_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            $crate::__tracing::debug!($($arg)*);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(vars: &[(&str, &str)]) -> LogSettings {
        LogSettings::from_lookup(|name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        })
    }

    #[test]
    fn test_disabled_by_default() {
        let settings = settings(&[]);
        assert!(!settings.enabled);
        assert_eq!(settings.level, "warn");
        assert_eq!(settings.format, LogFormat::Json);
    }

    #[test]
    fn test_debug_flag() {
        let settings = settings(&[(DEBUG_VAR, "YES")]);
        assert!(settings.enabled);
        assert_eq!(settings.level, "debug");
    }

    #[test]
    fn test_explicit_level_wins() {
        let settings = settings(&[(DEBUG_VAR, "true"), (LEVEL_VAR, "error"), (FORMAT_VAR, "compact")]);
        assert_eq!(settings.level, "error");
        assert_eq!(settings.format, LogFormat::Compact);
    }

    #[test]
    fn test_unknown_level_falls_back() {
        let settings = settings(&[(LEVEL_VAR, "loud")]);
        assert!(!settings.enabled);
        assert_eq!(settings.level, "warn");
    }

    #[test]
    fn test_directive_covers_every_crate() {
        let settings = settings(&[(LEVEL_VAR, "info")]);
        assert_eq!(
            settings.directive(),
            "reportdb=info,reportdb_query=info,reportdb_schema=info,reportdb_codegen=info"
        );
    }
}
