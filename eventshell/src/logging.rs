//! Tracing subscriber setup for function runtimes.
//!
//! `RUST_LOG` selects the filter (default `info`). Set `LOG_FORMAT=json`
//! for one JSON object per event, which log aggregators index directly.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable selecting the output format.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Reads the format from `LOG_FORMAT`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }

    fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Installs the global subscriber.
///
/// Safe to call on every invocation: only the first call has an effect and
/// an already-installed subscriber is left in place.
pub fn init_logging() {
    init_logging_with(LogFormat::from_env());
}

/// Installs the global subscriber with an explicit format.
pub fn init_logging_with(format: LogFormat) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let layer = match format {
            LogFormat::Json => fmt::layer()
                .json()
                .with_current_span(true)
                .with_target(true)
                .boxed(),
            LogFormat::Pretty => fmt::layer().with_target(true).with_ansi(false).boxed(),
        };

        if tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::debug!(format = ?format, "Logging initialized");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse(Some("json")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("text")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_logging_with(LogFormat::Json);
        init_logging_with(LogFormat::Pretty);
        assert!(LOGGER_INITIALIZED.get().is_some());
    }
}
