//! Logging setup: coloured stderr plus an optional daily-rolling JSON file.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::LoggingConfig;

/// Keeps the file writer flushing. Hold it for the whole session.
#[must_use]
pub struct TelemetryGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global subscriber. Fails if the directives do not parse or
/// a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<TelemetryGuard> {
    let stderr_filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("invalid log directives `{}`", config.level))?;

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(stderr_filter);

    let (json_layer, guard) = match &config.json_file {
        Some(path) => {
            let dir = path.parent().unwrap_or(Path::new("."));
            let file_name = path.file_name().unwrap_or(OsStr::new("review_explorer.log"));
            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_writer(writer)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(TelemetryGuard { _file: guard })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_directives_are_rejected() {
        let config = LoggingConfig {
            level: "info,review_explorer=loudest".to_string(),
            json_file: None,
        };
        assert!(init(&config).is_err());
    }
}
