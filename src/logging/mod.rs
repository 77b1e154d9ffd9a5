//! Process-wide tracing setup. Call [`init`] once, before any component runs.
//!
//! Pipeline events go to one file and storage events to another; stdout gets both.

use crate::config::LoggingConfig;
use anyhow::{Context, Result};
use tracing::{Metadata, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Events from this target prefix land in the storage log.
pub const STORAGE_TARGET: &str = "quotes_etl::storage";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DEFAULT_FILTER: &str = "quotes_etl=info,warn";

/// Keeps the background writers alive; flushes on drop.
#[must_use = "dropping the guards stops file logging"]
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

pub fn is_storage_event(meta: &Metadata<'_>) -> bool {
    meta.target().starts_with(STORAGE_TARGET)
}

/// Timestamp, level, target, file:line, message.
fn file_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
}

pub fn init(config: &LoggingConfig) -> Result<LogGuards> {
    if !config.dir.exists() {
        std::fs::create_dir_all(&config.dir)
            .with_context(|| format!("Could not create log dir {:?}", config.dir))?;
    }

    let (pipeline_writer, pipeline_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::never(&config.dir, &config.pipeline_file),
    );
    let (storage_writer, storage_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::never(&config.dir, &config.storage_file),
    );

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .with(file_layer(pipeline_writer).with_filter(filter_fn(|m| !is_storage_event(m))))
        .with(file_layer(storage_writer).with_filter(filter_fn(is_storage_event)))
        .try_init()
        .context("Logging was already initialised")?;

    Ok(LogGuards {
        _guards: vec![pipeline_guard, storage_guard],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_once_and_split_files() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            dir: tmp.path().join("logs"),
            pipeline_file: "pipeline.log".into(),
            storage_file: "storage.log".into(),
        };

        let guards = init(&config).unwrap();
        assert!(init(&config).is_err());

        tracing::info!(target: "quotes_etl::pipeline", "pipeline line");
        tracing::info!(target: "quotes_etl::storage", "storage line");
        drop(guards);

        let pipeline = std::fs::read_to_string(config.dir.join("pipeline.log")).unwrap();
        let storage = std::fs::read_to_string(config.dir.join("storage.log")).unwrap();
        assert!(pipeline.contains("pipeline line"));
        assert!(!pipeline.contains("storage line"));
        assert!(storage.contains("storage line"));
        assert!(storage.contains("INFO"));
    }
}
