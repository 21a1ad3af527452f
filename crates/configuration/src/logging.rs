use crate::error::ConfigError;
use crate::settings::LoggingSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Console output goes to
/// stderr through the indicatif layer so progress bars stay intact. When a log
/// directory is configured a daily-rolling file is written as well; the returned
/// guard must be held until exit so buffered lines get flushed.
pub fn init_tracing(settings: &LoggingSettings) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    let indicatif_layer = IndicatifLayer::new();
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(indicatif_layer.get_stderr_writer());

    let (file_layer, guard) = match &settings.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &settings.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .with(indicatif_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::debug!(level = %settings.level, directory = ?settings.directory, "Logging initialised.");
    Ok(guard)
}
