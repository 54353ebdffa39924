//! Process-wide `tracing` subscriber

use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::config::LoggingConfig;

type OutputLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber.
///
/// `RUST_LOG` directives take precedence; the configured level is the
/// fallback. Fails if the level is unknown, the log file cannot be opened,
/// or a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = level_filter(config)?;
    tracing_subscriber::registry()
        .with(output_layer(config)?)
        .with(filter)
        .try_init()?;
    Ok(())
}

fn level_filter(config: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    let level: LevelFilter = config
        .level
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid log level: {}", config.level))?;
    Ok(EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy())
}

/// JSON or pretty lines, to stdout or appended to `file_path`
fn output_layer(config: &LoggingConfig) -> anyhow::Result<OutputLayer> {
    let (writer, ansi) = match &config.file_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| anyhow::anyhow!("Failed to open log file {path}: {e}"))?;
            (BoxMakeWriter::new(Arc::new(file)), false)
        }
        None => (BoxMakeWriter::new(std::io::stdout), true),
    };

    let layer = match config.format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(writer)
            .boxed(),
        _ => fmt::layer()
            .pretty()
            .with_file(false)
            .with_ansi(ansi)
            .with_writer(writer)
            .boxed(),
    };
    Ok(layer)
}
