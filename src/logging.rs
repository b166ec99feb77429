//! tracing subscriber for the CLI
//!
//! Events go to stderr, and optionally to an append-mode log file, so command
//! output on stdout stays clean. The same format (JSON or text) is used for
//! every sink.

use crate::config::LoggingConfig;
use anyhow::Result;
use std::fs::OpenOptions;
use std::sync::Arc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Layer, Registry};

type SinkLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Build the level filter; `RUST_LOG` wins over the configured level
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?)
}

fn sink<W>(json: bool, ansi: bool, writer: W) -> SinkLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer().with_target(true).with_ansi(ansi).with_writer(writer);
    if json {
        layer.json().with_current_span(true).boxed()
    } else {
        layer.boxed()
    }
}

/// Install the global subscriber described by `config`
///
/// Fails on an invalid level directive, an unopenable log file, or when a
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let mut sinks = vec![sink(config.json_format, true, std::io::stderr)];
    if let Some(path) = &config.file_path {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        sinks.push(sink(config.json_format, false, Arc::new(file)));
    }

    tracing_subscriber::registry()
        .with(sinks)
        .with(env_filter(config)?)
        .try_init()?;
    Ok(())
}
