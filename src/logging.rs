use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

/// Install the global subscriber. Keep the returned guard alive until exit or
/// buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> Result<WorkerGuard> {
    let rotation = match config.rotation.as_str() {
        "hourly" => Rotation::HOURLY,
        "daily" => Rotation::DAILY,
        _ => Rotation::NEVER,
    };
    let file_appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.log_file)
        .build(&config.log_dir)
        .with_context(|| format!("Failed to open log directory: {}", config.log_dir))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Per-request auth events are debug level; cap them unless tracing is on
    let filter_str = if config.enable_tracing {
        config.log_level.clone()
    } else {
        format!("{},keysig_auth::auth=info", config.log_level)
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer().with_target(false).with_ansi(true);
        registry.with(file_layer).with(stdout_layer).init();
    }

    Ok(guard)
}
