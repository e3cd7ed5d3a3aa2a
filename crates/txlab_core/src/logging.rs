use std::path::Path;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::TxlabConfig;

const LOG_FILE_PREFIX: &str = "txlab";
const TOOLBOX_CRATES: [&str; 4] = ["txlab_core", "txlab_chain", "txlab_rpc", "txlab_app"];

/// Initializes the logging system with file + stderr output.
/// Returns a guard that must be kept alive for the duration of the process.
///
/// `level` is the fallback filter when `RUST_LOG` is unset. Stdout is left
/// untouched because the command-line front end prints results there.
pub fn init_logging(level: &str) -> Result<WorkerGuard> {
    install(&TxlabConfig::logs_dir()?, &fallback_directives(level))
}

/// `level` as the global default and for every toolbox crate.
fn fallback_directives(level: &str) -> String {
    TOOLBOX_CRATES
        .iter()
        .fold(level.to_string(), |acc, krate| format!("{acc},{krate}={level}"))
}

fn install(logs_dir: &Path, directives: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)?;

    // File appender: daily rotation
    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {e}"))?;

    Ok(guard)
}
