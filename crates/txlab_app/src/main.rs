mod cli;
mod commands;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use txlab_core::config::{ConfigManager, TxlabConfig};
use txlab_core::logging;
use txlab_core::storage::{FileStore, KeyValueStore};

use crate::cli::Cli;
use crate::commands::AppContext;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    TxlabConfig::ensure_dirs()?;
    let config = ConfigManager::new()?.get();
    let _log_guard = logging::init_logging(&config.log_level)?;
    info!("Starting txlab v{VERSION}");

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(TxlabConfig::store_path()?));
    let ctx = AppContext::new(config, store);

    if let Err(e) = commands::run(&ctx, cli.command).await {
        error!("{e:#}");
        return Err(e);
    }
    Ok(())
}
