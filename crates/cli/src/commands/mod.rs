//! CLI commands for the lifecycle daemons.

pub mod daemon;
pub mod migrate;
pub mod status;

use anyhow::Result;
use clap::Args;
use fhq_core::config_loader::DEFAULT_CONFIG_PATH;
use fhq_core::{AppConfig, ConfigLoader};
use fhq_data::DatabaseClient;
use std::path::PathBuf;

pub use daemon::{run_all, run_daemon, DaemonKind};
pub use migrate::run_migrate;
pub use status::run_status;

/// Arguments shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Arguments of the daemon commands.
#[derive(Args, Debug, Clone)]
pub struct DaemonArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Run a single cycle and exit; non-zero exit status on any failure
    #[arg(long)]
    pub once: bool,
}

fn load_config(args: &ConfigArgs) -> Result<AppConfig> {
    ConfigLoader::load_from(&args.config)
}

async fn connect(config: &AppConfig) -> Result<DatabaseClient> {
    let client = DatabaseClient::new(&config.database.url, config.database.max_connections).await?;
    tracing::info!("Connected to database");
    Ok(client)
}
