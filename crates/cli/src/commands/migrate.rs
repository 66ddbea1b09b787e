use anyhow::Result;

use super::{connect, load_config, ConfigArgs};

/// Applies the lifecycle schema migrations.
///
/// # Errors
/// Returns an error if the connection or a migration fails.
pub async fn run_migrate(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    connect(&config).await?.migrate().await
}
