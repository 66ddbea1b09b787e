use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod commands;

use commands::{ConfigArgs, DaemonArgs, DaemonKind};

#[derive(Parser)]
#[command(name = "fhq-lifecycle")]
#[command(about = "Hypothesis lifecycle and falsification daemons", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the trade-based falsification daemon
    Falsify(DaemonArgs),
    /// Run the time-based death daemon
    TimeDeath(DaemonArgs),
    /// Run the orphan-state cascade cleaner
    OrphanCleanup(DaemonArgs),
    /// Run all three daemons in one process
    All(DaemonArgs),
    /// Print lifecycle health: status histogram, orphans, expiries, exit coverage
    Status(ConfigArgs),
    /// Apply database migrations
    Migrate(ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let result = match cli.command {
        Commands::Falsify(args) => commands::run_daemon(DaemonKind::Falsification, &args).await,
        Commands::TimeDeath(args) => commands::run_daemon(DaemonKind::TimeDeath, &args).await,
        Commands::OrphanCleanup(args) => {
            commands::run_daemon(DaemonKind::OrphanCleanup, &args).await
        }
        Commands::All(args) => commands::run_all(&args).await,
        Commands::Status(args) => commands::run_status(&args).await.map(|()| ExitCode::SUCCESS),
        Commands::Migrate(args) => commands::run_migrate(&args).await.map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_once_flag_parses() {
        let cli = Cli::try_parse_from(["fhq-lifecycle", "orphan-cleanup", "--once"]).unwrap();
        match cli.command {
            Commands::OrphanCleanup(args) => {
                assert!(args.once);
                assert_eq!(args.config.config.to_str(), Some("config/Config.toml"));
            }
            _ => panic!("expected orphan-cleanup"),
        }
    }

    #[test]
    fn test_default_mode_is_continuous() {
        let cli = Cli::try_parse_from(["fhq-lifecycle", "falsify", "-c", "/etc/fhq.toml"]).unwrap();
        match cli.command {
            Commands::Falsify(args) => {
                assert!(!args.once);
                assert_eq!(args.config.config.to_str(), Some("/etc/fhq.toml"));
            }
            _ => panic!("expected falsify"),
        }
    }
}
