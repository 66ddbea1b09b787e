//! Daemon commands: one cycle with `--once`, otherwise an interval loop until Ctrl+C.

use anyhow::Result;
use fhq_data::PgLifecycleStore;
use fhq_lifecycle::{
    run_continuous, CycleSummary, Daemon, EvidenceWriter, FalsificationDaemon,
    OrphanCascadeCleaner, TimeDeathDaemon,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info};

use super::{connect, load_config, DaemonArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonKind {
    Falsification,
    TimeDeath,
    OrphanCleanup,
}

/// Runs one daemon.
///
/// # Errors
/// Returns an error if configuration, connection, or a `--once` cycle fails.
pub async fn run_daemon(kind: DaemonKind, args: &DaemonArgs) -> Result<ExitCode> {
    let config = load_config(&args.config)?;
    let store = Arc::new(PgLifecycleStore::new(connect(&config).await?.pool()));
    let evidence = EvidenceWriter::from_config(&config.evidence);

    match kind {
        DaemonKind::Falsification => {
            let daemon = FalsificationDaemon::new(store, &config.falsification, evidence);
            drive(&daemon, config.falsification.interval_secs, args.once).await
        }
        DaemonKind::TimeDeath => {
            let daemon = TimeDeathDaemon::new(store, &config.time_death, evidence);
            drive(&daemon, config.time_death.interval_secs, args.once).await
        }
        DaemonKind::OrphanCleanup => {
            let daemon = OrphanCascadeCleaner::new(store, &config.orphan_cleanup, evidence);
            drive(&daemon, config.orphan_cleanup.interval_secs, args.once).await
        }
    }
}

/// Runs all three daemons: in sequence with `--once`, otherwise each on its own interval.
///
/// # Errors
/// Returns an error if configuration or connection fails.
pub async fn run_all(args: &DaemonArgs) -> Result<ExitCode> {
    let config = load_config(&args.config)?;
    let store = Arc::new(PgLifecycleStore::new(connect(&config).await?.pool()));
    let evidence = EvidenceWriter::from_config(&config.evidence);

    let falsification = FalsificationDaemon::new(store.clone(), &config.falsification, evidence.clone());
    let time_death = TimeDeathDaemon::new(store.clone(), &config.time_death, evidence.clone());
    let cleaner = OrphanCascadeCleaner::new(store, &config.orphan_cleanup, evidence);

    if args.once {
        let results = [
            once(&falsification).await,
            once(&time_death).await,
            once(&cleaner).await,
        ];
        let failed = results.iter().filter(|ok| !**ok).count();
        if failed > 0 {
            error!(failed, "Single pass finished with failures");
            return Ok(ExitCode::FAILURE);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let shutdown = shutdown_signal();
    tokio::join!(
        run_continuous(
            &falsification,
            Duration::from_secs(config.falsification.interval_secs),
            shutdown.clone()
        ),
        run_continuous(
            &time_death,
            Duration::from_secs(config.time_death.interval_secs),
            shutdown.clone()
        ),
        run_continuous(
            &cleaner,
            Duration::from_secs(config.orphan_cleanup.interval_secs),
            shutdown
        ),
    );

    info!("All daemons stopped");
    Ok(ExitCode::SUCCESS)
}

async fn drive<D: Daemon>(daemon: &D, interval_secs: u64, once: bool) -> Result<ExitCode> {
    if once {
        let summary = daemon.run_once().await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(if summary.had_failures() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    run_continuous(daemon, Duration::from_secs(interval_secs), shutdown_signal()).await;
    Ok(ExitCode::SUCCESS)
}

/// Runs one cycle, printing its summary. Returns false on any failure.
async fn once<D: Daemon>(daemon: &D) -> bool {
    match daemon.run_once().await {
        Ok(summary) => {
            match serde_json::to_string_pretty(&summary) {
                Ok(json) => println!("{json}"),
                Err(e) => error!(daemon = daemon.name(), error = %e, "Failed to print summary"),
            }
            !summary.had_failures()
        }
        Err(e) => {
            error!(daemon = daemon.name(), error = %format!("{e:#}"), "Cycle failed");
            false
        }
    }
}

/// Returns a receiver that turns true on Ctrl+C.
fn shutdown_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down");
                let _ = tx.send(true);
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                tx.closed().await;
            }
        }
    });
    rx
}
