//! Lifecycle status command.
//!
//! Prints the hypothesis status histogram, orphaned FALSIFIED hypotheses,
//! hypotheses past their horizon, whether the exit-coverage guardrail
//! would currently allow falsification, and each daemon's last recorded cycle.

use anyhow::Result;
use chrono::Utc;
use fhq_core::{governance, CycleEvidence};
use fhq_data::{LifecycleOverview, PgLifecycleStore};
use fhq_lifecycle::{falsification, orphan_cleaner, time_death};

use super::{connect, load_config, ConfigArgs};

/// Runs the status command.
///
/// # Errors
/// Returns an error if the connection or any query fails.
pub async fn run_status(args: &ConfigArgs) -> Result<()> {
    let config = load_config(args)?;
    let store = PgLifecycleStore::new(connect(&config).await?.pool());
    let window_hours = config.falsification.exit_coverage_window_hours;

    let overview = store.overview(Utc::now(), window_hours).await?;

    let mut last_cycles = Vec::new();
    for daemon in [
        falsification::DAEMON_NAME,
        time_death::DAEMON_NAME,
        orphan_cleaner::DAEMON_NAME,
    ] {
        let latest = store
            .repositories()
            .evidence
            .query_recent(daemon, 1)
            .await?
            .into_iter()
            .next();
        last_cycles.push((daemon, latest));
    }

    print!(
        "{}",
        render(
            &overview,
            &last_cycles,
            window_hours,
            config.falsification.min_exits_in_window
        )
    );
    Ok(())
}

fn render(
    overview: &LifecycleOverview,
    last_cycles: &[(&str, Option<CycleEvidence>)],
    window_hours: i64,
    min_exits: i64,
) -> String {
    let constants = governance::active();
    let guardrail = if overview.realized_exits_in_window >= min_exits {
        "OPEN"
    } else {
        "LEARNING_BLOCKED"
    };

    let mut out = String::new();
    out.push('\n');
    out.push_str(&"=".repeat(60));
    out.push_str("\nHYPOTHESIS LIFECYCLE STATUS\n");
    out.push_str(&"=".repeat(60));
    out.push_str("\n\n");

    out.push_str(&format!("{:<30} {:>12}\n", "Status", "Hypotheses"));
    out.push_str(&format!("{}\n", "-".repeat(43)));
    for (status, count) in &overview.status_counts {
        out.push_str(&format!("{status:<30} {count:>12}\n"));
    }

    out.push('\n');
    out.push_str(&format!(
        "{:<30} {:>12}\n",
        "Orphaned (FALSIFIED)", overview.orphaned_hypotheses
    ));
    out.push_str(&format!(
        "{:<30} {:>12}\n",
        "Past horizon (DRAFT/ACTIVE)", overview.timeout_eligible
    ));
    out.push_str(&format!(
        "{:<30} {:>12}\n",
        format!("Realized exits ({window_hours}h)"),
        overview.realized_exits_in_window
    ));
    out.push_str(&format!("{:<30} {:>12}\n", "Guardrail", guardrail));
    out.push_str(&format!(
        "{:<30} {:>12}\n",
        "Governance",
        format!(
            "v{} ({}, {:.1})",
            constants.version, constants.min_trades_for_eval, constants.sharpe_threshold
        )
    ));

    out.push_str("\nLast cycle\n");
    out.push_str(&format!("{}\n", "-".repeat(43)));
    for (daemon, latest) in last_cycles {
        let when = latest.as_ref().map_or_else(
            || "never".to_string(),
            |e| e.finished_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        out.push_str(&format!("{daemon:<20} {when:>22}\n"));
    }
    out.push_str(&"=".repeat(60));
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn overview(exits: i64) -> LifecycleOverview {
        LifecycleOverview {
            status_counts: vec![("ACTIVE".to_string(), 12), ("FALSIFIED".to_string(), 3)],
            orphaned_hypotheses: 1,
            timeout_eligible: 4,
            realized_exits_in_window: exits,
        }
    }

    #[test]
    fn test_render_lists_every_status() {
        let text = render(&overview(5), &[], 48, 1);
        assert!(text.contains("ACTIVE"));
        assert!(text.contains("FALSIFIED"));
        assert!(text.contains("Realized exits (48h)"));
        assert!(text.contains("OPEN"));
    }

    #[test]
    fn test_render_shows_blocked_guardrail() {
        let text = render(&overview(0), &[], 48, 1);
        assert!(text.contains("LEARNING_BLOCKED"));
    }

    #[test]
    fn test_render_last_cycles() {
        let finished = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let evidence = CycleEvidence {
            cycle_id: Uuid::new_v4(),
            daemon: "time_death".to_string(),
            started_at: finished,
            finished_at: finished,
            summary: serde_json::json!({}),
        };
        let cycles = [("falsification", None), ("time_death", Some(evidence))];

        let text = render(&overview(1), &cycles, 48, 1);
        assert!(text.contains("never"));
        assert!(text.contains("2026-03-01 12:00:00 UTC"));
    }
}
