use std::fmt::Write as _;
use std::path::Path;

use slotswap_rollout::StatusReport;
use slotswap_runtime::UnitStatus;
use slotswap_state::OperationOutcome;

use super::Session;
use crate::OutputFormat;

pub async fn run(config_path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let session = Session::open(config_path)?;
    let report = session.orchestrator.status().await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print!("{}", format_report(&report)),
    }
    Ok(())
}

fn format_report(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "active:   {}", report.active);
    let _ = writeln!(out, "standby:  {}", report.standby);
    let rollback = match &report.state.previous_unit {
        Some(unit) if report.rollback_available => {
            let gone = report
                .units
                .iter()
                .any(|u| u.unit == *unit && u.status == Some(UnitStatus::Absent));
            if gone {
                format!("recorded, unit gone ({unit})")
            } else {
                format!("available ({unit})")
            }
        }
        _ => "none".to_string(),
    };
    let _ = writeln!(out, "rollback: {rollback}");

    match &report.proxy_error {
        Some(e) => {
            let _ = writeln!(out, "routing:  unknown ({e})");
        }
        None => {
            let sync = if report.routing_in_sync { "in sync" } else { "OUT OF SYNC" };
            let _ = writeln!(out, "routing:  {} [{sync}]", report.live_upstreams.join(", "));
        }
    }

    let _ = writeln!(out, "\nunits:");
    for unit in &report.units {
        let status = unit
            .status
            .map(|s| format!("{s:?}").to_lowercase())
            .unwrap_or_else(|| "unknown".to_string());
        let _ = writeln!(out, "  {:<16} :{:<6} {status}", unit.unit, unit.slot.port);
    }

    if !report.recent_operations.is_empty() {
        let _ = writeln!(out, "\nrecent:");
        for op in &report.recent_operations {
            let result = match &op.outcome {
                OperationOutcome::Succeeded { warnings } if warnings.is_empty() => "ok".to_string(),
                OperationOutcome::Succeeded { warnings } => {
                    format!("ok ({} warnings)", warnings.len())
                }
                OperationOutcome::Aborted { reason } => format!("aborted: {reason}"),
            };
            let _ = writeln!(
                out,
                "  {:?} :{} -> :{} {result}",
                op.kind, op.from_port, op.to_port
            );
        }
    }
    out
}
