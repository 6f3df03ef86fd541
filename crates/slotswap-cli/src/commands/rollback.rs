use std::path::Path;

use super::Session;
use super::deploy::print_diagnostics;

pub async fn run(config_path: &Path) -> anyhow::Result<()> {
    let session = Session::open(config_path)?;

    match session.orchestrator.rollback().await {
        Ok(report) => {
            println!(
                "✓ Rolled back: traffic now on port {}",
                report.state.active_port
            );
            for warning in &report.warnings {
                eprintln!("warning: {warning}");
            }
            Ok(())
        }
        Err(e) => {
            print_diagnostics(&e);
            Err(e.into())
        }
    }
}
