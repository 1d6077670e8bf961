use crate::types::{LifecycleState, StatusReport};

use super::{SettingsArgs, init_controller};

pub async fn run_status(args: SettingsArgs, json: bool) -> anyhow::Result<()> {
    let (controller, _) = init_controller(&args)?;
    let snapshot = controller.check().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!();
        println!("Schema Status");
        println!("{}", "─".repeat(13));
        println!("State:     {}", snapshot.state);
        if let Some(report) = &snapshot.report {
            print_report(report);
        }
        if let Some(error) = &snapshot.last_error {
            println!("Error:     {error}");
        }
        println!();
    }

    if snapshot.state == LifecycleState::Error {
        anyhow::bail!(
            "{}",
            snapshot
                .last_error
                .unwrap_or_else(|| "status check failed".to_string())
        );
    }

    Ok(())
}

pub fn print_report(report: &StatusReport) {
    println!(
        "Entities:  {}/{} present",
        report.existing_count, report.total_count
    );
    println!();

    let width = report
        .entities
        .iter()
        .map(|e| e.name.len())
        .max()
        .unwrap_or(0);
    for entity in &report.entities {
        let (marker, detail) = match (entity.exists, entity.accessible, entity.row_count) {
            (false, _, _) => ("✗", "missing".to_string()),
            (true, false, _) => ("!", "inaccessible".to_string()),
            (true, true, Some(1)) => ("✓", "1 row".to_string()),
            (true, true, Some(rows)) => ("✓", format!("{rows} rows")),
            (true, true, None) => ("✓", "present".to_string()),
        };
        println!("  {marker} {:<width$}  {detail}", entity.name);
    }
}
