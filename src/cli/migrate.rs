use crate::lifecycle::Controller;
use crate::types::{LifecycleState, MigrationResult};

use super::{SettingsArgs, init_controller};

/// Inspects first so the controller leaves `checking`; reports whether there
/// is anything to do.
async fn prepare(controller: &Controller) -> anyhow::Result<bool> {
    let snapshot = controller.check().await?;
    match snapshot.state {
        LifecycleState::Idle => Ok(true),
        LifecycleState::Success => {
            println!("Schema is already initialized; nothing to do.");
            Ok(false)
        }
        _ => anyhow::bail!(
            "{}",
            snapshot
                .last_error
                .unwrap_or_else(|| "status check failed".to_string())
        ),
    }
}

fn print_result(result: &MigrationResult) -> anyhow::Result<()> {
    println!();
    for line in &result.log {
        println!("  {line}");
    }
    println!();

    if !result.failed_versions.is_empty() {
        anyhow::bail!(
            "{} migration unit(s) failed: {}",
            result.failed_versions.len(),
            result.failed_versions.join(", ")
        );
    }
    Ok(())
}

fn finish(controller: &Controller, result: &MigrationResult) -> anyhow::Result<()> {
    print_result(result)?;
    let snapshot = controller.snapshot();
    if snapshot.state == LifecycleState::Error {
        anyhow::bail!(
            "{}",
            snapshot
                .last_error
                .unwrap_or_else(|| "migration run failed".to_string())
        );
    }
    println!(
        "Applied {} unit(s), skipped {}.",
        result.applied_versions.len(),
        result.skipped_versions.len()
    );
    Ok(())
}

pub async fn run_migrate(args: SettingsArgs) -> anyhow::Result<()> {
    let (controller, _) = init_controller(&args)?;
    if !prepare(&controller).await? {
        return Ok(());
    }

    let result = controller.initialize().await?;
    finish(&controller, &result)
}

pub async fn run_repair(args: SettingsArgs) -> anyhow::Result<()> {
    let (controller, _) = init_controller(&args)?;
    if !prepare(&controller).await? {
        return Ok(());
    }

    if let Some(report) = controller.snapshot().report {
        println!("Missing: {}", report.missing.join(", "));
    }

    let result = controller.repair().await?;
    finish(&controller, &result)
}
