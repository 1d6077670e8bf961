mod admin;
mod bucket;
mod commands;
mod migrate;
mod status;

pub use admin::run_admin_create;
pub use bucket::{run_bucket_ensure, run_bucket_status};
pub use commands::{AdminCommands, BucketCommands, SettingsArgs};
pub use migrate::{run_migrate, run_repair};
pub use status::{print_report, run_status};

use crate::config::Settings;
use crate::lifecycle::Controller;

/// Load settings and wire a controller for one command.
pub fn init_controller(args: &SettingsArgs) -> anyhow::Result<(Controller, Settings)> {
    let settings = Settings::load(args.data_dir.as_deref(), args.config.as_deref())?;
    let controller = Controller::from_settings(&settings)?;
    Ok((controller, settings))
}
