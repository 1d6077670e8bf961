use inquire::Text;
use inquire::validator::Validation;

use crate::types::{AdminOutcome, Identity};

use super::{SettingsArgs, init_controller};

fn prompt_name(label: &str) -> anyhow::Result<String> {
    let value = Text::new(label)
        .with_validator(|input: &str| {
            if input.trim().is_empty() {
                Ok(Validation::Invalid("Name cannot be empty".into()))
            } else {
                Ok(Validation::Valid)
            }
        })
        .prompt()?;
    Ok(value)
}

fn resolve(value: Option<String>, label: &str, flag: &str, non_interactive: bool) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None if non_interactive => anyhow::bail!("{flag} is required in non-interactive mode"),
        None => prompt_name(label),
    }
}

pub fn run_admin_create(
    args: SettingsArgs,
    given_name: Option<String>,
    family_name: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let (controller, _) = init_controller(&args)?;

    let identity = Identity {
        given_name: resolve(given_name, "Given name:", "--given-name", non_interactive)?,
        family_name: resolve(family_name, "Family name:", "--family-name", non_interactive)?,
    };

    let result = controller.create_admin(&identity);
    match result.outcome {
        AdminOutcome::Created => {
            println!();
            println!("{}", result.message);
            println!();
            Ok(())
        }
        _ => anyhow::bail!("{}", result.message),
    }
}
