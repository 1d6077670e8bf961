use crate::types::BucketSpec;

use super::{SettingsArgs, init_controller};

pub fn run_bucket_ensure(
    args: SettingsArgs,
    name: Option<String>,
    private: bool,
    max_object_bytes: Option<u64>,
    content_types: Vec<String>,
) -> anyhow::Result<()> {
    let (controller, settings) = init_controller(&args)?;

    let base = settings.bucket;
    let spec = BucketSpec {
        name: name.unwrap_or(base.name),
        public_read: base.public_read && !private,
        max_object_bytes: max_object_bytes.unwrap_or(base.max_object_bytes),
        allowed_content_types: if content_types.is_empty() {
            base.allowed_content_types
        } else {
            content_types
        },
    };

    let outcome = controller.ensure_bucket(&spec);
    println!("{}", outcome.message);

    if let Some(manual) = &outcome.manual_setup {
        println!();
        println!("Create it by hand with:");
        println!("  name:           {}", manual.name);
        println!("  public read:    {}", manual.public_read);
        println!("  max object:     {} bytes", manual.max_object_bytes);
        println!(
            "  content types:  {}",
            manual.allowed_content_types.join(", ")
        );
        println!();
    }

    if !outcome.success {
        anyhow::bail!("bucket '{}' is not ready", spec.name);
    }
    Ok(())
}

pub fn run_bucket_status(args: SettingsArgs, name: Option<String>, json: bool) -> anyhow::Result<()> {
    let (controller, settings) = init_controller(&args)?;
    let name = name.unwrap_or(settings.bucket.name);

    let status = controller.refresh_bucket_status(&name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else if status.exists {
        println!("Bucket '{}' exists", status.name);
    } else {
        println!("Bucket '{}' not found", status.name);
    }
    Ok(())
}
