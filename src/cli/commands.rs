use std::path::PathBuf;

use clap::{Args, Subcommand};

#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    /// Data directory for the database, storage and stagehand.toml
    /// [default: ./data]
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Explicit config file (defaults to <data-dir>/stagehand.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum BucketCommands {
    /// Create the media bucket if it does not exist
    Ensure {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Bucket name (defaults to the configured bucket)
        #[arg(long)]
        name: Option<String>,

        /// Make the bucket private
        #[arg(long)]
        private: bool,

        /// Maximum object size in bytes
        #[arg(long)]
        max_object_bytes: Option<u64>,

        /// Allowed content type pattern; repeat for several
        #[arg(long = "content-type")]
        content_types: Vec<String>,
    },

    /// Show whether a bucket exists
    Status {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Bucket name (defaults to the configured bucket)
        name: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create the bootstrap administrator
    Create {
        #[command(flatten)]
        settings: SettingsArgs,

        #[arg(long)]
        given_name: Option<String>,

        #[arg(long)]
        family_name: Option<String>,

        /// Skip interactive prompts (requires both names)
        #[arg(long)]
        non_interactive: bool,
    },
}
