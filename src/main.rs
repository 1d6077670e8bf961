use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use stagehand::cli::{
    AdminCommands, BucketCommands, SettingsArgs, init_controller, run_admin_create,
    run_bucket_ensure, run_bucket_status, run_migrate, run_repair, run_status,
};
use stagehand::server::{AppState, create_router};

#[derive(Parser)]
#[command(name = "stagehand")]
#[command(about = "Schema lifecycle and storage provisioning for a content library", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the schema and report which entities exist
    Status {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply every pending migration unit
    Migrate {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Apply only the units that create missing entities
    Repair {
        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Storage bucket commands
    Bucket {
        #[command(subcommand)]
        command: BucketCommands,
    },

    /// Administrator commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the HTTP API
    Serve {
        #[command(flatten)]
        settings: SettingsArgs,

        /// Host to bind to (overrides the config file)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (overrides the config file)
        #[arg(long, short)]
        port: Option<u16>,
    },
}

async fn run_serve(args: SettingsArgs, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let (controller, mut settings) = init_controller(&args)?;
    if let Some(host) = host {
        settings.host = host;
    }
    if let Some(port) = port {
        settings.port = port;
    }

    let snapshot = controller.check().await?;
    info!("Schema state on startup: {}", snapshot.state);

    let addr = settings.socket_addr()?;
    let state = Arc::new(AppState::new(controller, settings));
    let app = create_router(state);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stagehand=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status { settings, json } => run_status(settings, json).await?,
        Commands::Migrate { settings } => run_migrate(settings).await?,
        Commands::Repair { settings } => run_repair(settings).await?,
        Commands::Bucket { command } => match command {
            BucketCommands::Ensure {
                settings,
                name,
                private,
                max_object_bytes,
                content_types,
            } => run_bucket_ensure(settings, name, private, max_object_bytes, content_types)?,
            BucketCommands::Status {
                settings,
                name,
                json,
            } => run_bucket_status(settings, name, json)?,
        },
        Commands::Admin { command } => match command {
            AdminCommands::Create {
                settings,
                given_name,
                family_name,
                non_interactive,
            } => run_admin_create(settings, given_name, family_name, non_interactive)?,
        },
        Commands::Serve {
            settings,
            host,
            port,
        } => run_serve(settings, host, port).await?,
    }

    Ok(())
}
