mod commands;
mod utils;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "prismflow")]
#[command(about = "Start it, wait for it, know how it ended.", long_about = None)]
struct Cli {
    /// Config file (defaults to prismflow.yaml discovery)
    #[arg(short, long, global = true, env = "PRISMFLOW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every classification table
    Tables {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Wait for an operation that is already running
    Wait {
        /// Operation kind (blueprint-launch, app-provisioning, app-deletion,
        /// app-runlog, runbook-runlog, prism-task, ndb-operation)
        kind: String,
        /// Operation handle (request id, app uuid, run-log uuid, task uuid, operation id)
        handle: String,
        /// Application uuid owning the run-log (app-runlog)
        #[arg(long)]
        app: Option<String>,
        /// Blueprint uuid of the launch (blueprint-launch)
        #[arg(long)]
        blueprint: Option<String>,
        /// Delay between status queries in milliseconds
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Give up after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Launch a blueprint and wait until the application is running
    Launch {
        /// Blueprint uuid
        #[arg(long)]
        blueprint: String,
        /// Application name
        #[arg(long)]
        name: String,
        /// Application description
        #[arg(long)]
        description: Option<String>,
        /// Application profile (defaults to the first one)
        #[arg(long)]
        profile: Option<String>,
    },
    /// Run an application action (start, stop, restart or a custom action)
    Action {
        /// Application uuid or name
        app: String,
        /// Action name
        action: String,
    },
    /// Execute a runbook and print its output variables
    Runbook {
        /// Runbook uuid or name
        runbook: String,
        /// Runbook variable (NAME=VALUE), repeatable
        #[arg(long = "var", value_parser = utils::parse_var)]
        vars: Vec<(String, String)>,
    },
    /// Delete an application and wait until it is gone
    Delete {
        /// Application uuid or name
        app: String,
        /// Remove only the self-service record, keep the VMs
        #[arg(long)]
        soft: bool,
    },
    /// List or delete application recovery points
    #[command(subcommand)]
    RecoveryPoint(RecoveryPointCommands),
    /// Show version
    Version,
}

#[derive(Subcommand)]
enum RecoveryPointCommands {
    /// List unexpired recovery points
    List {
        /// Application uuid or name
        app: String,
    },
    /// Delete a recovery point by name and wait for it
    Delete {
        /// Application uuid or name
        app: String,
        /// Recovery point name
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Version => {
            println!("prismflow {}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Tables { json } => {
            commands::tables::handle(json)?;
        }
        Commands::Wait {
            kind,
            handle,
            app,
            blueprint,
            delay_ms,
            timeout_secs,
        } => {
            let (settings, cancel) = utils::session(config)?;
            let args = commands::wait::WaitArgs {
                kind,
                handle,
                app,
                blueprint,
                delay_ms,
                timeout_secs,
            };
            commands::wait::handle(&settings, cancel, args).await?;
        }
        Commands::Launch {
            blueprint,
            name,
            description,
            profile,
        } => {
            let (settings, cancel) = utils::session(config)?;
            let request = prismflow_api::LaunchRequest {
                blueprint,
                app_name: name,
                app_description: description,
                app_profile: profile,
            };
            commands::launch::handle(&settings, cancel, request).await?;
        }
        Commands::Action { app, action } => {
            let (settings, cancel) = utils::session(config)?;
            commands::action::handle(&settings, cancel, &app, &action).await?;
        }
        Commands::Runbook { runbook, vars } => {
            let (settings, cancel) = utils::session(config)?;
            commands::runbook::handle(&settings, cancel, &runbook, vars).await?;
        }
        Commands::Delete { app, soft } => {
            let (settings, cancel) = utils::session(config)?;
            commands::delete::handle(&settings, cancel, &app, soft).await?;
        }
        Commands::RecoveryPoint(RecoveryPointCommands::List { app }) => {
            let (settings, cancel) = utils::session(config)?;
            commands::recovery_point::list(&settings, cancel, &app).await?;
        }
        Commands::RecoveryPoint(RecoveryPointCommands::Delete { app, name }) => {
            let (settings, cancel) = utils::session(config)?;
            commands::recovery_point::delete(&settings, cancel, &app, &name).await?;
        }
    }

    Ok(())
}
