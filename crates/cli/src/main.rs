//! Guardfleet CLI, the main entry point.
//!
//! Commands:
//! - `init`      : write a default config and empty identity lists
//! - `supervise` : run the fleet supervisor with its operator console
//! - `agent`     : run one guard agent speaking IPC on stdin/stdout

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "guardfleet",
    about = "Guardfleet: a supervised fleet of autonomous guard agents",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and empty boss/target lists
    Init,

    /// Start the fleet supervisor
    Supervise {
        /// Agents to spawn at startup (overrides fleet.auto_spawn)
        #[arg(short, long)]
        spawn: Option<u32>,
    },

    /// Run a single guard agent (normally launched by the supervisor)
    Agent {
        /// In-game username of the agent
        #[arg(short, long)]
        name: String,

        /// Override the server host
        #[arg(long)]
        host: Option<String>,

        /// Override the server port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // stdout is the IPC channel for agent processes, so logs go to stderr
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Supervise { spawn } => commands::supervise::run(spawn).await?,
        Commands::Agent { name, host, port } => commands::agent::run(name, host, port).await?,
    }

    Ok(())
}
