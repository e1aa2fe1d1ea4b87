//! `guardfleet supervise`: run the fleet.

use std::sync::Arc;

use guardfleet_config::{AppConfig, LauncherKind, load_identity_list};
use guardfleet_supervisor::{
    AgentLauncher, FleetSettings, ProcessLauncher, SandboxWorldFactory, Supervisor, TaskLauncher,
    stdin_lines,
};
use tracing::info;

pub async fn run(spawn: Option<u32>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let mut settings = FleetSettings::from_config(&config.fleet);
    if let Some(count) = spawn {
        settings.auto_spawn = count;
    }

    let launcher: Arc<dyn AgentLauncher> = match config.fleet.launcher {
        LauncherKind::Process => Arc::new(ProcessLauncher::current_exe(
            config.server.host.clone(),
            config.server.port,
        )?),
        LauncherKind::Task => {
            let bosses = load_identity_list(&config.lists.bosses)?;
            Arc::new(TaskLauncher::new(
                Arc::new(SandboxWorldFactory::new(bosses)),
                config.lists.load_bosses()?,
                config.lists.load_targets()?,
                config.agent.clone(),
            ))
        }
    };

    info!(
        server = %format!("{}:{}", config.server.host, config.server.port),
        launcher = ?config.fleet.launcher,
        agents = settings.auto_spawn,
        "Starting fleet supervisor"
    );
    println!("Commands: @<agent> <command...> | ping | spawn <count> | list");

    Supervisor::new(launcher, settings)
        .run(stdin_lines(), shutdown_signal())
        .await;

    info!("Supervisor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}
