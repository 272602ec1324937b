use anyhow::Result;
use clap::Parser;

use workspace_autopilot::cli::commands::{
    DeployCommand, InitConfigCommand, PublishCommand, RunCommand, SyncVarsCommand,
    WorkspaceIdCommand,
};
use workspace_autopilot::cli::{Cli, Commands};
use workspace_autopilot::config::AutopilotConfig;
use workspace_autopilot::telemetry::{init_telemetry, shutdown_telemetry};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // init-config must work before any configuration exists
    if let Commands::InitConfig { path, force } = cli.command {
        return InitConfigCommand::new(path, force).execute();
    }

    AutopilotConfig::load_env_file()?;
    let config = AutopilotConfig::load(cli.config.as_deref())?;
    init_telemetry(&config.observability)?;

    let result = tokio::runtime::Runtime::new()?.block_on(async {
        match cli.command {
            Commands::SyncVars => SyncVarsCommand::new(&config).execute().await,
            Commands::Publish { file } => PublishCommand::new(&config, file).execute().await,
            Commands::Run {
                configuration_version,
                auto_apply,
                timeout,
            } => {
                RunCommand::new(config.clone())
                    .with_configuration_version(configuration_version)
                    .with_auto_apply(auto_apply)
                    .with_timeout(timeout)
                    .execute()
                    .await
            }
            Commands::Deploy { file, auto_apply } => {
                DeployCommand::new(config.clone(), file)
                    .with_auto_apply(auto_apply)
                    .execute()
                    .await
            }
            Commands::WorkspaceId { name } => {
                WorkspaceIdCommand::new(&config, name).execute().await
            }
            Commands::InitConfig { .. } => Ok(()),
        }
    });

    shutdown_telemetry();
    result
}
