//! Webhook server command, the default mode.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use gardinar::config::Config;
use gardinar::webhook::server::start_server;

use crate::Cli;

/// Layer the configuration: file, then environment, then CLI flags.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load(&cli.config)
        .and_then(Config::with_env_overrides)
        .and_then(|c| c.with_port(cli.port))
        .with_context(|| format!("Error loading config from {}", cli.config.display()))?;
    Ok(config)
}

pub async fn cmd_serve(config: Config) -> Result<()> {
    info!("Gardinar v{}", env!("CARGO_PKG_VERSION"));
    info!(
        strategy = config.tasks.strategy(),
        "Loaded {} tasks from config file",
        config.tasks.task_names().len()
    );

    start_server(Arc::new(config)).await
}
