use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use gardinar::config::DEFAULT_CONFIG_PATH;
use gardinar::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "gardinar")]
#[command(version, about = "Runs configured tasks when an authenticated webhook arrives")]
pub struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Listen port (overrides the config file and GARDINAR_LISTEN_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Validate the configuration, print a summary and exit
    #[arg(long)]
    pub check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    logging::init(cli.verbose, cli.log_format)?;

    let config = cmd::load_config(&cli)?;
    if cli.check {
        cmd::cmd_check(&cli.config, &config);
        return Ok(());
    }
    cmd::cmd_serve(config).await
}
