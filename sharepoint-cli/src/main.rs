use anyhow::Result;
use clap::Parser;

use sharepoint_cli::cli::{self, Cli};
use sharepoint_cli::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = Config::load(cli.config.as_deref())?;
    cli::run(cli, config).await
}
