//! Command-line interface

pub mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};

use crate::api::metadata::DescriptorRegistry;
use crate::api::query::Dialect;
use crate::api::SharePointClient;
use crate::config::Config;
use commands::describe::DescribeArgs;
use commands::query::QueryCommands;
use commands::set_field::SetFieldArgs;

/// Query SharePoint and Microsoft Graph collections and update list items
#[derive(Debug, Parser)]
#[command(name = "sharepoint-cli", version, about)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Query a model collection through SharePoint REST or Graph
    Query(QueryCommands),
    /// Set a field on a list item through CSOM
    SetField(SetFieldArgs),
    /// Show the descriptor table of a model
    Describe(DescribeArgs),
}

/// Loaded configuration shared by command handlers
pub struct Context {
    pub config: Config,
    pub registry: Arc<DescriptorRegistry>,
}

impl Context {
    pub fn load(config: Config) -> Result<Self> {
        let registry = config.registry().context("Failed to load model descriptors")?;
        Ok(Self {
            config,
            registry: Arc::new(registry),
        })
    }

    /// Client for `dialect`; building it performs no I/O
    pub fn client(&self, dialect: Dialect) -> Result<SharePointClient> {
        let client_config = self.config.client_config(dialect)?;
        SharePointClient::with_reqwest(client_config, self.registry.clone())
            .context("Failed to create HTTP client")
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    if cli.no_color {
        colored::control::set_override(false);
    }

    let context = Context::load(config)?;
    match cli.command {
        Commands::Query(args) => commands::query::handle_query_command(args, &context).await,
        Commands::SetField(args) => commands::set_field::handle_set_field_command(args, &context).await,
        Commands::Describe(args) => commands::describe::handle_describe_command(args, &context),
    }
}
