// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use commands::StoreOptions;

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let opts = StoreOptions::from(&cli);

    match &cli.command {
        Commands::Show { key } => commands::cmd_show(&opts, key.as_deref()),
        Commands::Set { key, value } => commands::cmd_set(&opts, key, value),
        Commands::Unset { key } => commands::cmd_unset(&opts, key),
        Commands::Add { key, values } => commands::cmd_add(&opts, key, values),
        Commands::Remove { key, values } => commands::cmd_remove(&opts, key, values),
        Commands::Sync => commands::cmd_sync(&opts),
        Commands::ValidFields { key } => commands::cmd_valid_fields(&opts, key.as_deref()),
    }
}
