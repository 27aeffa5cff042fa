pub mod adapters;
pub mod cli;
pub mod commands;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use cli::{Cli, Commands, ConfigCommands};
use commands::settings::load_settings;
use models::Settings;

/// Dispatch a parsed command line
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let explicit = cli.config.as_deref();
    let json = cli.json;

    let load = || -> anyhow::Result<Settings> {
        let mut settings = load_settings(explicit)?;
        if let Some(backend) = cli.backend {
            settings.backend = backend;
        }
        Ok(settings)
    };

    match &cli.command {
        None => commands::lookup::run_interactive(&load()?, json).await?,
        Some(Commands::Search(args)) => commands::search::run_search(args, &load()?, json).await?,
        Some(Commands::Lookup { query, show_abstract }) => {
            commands::lookup::run_lookup(query, *show_abstract, &load()?, json).await?
        }
        Some(Commands::Summarize { file }) => {
            commands::text::run_summarize(file.as_deref(), &load()?, json).await?
        }
        Some(Commands::Clean { file }) => commands::text::run_clean(file.as_deref(), json)?,
        Some(Commands::Tokens { file, max }) => {
            commands::text::run_tokens(file.as_deref(), *max, json)?
        }
        Some(Commands::Config { command }) => {
            // Only `show` needs a readable file; `init --force` repairs a broken one
            let settings = match command {
                ConfigCommands::Show => load()?,
                _ => Settings::default(),
            };
            commands::settings::run_config(command, explicit, &settings, json)?
        }
        Some(Commands::Check) => {
            commands::diagnostics::run_diagnostics(explicit, &load()?, json).await?
        }
    }

    Ok(())
}
