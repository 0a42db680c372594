//! Farm Notes CLI - field notes from the command line
//!
//! Works against the local cache when the backend is unreachable and pushes
//! queued changes on the next run that finds it online.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;

use clap::{CommandFactory, Parser};

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::run_auth;
use crate::commands::common::CliContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::edit::run_edit;
use crate::commands::list::{run_list, ListOptions};
use crate::commands::status::run_status;
use crate::commands::sync::run_sync;
use crate::commands::toggle::run_toggle;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "farmnotes=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let context = || CliContext::resolve(cli.cache_path.clone(), cli.profile.as_deref(), cli.offline);

    match command {
        Commands::Add {
            title,
            content,
            date,
            completed,
        } => run_add(&context()?, &title, content, date, completed).await,
        Commands::List {
            status,
            search,
            from,
            to,
            limit,
            json,
        } => {
            let options = ListOptions {
                status,
                search,
                from,
                to,
                limit,
                as_json: json,
            };
            run_list(&context()?, &options).await
        }
        Commands::Edit {
            id,
            title,
            content,
            date,
        } => run_edit(&context()?, &id, title, content, date).await,
        Commands::Toggle { id } => run_toggle(&context()?, &id).await,
        Commands::Delete { id } => run_delete(&context()?, &id).await,
        Commands::Sync => run_sync(&context()?).await,
        Commands::Status { json } => run_status(&context()?, json).await,
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Config { command } => {
            run_config(command, cli.profile.as_deref(), cli.cache_path.as_deref())
        }
        Commands::Auth { command } => run_auth(command, &context()?).await,
    }
}
