//! Quire CLI - an encrypted, local-first note store
//!
//! This is the command-line interface for Quire. It is a thin layer over
//! `quire-core`: argument parsing, prompts and output formatting.

mod app;
mod cli;
mod commands;
mod config;
mod errors;
mod helpers;
mod output;
mod ui;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use quire_core::{QuireError, VERSION};

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::errors::{classify, CliError, EXIT_FAILURE};

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(&cli).await {
        if let Some(cli_err) = err.downcast_ref::<CliError>() {
            cli_err.exit()
        }
        if let Some(cli_err) = err.downcast_ref::<QuireError>().and_then(classify) {
            cli_err.exit()
        }
        eprintln!("Error: {:#}", err);
        std::process::exit(EXIT_FAILURE);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUIRE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let ctx = AppContext::new(cli);

    match &cli.command {
        Some(Commands::Init(args)) => commands::init::handle_init(&ctx, args).await,
        Some(Commands::Status(args)) => commands::maintenance::handle_status(&ctx, args).await,
        Some(Commands::Unlock(args)) => commands::maintenance::handle_unlock(&ctx, args).await,
        Some(Commands::New(args)) => commands::notes::handle_new(&ctx, args).await,
        Some(Commands::Edit(args)) => commands::notes::handle_edit(&ctx, args).await,
        Some(Commands::Show(args)) => commands::notes::handle_show(&ctx, args).await,
        Some(Commands::List(args)) => commands::notes::handle_list(&ctx, args).await,
        Some(Commands::Search(args)) => commands::notes::handle_search(&ctx, args).await,
        Some(Commands::Delete(args)) => commands::notes::handle_delete(&ctx, args).await,
        Some(Commands::Export(args)) => commands::backup::handle_export(&ctx, args).await,
        Some(Commands::Import(args)) => commands::backup::handle_import(&ctx, args).await,
        Some(Commands::Maintain) => commands::maintenance::handle_maintain(&ctx).await,
        Some(Commands::Strength(args)) => commands::misc::handle_strength(&ctx, args),
        Some(Commands::Shell(args)) => commands::shell::handle_shell(&ctx, args).await,
        Some(Commands::Completions { shell }) => commands::misc::handle_completions(*shell),
        None => {
            println!("Quire v{}", VERSION);
            println!("\nRun `quire --help` for usage information.");
            Ok(())
        }
    }
}
