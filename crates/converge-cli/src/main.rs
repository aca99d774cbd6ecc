//! converge CLI
//!
//! Offline front end for the reconciliation engine: validates plan files,
//! previews diffs against recorded state and inspects the schema registry.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;
use converge_core::logging;

use cli::{Cli, Commands, SchemaAction};
use context::Context;
use error::{CliError, Result};

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("{} reconciliation engine", "converge".green().bold());
        println!();
        println!("Run {} for available commands.", "converge --help".cyan());
        return Ok(());
    };

    let dir = match cli.config {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let ctx = Context::load(&dir)?;

    let filter = if cli.verbose {
        "debug"
    } else {
        ctx.config.logging.filter.as_str()
    };
    logging::init(filter)
        .map_err(|e| CliError::user(format!("failed to initialise logging: {e}")))?;
    tracing::debug!(dir = %dir.display(), "verbose mode enabled");

    execute_command(&ctx, command)
}

fn execute_command(ctx: &Context, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Validate {
            plan,
            remote_version,
            json,
        } => commands::run_validate(ctx, &plan, remote_version, json),
        Commands::Diff {
            plan,
            state,
            remote_version,
            json,
        } => commands::run_diff(ctx, &plan, state.as_deref(), remote_version, json),
        Commands::ImportId {
            resource,
            id,
            delimiter,
            json,
        } => commands::run_import_id(ctx, &resource, &id, delimiter.as_deref(), json),
        Commands::Schema { action } => match action {
            SchemaAction::List { json } => commands::run_schema_list(ctx, json),
            SchemaAction::Show { resource, json } => {
                commands::run_schema_show(ctx, &resource, json)
            }
        },
    }
}
