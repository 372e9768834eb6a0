use anyhow::Result;
use clap::Parser;
use std::io;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
use cli::{Cli, Commands};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let loader = commands::loader(&cli, &cli.command.overrides().args);
    let Some(sources) = commands::load(&loader)? else {
        return Ok(ExitCode::FAILURE);
    };
    debug!(sources = sources.len(), "Configuration sources loaded");

    let mut out = io::stdout().lock();
    let ok = match &cli.command {
        Commands::Get {
            name, target, json, ..
        } => commands::get(sources, name, *target, *json, &mut out)?,
        Commands::List { prefix, .. } => commands::list(&sources, prefix.as_deref(), &mut out)?,
        Commands::Explain { name, target, .. } => commands::explain(sources, name, *target, &mut out)?,
        Commands::Sources { .. } => commands::sources(&sources, &mut out)?,
    };
    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Log to stderr; `--log-level` wins over RUST_LOG, which wins over `warn`
fn init_tracing(log_level: Option<&str>) {
    let env_filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| {
            eprintln!("Invalid log level '{}', falling back to 'warn'", level);
            EnvFilter::new("warn")
        }),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .try_init();
}
