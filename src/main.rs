mod cli;
mod client;
mod commands;
mod config;
mod error;
mod gitlab;
mod jira;
mod output;
mod pipeline;
mod progress;
mod snapshot;
mod transform;
mod types;

use std::error::Error;
use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use config::Config;
use error::Result;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");

        // Show error chain if verbose flag was passed
        if std::env::args().any(|arg| arg == "--verbose" || arg == "-v") {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = std::error::Error::source(cause);
            }
        }

        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise warnings only, or debug output with `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "jira2gitlab=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    output::set_quiet(cli.quiet);

    match cli.command {
        // Commands that don't require config
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "jira2gitlab", &mut io::stdout());
        }
        Commands::Init { force } => {
            let path = Config::config_path(cli.config.as_deref())?;
            commands::init::run(&path, force)?;
        }
        Commands::Migrate(args) => {
            let path = Config::config_path(cli.config.as_deref())?;
            let config = Config::load(&path)?;
            // Progress bars and debug logs share stderr
            let show_progress = !cli.quiet && !cli.verbose;
            commands::migrate::run(&config, args, show_progress).await?;
        }
    }

    Ok(())
}
