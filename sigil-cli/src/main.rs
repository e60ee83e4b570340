//! `sigil` binary entrypoint.

use std::io::Write;

use clap::Parser;
use sigil_cli::commands::{self, Cli};
use sigil_cli::config::SigilConfig;
use sigil_cli::error::CliError;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => tracing::debug!("no .env file found"),
        Err(e) => tracing::warn!("failed to load .env: {e}"),
    }

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        tracing::error!("sigil failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = SigilConfig::load()?;
    let output = commands::run(&cli.command, &config)?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &output)?;
    writeln!(stdout).map_err(CliError::Write)
}
