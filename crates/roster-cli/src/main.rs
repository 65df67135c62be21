// Command-line tool for a roster store

use anyhow::Context;
use clap::Parser;
use roster_cli::{commands, Cli};
use roster_sync::{Auth, DirectoryProvider};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.provider_config()?;
    debug!(stores = ?config.stores_dir, keys = ?config.keys_dir, "using directories");

    let provider = DirectoryProvider::from_config(&config)?;
    let mut auth = Auth::new(provider).context("loading store")?;

    commands::run(&mut auth, &cli.command)?;

    if cli.command.is_mutating() {
        auth.commit().context("committing changes")?;
    }
    Ok(())
}
