//! snix-compose - snippet composition from the terminal
//!
//! Keeps a persisted, ordered collection of code snippets, fills in their
//! placeholders and prints the generated file.

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use snix_compose::Config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = cli::Cli::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .map_err(|e| eyre!("{:#}", e))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    cli::execute(args, config, cancel).await
}
