//! kitbuild - build orchestrator for a web component library
//!
//! `kitbuild` bundles the library for production and mirrors it into the
//! docs site. `kitbuild --dev` builds once, then serves the docs with the
//! live bundle and rebuilds and reloads on change.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kitbuild_lib::{Cli, Config};

/// Initialize the logging/tracing system
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("kitbuild=info,kitbuild_lib=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let root = std::env::current_dir().context("Failed to read the working directory")?;
    let config = Config::load(&root)?;

    cli.execute(config).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing();

    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", "✗".red().bold(), err);
        std::process::exit(1);
    }
}
