//! Command-line interface for kitbuild
//!
//! There is a single command with a single flag: without `--dev` the library
//! is built for production, with it a development build is served and
//! rebuilt on change.

mod build;
mod dev;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::bundler::Mode;
use crate::config::Config;

/// Build the component library, or serve it with live reload
#[derive(Parser, Debug)]
#[command(name = "kitbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Development build, then serve the docs and rebuild on change
    #[arg(long)]
    pub dev: bool,
}

impl Cli {
    pub fn mode(&self) -> Mode {
        Mode::from_dev_flag(self.dev)
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: Config) -> Result<()> {
        print_banner();
        build::execute(config, self.mode()).await
    }
}

/// Print the kitbuild banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "kitbuild".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
