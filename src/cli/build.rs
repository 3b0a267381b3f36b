//! The build pipeline, shared by both modes

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::bundler::{self, BuildOptions, Mode, OutputFile};
use crate::config::Config;
use crate::entries;
use crate::mirror::{self, MirrorOutcome};
use crate::plugins::PluginChain;
use crate::preprocess::GrassCompiler;
use crate::presteps;
use crate::utils::{display_relative, human_duration, human_size};

use super::dev;

/// Clean, pre-build, bundle, mirror; then serve in development mode
pub async fn execute(config: Config, mode: Mode) -> Result<()> {
    let start = Instant::now();
    eprintln!("{} Building for {}...", "→".blue(), mode);

    let out_dir = config.out_dir();
    mirror::clean_dir(&out_dir).context("Failed to clean the output directory")?;

    if !mode.is_development() {
        presteps::run_all(&config.prebuild.production, &config.root).await?;
    }
    presteps::run_all(&config.prebuild.always, &config.root).await?;

    let entries = entries::resolve(&config).context("Failed to discover entry points")?;
    debug!("Bundling {} entry points", entries.len());

    let plugins = PluginChain::stylesheets(Arc::new(GrassCompiler));
    let entry_count = entries.len();
    let options = BuildOptions::configure(mode, entries, out_dir.clone(), plugins);

    let spinner = spinner("Bundling...");
    let result = bundler::invoke(options, &config.root).await;
    spinner.finish_and_clear();
    let result = result.context("Build failed")?;

    let total: usize = result.output.files.iter().map(|f| f.size).sum();
    for file in &result.output.files {
        debug!("{}", describe(file, &config.root));
    }
    eprintln!(
        "  {} {} entries into {} files ({})",
        "•".dimmed(),
        entry_count,
        result.output.files.len(),
        human_size(total).dimmed()
    );

    match mirror::mirror_distribution(mode, &out_dir, &config.docs_dist_dir())
        .context("Failed to mirror the build into the docs")?
    {
        MirrorOutcome::Copied { files } => eprintln!(
            "  {} Mirrored {} files to {}",
            "•".dimmed(),
            files,
            display_relative(&config.docs_dist_dir(), &config.root).cyan()
        ),
        MirrorOutcome::Cleared => debug!("Docs distribution cleared"),
    }

    eprintln!(
        "\n{} The build has finished! 📦 {}\n",
        "✓".green().bold(),
        human_duration(start.elapsed()).dimmed()
    );

    if let Some(handle) = result.handle {
        dev::serve(&config, handle).await?;
    }

    Ok(())
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// One line of the per-file listing
fn describe(file: &OutputFile, root: &Path) -> String {
    format!("{} {}", display_relative(&file.path, root), human_size(file.size))
}
