//! Development mode: serve, watch, rebuild

use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::bundler::BuildHandle;
use crate::config::Config;
use crate::lifecycle::{shutdown_signal, SessionGuard};
use crate::server::{self, DevServer, ReloadSignal, DIST_ROUTE};
use crate::watch::{TreeWatcher, WatchLoop, WatchSubscription};

/// Serve the docs and drive rebuilds until shutdown
pub async fn serve(config: &Config, handle: BuildHandle) -> Result<()> {
    let mut guard = SessionGuard::new(handle);

    let listener = server::bind_in_range(config.dev_host(), config.port_range())?;
    let addr = listener.local_addr().context("Failed to read server address")?;

    let signal = ReloadSignal::new();
    let server = DevServer::new(config.docs_dir(), config.out_dir(), signal.clone());
    let mut server_task = tokio::spawn(server.serve(listener));

    let debounce = Duration::from_millis(config.dev.debounce_ms);
    let source = WatchSubscription::source(&config.entries.test_pattern)?;
    let (_source_watcher, source_rx) = TreeWatcher::spawn(source, &config.src_dir(), debounce)?;
    let (_docs_watcher, docs_rx) = TreeWatcher::spawn(WatchSubscription::docs()?, &config.docs_dir(), debounce)?;

    eprintln!(
        "{} Serving docs at {}",
        "→".blue(),
        format!("http://{}/", addr).cyan().underline()
    );
    eprintln!("  {} Bundle under {}", "•".dimmed(), DIST_ROUTE.cyan());
    eprintln!("  {} Press {} to stop\n", "•".dimmed(), "Ctrl+C".yellow());

    let outcome = match guard.session() {
        Some(session) => {
            let mut watch = WatchLoop::new(session, &signal);
            tokio::select! {
                _ = watch.run(source_rx, docs_rx) => Ok(()),
                _ = shutdown_signal() => {
                    eprintln!("\n{} Shutting down", "→".blue());
                    Ok(())
                }
                joined = &mut server_task => match joined {
                    Ok(result) => result,
                    Err(err) => Err(err).context("Dev server task failed"),
                },
            }
        }
        None => Ok(()),
    };

    server_task.abort();
    guard.release();

    outcome
}
