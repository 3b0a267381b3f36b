//! Watch loop for development mode
//!
//! Two trees are watched. A source change rebuilds through the incremental
//! build session and reloads clients only if the rebuild succeeded. A docs
//! change reloads clients straight away. What happens is decided by the tree
//! an event came from, nothing else.

mod watcher;

use std::path::{Path, PathBuf};

use colored::Colorize;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};

use crate::bundler::IncrementalBuild;
use crate::error::DiscoveryError;
use crate::server::ReloadSignal;
use crate::utils::human_duration;

pub use watcher::TreeWatcher;

/// Which of the two watched trees an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchedTree {
    Source,
    Docs,
}

/// A debounced change in one of the watched trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub tree: WatchedTree,
    pub path: PathBuf,
}

/// How the loop answers a change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    RebuildThenReload,
    ReloadOnly,
}

impl Reaction {
    pub fn for_tree(tree: WatchedTree) -> Self {
        match tree {
            WatchedTree::Source => Reaction::RebuildThenReload,
            WatchedTree::Docs => Reaction::ReloadOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Rebuilding,
    Reloading,
}

/// Result of handling one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Clients were told to reload
    Reloaded { clients: usize },
    /// The rebuild failed; nobody was reloaded
    RebuildFailed,
}

/// A glob filter paired with the tree it reacts for
#[derive(Debug, Clone)]
pub struct WatchSubscription {
    tree: WatchedTree,
    include: GlobSet,
    exclude: GlobSet,
}

impl WatchSubscription {
    /// Every file under the source tree except test modules
    pub fn source(test_pattern: &str) -> Result<Self, DiscoveryError> {
        Ok(Self {
            tree: WatchedTree::Source,
            include: glob_set(&["**/*"])?,
            exclude: glob_set(&[&format!("**/{}", test_pattern)])?,
        })
    }

    /// Every file under the docs tree
    pub fn docs() -> Result<Self, DiscoveryError> {
        Ok(Self {
            tree: WatchedTree::Docs,
            include: glob_set(&["**/*"])?,
            exclude: GlobSet::empty(),
        })
    }

    pub fn tree(&self) -> WatchedTree {
        self.tree
    }

    pub fn reaction(&self) -> Reaction {
        Reaction::for_tree(self.tree)
    }

    /// Whether a path relative to the tree root should trigger the reaction
    pub fn matches(&self, relative: &Path) -> bool {
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }
}

fn glob_set(patterns: &[&str]) -> Result<GlobSet, DiscoveryError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        builder.add(glob);
    }

    builder.build().map_err(|source| DiscoveryError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Drives rebuilds and reloads from the two change streams
pub struct WatchLoop<'a, B: IncrementalBuild + ?Sized> {
    build: &'a B,
    signal: &'a ReloadSignal,
    state: WatchState,
}

impl<'a, B: IncrementalBuild + ?Sized> WatchLoop<'a, B> {
    pub fn new(build: &'a B, signal: &'a ReloadSignal) -> Self {
        Self {
            build,
            signal,
            state: WatchState::Idle,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Consume both streams until they close
    ///
    /// Events are handled one at a time, so a source rebuild is never
    /// started while another is in flight.
    pub async fn run(
        &mut self,
        mut source: UnboundedReceiver<ChangeEvent>,
        mut docs: UnboundedReceiver<ChangeEvent>,
    ) {
        loop {
            let event = tokio::select! {
                Some(event) = source.recv() => event,
                Some(event) = docs.recv() => event,
                else => break,
            };
            self.handle(event).await;
        }

        debug!("Watch streams closed");
    }

    /// Handle a single change event
    pub async fn handle(&mut self, event: ChangeEvent) -> WatchOutcome {
        let reason = event.path.display().to_string();
        eprintln!("{}", change_line(&event));

        let outcome = match Reaction::for_tree(event.tree) {
            Reaction::RebuildThenReload => {
                self.state = WatchState::Rebuilding;

                match self.build.rebuild().await {
                    Ok(output) => {
                        eprintln!(
                            "  {} Rebuilt {} files in {}",
                            "✓".green(),
                            output.files.len(),
                            human_duration(output.duration)
                        );
                        self.reload(&reason)
                    }
                    Err(err) => {
                        eprintln!("  {} Rebuild failed: {:#}", "✗".red(), anyhow::Error::new(err));
                        WatchOutcome::RebuildFailed
                    }
                }
            }
            Reaction::ReloadOnly => self.reload(&reason),
        };

        self.state = WatchState::Idle;
        outcome
    }

    fn reload(&mut self, reason: &str) -> WatchOutcome {
        self.state = WatchState::Reloading;
        let clients = self.signal.reload(reason);
        if clients == 0 {
            warn!("No clients connected to reload");
        }
        WatchOutcome::Reloaded { clients }
    }
}

/// Status line printed for every change the loop picks up
fn change_line(event: &ChangeEvent) -> String {
    let marker = match event.tree {
        WatchedTree::Source => "↻".yellow(),
        WatchedTree::Docs => "↻".cyan(),
    };
    format!("  {} {}", marker, event.path.display().to_string().dimmed())
}
