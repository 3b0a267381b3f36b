//! Debounced file watchers feeding the watch loop

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, Debouncer};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error};

use super::{ChangeEvent, WatchSubscription};

/// A recursive watcher over one tree; dropping it stops the events
pub struct TreeWatcher {
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl TreeWatcher {
    /// Watch `root`, sending one event per debounced batch that matches
    pub fn spawn(
        subscription: WatchSubscription,
        root: &Path,
        debounce: Duration,
    ) -> Result<(Self, UnboundedReceiver<ChangeEvent>)> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Cannot watch {}", root.display()))?;
        let (tx, rx) = mpsc::unbounded_channel();
        let tree_root = root.clone();

        let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| match result {
            Ok(events) => {
                // One save often touches several files; it is still one change
                let changed = events.into_iter().map(|e| e.path).find(|path| {
                    let relative = path.strip_prefix(&tree_root).unwrap_or(path);
                    subscription.matches(relative)
                });

                if let Some(path) = changed {
                    let relative = path.strip_prefix(&tree_root).unwrap_or(&path).to_path_buf();
                    let _ = tx.send(ChangeEvent {
                        tree: subscription.tree(),
                        path: relative,
                    });
                }
            }
            Err(err) => error!("Watch error: {:?}", err),
        })
        .context("Failed to create file watcher")?;

        debouncer
            .watcher()
            .watch(&root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;

        debug!("Watching {}", root.display());

        Ok((
            Self {
                _debouncer: debouncer,
            },
            rx,
        ))
    }
}
