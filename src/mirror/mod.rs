//! Distribution mirroring into the docs site
//!
//! The docs site serves its own copy of the bundle. The copy is cleared on
//! every build, and only refilled for production builds: the dev server
//! serves the live output directory instead.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;
use walkdir::WalkDir;

use crate::bundler::Mode;

/// What the mirror did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    /// Destination cleared and left empty
    Cleared,
    /// Destination replaced with a copy of the output directory
    Copied { files: usize },
}

/// Remove `dir` and everything below it; a missing directory is fine
pub fn clean_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        debug!("Removing {}", dir.display());
        fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))?;
    }
    Ok(())
}

/// Mirror `out` into `dest` according to `mode`
pub fn mirror_distribution(mode: Mode, out: &Path, dest: &Path) -> Result<MirrorOutcome> {
    clean_dir(dest)?;

    if mode.is_development() {
        return Ok(MirrorOutcome::Cleared);
    }

    let files = copy_tree(out, dest)?;
    debug!("Mirrored {} files into {}", files, dest.display());

    Ok(MirrorOutcome::Copied { files })
}

fn copy_tree(from: &Path, to: &Path) -> Result<usize> {
    fs::create_dir_all(to).with_context(|| format!("Failed to create {}", to.display()))?;

    let mut files = 0;
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", from.display()))?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("Failed to copy {} to {}", entry.path().display(), target.display())
            })?;
            files += 1;
        }
    }

    Ok(files)
}
