//! Path and formatting helpers

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Docs-relative file path for a request path
///
/// Empty and `.` segments are skipped and `..` pops a segment, never going
/// above the served directory.
pub fn request_path(uri_path: &str) -> PathBuf {
    uri_path
        .split('/')
        .fold(PathBuf::new(), |mut path, segment| {
            match segment {
                "" | "." => {}
                ".." => {
                    path.pop();
                }
                name => path.push(name),
            }
            path
        })
}

/// Lexically resolve `.` and `..` components without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }

    normalized
}

/// `path` relative to `base` for display, falling back to `path` itself
pub fn display_relative(path: &Path, base: &Path) -> String {
    pathdiff::diff_paths(path, base)
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}

/// Output file size for the build summary
pub fn human_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["B", "kB", "MB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// Build time for status lines: milliseconds below a second
pub fn human_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}
