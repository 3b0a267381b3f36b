//! Entry point discovery
//!
//! The entry set is the root entry followed by every module found under the
//! configured subtrees, minus test modules.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::DiscoveryError;

/// Ordered, duplicate-free list of bundle entry points
///
/// Always holds at least the root entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySet {
    paths: Vec<PathBuf>,
}

impl EntrySet {
    pub fn new(root_entry: PathBuf) -> Self {
        Self {
            paths: vec![root_entry],
        }
    }

    /// Root entry followed by `others`, dropping duplicates
    pub fn from_paths(root_entry: PathBuf, others: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut entries = Self::new(root_entry);
        let mut seen: HashSet<PathBuf> = entries.iter().map(Path::to_path_buf).collect();

        for path in others {
            if seen.insert(path.clone()) {
                entries.paths.push(path);
            }
        }

        entries
    }

    pub fn root(&self) -> &Path {
        &self.paths[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Matches test modules by file name, e.g. `*.test.*`
#[derive(Debug, Clone)]
pub struct TestFilter {
    matcher: GlobMatcher,
}

impl TestFilter {
    pub fn new(pattern: &str) -> Result<Self, DiscoveryError> {
        Ok(Self {
            matcher: compile(pattern)?,
        })
    }

    pub fn is_test(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.matcher.is_match(Path::new(name)))
            .unwrap_or(false)
    }
}

/// Resolve the entry set for a project
pub fn resolve(config: &Config) -> Result<EntrySet, DiscoveryError> {
    let pattern = compile(&config.entries.pattern)?;
    let tests = TestFilter::new(&config.entries.test_pattern)?;
    let src = config.src_dir();

    let mut discovered = Vec::new();
    for dir in &config.entries.dirs {
        discovered.extend(scan(&src.join(dir), &pattern, &tests)?);
    }

    let entries = EntrySet::from_paths(config.root_entry(), discovered);

    debug!("Resolved {} entry points", entries.len());

    Ok(entries)
}

/// Collect matching source modules below `dir`, sorted by path
fn scan(dir: &Path, pattern: &GlobMatcher, tests: &TestFilter) -> Result<Vec<PathBuf>, DiscoveryError> {
    // A missing subtree contributes nothing
    if !dir.is_dir() {
        debug!("Skipping missing entry directory {}", dir.display());
        return Ok(Vec::new());
    }

    let mut found = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            dir: dir.to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(dir).unwrap_or(path);

        if pattern.is_match(relative) && !tests.is_test(path) {
            found.push(path.to_path_buf());
        }
    }

    Ok(found)
}

fn compile(pattern: &str) -> Result<GlobMatcher, DiscoveryError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| DiscoveryError::Pattern {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn touch(root: &Path, path: &str) {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, "export {};\n").unwrap();
    }

    fn project(files: &[&str]) -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        for file in files {
            touch(dir.path(), file);
        }
        let config = Config::load(dir.path()).unwrap();
        (dir, config)
    }

    fn relative(entries: &EntrySet, root: &Path) -> Vec<String> {
        entries
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().display().to_string())
            .collect()
    }

    #[test]
    fn test_excludes_test_modules() {
        let (dir, config) = project(&[
            "src/index.ts",
            "src/components/button.ts",
            "src/components/button.test.ts",
            "src/utilities/animate.ts",
        ]);

        let entries = resolve(&config).unwrap();

        assert_eq!(
            relative(&entries, dir.path()),
            vec!["src/index.ts", "src/components/button.ts", "src/utilities/animate.ts"]
        );
    }

    #[test]
    fn test_recursive_and_ordered() {
        let (dir, config) = project(&[
            "src/themes/light.ts",
            "src/components/tab/tab.ts",
            "src/components/alert/alert.ts",
            "src/components/alert/alert.styles.scss",
            "src/components/alert/alert.test.ts",
        ]);

        let entries = resolve(&config).unwrap();

        assert_eq!(
            relative(&entries, dir.path()),
            vec![
                "src/index.ts",
                "src/components/alert/alert.ts",
                "src/components/tab/tab.ts",
                "src/themes/light.ts",
            ]
        );
    }

    #[test]
    fn test_root_entry_is_never_duplicated() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "src/components/index.ts");
        fs::write(
            dir.path().join("kitbuild.toml"),
            "[paths]\nroot_entry = \"src/components/index.ts\"\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();

        let entries = resolve(&config).unwrap();

        assert_eq!(relative(&entries, dir.path()), vec!["src/components/index.ts"]);
        assert_eq!(entries.root(), config.root_entry().as_path());
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let (dir, config) = project(&["src/components/Button.TS", "src/components/card.ts"]);

        let entries = resolve(&config).unwrap();

        assert_eq!(
            relative(&entries, dir.path()),
            vec!["src/index.ts", "src/components/card.ts"]
        );
    }

    #[test]
    fn test_never_contains_test_modules() {
        let (_dir, config) = project(&[
            "src/components/a.test.ts",
            "src/components/nested/b.test.ts",
            "src/utilities/c.ts",
            "src/utilities/c.test.ts",
            "src/themes/d.test.ts",
        ]);

        let entries = resolve(&config).unwrap();
        let filter = TestFilter::new("*.test.*").unwrap();

        assert!(entries.iter().all(|p| !filter.is_test(p)));
        assert_eq!(entries.len(), 2);
    }
}
