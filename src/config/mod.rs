//! Configuration handling for kitbuild
//!
//! Reads the optional `kitbuild.toml` next to the project. Every key has a
//! default, so a project following the conventional layout needs no file.

mod schema;

use std::fs;
use std::net::IpAddr;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

pub use schema::*;

/// Name of the configuration file looked up in the project root
pub const CONFIG_FILE: &str = "kitbuild.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    pub entries: EntriesConfig,

    #[serde(default)]
    pub prebuild: PrebuildConfig,

    #[serde(default)]
    pub dev: DevConfig,

    /// Root directory (the directory holding kitbuild.toml)
    #[serde(skip)]
    pub root: PathBuf,
}

impl Config {
    /// Load the configuration for the project rooted at `root`
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let path = root.join(CONFIG_FILE);

        let mut config = if path.is_file() {
            let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            Self::parse(&content, &path)?
        } else {
            debug!("No {} found, using defaults", CONFIG_FILE);
            Config::default()
        };

        config.root = root.to_path_buf();
        config.validate()?;

        Ok(config)
    }

    fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let [start, end] = self.dev.port_range;
        if start > end {
            return Err(ConfigError::Invalid(format!(
                "dev.port_range [{}, {}] is empty",
                start, end
            )));
        }

        if self.entries.dirs.is_empty() {
            return Err(ConfigError::Invalid(
                "entries.dirs must name at least one subtree".to_string(),
            ));
        }

        let mut steps = self.prebuild.production.iter().chain(&self.prebuild.always);
        if steps.any(|step| step.is_empty()) {
            return Err(ConfigError::Invalid(
                "prebuild steps must not be empty commands".to_string(),
            ));
        }

        if self.dev.host.parse::<IpAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "dev.host '{}' is not an IP address",
                self.dev.host
            )));
        }

        Ok(())
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(&self.paths.src)
    }

    pub fn root_entry(&self) -> PathBuf {
        self.root.join(&self.paths.root_entry)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join(&self.paths.out)
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.root.join(&self.paths.docs)
    }

    pub fn docs_dist_dir(&self) -> PathBuf {
        self.root.join(&self.paths.docs_dist)
    }

    /// Host address the dev server binds to (validated on load)
    pub fn dev_host(&self) -> IpAddr {
        self.dev
            .host
            .parse()
            .unwrap_or(IpAddr::from([127, 0, 0, 1]))
    }

    pub fn port_range(&self) -> RangeInclusive<u16> {
        self.dev.port_range[0]..=self.dev.port_range[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.root_entry(), dir.path().join("src/index.ts"));
        assert_eq!(config.out_dir(), dir.path().join("dist"));
        assert_eq!(config.docs_dist_dir(), dir.path().join("docs/dist"));
        assert_eq!(config.port_range(), 4000..=4999);
        assert_eq!(config.entries.dirs, vec!["components", "utilities", "themes"]);
        assert_eq!(config.prebuild.production, vec![vec!["tsc".to_string()]]);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "[paths]\nroot_entry = \"src/library.ts\"\n\n[prebuild]\nalways = []\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.root_entry(), dir.path().join("src/library.ts"));
        assert_eq!(config.paths.out, "dist");
        assert!(config.prebuild.always.is_empty());
        assert_eq!(config.prebuild.production.len(), 1);
    }

    #[test]
    fn test_rejects_empty_port_range() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[dev]\nport_range = [5000, 4000]\n").unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[paths\nsrc = 1").unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
