//! Build configuration handed to the bundler

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::entries::EntrySet;
use crate::plugins::PluginChain;

/// Compile-time key replaced in every script module
pub const NODE_ENV_KEY: &str = "process.env.NODE_ENV";

/// Shared chunks land in `chunks/` and are named by content hash
pub const CHUNK_NAMES: &str = "chunks/[name].[hash]";

/// Which pipeline the orchestrator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Production,
    Development,
}

impl Mode {
    pub fn from_dev_flag(dev: bool) -> Self {
        if dev {
            Mode::Development
        } else {
            Mode::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Mode::Development
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Production => f.write_str("production"),
            Mode::Development => f.write_str("development"),
        }
    }
}

/// Output module format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Esm,
}

/// Language level of emitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Es2017,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Es2017 => f.write_str("es2017"),
        }
    }
}

/// Everything the bundler needs for one build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub format: Format,
    pub target: Target,
    pub entry_points: EntrySet,
    pub outdir: PathBuf,
    /// Template for shared chunk paths, relative to `outdir`
    pub chunk_names: String,
    /// Keep a session for rebuilds (development only)
    pub incremental: bool,
    pub define: BTreeMap<String, String>,
    pub plugins: PluginChain,
}

impl BuildOptions {
    /// Build options for `mode`
    ///
    /// `process.env.NODE_ENV` is always `"production"`, in every mode: the
    /// positioning library bundled with the components checks it at runtime
    /// and must see a production value.
    pub fn configure(mode: Mode, entry_points: EntrySet, outdir: PathBuf, plugins: PluginChain) -> Self {
        let mut define = BTreeMap::new();
        define.insert(NODE_ENV_KEY.to_string(), "\"production\"".to_string());

        Self {
            format: Format::Esm,
            target: Target::Es2017,
            entry_points,
            outdir,
            chunk_names: CHUNK_NAMES.to_string(),
            incremental: mode.is_development(),
            define,
            plugins,
        }
    }
}
