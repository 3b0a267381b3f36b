//! Error taxonomy for the build orchestrator
//!
//! Every component surfaces its own error type; the CLI layer composes them
//! with `anyhow` and decides whether a failure is fatal.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

/// A stylesheet could not be read or compiled
#[derive(Debug, Error)]
pub enum PreprocessError {
    #[error("failed to read stylesheet {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile stylesheet {path}: {message}")]
    Compile { path: PathBuf, message: String },
}

/// Entry discovery could not scan the source tree
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to scan {dir}")]
    Walk {
        dir: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid entry pattern '{pattern}'")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// The bundler rejected a build
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    #[error("bundler reported errors:\n{diagnostics}")]
    Bundler { diagnostics: String },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build session has already been disposed")]
    Disposed,
}

/// No port in the configured range could be bound
#[derive(Debug, Error)]
#[error("no free port between {start} and {end}")]
pub struct PortExhaustedError {
    pub start: u16,
    pub end: u16,
}

impl PortExhaustedError {
    pub fn new(range: &RangeInclusive<u16>) -> Self {
        Self {
            start: *range.start(),
            end: *range.end(),
        }
    }
}

/// A pre-build command failed
#[derive(Debug, Error)]
pub enum PreStepError {
    #[error("failed to start `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Failed { command: String, status: ExitStatus },
}

/// kitbuild.toml is unreadable or inconsistent
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
