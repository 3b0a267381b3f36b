//! Configuration schema definitions

use serde::{Deserialize, Serialize};

/// Source and output locations, relative to the project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Source tree (watched in dev mode)
    #[serde(default = "default_src")]
    pub src: String,

    /// The entry that bundles the whole library
    #[serde(default = "default_root_entry")]
    pub root_entry: String,

    /// Bundle output directory
    #[serde(default = "default_out")]
    pub out: String,

    /// Documentation site, served by the dev server
    #[serde(default = "default_docs")]
    pub docs: String,

    /// Where production builds are mirrored inside the docs site
    #[serde(default = "default_docs_dist")]
    pub docs_dist: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: default_src(),
            root_entry: default_root_entry(),
            out: default_out(),
            docs: default_docs(),
            docs_dist: default_docs_dist(),
        }
    }
}

fn default_src() -> String {
    "src".to_string()
}

fn default_root_entry() -> String {
    "src/index.ts".to_string()
}

fn default_out() -> String {
    "dist".to_string()
}

fn default_docs() -> String {
    "docs".to_string()
}

fn default_docs_dist() -> String {
    "docs/dist".to_string()
}

/// Entry point discovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntriesConfig {
    /// Subtrees of `paths.src` whose modules become entry points
    #[serde(default = "default_entry_dirs")]
    pub dirs: Vec<String>,

    /// Glob selecting entry modules inside each subtree
    #[serde(default = "default_entry_pattern")]
    pub pattern: String,

    /// File name glob of test modules, never bundled or rebuilt for
    #[serde(default = "default_test_pattern")]
    pub test_pattern: String,
}

impl Default for EntriesConfig {
    fn default() -> Self {
        Self {
            dirs: default_entry_dirs(),
            pattern: default_entry_pattern(),
            test_pattern: default_test_pattern(),
        }
    }
}

fn default_entry_dirs() -> Vec<String> {
    vec![
        "components".to_string(),
        "utilities".to_string(),
        "themes".to_string(),
    ]
}

fn default_entry_pattern() -> String {
    "**/*.ts".to_string()
}

fn default_test_pattern() -> String {
    "*.test.*".to_string()
}

/// Commands run to completion before bundling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrebuildConfig {
    /// Production builds only (type declarations)
    #[serde(default = "default_production_steps")]
    pub production: Vec<Vec<String>>,

    /// Every build (metadata and icons)
    #[serde(default = "default_always_steps")]
    pub always: Vec<Vec<String>>,
}

impl Default for PrebuildConfig {
    fn default() -> Self {
        Self {
            production: default_production_steps(),
            always: default_always_steps(),
        }
    }
}

fn default_production_steps() -> Vec<Vec<String>> {
    vec![vec!["tsc".to_string()]]
}

fn default_always_steps() -> Vec<Vec<String>> {
    vec![
        vec!["node".to_string(), "scripts/make-metadata.js".to_string()],
        vec!["node".to_string(), "scripts/make-icons.js".to_string()],
    ]
}

/// Development server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Inclusive range the server port is picked from
    #[serde(default = "default_port_range")]
    pub port_range: [u16; 2],

    /// Quiet period before a burst of file events is delivered
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port_range: default_port_range(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port_range() -> [u16; 2] {
    [4000, 4999]
}

fn default_debounce_ms() -> u64 {
    100
}
