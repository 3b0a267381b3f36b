//! kitbuild library
//!
//! Build orchestration for a web component library: entry discovery,
//! stylesheet preprocessing, bundling with shared chunks, docs mirroring,
//! and a live-reloading development server.

pub mod bundler;
pub mod cli;
pub mod config;
pub mod entries;
pub mod error;
pub mod lifecycle;
pub mod mirror;
pub mod plugins;
pub mod preprocess;
pub mod presteps;
pub mod server;
pub mod utils;
pub mod watch;

pub use bundler::Bundler;
pub use cli::Cli;
pub use config::Config;
