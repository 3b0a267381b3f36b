//! Stylesheet plugin chain
//!
//! Each transform pairs a match predicate on import specifiers with a
//! function producing compiled CSS. The bundler asks the chain about every
//! import before resolving it; the first matching transform handles it.

mod sass;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::PreprocessError;
use crate::preprocess::StylesheetCompiler;

pub use sass::{FileTransform, InlineTransform, INLINE_PREFIX};

/// How the bundler should expose a compiled stylesheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StylesheetKind {
    /// CSS text becomes the default export of the import
    Inline,
    /// CSS is emitted alongside the importing entry's bundle
    Sheet,
}

/// A stylesheet compiled by a transform
#[derive(Debug, Clone)]
pub struct CompiledStylesheet {
    /// Resolved path of the stylesheet source
    pub path: PathBuf,
    pub kind: StylesheetKind,
    pub css: String,
}

/// A `{ match, transform }` pair consulted for every import
#[async_trait]
pub trait StylesheetTransform: Send + Sync {
    /// Plugin name for logging and debugging
    fn name(&self) -> &str;

    /// Whether this transform handles `specifier`
    fn matches(&self, specifier: &str) -> bool;

    /// Compile the stylesheet `specifier` refers to, relative to `importer`
    async fn transform(
        &self,
        specifier: &str,
        importer: &Path,
    ) -> Result<CompiledStylesheet, PreprocessError>;
}

/// Ordered list of stylesheet transforms
#[derive(Clone, Default)]
pub struct PluginChain {
    transforms: Vec<Arc<dyn StylesheetTransform>>,
}

impl PluginChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard chain: inline `sass:` imports first, then stylesheet files
    pub fn stylesheets(compiler: Arc<dyn StylesheetCompiler>) -> Self {
        let mut chain = Self::new();
        chain.register(Arc::new(InlineTransform::new(compiler.clone())));
        chain.register(Arc::new(FileTransform::new(compiler)));
        chain
    }

    pub fn register(&mut self, transform: Arc<dyn StylesheetTransform>) {
        self.transforms.push(transform);
    }

    pub fn names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Run the first transform matching `specifier`, if any
    ///
    /// Preprocessor errors propagate untouched so the build fails.
    pub async fn run(
        &self,
        specifier: &str,
        importer: &Path,
    ) -> Result<Option<CompiledStylesheet>, PreprocessError> {
        match self.transforms.iter().find(|t| t.matches(specifier)) {
            Some(transform) => transform.transform(specifier, importer).await.map(Some),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
