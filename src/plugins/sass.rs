//! Sass transforms for inline and file-based stylesheet imports

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{CompiledStylesheet, StylesheetKind, StylesheetTransform};
use crate::error::PreprocessError;
use crate::preprocess::StylesheetCompiler;
use crate::utils::normalize_path;

/// Marks an import whose compiled CSS is inlined as a string export
pub const INLINE_PREFIX: &str = "sass:";

const STYLESHEET_EXTENSIONS: &[&str] = &["scss", "sass", "css"];

/// Handles `import styles from 'sass:./x.scss'`
pub struct InlineTransform {
    compiler: Arc<dyn StylesheetCompiler>,
}

impl InlineTransform {
    pub fn new(compiler: Arc<dyn StylesheetCompiler>) -> Self {
        Self { compiler }
    }
}

#[async_trait]
impl StylesheetTransform for InlineTransform {
    fn name(&self) -> &str {
        "sass-inline"
    }

    fn matches(&self, specifier: &str) -> bool {
        specifier.starts_with(INLINE_PREFIX)
    }

    async fn transform(
        &self,
        specifier: &str,
        importer: &Path,
    ) -> Result<CompiledStylesheet, PreprocessError> {
        let target = specifier.strip_prefix(INLINE_PREFIX).unwrap_or(specifier);
        let path = resolve(target, importer);
        let source = read(&path).await?;

        // The stylesheet's own directory joins the include paths
        let include = path.parent().unwrap_or(Path::new("."));
        let css = compile(self.compiler.as_ref(), &source, &path, &[include])?;

        Ok(CompiledStylesheet {
            path,
            kind: StylesheetKind::Inline,
            css,
        })
    }
}

/// Handles every other stylesheet import, e.g. `import './theme.scss'`
pub struct FileTransform {
    compiler: Arc<dyn StylesheetCompiler>,
}

impl FileTransform {
    pub fn new(compiler: Arc<dyn StylesheetCompiler>) -> Self {
        Self { compiler }
    }
}

#[async_trait]
impl StylesheetTransform for FileTransform {
    fn name(&self) -> &str {
        "sass"
    }

    fn matches(&self, specifier: &str) -> bool {
        Path::new(specifier)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| STYLESHEET_EXTENSIONS.contains(&ext))
            .unwrap_or(false)
    }

    async fn transform(
        &self,
        specifier: &str,
        importer: &Path,
    ) -> Result<CompiledStylesheet, PreprocessError> {
        let path = resolve(specifier, importer);
        let source = read(&path).await?;

        // Default resolution: imports are relative to the stylesheet itself
        let include = path.parent().unwrap_or(Path::new("."));
        let css = compile(self.compiler.as_ref(), &source, &path, &[include])?;

        Ok(CompiledStylesheet {
            path,
            kind: StylesheetKind::Sheet,
            css,
        })
    }
}

fn resolve(specifier: &str, importer: &Path) -> PathBuf {
    normalize_path(&importer.parent().unwrap_or(Path::new(".")).join(specifier))
}

async fn read(path: &Path) -> Result<String, PreprocessError> {
    debug!("Preprocessing stylesheet {}", path.display());

    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PreprocessError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn compile(
    compiler: &dyn StylesheetCompiler,
    source: &str,
    path: &Path,
    include_paths: &[&Path],
) -> Result<String, PreprocessError> {
    compiler
        .compile(source, include_paths)
        .map_err(|message| PreprocessError::Compile {
            path: path.to_path_buf(),
            message,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::GrassCompiler;

    #[test]
    fn test_matches() {
        let inline = InlineTransform::new(Arc::new(GrassCompiler));
        let file = FileTransform::new(Arc::new(GrassCompiler));

        assert!(inline.matches("sass:./button.styles.scss"));
        assert!(!inline.matches("./button.styles.scss"));

        assert!(file.matches("./theme.scss"));
        assert!(file.matches("../base.css"));
        assert!(!file.matches("./button"));
        assert!(!file.matches("lit"));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let inline = InlineTransform::new(Arc::new(GrassCompiler));

        let err = inline
            .transform("sass:./nope.scss", &dir.path().join("a.ts"))
            .await
            .unwrap_err();

        assert!(matches!(err, PreprocessError::Read { .. }));
    }
}
