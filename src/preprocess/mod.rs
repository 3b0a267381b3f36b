//! Stylesheet preprocessing
//!
//! The preprocessor is a pure function from Sass source plus include paths to
//! CSS text. It sits behind a trait so the bundler plugins never depend on a
//! particular compiler.

use std::path::Path;

/// Compiles Sass/SCSS source text to CSS
pub trait StylesheetCompiler: Send + Sync {
    /// Compile `source`, resolving `@use`/`@import` against `include_paths`.
    /// The error string is the compiler's own diagnostic, unaltered.
    fn compile(&self, source: &str, include_paths: &[&Path]) -> Result<String, String>;
}

/// In-process Sass compiler backed by `grass`
#[derive(Debug, Default, Clone, Copy)]
pub struct GrassCompiler;

impl StylesheetCompiler for GrassCompiler {
    fn compile(&self, source: &str, include_paths: &[&Path]) -> Result<String, String> {
        let mut options = grass::Options::default();
        for path in include_paths {
            options = options.load_path(*path);
        }

        grass::from_string(source.to_owned(), &options).map_err(|err| err.to_string())
    }
}
