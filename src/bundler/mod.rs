//! Build invoker
//!
//! Translates [`BuildOptions`] into a rolldown build, writes the generated
//! entries, shared chunks and stylesheets under the output directory, and
//! keeps development sessions alive behind a [`BuildHandle`] for rebuilds.

mod options;
mod plugin;
mod session;

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use itertools::Either;
use rolldown::{BundlerBuilder, BundlerOptions, InputItem, OutputFormat, Platform, ResolveOptions};
use rolldown_common::{BundlerTransformOptions, DecoratorOptions};
use rolldown_plugin::__inner::SharedPluginable;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::BuildError;
use plugin::{StyleRegistry, StylesheetPlugin};

pub use options::{BuildOptions, Format, Mode, Target, CHUNK_NAMES, NODE_ENV_KEY};
pub use session::{BuildHandle, IncrementalBuild};

/// Extensions tried for extensionless script imports
const SCRIPT_EXTENSIONS: &[&str] = &[".ts", ".js", ".mjs", ".json"];

/// Information about a written output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub size: usize,
}

/// Summary of one completed build
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Written files, sorted by path
    pub files: Vec<OutputFile>,
    pub duration: Duration,
}

/// What [`invoke`] hands back
#[derive(Debug)]
pub struct BuildResult {
    pub output: BuildOutput,
    /// Present only for incremental builds
    pub handle: Option<BuildHandle>,
}

/// Run one build; incremental options also return a handle for rebuilds
pub async fn invoke(options: BuildOptions, root: &Path) -> Result<BuildResult, BuildError> {
    let incremental = options.incremental;
    let bundler = Arc::new(Bundler::new(options, root));
    let output = bundler.build().await?;

    let handle = if incremental {
        Some(BuildHandle::new(bundler))
    } else {
        None
    };

    Ok(BuildResult { output, handle })
}

/// A build session over one set of options
pub struct Bundler {
    options: BuildOptions,
    root: PathBuf,
    styles: Arc<StyleRegistry>,
    /// Files of the previous build; held for the whole of a build, so builds
    /// never overlap
    written: Mutex<BTreeSet<PathBuf>>,
    disposed: AtomicBool,
}

impl Bundler {
    pub fn new(options: BuildOptions, root: &Path) -> Self {
        Self {
            options,
            root: root.to_path_buf(),
            styles: Arc::new(StyleRegistry::default()),
            written: Mutex::new(BTreeSet::new()),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Bundle every entry and write the result
    pub async fn build(&self) -> Result<BuildOutput, BuildError> {
        if self.is_disposed() {
            return Err(BuildError::Disposed);
        }

        let mut written = self.written.lock().await;
        if self.is_disposed() {
            return Err(BuildError::Disposed);
        }

        let start = Instant::now();
        self.styles.clear().await;

        let plugins: Vec<SharedPluginable> = vec![Arc::new(StylesheetPlugin::new(
            self.options.plugins.clone(),
            Arc::clone(&self.styles),
        ))];

        debug!("Bundling {} entry points", self.options.entry_points.len());
        let mut bundler = match BundlerBuilder::default()
            .with_options(self.rolldown_options())
            .with_plugins(plugins)
            .build()
        {
            Ok(bundler) => bundler,
            Err(errors) => return Err(self.failure(format!("{:?}", errors)).await),
        };

        let bundle = match bundler.generate().await {
            Ok(bundle) => bundle,
            Err(errors) => return Err(self.failure(format!("{:?}", errors)).await),
        };

        let mut files = Vec::with_capacity(bundle.assets.len());
        let mut current = BTreeSet::new();

        for asset in bundle.assets.iter() {
            let path = self.options.outdir.join(asset.filename());
            let contents = asset.content_as_bytes();
            write_file(&path, contents).await?;

            debug!("Wrote {}", path.display());
            current.insert(path.clone());
            files.push(OutputFile {
                path,
                size: contents.len(),
            });
        }
        files.sort_by(|a, b| a.path.cmp(&b.path));

        remove_stale(&written, &current).await?;
        *written = current;

        let duration = start.elapsed();
        info!("Bundled {} entries into {} files", self.options.entry_points.len(), files.len());

        Ok(BuildOutput { files, duration })
    }

    /// Refuse further builds; later calls do nothing
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        // An in-flight build keeps the lock and forgets the record itself
        if let Ok(mut written) = self.written.try_lock() {
            written.clear();
        }
        debug!("Build session disposed");
    }

    /// A preprocessor failure outranks the bundler's report of it
    async fn failure(&self, diagnostics: String) -> BuildError {
        match self.styles.take_failure().await {
            Some(err) => BuildError::Preprocess(err),
            None => BuildError::Bundler { diagnostics },
        }
    }

    fn rolldown_options(&self) -> BundlerOptions {
        let entries: Vec<&Path> = self.options.entry_points.iter().collect();
        let base = outbase(&entries);

        let input = entries
            .iter()
            .map(|entry| InputItem {
                name: Some(entry_name(entry, &base)),
                import: entry.display().to_string(),
            })
            .collect();

        let format = match self.options.format {
            Format::Esm => OutputFormat::Esm,
        };

        BundlerOptions {
            input: Some(input),
            cwd: Some(self.root.clone()),
            format: Some(format),
            platform: Some(Platform::Browser),
            chunk_filenames: Some(format!("{}.js", self.options.chunk_names).into()),
            define: Some(
                self.options
                    .define
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect(),
            ),
            resolve: Some(ResolveOptions {
                extensions: Some(SCRIPT_EXTENSIONS.iter().map(|ext| ext.to_string()).collect()),
                // Sources import `./x.js` for a sibling `x.ts`
                extension_alias: Some(vec![(
                    ".js".to_string(),
                    vec![".ts".to_string(), ".js".to_string()],
                )]),
                ..Default::default()
            }),
            transform: Some(BundlerTransformOptions {
                target: Some(Either::Left(self.options.target.to_string())),
                decorator: Some(DecoratorOptions {
                    legacy: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Lowest common ancestor of the entries' directories
fn outbase(entries: &[&Path]) -> PathBuf {
    let mut dirs = entries.iter().filter_map(|path| path.parent());
    let Some(first) = dirs.next() else {
        return PathBuf::new();
    };

    let mut base: Vec<Component> = first.components().collect();
    for dir in dirs {
        let common = base
            .iter()
            .zip(dir.components())
            .take_while(|(a, b)| **a == *b)
            .count();
        base.truncate(common);
    }

    base.iter().collect()
}

/// Output name of an entry: its path below `base`, without extension
fn entry_name(entry: &Path, base: &Path) -> String {
    entry
        .strip_prefix(base)
        .unwrap_or(entry)
        .with_extension("")
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| BuildError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
    }

    tokio::fs::write(path, contents)
        .await
        .map_err(|source| BuildError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Delete files the previous build wrote that this one did not
async fn remove_stale(previous: &BTreeSet<PathBuf>, current: &BTreeSet<PathBuf>) -> Result<(), BuildError> {
    for stale in previous.difference(current) {
        debug!("Removing stale output {}", stale.display());
        if let Err(err) = tokio::fs::remove_file(stale).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                return Err(BuildError::Write {
                    path: stale.clone(),
                    source: err,
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::EntrySet;
    use crate::plugins::PluginChain;
    use crate::preprocess::GrassCompiler;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        write(
            root,
            "src/index.ts",
            "export { default as KbButton } from './components/button/button.js';\n\
             export { KbIcon } from './components/icon/icon.js';\n",
        );
        write(
            root,
            "src/components/button/button.ts",
            "import styles from 'sass:./button.scss';\n\
             import { watch } from '../../internal/watch.js';\n\
             \n\
             type Size = 'small' | 'medium';\n\
             \n\
             export default class KbButton extends HTMLElement {\n\
               static get styles(): string { return styles; }\n\
               get mode(): string { return process.env.NODE_ENV; }\n\
               get hint(): string { return 'set process.env.NODE_ENV first'; }\n\
               sizes(): Map<string, Size> { return new Map<string, Size>([['default', 'medium']]); }\n\
               press(): void { watch(this.localName as string); }\n\
             }\n",
        );
        write(root, "src/components/button/button.scss", "$c: red;\n.button { color: $c; }\n");
        write(
            root,
            "src/components/icon/icon.ts",
            "import { watch } from '../../internal/watch.js';\n\
             \n\
             export function KbIcon(name: string): string {\n\
               const usage = `import './not-real.js';`;\n\
               return watch(name) + usage;\n\
             }\n",
        );
        write(
            root,
            "src/internal/watch.ts",
            "/**\n * import './legacy-polyfill.js';\n */\n\
             export function watch(name: string): string { return name; }\n",
        );
        dir
    }

    fn options(root: &Path, mode: Mode) -> BuildOptions {
        let entries = EntrySet::from_paths(
            root.join("src/index.ts"),
            [
                root.join("src/components/button/button.ts"),
                root.join("src/components/icon/icon.ts"),
            ],
        );

        BuildOptions::configure(
            mode,
            entries,
            root.join("dist"),
            PluginChain::stylesheets(Arc::new(GrassCompiler)),
        )
    }

    fn chunks(root: &Path) -> Vec<PathBuf> {
        let dir = root.join("dist/chunks");
        if !dir.is_dir() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = fs::read_dir(dir).unwrap().map(|e| e.unwrap().path()).collect();
        files.sort();
        files
    }

    fn all_output(output: &BuildOutput) -> String {
        output
            .files
            .iter()
            .map(|file| fs::read_to_string(&file.path).unwrap())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_outbase_is_common_ancestor() {
        let entries = [
            Path::new("/p/src/index.ts"),
            Path::new("/p/src/components/button/button.ts"),
            Path::new("/p/src/utilities/animate.ts"),
        ];
        assert_eq!(outbase(&entries), PathBuf::from("/p/src"));
        assert_eq!(outbase(&[]), PathBuf::new());
    }

    #[test]
    fn test_entry_names_mirror_source_layout() {
        let base = Path::new("/p/src");
        assert_eq!(entry_name(Path::new("/p/src/index.ts"), base), "index");
        assert_eq!(
            entry_name(Path::new("/p/src/components/button/button.ts"), base),
            "components/button/button"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_build_writes_entries_and_shared_chunks() {
        let dir = project();
        let root = dir.path();

        let result = invoke(options(root, Mode::Production), root).await.unwrap();
        assert!(result.handle.is_none());

        assert!(root.join("dist/index.js").is_file());
        assert!(root.join("dist/components/button/button.js").is_file());
        assert!(root.join("dist/components/icon/icon.js").is_file());
        assert_eq!(chunks(root).len(), 1);

        let output = all_output(&result.output);
        assert!(output.contains("\"production\""));
        assert!(output.contains("set process.env.NODE_ENV first"));
        assert!(output.contains("color: red"));
        assert!(output.contains("import './not-real.js';"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_reexports_stay_live_bindings() {
        let dir = project();
        let root = dir.path();

        invoke(options(root, Mode::Production), root).await.unwrap();

        let index = fs::read_to_string(root.join("dist/index.js")).unwrap();
        assert!(index.contains("./components/button/button.js"));
        assert!(index.contains("export {"));
        assert!(!index.contains("export var"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_define_replaces_expressions_not_strings() {
        let dir = project();
        let root = dir.path();

        invoke(options(root, Mode::Development), root).await.unwrap();

        let button = fs::read_to_string(root.join("dist/components/button/button.js")).unwrap();
        assert!(button.contains("return \"production\""));
        assert!(button.contains("set process.env.NODE_ENV first"));
        assert!(!button.contains("set \"production\" first"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_typescript_is_compiled_away() {
        let dir = project();
        let root = dir.path();

        invoke(options(root, Mode::Production), root).await.unwrap();

        let button = fs::read_to_string(root.join("dist/components/button/button.js")).unwrap();
        assert!(!button.contains("type Size"));
        assert!(!button.contains("'small' | 'medium'"));
        assert!(!button.contains("Map<string"));
        assert!(!button.contains("): string"));
        assert!(!button.contains(" as string"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unresolved_import_fails() {
        let dir = project();
        let root = dir.path();
        write(root, "src/index.ts", "import './missing.js';\n");

        let err = invoke(options(root, Mode::Production), root).await.unwrap_err();
        match err {
            BuildError::Bundler { diagnostics } => assert!(diagnostics.contains("missing")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stylesheet_error_fails_build() {
        let dir = project();
        let root = dir.path();
        write(root, "src/components/button/button.scss", ".button { color: $undefined; }\n");

        let err = invoke(options(root, Mode::Production), root).await.unwrap_err();
        assert!(matches!(err, BuildError::Preprocess(_)));
        assert!(err.to_string().contains("button.scss"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_output_is_deterministic() {
        let dir = project();
        let root = dir.path();

        let first = invoke(options(root, Mode::Production), root).await.unwrap();
        let first_output = all_output(&first.output);
        let first_chunks = chunks(root);

        let second = invoke(options(root, Mode::Production), root).await.unwrap();

        assert_eq!(first_output, all_output(&second.output));
        assert_eq!(first_chunks, chunks(root));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rebuild_picks_up_changes_and_removes_stale_chunks() {
        let dir = project();
        let root = dir.path();

        let result = invoke(options(root, Mode::Development), root).await.unwrap();
        let handle = result.handle.expect("development builds are incremental");
        let before = chunks(root);

        write(
            root,
            "src/internal/watch.ts",
            "export function watch(name: string): string { return name + '!'; }\n",
        );
        handle.rebuild().await.unwrap();

        let after = chunks(root);
        assert_eq!(after.len(), 1);
        assert_ne!(before, after);
        assert!(fs::read_to_string(&after[0]).unwrap().contains("name + \"!\""));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispose_is_idempotent_and_final() {
        let dir = project();
        let root = dir.path();

        let result = invoke(options(root, Mode::Development), root).await.unwrap();
        let handle = result.handle.unwrap();

        handle.dispose();
        handle.dispose();

        assert!(handle.is_disposed());
        assert!(matches!(handle.rebuild().await, Err(BuildError::Disposed)));
    }
}
