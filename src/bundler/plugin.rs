//! Rolldown adapter for the stylesheet plugin chain
//!
//! Every import goes through the chain in `resolve_id`. A match is compiled
//! immediately and parked under a module id; `load` hands that module back
//! to rolldown as a JS string export (inline) or as CSS (file-based).

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rolldown_common::ModuleType;
use rolldown_plugin::{
    HookLoadArgs, HookLoadOutput, HookLoadReturn, HookResolveIdArgs, HookResolveIdOutput,
    HookResolveIdReturn, HookUsage, Plugin, PluginContext,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::PreprocessError;
use crate::plugins::{CompiledStylesheet, PluginChain, StylesheetKind, INLINE_PREFIX};

/// Compiled stylesheets of the current build, plus the first failure
#[derive(Debug, Default)]
pub(crate) struct StyleRegistry {
    compiled: Mutex<HashMap<String, CompiledStylesheet>>,
    failure: Mutex<Option<PreprocessError>>,
}

impl StyleRegistry {
    /// Park `sheet` and return the module id rolldown will load it by
    async fn insert(&self, sheet: CompiledStylesheet) -> String {
        let id = module_id(&sheet);
        self.compiled.lock().await.insert(id.clone(), sheet);
        id
    }

    async fn get(&self, id: &str) -> Option<CompiledStylesheet> {
        self.compiled.lock().await.get(id).cloned()
    }

    async fn record(&self, err: PreprocessError) {
        let mut failure = self.failure.lock().await;
        if failure.is_none() {
            *failure = Some(err);
        }
    }

    /// The preprocessor error that failed the last build, if any
    pub(crate) async fn take_failure(&self) -> Option<PreprocessError> {
        self.failure.lock().await.take()
    }

    pub(crate) async fn clear(&self) {
        self.compiled.lock().await.clear();
        self.failure.lock().await.take();
    }
}

/// Inline stylesheets are virtual modules; file-based ones keep their path
fn module_id(sheet: &CompiledStylesheet) -> String {
    match sheet.kind {
        StylesheetKind::Inline => format!("\0{}{}", INLINE_PREFIX, sheet.path.display()),
        StylesheetKind::Sheet => sheet.path.display().to_string(),
    }
}

/// Runs the [`PluginChain`] inside rolldown
#[derive(Debug)]
pub(crate) struct StylesheetPlugin {
    chain: PluginChain,
    registry: Arc<StyleRegistry>,
}

impl StylesheetPlugin {
    pub(crate) fn new(chain: PluginChain, registry: Arc<StyleRegistry>) -> Self {
        Self { chain, registry }
    }
}

impl Plugin for StylesheetPlugin {
    fn name(&self) -> Cow<'static, str> {
        "kitbuild-stylesheets".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId | HookUsage::Load
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs<'_>,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let importer = args.importer.map(PathBuf::from);
        let chain = self.chain.clone();
        let registry = Arc::clone(&self.registry);

        async move {
            // Entries have no importer and are never stylesheets
            let Some(importer) = importer else {
                return Ok(None);
            };

            match chain.run(&specifier, &importer).await {
                Ok(Some(sheet)) => {
                    let id = registry.insert(sheet).await;
                    debug!("Resolved stylesheet {} as {:?}", specifier, id);
                    Ok(Some(HookResolveIdOutput {
                        id: id.into(),
                        ..Default::default()
                    }))
                }
                Ok(None) => Ok(None),
                Err(err) => {
                    let message = err.to_string();
                    registry.record(err).await;
                    Err(anyhow::anyhow!(message))
                }
            }
        }
    }

    fn load(
        &self,
        _ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        let id = args.id.to_string();
        let registry = Arc::clone(&self.registry);

        async move {
            let Some(sheet) = registry.get(&id).await else {
                return Ok(None);
            };

            let output = match sheet.kind {
                StylesheetKind::Inline => HookLoadOutput {
                    code: format!("export default {};\n", serde_json::to_string(&sheet.css)?).into(),
                    module_type: Some(ModuleType::Js),
                    ..Default::default()
                },
                StylesheetKind::Sheet => HookLoadOutput {
                    code: sheet.css.into(),
                    module_type: Some(ModuleType::Css),
                    ..Default::default()
                },
            };

            Ok(Some(output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sheet(kind: StylesheetKind) -> CompiledStylesheet {
        CompiledStylesheet {
            path: PathBuf::from("/p/src/components/button/button.scss"),
            kind,
            css: ".button { color: red; }".to_string(),
        }
    }

    #[test]
    fn test_inline_sheets_are_virtual() {
        assert_eq!(
            module_id(&sheet(StylesheetKind::Inline)),
            "\0sass:/p/src/components/button/button.scss"
        );
        assert_eq!(
            module_id(&sheet(StylesheetKind::Sheet)),
            "/p/src/components/button/button.scss"
        );
    }

    #[tokio::test]
    async fn test_registry_keeps_first_failure() {
        let registry = StyleRegistry::default();
        let id = registry.insert(sheet(StylesheetKind::Sheet)).await;
        assert!(registry.get(&id).await.is_some());

        registry
            .record(PreprocessError::Compile {
                path: PathBuf::from("a.scss"),
                message: "first".to_string(),
            })
            .await;
        registry
            .record(PreprocessError::Compile {
                path: PathBuf::from("b.scss"),
                message: "second".to_string(),
            })
            .await;

        let failure = registry.take_failure().await.unwrap();
        assert!(failure.to_string().contains("a.scss"));
        assert!(registry.take_failure().await.is_none());

        registry.clear().await;
        assert!(registry.get(&id).await.is_none());
    }
}
