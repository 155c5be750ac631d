//! One compilation result for one route.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use tela_compiler::Diagnostic;

use crate::module::PageModule;

/// Dependency file → modification time recorded at compile time.
pub type DependencyTimes = BTreeMap<PathBuf, SystemTime>;

/// Either a generated type (with its loaded module) or a diagnostic payload,
/// never both. A failed page is still routable: its handler serves the
/// diagnostics instead of output, so one broken page fails per-request, not
/// application-wide.
pub struct CompiledPage {
    route: String,
    source: PathBuf,
    type_name: Option<String>,
    diagnostics: Vec<Diagnostic>,
    dependencies: DependencyTimes,
    module: Mutex<Option<PageModule>>,
    disposed: AtomicBool,
}

impl CompiledPage {
    /// The module may be absent in persisted-output builds, where the
    /// artifact stays on disk and is never loaded into the builder process.
    pub fn succeeded(
        route: impl Into<String>,
        source: impl Into<PathBuf>,
        type_name: impl Into<String>,
        module: Option<PageModule>,
        dependencies: DependencyTimes,
    ) -> Self {
        Self {
            route: route.into(),
            source: source.into(),
            type_name: Some(type_name.into()),
            diagnostics: Vec::new(),
            dependencies,
            module: Mutex::new(module),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn failed(
        route: impl Into<String>,
        source: impl Into<PathBuf>,
        diagnostics: Vec<Diagnostic>,
        dependencies: DependencyTimes,
    ) -> Self {
        Self {
            route: route.into(),
            source: source.into(),
            type_name: None,
            diagnostics,
            dependencies,
            module: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// The markup root file this page was compiled from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn dependencies(&self) -> &DependencyTimes {
        &self.dependencies
    }

    pub fn is_ok(&self) -> bool {
        self.type_name.is_some()
    }

    /// Run `f` against the loaded module, if any.
    pub fn with_module<R>(&self, f: impl FnOnce(Option<&PageModule>) -> R) -> R {
        let guard = self.module.lock().expect("module lock poisoned");
        f(guard.as_ref())
    }

    /// Unload the isolated module. Called when this page is superseded or
    /// removed; never implicit.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        let module = self.module.lock().expect("module lock poisoned").take();
        drop(module);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CompiledPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledPage")
            .field("route", &self.route)
            .field("source", &self.source)
            .field("type_name", &self.type_name)
            .field("diagnostics", &self.diagnostics.len())
            .field("dependencies", &self.dependencies.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
