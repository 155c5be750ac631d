//! The full per-page compile pipeline: read, parse, analyze, emit,
//! orchestrate, load.
//!
//! The engine only sees the [`PageCompiler`] trait, so its batching and
//! snapshot semantics are testable without a native toolchain.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tela_compiler::orchestrate::{
    BuildOptions, CancelToken, CompilationUnit, CompileOutcome, ModuleRef, Orchestrator,
    SourceFragment,
};
use tela_compiler::parse::IncludeResolver;
use tela_compiler::{Diagnostic, EmitOptions, analyze, emit_page, order_by_severity, parse_page};

use crate::compiled::{CompiledPage, DependencyTimes};
use crate::module::PageModule;
use crate::provider::SourceProvider;

/// Bounded, fixed-backoff retry for transient file reads. Scoped to one
/// file; the rest of a batch is unaffected.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}

/// Explicit configuration threaded through the pipeline; nothing is global.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub site_root: PathBuf,
    pub out_dir: PathBuf,
    pub page_extension: String,
    pub default_language: String,
    pub runtime_crate: String,
    /// Modules linked into every page (the control runtime, at minimum).
    pub runtime_refs: Vec<ModuleRef>,
    pub search_paths: Vec<PathBuf>,
    pub rustc: PathBuf,
    /// Load each artifact into the process after compiling. Persisted-output
    /// builds leave this off and keep artifacts on disk.
    pub load_modules: bool,
    pub retry: RetryPolicy,
}

impl CompilerConfig {
    pub fn new(site_root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
            out_dir: out_dir.into(),
            page_extension: "tela".to_string(),
            default_language: "rust".to_string(),
            runtime_crate: "tela_controls".to_string(),
            runtime_refs: Vec::new(),
            search_paths: Vec::new(),
            rustc: PathBuf::from("rustc"),
            load_modules: true,
            retry: RetryPolicy::default(),
        }
    }
}

pub trait PageCompiler: Send + Sync {
    /// One page, end to end. Failures come back as a failed page, never a
    /// panic; a cancellation comes back as a failed page the engine will not
    /// publish.
    fn compile_page(&self, source: &Path, cancel: &CancelToken) -> CompiledPage;
}

pub struct TelaCompiler {
    config: CompilerConfig,
    orchestrator: Orchestrator,
    provider: Arc<dyn SourceProvider>,
}

impl TelaCompiler {
    pub fn new(config: CompilerConfig, provider: Arc<dyn SourceProvider>) -> Self {
        Self {
            config,
            orchestrator: Orchestrator::with_default_providers(),
            provider,
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn route_for(&self, path: &Path) -> String {
        route_from_path(&self.config.site_root, path, &self.config.page_extension)
    }

    fn read_with_retry(&self, path: &Path) -> io::Result<String> {
        let mut attempt = 0;
        loop {
            match self.provider.read(path) {
                Ok(text) => return Ok(text),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.config.retry.attempts.max(1) {
                        return Err(err);
                    }
                    tracing::warn!(
                        path = %path.display(),
                        attempt,
                        error = %err,
                        "transient read failure, retrying"
                    );
                    std::thread::sleep(self.config.retry.backoff);
                }
            }
        }
    }

    fn record_dep(&self, deps: &mut DependencyTimes, path: &Path) {
        match self.provider.modified(path) {
            Ok(modified) => {
                deps.insert(path.to_path_buf(), modified);
            }
            Err(_) => {
                deps.insert(path.to_path_buf(), SystemTime::UNIX_EPOCH);
            }
        }
    }
}

impl PageCompiler for TelaCompiler {
    fn compile_page(&self, source: &Path, cancel: &CancelToken) -> CompiledPage {
        let route = self.route_for(source);
        let mut deps = DependencyTimes::new();
        self.record_dep(&mut deps, source);

        let text = match self.read_with_retry(source) {
            Ok(text) => text,
            Err(err) => {
                return CompiledPage::failed(
                    route,
                    source,
                    vec![Diagnostic::error(
                        "io/read",
                        format!("{}: {err}", source.display()),
                    )],
                    deps,
                );
            }
        };

        let resolver = ProviderResolver {
            provider: self.provider.as_ref(),
        };
        let parsed = parse_page(source, &text, &resolver);
        for dep in &parsed.dependencies {
            self.record_dep(&mut deps, dep);
        }

        let details = analyze(&parsed);
        if let Some(master) = details.directive.as_ref().and_then(|d| d.master()) {
            let master_path = match source.parent() {
                Some(dir) => dir.join(master),
                None => PathBuf::from(master),
            };
            self.record_dep(&mut deps, &master_path);
        }
        if !details.is_ok() {
            return CompiledPage::failed(route, source, details.errors.clone(), deps);
        }
        for warning in &details.errors {
            tracing::warn!(route = %route, "{}: {}", warning.id, warning.message);
        }

        if cancel.is_canceled() {
            return canceled_page(route, source, deps);
        }

        let emit_opts = EmitOptions {
            runtime_crate: self.config.runtime_crate.clone(),
        };
        let emitted = emit_page(&details, &parsed, source, &emit_opts);
        if !emitted.is_ok() {
            let mut diagnostics = emitted.diagnostics;
            order_by_severity(&mut diagnostics);
            return CompiledPage::failed(route, source, diagnostics, deps);
        }

        let default_language = details
            .directive
            .as_ref()
            .and_then(|d| d.language())
            .unwrap_or(&self.config.default_language)
            .to_string();
        let mut fragments = Vec::new();
        for (i, script) in details.scripts.iter().enumerate() {
            fragments.push(SourceFragment {
                language: script
                    .language
                    .clone()
                    .unwrap_or_else(|| default_language.clone()),
                name: format!("script_{i}"),
                code: script.code.clone(),
                origin: format!("{}#script{}", source.display(), i),
            });
        }
        fragments.push(SourceFragment {
            language: "rust".to_string(),
            name: "page".to_string(),
            code: emitted.code,
            origin: source.display().to_string(),
        });

        let mut references = self.config.runtime_refs.clone();
        references.extend(details.references.iter().map(|r| ModuleRef {
            name: r.module.clone(),
            path: r.path.as_ref().map(PathBuf::from),
        }));

        let unit = CompilationUnit {
            // keyed by route, not type name: two routes may share a stem
            crate_name: format!("tela_page_{}", route_slug(&route)),
            type_name: emitted.type_name,
            entry_symbol: emitted.entry_symbol,
            embedded_source: text,
            fragments,
            references,
        };
        let build_opts = BuildOptions {
            out_dir: self.config.out_dir.clone(),
            rustc: self.config.rustc.clone(),
            edition: "2024".to_string(),
            debug_info: true,
            search_paths: self.config.search_paths.clone(),
        };

        match self.orchestrator.compile(&unit, &build_opts, cancel) {
            Ok(CompileOutcome::Success(artifact)) => {
                if !self.config.load_modules {
                    return CompiledPage::succeeded(route, source, artifact.type_name, None, deps);
                }
                match PageModule::load(&artifact.lib_path, &artifact.entry_symbol) {
                    Ok(module) => {
                        tracing::info!(route = %route, type_name = %artifact.type_name, "page compiled");
                        CompiledPage::succeeded(
                            route,
                            source,
                            artifact.type_name,
                            Some(module),
                            deps,
                        )
                    }
                    // compiled fine but the generated type is missing; fatal
                    // for this page only
                    Err(err) => CompiledPage::failed(
                        route,
                        source,
                        vec![Diagnostic::error("module/load", err.to_string())],
                        deps,
                    ),
                }
            }
            Ok(CompileOutcome::Failed(diagnostics)) => {
                CompiledPage::failed(route, source, diagnostics, deps)
            }
            Ok(CompileOutcome::Canceled) => canceled_page(route, source, deps),
            Err(err) => CompiledPage::failed(
                route,
                source,
                vec![Diagnostic::error("io/compile", err.to_string())],
                deps,
            ),
        }
    }
}

pub(crate) const CANCELED_ID: &str = "compile/canceled";

fn canceled_page(route: String, source: &Path, deps: DependencyTimes) -> CompiledPage {
    CompiledPage::failed(
        route,
        source,
        vec![Diagnostic::error(CANCELED_ID, "compilation canceled")],
        deps,
    )
}

struct ProviderResolver<'a> {
    provider: &'a dyn SourceProvider,
}

impl IncludeResolver for ProviderResolver<'_> {
    fn resolve(&self, from: &Path, target: &str) -> io::Result<(PathBuf, String)> {
        let path = match from.parent() {
            Some(dir) => dir.join(target),
            None => PathBuf::from(target),
        };
        let text = self.provider.read(&path)?;
        Ok((path, text))
    }
}

/// Identifier-safe slug for a route, used for crate and artifact names.
pub fn route_slug(route: &str) -> String {
    let slug: String = route
        .trim_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if slug.is_empty() {
        "index".to_string()
    } else {
        slug
    }
}

/// Site-relative route: `pages/home.tela` → `/pages/home`; a trailing
/// `index` segment collapses (`index.tela` → `/`).
pub fn route_from_path(site_root: &Path, path: &Path, page_extension: &str) -> String {
    let rel = path.strip_prefix(site_root).unwrap_or(path);
    let mut segments: Vec<String> = rel
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(os) => Some(os.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    if let Some(last) = segments.last_mut() {
        if let Some(stripped) = last
            .strip_suffix(page_extension)
            .and_then(|s| s.strip_suffix('.'))
        {
            *last = stripped.to_string();
        }
        if last.eq_ignore_ascii_case("index") {
            segments.pop();
        }
    }
    let joined = segments.join("/");
    format!("/{joined}")
}
