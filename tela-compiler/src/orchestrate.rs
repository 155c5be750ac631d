//! Compilation orchestration.
//!
//! Takes the ordered source fragments for one page (authored scripts plus
//! the generated builder) and the page's referenced modules, lowers every
//! fragment through its language provider, assembles one Rust source file
//! with the original markup embedded, and drives `rustc` to a loadable
//! `cdylib`, or to an ordered diagnostic list.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::diag::{Diagnostic, order_by_severity, parse_rustc_output};
use crate::emit::string_lit;
use crate::error::CompileError;
use crate::lang::{ExprLanguage, LanguageProvider, RustLanguage};

#[derive(Debug, Clone)]
pub struct SourceFragment {
    pub language: String,
    /// Identifier-safe name; the expr provider uses it as its module name.
    pub name: String,
    pub code: String,
    /// Where the fragment came from, for diagnostics.
    pub origin: String,
}

/// Referenced external module. Identity is the module (crate) name; paths are
/// incidental and do not participate in deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleRef {
    pub name: String,
    pub path: Option<PathBuf>,
}

impl ModuleRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    pub fn at(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
        }
    }
}

/// Deduplicate by module name, first occurrence wins, order preserved.
pub fn dedup_references(refs: &[ModuleRef]) -> Vec<ModuleRef> {
    let mut out: Vec<ModuleRef> = Vec::new();
    for r in refs {
        if !out.iter().any(|seen| seen.name == r.name) {
            out.push(r.clone());
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct CompilationUnit {
    pub crate_name: String,
    pub type_name: String,
    pub entry_symbol: String,
    /// Original markup text, embedded in the artifact for diagnostics.
    pub embedded_source: String,
    pub fragments: Vec<SourceFragment>,
    pub references: Vec<ModuleRef>,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub out_dir: PathBuf,
    pub rustc: PathBuf,
    pub edition: String,
    pub debug_info: bool,
    pub search_paths: Vec<PathBuf>,
}

impl BuildOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            rustc: PathBuf::from("rustc"),
            edition: "2024".to_string(),
            debug_info: true,
            search_paths: Vec::new(),
        }
    }
}

/// Caller-supplied cancellation, checked at fragment and compile-call
/// granularity. A canceled compile abandons its in-progress artifact; nothing
/// partial is published.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Artifact {
    pub lib_path: PathBuf,
    /// The assembled Rust source; doubles as the debug/source-map file.
    pub source_path: PathBuf,
    pub type_name: String,
    pub entry_symbol: String,
}

#[derive(Debug)]
pub enum CompileOutcome {
    Success(Artifact),
    /// Ordered most severe first.
    Failed(Vec<Diagnostic>),
    Canceled,
}

pub struct Orchestrator {
    providers: Vec<Box<dyn LanguageProvider>>,
}

impl Orchestrator {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// `rust` plus the `expr` binding DSL.
    pub fn with_default_providers() -> Self {
        let mut o = Self::new();
        o.register(Box::new(RustLanguage));
        o.register(Box::new(ExprLanguage));
        o
    }

    pub fn register(&mut self, provider: Box<dyn LanguageProvider>) {
        self.providers.push(provider);
    }

    fn provider(&self, language: &str) -> Option<&dyn LanguageProvider> {
        self.providers
            .iter()
            .find(|p| p.language().eq_ignore_ascii_case(language))
            .map(|p| p.as_ref())
    }

    /// Lower every fragment and assemble the unit's single Rust source.
    /// All fragment diagnostics are collected before giving up.
    pub fn assemble(&self, unit: &CompilationUnit) -> Result<String, Vec<Diagnostic>> {
        let mut out = String::new();
        out.push_str("//! Generated by tela. Do not edit.\n");
        out.push_str("#![allow(unused_imports, unused_mut, unused_variables, dead_code)]\n\n");
        out.push_str("/// Original markup, embedded for diagnostics.\n");
        out.push_str(&format!(
            "pub static PAGE_SOURCE: &str = {};\n\n",
            string_lit(&unit.embedded_source)
        ));

        let mut diagnostics = Vec::new();
        for fragment in &unit.fragments {
            let Some(provider) = self.provider(&fragment.language) else {
                diagnostics.push(Diagnostic::error(
                    "orchestrate/unknown-language",
                    format!("no provider for language `{}`", fragment.language),
                ));
                continue;
            };
            match provider.lower(fragment) {
                Ok(code) => {
                    out.push_str(&format!(
                        "// fragment: {} [{}]\n",
                        fragment.origin, fragment.language
                    ));
                    out.push_str(&code);
                    out.push_str("\n\n");
                }
                Err(diag) => diagnostics.push(diag),
            }
        }

        if diagnostics.is_empty() {
            Ok(out)
        } else {
            order_by_severity(&mut diagnostics);
            Err(diagnostics)
        }
    }

    pub fn compile(
        &self,
        unit: &CompilationUnit,
        opts: &BuildOptions,
        cancel: &CancelToken,
    ) -> Result<CompileOutcome, CompileError> {
        if cancel.is_canceled() {
            return Ok(CompileOutcome::Canceled);
        }

        let source = match self.assemble(unit) {
            Ok(source) => source,
            Err(diagnostics) => return Ok(CompileOutcome::Failed(diagnostics)),
        };

        std::fs::create_dir_all(&opts.out_dir)?;
        let source_path = opts.out_dir.join(format!("{}.rs", unit.crate_name));
        std::fs::write(&source_path, &source)?;

        if cancel.is_canceled() {
            return Ok(CompileOutcome::Canceled);
        }

        let lib_path = opts.out_dir.join(format!("{}.so", unit.crate_name));
        let output = Command::new(&opts.rustc)
            .args(rustc_args(unit, opts, &source_path, &lib_path))
            .output()?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut diagnostics = parse_rustc_output(&stderr);

        if output.status.success() && lib_path.exists() {
            return Ok(CompileOutcome::Success(Artifact {
                lib_path,
                source_path,
                type_name: unit.type_name.clone(),
                entry_symbol: unit.entry_symbol.clone(),
            }));
        }

        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic::error(
                "orchestrate/rustc-failed",
                format!("rustc failed without diagnostics: {}", stderr.trim()),
            ));
        }
        order_by_severity(&mut diagnostics);
        Ok(CompileOutcome::Failed(diagnostics))
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::with_default_providers()
    }
}

fn rustc_args(
    unit: &CompilationUnit,
    opts: &BuildOptions,
    source_path: &Path,
    lib_path: &Path,
) -> Vec<String> {
    let mut args = vec![
        "--edition".to_string(),
        opts.edition.clone(),
        "--crate-type".to_string(),
        "cdylib".to_string(),
        "--crate-name".to_string(),
        unit.crate_name.clone(),
        "--error-format".to_string(),
        "json".to_string(),
        "-o".to_string(),
        lib_path.display().to_string(),
    ];
    if opts.debug_info {
        args.push("-C".to_string());
        args.push("debuginfo=2".to_string());
    }
    for path in &opts.search_paths {
        args.push("-L".to_string());
        args.push(path.display().to_string());
    }
    for reference in dedup_references(&unit.references) {
        args.push("--extern".to_string());
        match &reference.path {
            Some(path) => args.push(format!("{}={}", reference.name, path.display())),
            None => args.push(reference.name.clone()),
        }
    }
    args.push(source_path.display().to_string());
    args
}
