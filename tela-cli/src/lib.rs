use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tela_compiler::orchestrate::{CancelToken, ModuleRef};
use tela_compiler::{Diagnostic, Severity, analyze, parse_page};
use tela_engine::{
    CompilerConfig, DiskProvider, Engine, EngineConfig, PageCompiler, SourceProvider, TelaCompiler,
    WorkItem, route_slug,
};

/// `manifest.json` row: route → generated type name → artifact file.
#[derive(Serialize)]
struct ManifestEntry {
    route: String,
    type_name: String,
    artifact: String,
}

pub struct BuildSummary {
    pub manifest_path: PathBuf,
    pub succeeded: usize,
    pub failed: usize,
}

/// `--lib name=path` (or a bare `name` resolved through search paths).
pub fn parse_lib_spec(spec: &str) -> Result<ModuleRef> {
    match spec.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok(ModuleRef::at(name, path))
        }
        None if !spec.is_empty() => Ok(ModuleRef::named(spec)),
        _ => anyhow::bail!("invalid --lib spec `{spec}`, expected name=path"),
    }
}

fn compiler_config(site_root: &Path, out_dir: &Path, libs: &[ModuleRef]) -> CompilerConfig {
    let mut config = CompilerConfig::new(site_root, out_dir);
    config.runtime_refs = libs.to_vec();
    config.search_paths = libs
        .iter()
        .filter_map(|l| l.path.as_ref().and_then(|p| p.parent()))
        .map(|p| p.to_path_buf())
        .collect();
    config
}

/// Ahead-of-time build: every page compiles to a persisted artifact plus its
/// generated source; failures persist a diagnostics file instead. The
/// manifest maps each successful route to its generated type and artifact.
pub fn build_cmd(site_root: &Path, out_dir: &Path, libs: &[ModuleRef]) -> Result<BuildSummary> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let provider: Arc<dyn SourceProvider> = Arc::new(DiskProvider);
    let mut config = compiler_config(site_root, out_dir, libs);
    config.load_modules = false;
    let page_extension = config.page_extension.clone();
    let compiler = TelaCompiler::new(config, provider.clone());
    let cancel = CancelToken::new();

    let pages: Vec<PathBuf> = provider
        .enumerate(site_root)
        .with_context(|| format!("failed to list {}", site_root.display()))?
        .into_iter()
        .map(|e| e.path)
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&page_extension))
        })
        .collect();

    let mut manifest = Vec::new();
    let mut succeeded = 0;
    let mut failed = 0;
    for page in pages {
        let compiled = compiler.compile_page(&page, &cancel);
        if let Some(type_name) = compiled.type_name() {
            let artifact = format!("tela_page_{}.so", route_slug(compiled.route()));
            manifest.push(ManifestEntry {
                route: compiled.route().to_string(),
                type_name: type_name.to_string(),
                artifact,
            });
            succeeded += 1;
            println!("compiled {}", compiled.route());
        } else {
            failed += 1;
            let diag_path = out_dir.join(format!("{}.diag.json", route_slug(compiled.route())));
            let json = serde_json::to_string_pretty(compiled.diagnostics())?;
            fs::write(&diag_path, json)
                .with_context(|| format!("failed to write {}", diag_path.display()))?;
            println!(
                "failed {} ({} diagnostics, see {})",
                compiled.route(),
                compiled.diagnostics().len(),
                diag_path.display()
            );
        }
    }

    let manifest_path = out_dir.join("manifest.json");
    fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    Ok(BuildSummary {
        manifest_path,
        succeeded,
        failed,
    })
}

/// Parse and analyze one page; prints and returns its diagnostics.
pub fn check_cmd(file: &Path) -> Result<Vec<Diagnostic>> {
    let text =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let parsed = parse_page(file, &text, &tela_compiler::DiskResolver);
    let details = analyze(&parsed);
    for diag in &details.errors {
        let severity = match diag.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Note => "note",
        };
        match &diag.location {
            Some(loc) => println!(
                "{severity}: {} [{}] at {}:{}:{}",
                diag.message, diag.id, loc.file, loc.line, loc.column
            ),
            None => println!("{severity}: {} [{}]", diag.message, diag.id),
        }
    }
    Ok(details.errors)
}

/// Run the incremental engine against a site root and report every published
/// snapshot until interrupted.
pub fn watch_cmd(site_root: &Path, out_dir: &Path, libs: &[ModuleRef]) -> Result<()> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let provider: Arc<dyn SourceProvider> = Arc::new(DiskProvider);
    let compiler: Arc<dyn PageCompiler> = Arc::new(TelaCompiler::new(
        compiler_config(site_root, out_dir, libs),
        provider.clone(),
    ));
    let engine = Engine::new(EngineConfig::new(site_root), provider, compiler);

    let events = engine.subscribe();
    engine.start();
    engine.watch()?;
    engine.enqueue(WorkItem::Rescan);
    println!("watching {}", site_root.display());

    for version in events {
        let snapshot = engine.pages();
        println!("snapshot v{version}: {} pages", snapshot.len());
        for entry in snapshot.entries() {
            if !entry.is_ok() {
                println!(
                    "  {} is broken ({} diagnostics)",
                    entry.route(),
                    entry.diagnostics().len()
                );
            }
        }
    }
    Ok(())
}
