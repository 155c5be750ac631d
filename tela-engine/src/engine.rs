//! Incremental compilation engine.
//!
//! State is an immutable snapshot of compiled pages. Change notifications
//! funnel into a single-consumer work queue; a coalesced burst triggers one
//! source-tree enumeration, the batch plan decides what recompiles, and a
//! new snapshot is published with one atomic swap before superseded modules
//! are disposed. At most one compilation runs at any time.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use tela_compiler::orchestrate::CancelToken;

use crate::compiled::CompiledPage;
use crate::error::EngineError;
use crate::pipeline::{CANCELED_ID, PageCompiler};
use crate::plan::plan_batch;
use crate::provider::SourceProvider;
use crate::snapshot::{PagesSnapshot, SharedPages};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub site_root: PathBuf,
    pub page_extension: String,
    /// How long a change burst is allowed to settle before the rescan.
    pub debounce: Duration,
}

impl EngineConfig {
    pub fn new(site_root: impl Into<PathBuf>) -> Self {
        Self {
            site_root: site_root.into(),
            page_extension: "tela".to_string(),
            debounce: Duration::from_millis(200),
        }
    }
}

#[derive(Debug)]
pub enum WorkItem {
    Rescan,
    Compile(PathBuf),
    Shutdown,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub compiled: Vec<String>,
    pub failed: Vec<String>,
    pub removed: Vec<String>,
}

pub struct Engine {
    shared: Arc<EngineShared>,
    queue: Sender<WorkItem>,
    inbox: Mutex<Option<Receiver<WorkItem>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    watcher: Mutex<Option<notify::RecommendedWatcher>>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn SourceProvider>,
        compiler: Arc<dyn PageCompiler>,
    ) -> Self {
        let (queue, inbox) = channel();
        Self {
            shared: Arc::new(EngineShared {
                config,
                provider,
                compiler,
                pages: SharedPages::new(),
                compiling: AtomicBool::new(false),
                cancel: CancelToken::new(),
            }),
            queue,
            inbox: Mutex::new(Some(inbox)),
            worker: Mutex::new(None),
            watcher: Mutex::new(None),
        }
    }

    /// Current immutable snapshot; never blocks on compilation.
    pub fn pages(&self) -> Arc<PagesSnapshot> {
        self.shared.pages.snapshot()
    }

    /// Fires once per published snapshot.
    pub fn subscribe(&self) -> Receiver<u64> {
        self.shared.pages.subscribe()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    /// Compile one page and publish it. Fails immediately with
    /// [`EngineError::CompileInProgress`] if another compilation is
    /// outstanding.
    pub fn compile(&self, path: &Path) -> Result<Arc<CompiledPage>, EngineError> {
        self.shared.compile_one(path)
    }

    pub fn enqueue(&self, item: WorkItem) {
        let _ = self.queue.send(item);
    }

    /// Synchronous rescan: plan, recompile, publish, dispose.
    pub fn rescan_now(&self) -> Result<BatchReport, EngineError> {
        self.shared.rescan()
    }

    /// Spawn the single-consumer worker that drains the work queue.
    pub fn start(&self) {
        let Some(inbox) = self.inbox.lock().expect("inbox lock poisoned").take() else {
            return;
        };
        let shared = self.shared.clone();
        let handle = std::thread::spawn(move || worker_loop(shared, inbox));
        *self.worker.lock().expect("worker lock poisoned") = Some(handle);
    }

    /// Attach the filesystem watcher; change bursts enqueue rescans.
    pub fn watch(&self) -> Result<(), EngineError> {
        let watcher = crate::watch::spawn_watcher(
            &self.shared.config.site_root,
            self.shared.config.page_extension.clone(),
            self.queue.clone(),
        )?;
        *self.watcher.lock().expect("watcher lock poisoned") = Some(watcher);
        Ok(())
    }

    pub fn shutdown(&self) {
        *self.watcher.lock().expect("watcher lock poisoned") = None;
        let _ = self.queue.send(WorkItem::Shutdown);
        if let Some(handle) = self.worker.lock().expect("worker lock poisoned").take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct EngineShared {
    config: EngineConfig,
    provider: Arc<dyn SourceProvider>,
    compiler: Arc<dyn PageCompiler>,
    pages: SharedPages,
    compiling: AtomicBool,
    cancel: CancelToken,
}

impl EngineShared {
    fn try_guard(&self) -> Result<CompileGuard<'_>, EngineError> {
        CompileGuard::try_acquire(&self.compiling).ok_or(EngineError::CompileInProgress)
    }

    /// The worker serializes its own batch; it waits instead of failing when
    /// an external `compile()` holds the guard.
    fn guard_waiting(&self) -> CompileGuard<'_> {
        loop {
            if let Some(guard) = CompileGuard::try_acquire(&self.compiling) {
                return guard;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn compile_one(&self, path: &Path) -> Result<Arc<CompiledPage>, EngineError> {
        let guard = self.try_guard()?;
        let page = Arc::new(self.compiler.compile_page(path, &self.cancel));
        drop(guard);
        if self.cancel.is_canceled() || was_canceled(&page) {
            return Err(EngineError::Canceled);
        }
        self.publish_merged(vec![page.clone()], &[]);
        Ok(page)
    }

    fn rescan(&self) -> Result<BatchReport, EngineError> {
        if self.cancel.is_canceled() {
            return Err(EngineError::Canceled);
        }
        let snapshot = self.pages.snapshot();
        let listing = self.provider.enumerate(&self.config.site_root)?;
        let plan = plan_batch(&snapshot, &listing, &self.config.page_extension);
        if plan.is_empty() {
            tracing::debug!("source tree unchanged");
            return Ok(BatchReport::default());
        }
        tracing::info!(
            changed = plan.changed.len(),
            added = plan.added.len(),
            removed = plan.removed.len(),
            "recompiling batch"
        );

        let mut report = BatchReport::default();
        let mut results: Vec<Arc<CompiledPage>> = Vec::new();
        for path in plan.changed.iter().chain(plan.added.iter()) {
            if self.cancel.is_canceled() {
                tracing::info!("batch canceled, nothing published");
                return Err(EngineError::Canceled);
            }
            let guard = self.guard_waiting();
            let page = Arc::new(self.compiler.compile_page(path, &self.cancel));
            drop(guard);
            if was_canceled(&page) {
                return Err(EngineError::Canceled);
            }
            if page.is_ok() {
                report.compiled.push(page.route().to_string());
            } else {
                // one broken page never aborts the rest of the batch
                report.failed.push(page.route().to_string());
            }
            results.push(page);
        }

        self.publish_merged(results, &plan.removed);
        report.removed = plan.removed;
        Ok(report)
    }

    /// Build the next snapshot, swap it in, and only then dispose the
    /// superseded entries. Readers holding the old snapshot keep their list;
    /// in-flight use of a disposed module is the host's draining problem.
    fn publish_merged(&self, replacements: Vec<Arc<CompiledPage>>, removed_routes: &[String]) {
        let old = self.pages.snapshot();
        let replaced: HashSet<String> = replacements
            .iter()
            .map(|p| p.route().to_string())
            .collect();
        let mut next: Vec<Arc<CompiledPage>> = old
            .entries()
            .iter()
            .filter(|e| {
                !replaced.contains(e.route()) && !removed_routes.iter().any(|r| r == e.route())
            })
            .cloned()
            .collect();
        next.extend(replacements);
        let version = self.pages.publish(PagesSnapshot::from_entries(next));

        for entry in old.entries() {
            if replaced.contains(entry.route()) || removed_routes.iter().any(|r| r == entry.route())
            {
                entry.dispose();
            }
        }
        tracing::debug!(version, "snapshot published");
    }
}

fn was_canceled(page: &CompiledPage) -> bool {
    page.diagnostics().iter().any(|d| d.id == CANCELED_ID)
}

fn worker_loop(shared: Arc<EngineShared>, inbox: Receiver<WorkItem>) {
    while let Ok(item) = inbox.recv() {
        match item {
            WorkItem::Shutdown => break,
            WorkItem::Compile(path) => run_compile(&shared, &path),
            WorkItem::Rescan => {
                // let the burst settle, then fold every queued signal into
                // one rescan
                std::thread::sleep(shared.config.debounce);
                let mut pending = Vec::new();
                while let Ok(extra) = inbox.try_recv() {
                    match extra {
                        WorkItem::Rescan => {}
                        WorkItem::Compile(path) => pending.push(path),
                        WorkItem::Shutdown => return,
                    }
                }
                match shared.rescan() {
                    Ok(report) => {
                        if !report.failed.is_empty() {
                            tracing::warn!(failed = report.failed.len(), "batch had failures");
                        }
                    }
                    Err(EngineError::Canceled) => {}
                    Err(err) => tracing::error!(error = %err, "rescan failed"),
                }
                for path in pending {
                    run_compile(&shared, &path);
                }
            }
        }
    }
}

fn run_compile(shared: &Arc<EngineShared>, path: &Path) {
    loop {
        match shared.compile_one(path) {
            Err(EngineError::CompileInProgress) => {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(EngineError::Canceled) => break,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "compile failed");
                break;
            }
            Ok(_) => break,
        }
    }
}

struct CompileGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> CompileGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for CompileGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
