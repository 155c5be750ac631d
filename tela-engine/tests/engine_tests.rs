use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tela_compiler::Diagnostic;
use tela_compiler::orchestrate::CancelToken;
use tela_engine::compiled::{CompiledPage, DependencyTimes};
use tela_engine::engine::{Engine, EngineConfig};
use tela_engine::error::EngineError;
use tela_engine::pipeline::{
    CompilerConfig, PageCompiler, RetryPolicy, TelaCompiler, route_from_path,
};
use tela_engine::provider::{MemoryProvider, SourceProvider};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

struct StubCompiler {
    root: PathBuf,
    provider: Arc<MemoryProvider>,
    fail: Vec<PathBuf>,
    calls: Mutex<Vec<PathBuf>>,
}

impl StubCompiler {
    fn new(root: impl Into<PathBuf>, provider: Arc<MemoryProvider>) -> Self {
        Self {
            root: root.into(),
            provider,
            fail: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail.push(path.into());
        self
    }

    fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().unwrap().clone()
    }
}

impl PageCompiler for StubCompiler {
    fn compile_page(&self, source: &Path, _cancel: &CancelToken) -> CompiledPage {
        self.calls.lock().unwrap().push(source.to_path_buf());
        let route = route_from_path(&self.root, source, "tela");
        let mut deps = DependencyTimes::new();
        if let Ok(modified) = self.provider.modified(source) {
            deps.insert(source.to_path_buf(), modified);
        }
        if self.fail.iter().any(|p| p == source) {
            CompiledPage::failed(
                route,
                source,
                vec![Diagnostic::error("test/boom", "stub failure")],
                deps,
            )
        } else {
            CompiledPage::succeeded(route, source, "StubPage", None, deps)
        }
    }
}

fn engine_with(
    provider: Arc<MemoryProvider>,
    compiler: Arc<StubCompiler>,
) -> Engine {
    Engine::new(
        EngineConfig::new("/site"),
        provider as Arc<dyn SourceProvider>,
        compiler as Arc<dyn PageCompiler>,
    )
}

#[test]
fn one_failing_page_does_not_abort_the_batch() {
    let provider = Arc::new(MemoryProvider::new());
    provider.insert("/site/p1.tela", "x", at(100));
    provider.insert("/site/p2.tela", "x", at(100));
    provider.insert("/site/p3.tela", "x", at(100));
    let stub = Arc::new(
        StubCompiler::new("/site", provider.clone()).failing("/site/p2.tela"),
    );
    let engine = engine_with(provider, stub.clone());

    let report = engine.rescan_now().expect("batch runs");
    assert_eq!(report.compiled, vec!["/p1".to_string(), "/p3".to_string()]);
    assert_eq!(report.failed, vec!["/p2".to_string()]);

    // the broken page is still a routable entry carrying its diagnostics
    let snapshot = engine.pages();
    assert_eq!(snapshot.len(), 3);
    let p2 = snapshot.get("/p2").expect("published");
    assert!(!p2.is_ok());
    assert_eq!(p2.diagnostics()[0].id, "test/boom");
    assert!(snapshot.get("/p1").expect("p1").is_ok());
}

#[test]
fn unchanged_pages_are_never_recompiled() {
    let provider = Arc::new(MemoryProvider::new());
    provider.insert("/site/p1.tela", "x", at(100));
    provider.insert("/site/p2.tela", "x", at(100));
    let stub = Arc::new(StubCompiler::new("/site", provider.clone()));
    let engine = engine_with(provider.clone(), stub.clone());

    engine.rescan_now().expect("initial batch");
    assert_eq!(stub.calls().len(), 2);

    // identical timestamps: the engine must not recompile anything
    let report = engine.rescan_now().expect("noop batch");
    assert!(report.compiled.is_empty());
    assert_eq!(stub.calls().len(), 2);

    provider.touch(Path::new("/site/p1.tela"), at(200));
    let report = engine.rescan_now().expect("incremental batch");
    assert_eq!(report.compiled, vec!["/p1".to_string()]);
    let calls = stub.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2], PathBuf::from("/site/p1.tela"));
}

#[test]
fn removed_page_is_deleted_and_disposed_after_the_swap() {
    let provider = Arc::new(MemoryProvider::new());
    provider.insert("/site/p1.tela", "x", at(100));
    provider.insert("/site/p2.tela", "x", at(100));
    let stub = Arc::new(StubCompiler::new("/site", provider.clone()));
    let engine = engine_with(provider.clone(), stub.clone());

    engine.rescan_now().expect("initial batch");
    let old_p2 = engine.pages().get("/p2").cloned().expect("p2 published");
    assert!(!old_p2.is_disposed());

    provider.remove(Path::new("/site/p2.tela"));
    let report = engine.rescan_now().expect("removal batch");
    assert_eq!(report.removed, vec!["/p2".to_string()]);

    let snapshot = engine.pages();
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.get("/p2").is_none());
    assert!(snapshot.get("/p1").is_some());
    // superseded entry disposed only after the new snapshot is visible
    assert!(old_p2.is_disposed());
    // p1 was untouched, so no extra compile happened
    assert_eq!(stub.calls().len(), 2);
}

struct BlockingCompiler {
    entered: Sender<()>,
    release: Mutex<Receiver<()>>,
}

impl PageCompiler for BlockingCompiler {
    fn compile_page(&self, source: &Path, _cancel: &CancelToken) -> CompiledPage {
        self.entered.send(()).expect("test alive");
        self.release
            .lock()
            .unwrap()
            .recv()
            .expect("released by test");
        CompiledPage::succeeded("/a", source, "StubPage", None, DependencyTimes::new())
    }
}

#[test]
fn second_concurrent_compile_fails_immediately() {
    let (entered_tx, entered_rx) = channel();
    let (release_tx, release_rx) = channel();
    let provider: Arc<dyn SourceProvider> = Arc::new(MemoryProvider::new());
    let compiler: Arc<dyn PageCompiler> = Arc::new(BlockingCompiler {
        entered: entered_tx,
        release: Mutex::new(release_rx),
    });
    let engine = Engine::new(EngineConfig::new("/site"), provider, compiler);

    std::thread::scope(|scope| {
        let first = scope.spawn(|| engine.compile(Path::new("/site/a.tela")));

        entered_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("first compile started");
        let err = engine
            .compile(Path::new("/site/b.tela"))
            .expect_err("guard rejects the overlap");
        assert!(matches!(err, EngineError::CompileInProgress));

        release_tx.send(()).expect("release");
        let page = first.join().expect("no panic").expect("first compile ok");
        assert!(page.is_ok());
    });

    assert_eq!(engine.pages().len(), 1);
}

#[test]
fn publishes_fire_the_change_signal() {
    let provider = Arc::new(MemoryProvider::new());
    provider.insert("/site/p1.tela", "x", at(100));
    let stub = Arc::new(StubCompiler::new("/site", provider.clone()));
    let engine = engine_with(provider, stub);

    let rx = engine.subscribe();
    engine.rescan_now().expect("batch");
    let version = rx
        .recv_timeout(Duration::from_secs(1))
        .expect("change signal");
    assert_eq!(version, 1);
}

#[test]
fn canceled_batch_publishes_nothing() {
    let provider = Arc::new(MemoryProvider::new());
    provider.insert("/site/p1.tela", "x", at(100));
    let stub = Arc::new(StubCompiler::new("/site", provider.clone()));
    let engine = engine_with(provider, stub.clone());

    engine.cancel_token().cancel();
    let err = engine.rescan_now().expect_err("canceled");
    assert!(matches!(err, EngineError::Canceled));
    assert!(engine.pages().is_empty());
    assert!(stub.calls().is_empty());
}

#[test]
fn missing_source_fails_with_io_diagnostic_after_bounded_retry() {
    let provider: Arc<dyn SourceProvider> = Arc::new(MemoryProvider::new());
    let mut config = CompilerConfig::new("/site", "/site-out");
    config.retry = RetryPolicy {
        attempts: 2,
        backoff: Duration::from_millis(1),
    };
    let compiler = TelaCompiler::new(config, provider);

    let page = compiler.compile_page(Path::new("/site/missing.tela"), &CancelToken::new());
    assert!(!page.is_ok());
    assert_eq!(page.diagnostics()[0].id, "io/read");
}

#[test]
fn routes_derive_from_site_relative_paths() {
    let root = Path::new("/site");
    assert_eq!(route_from_path(root, Path::new("/site/index.tela"), "tela"), "/");
    assert_eq!(
        route_from_path(root, Path::new("/site/pages/home.tela"), "tela"),
        "/pages/home"
    );
}
