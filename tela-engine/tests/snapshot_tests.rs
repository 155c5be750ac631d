use std::sync::Arc;
use std::time::Duration;

use tela_engine::compiled::{CompiledPage, DependencyTimes};
use tela_engine::snapshot::{PagesSnapshot, SharedPages};

fn page(route: &str) -> Arc<CompiledPage> {
    Arc::new(CompiledPage::succeeded(
        route,
        format!("site{route}.tela"),
        "TestPage",
        None,
        DependencyTimes::new(),
    ))
}

#[test]
fn entries_are_ordered_by_route() {
    let snapshot = PagesSnapshot::from_entries(vec![page("/b"), page("/a"), page("/c")]);
    let routes: Vec<&str> = snapshot.entries().iter().map(|e| e.route()).collect();
    assert_eq!(routes, vec!["/a", "/b", "/c"]);
    assert!(snapshot.get("/b").is_some());
    assert!(snapshot.get("/missing").is_none());
}

#[test]
fn readers_keep_their_snapshot_across_a_publish() {
    let shared = SharedPages::new();
    let before = shared.snapshot();
    assert!(before.is_empty());

    shared.publish(PagesSnapshot::from_entries(vec![page("/a")]));

    // the old reference still sees the old list; new readers see the swap
    assert!(before.is_empty());
    assert_eq!(shared.snapshot().len(), 1);
}

#[test]
fn publish_bumps_version_and_signals_subscribers() {
    let shared = SharedPages::new();
    let rx = shared.subscribe();
    assert_eq!(shared.version(), 0);

    shared.publish(PagesSnapshot::from_entries(vec![page("/a")]));
    let version = rx
        .recv_timeout(Duration::from_secs(1))
        .expect("change signal");
    assert_eq!(version, 1);
    assert_eq!(shared.version(), 1);

    shared.publish(PagesSnapshot::empty());
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(1)).expect("signal"),
        2
    );
}

#[test]
fn dropped_subscribers_are_pruned() {
    let shared = SharedPages::new();
    let rx = shared.subscribe();
    drop(rx);
    // publishing after a receiver is gone must not error or wedge
    shared.publish(PagesSnapshot::from_entries(vec![page("/a")]));
    assert_eq!(shared.version(), 1);
}
