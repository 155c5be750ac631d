//! Filesystem watching.
//!
//! The watcher only signals; the worker owns the debounce and the rescan.
//! One enumeration of the source tree per coalesced burst decides what
//! actually changed, so event noise (editors writing twice, renames) cannot
//! cause extra work.

use std::path::Path;
use std::sync::mpsc::Sender;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::engine::WorkItem;
use crate::error::EngineError;

pub fn spawn_watcher(
    root: &Path,
    extension: String,
    queue: Sender<WorkItem>,
) -> Result<RecommendedWatcher, EngineError> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let relevant = event.paths.iter().any(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case(&extension))
            });
            if relevant {
                let _ = queue.send(WorkItem::Rescan);
            }
        }
        Err(err) => tracing::warn!(error = %err, "watch error"),
    })
    .map_err(|e| EngineError::Watch(e.to_string()))?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| EngineError::Watch(e.to_string()))?;
    tracing::info!(root = %root.display(), "watching for changes");
    Ok(watcher)
}
