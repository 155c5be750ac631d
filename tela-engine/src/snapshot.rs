//! Published compiled-page state.
//!
//! Readers clone an `Arc` to the current immutable snapshot and never block
//! on compilation. Publication replaces the whole snapshot in one store
//! inside the write guard; a published snapshot is never mutated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, RwLock};

use crate::compiled::CompiledPage;

pub struct PagesSnapshot {
    entries: Vec<Arc<CompiledPage>>,
}

impl PagesSnapshot {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Entries are kept ordered by route.
    pub fn from_entries(mut entries: Vec<Arc<CompiledPage>>) -> Self {
        entries.sort_by(|a, b| a.route().cmp(b.route()));
        Self { entries }
    }

    pub fn entries(&self) -> &[Arc<CompiledPage>] {
        &self.entries
    }

    pub fn get(&self, route: &str) -> Option<&Arc<CompiledPage>> {
        self.entries.iter().find(|e| e.route() == route)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct SharedPages {
    current: RwLock<Arc<PagesSnapshot>>,
    version: AtomicU64,
    subscribers: Mutex<Vec<Sender<u64>>>,
}

impl SharedPages {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(PagesSnapshot::empty())),
            version: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Arc<PagesSnapshot> {
        self.current.read().expect("snapshot lock poisoned").clone()
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Change-notification token: every publish sends the new version.
    pub fn subscribe(&self) -> Receiver<u64> {
        let (tx, rx) = channel();
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .push(tx);
        rx
    }

    /// Single atomic swap; the signal fires strictly after the new snapshot
    /// is visible.
    pub fn publish(&self, next: PagesSnapshot) -> u64 {
        {
            let mut current = self.current.write().expect("snapshot lock poisoned");
            *current = Arc::new(next);
        }
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.subscribers
            .lock()
            .expect("subscriber lock poisoned")
            .retain(|tx| tx.send(version).is_ok());
        version
    }
}

impl Default for SharedPages {
    fn default() -> Self {
        Self::new()
    }
}
