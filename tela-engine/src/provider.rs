//! Source tree access.
//!
//! The engine never touches the filesystem directly; everything goes through
//! [`SourceProvider`] so the incremental machinery can run against an
//! in-memory tree in tests.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub modified: SystemTime,
}

pub trait SourceProvider: Send + Sync {
    /// Recursive listing of every file under `root`.
    fn enumerate(&self, root: &Path) -> io::Result<Vec<SourceEntry>>;
    fn read(&self, path: &Path) -> io::Result<String>;
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
}

pub struct DiskProvider;

impl SourceProvider for DiskProvider {
    fn enumerate(&self, root: &Path) -> io::Result<Vec<SourceEntry>> {
        let mut out = Vec::new();
        walk(root, &mut out)?;
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }
}

fn walk(dir: &Path, out: &mut Vec<SourceEntry>) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(&path, out)?;
        } else {
            let modified = entry.metadata()?.modified()?;
            out.push(SourceEntry { path, modified });
        }
    }
    Ok(())
}

/// In-memory tree keyed by path; timestamps are supplied by the caller.
#[derive(Default)]
pub struct MemoryProvider {
    files: Mutex<HashMap<PathBuf, (String, SystemTime)>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, text: impl Into<String>, modified: SystemTime) {
        self.files
            .lock()
            .expect("file map lock poisoned")
            .insert(path.into(), (text.into(), modified));
    }

    pub fn touch(&self, path: &Path, modified: SystemTime) {
        if let Some(slot) = self
            .files
            .lock()
            .expect("file map lock poisoned")
            .get_mut(path)
        {
            slot.1 = modified;
        }
    }

    pub fn remove(&self, path: &Path) {
        self.files
            .lock()
            .expect("file map lock poisoned")
            .remove(path);
    }
}

impl SourceProvider for MemoryProvider {
    fn enumerate(&self, root: &Path) -> io::Result<Vec<SourceEntry>> {
        let files = self.files.lock().expect("file map lock poisoned");
        let mut out: Vec<SourceEntry> = files
            .iter()
            .filter(|(path, _)| path.starts_with(root))
            .map(|(path, (_, modified))| SourceEntry {
                path: path.clone(),
                modified: *modified,
            })
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    fn read(&self, path: &Path) -> io::Result<String> {
        self.files
            .lock()
            .expect("file map lock poisoned")
            .get(path)
            .map(|(text, _)| text.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.files
            .lock()
            .expect("file map lock poisoned")
            .get(path)
            .map(|(_, modified)| *modified)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}
