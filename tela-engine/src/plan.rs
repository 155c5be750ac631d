//! Batch planning.
//!
//! Pure diff of the current snapshot against one enumeration of the source
//! tree: an inverse index from dependency file to owning entries decides
//! which pages changed, which root files are new, and which pages lost a
//! dependency file entirely. No filesystem access happens here.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::provider::SourceEntry;
use crate::snapshot::PagesSnapshot;

#[derive(Debug, Default)]
pub struct BatchPlan {
    /// Root source files of pages whose dependencies got newer timestamps.
    pub changed: Vec<PathBuf>,
    /// Markup root files with no owning entry.
    pub added: Vec<PathBuf>,
    /// Routes whose entries lost a dependency file.
    pub removed: Vec<String>,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.added.is_empty() && self.removed.is_empty()
    }
}

pub fn plan_batch(
    snapshot: &PagesSnapshot,
    listing: &[SourceEntry],
    page_extension: &str,
) -> BatchPlan {
    // (a) inverse index: dependency file -> owning entry indices
    let mut inverse: HashMap<&PathBuf, Vec<usize>> = HashMap::new();
    for (idx, entry) in snapshot.entries().iter().enumerate() {
        for dep in entry.dependencies().keys() {
            inverse.entry(dep).or_default().push(idx);
        }
    }

    let present: HashSet<&PathBuf> = listing.iter().map(|e| &e.path).collect();

    // (c) owners of still-existing deps newer than their recorded timestamp
    let mut changed_idx: HashSet<usize> = HashSet::new();
    for file in listing {
        if let Some(owners) = inverse.get(&file.path) {
            for &owner in owners {
                let recorded = snapshot.entries()[owner].dependencies().get(&file.path);
                if recorded.is_some_and(|t| file.modified > *t) {
                    changed_idx.insert(owner);
                }
            }
        }
    }

    // (d) markup files owned by no entry (not even as someone's include)
    // are new roots
    let mut added: Vec<PathBuf> = listing
        .iter()
        .filter(|f| {
            f.path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(page_extension))
                && !inverse.contains_key(&f.path)
        })
        .map(|f| f.path.clone())
        .collect();
    added.sort();
    added.dedup();

    // (e) a vanished dependency deletes every owner; deletion wins
    let mut removed_idx: HashSet<usize> = HashSet::new();
    for (dep, owners) in &inverse {
        if !present.contains(dep) {
            removed_idx.extend(owners.iter().copied());
        }
    }
    for idx in &removed_idx {
        changed_idx.remove(idx);
    }

    // stable output order follows the snapshot
    let mut changed = Vec::new();
    let mut removed = Vec::new();
    for (idx, entry) in snapshot.entries().iter().enumerate() {
        if removed_idx.contains(&idx) {
            removed.push(entry.route().to_string());
        } else if changed_idx.contains(&idx) {
            changed.push(entry.source().to_path_buf());
        }
    }
    changed.dedup();

    BatchPlan {
        changed,
        added,
        removed,
    }
}
