//! Isolated execution units.
//!
//! Each successful compilation loads its artifact into a fresh dynamic
//! library. The expected entry symbol is verified at load time; a module
//! that compiled but lacks its generated entry is a load error. Unloading
//! happens when the [`PageModule`] is dropped, only ever through explicit
//! disposal of the owning compiled page. In-flight calls into a module being
//! unloaded are not tracked here; draining is the host's responsibility.
//!
//! The artifact must be produced by the same toolchain and link the same
//! control-runtime library as the host, which the compilation pipeline
//! guarantees.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("failed to load module {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error("entry symbol `{symbol}` not found in {path}")]
    MissingEntry {
        symbol: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
}

#[derive(Debug)]
pub struct PageModule {
    lib: Library,
    path: PathBuf,
    entry_symbol: String,
}

impl PageModule {
    pub fn load(path: &Path, entry_symbol: &str) -> Result<Self, ModuleError> {
        let lib = unsafe { Library::new(path) }.map_err(|source| ModuleError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        // probe the generated entry so a bad artifact fails now, not at
        // first request
        let probe = unsafe { lib.get::<*const ()>(entry_symbol.as_bytes()) }.map(|_| ());
        if let Err(source) = probe {
            return Err(ModuleError::MissingEntry {
                symbol: entry_symbol.to_string(),
                path: path.to_path_buf(),
                source,
            });
        }
        Ok(Self {
            lib,
            path: path.to_path_buf(),
            entry_symbol: entry_symbol.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entry_symbol(&self) -> &str {
        &self.entry_symbol
    }

    /// Resolve the entry at the caller's chosen signature.
    ///
    /// # Safety
    /// `T` must match the actual signature of the exported symbol.
    pub unsafe fn entry<T>(&self) -> Result<Symbol<'_, T>, ModuleError> {
        unsafe { self.lib.get::<T>(self.entry_symbol.as_bytes()) }.map_err(|source| {
            ModuleError::MissingEntry {
                symbol: self.entry_symbol.clone(),
                path: self.path.clone(),
                source,
            }
        })
    }
}
