//! Memoisation of loaded tables keyed by source-file identity.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use rustc_hash::FxHashMap;

use crate::error::Result;

/// Identity of a source file: where it is and which version of it was read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceKey {
    pub path: PathBuf,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl SourceKey {
    /// Fingerprint a file from its metadata
    pub fn for_path(path: &Path) -> Result<Self> {
        let metadata = std::fs::metadata(path)?;
        Ok(Self {
            path: std::fs::canonicalize(path)?,
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

/// Caller-owned cache of loaded tables.
///
/// Entries are shared read-only behind `Arc`; a file whose size or
/// modification time changes is loaded again. Loading happens outside the
/// lock, so two callers racing on a cold entry may both load it.
#[derive(Debug)]
pub struct DatasetCache<T> {
    entries: Mutex<FxHashMap<SourceKey, Arc<T>>>,
}

impl<T> Default for DatasetCache<T> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(FxHashMap::default()),
        }
    }
}

impl<T> DatasetCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, loading it with `load` on a miss
    pub fn get_or_load<F>(&self, path: &Path, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        let key = SourceKey::for_path(path)?;
        if let Some(hit) = self.lock().get(&key) {
            log::debug!("Using cached table for {}", path.display());
            return Ok(Arc::clone(hit));
        }

        let table = Arc::new(load(path)?);
        let mut entries = self.lock();
        entries.retain(|cached, _| cached.path != key.path);
        entries.insert(key, Arc::clone(&table));
        Ok(table)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FxHashMap<SourceKey, Arc<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
