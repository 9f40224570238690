//! Single-writer guard per partition.
//!
//! Two layers: an in-process mutex keyed by store path (threads of this
//! server), and an exclusive advisory lock on a sibling `.lock` file (other
//! processes writing the same tracker). Both are held for the whole
//! load -> mutate -> persist cycle.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use fs2::FileExt;
use tracing::debug;

use crate::tracker::TrackerError;

#[derive(Debug, Default)]
pub struct PartitionLocks {
    inner: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PartitionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the partition's lock.
    pub fn with_lock<T>(
        &self,
        store_path: &Path,
        f: impl FnOnce() -> Result<T, TrackerError>,
    ) -> Result<T, TrackerError> {
        let partition_mutex = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(store_path.to_path_buf()).or_default().clone()
        };
        let result = {
            // The guarded value is `()`, so a poisoned mutex holds nothing stale.
            let _guard = partition_mutex
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            with_file_lock(store_path, f)
        };
        self.release(store_path, &partition_mutex);
        result
    }

    /// Drops the map entry once no other caller holds or waits on it.
    fn release(&self, store_path: &Path, partition_mutex: &Arc<Mutex<()>>) {
        let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference in the map, one held by the caller.
        if Arc::strong_count(partition_mutex) == 2 {
            map.remove(store_path);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn with_file_lock<T>(
    store_path: &Path,
    f: impl FnOnce() -> Result<T, TrackerError>,
) -> Result<T, TrackerError> {
    let lock_path = lock_file_path(store_path);
    if let Some(dir) = lock_path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| TrackerError::io(dir, e))?;
    }
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)
        .map_err(|source| TrackerError::Lock {
            path: lock_path.clone(),
            source,
        })?;
    lock_file
        .lock_exclusive()
        .map_err(|source| TrackerError::Lock {
            path: lock_path.clone(),
            source,
        })?;
    debug!("Acquired partition lock {}", lock_path.display());

    let result = f();

    let _ = FileExt::unlock(&lock_file);
    result
}

/// `Tracker/Candidates_Tracker.xlsx` -> `Tracker/.Candidates_Tracker.lock`
pub fn lock_file_path(store_path: &Path) -> PathBuf {
    let stem = store_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tracker".to_string());
    store_path.with_file_name(format!(".{stem}.lock"))
}
