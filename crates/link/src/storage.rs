// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value storage for the offline queue.
//!
//! [`FileStore`] keeps one file per key inside a directory. Each write goes to
//! a temp file that is fsynced and then renamed over the old value, so a crash
//! leaves either the previous value or the new one, never a torn write.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::future::Future;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use fs2::FileExt;
use rideline_core::{Error, Result};
use tokio::sync::Mutex;

/// Boxed future returned by store methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Asynchronous string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never written.
    fn get(&self, key: &str) -> StoreFuture<'_, Option<String>>;

    /// Replaces the value stored under `key`.
    fn set(&self, key: &str, value: String) -> StoreFuture<'_, ()>;

    /// Deletes `key`. Deleting a missing key is not an error.
    fn remove(&self, key: &str) -> StoreFuture<'_, ()>;
}

const LOCK_FILE: &str = ".lock";

/// File-per-key store rooted at a directory.
///
/// Holds an exclusive lock on the directory for its whole lifetime, so two
/// processes can never interleave writes to the same queue.
pub struct FileStore {
    dir: PathBuf,
    /// Held for the lock, never read.
    _lock: File,
}

impl FileStore {
    /// Opens (creating if needed) a store in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(dir.join(LOCK_FILE))?;
        lock.try_lock_exclusive().map_err(|e| {
            Error::Storage(format!(
                "{} is locked by another process: {e}",
                dir.display()
            ))
        })?;

        Ok(FileStore { dir, _lock: lock })
    }

    /// Platform data directory for rideline, e.g. `~/.local/share/rideline`.
    pub fn default_location() -> Option<PathBuf> {
        dirs::data_local_dir().map(|d| d.join("rideline"))
    }

    /// Directory this store writes to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(Error::Storage(format!("invalid storage key '{key}'")));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

fn write_atomically(path: &Path, value: &str) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut file = File::create(&tmp)?;
    file.write_all(value.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Storage(format!("storage task failed: {e}")))?
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreFuture<'_, Option<String>> {
        let path = self.path_for(key);
        Box::pin(async move {
            let path = path?;
            blocking(move || match fs::read_to_string(&path) {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            })
            .await
        })
    }

    fn set(&self, key: &str, value: String) -> StoreFuture<'_, ()> {
        let path = self.path_for(key);
        Box::pin(async move {
            let path = path?;
            blocking(move || write_atomically(&path, &value)).await
        })
    }

    fn remove(&self, key: &str) -> StoreFuture<'_, ()> {
        let path = self.path_for(key);
        Box::pin(async move {
            let path = path?;
            blocking(move || match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            })
            .await
        })
    }
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreFuture<'_, Option<String>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.entries.lock().await.get(&key).cloned()) })
    }

    fn set(&self, key: &str, value: String) -> StoreFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.entries.lock().await.insert(key, value);
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> StoreFuture<'_, ()> {
        let key = key.to_string();
        Box::pin(async move {
            self.entries.lock().await.remove(&key);
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
