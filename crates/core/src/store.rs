// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable key-value byte stores.
//!
//! The queue only needs `read`, `write` and `remove` on a handful of keys.
//! [`FileStore`] keeps one file per key and replaces it atomically;
//! [`MemoryStore`] is for tests and hosts that bring their own persistence.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fs2::FileExt;

use crate::error::{Error, Result};

/// A durable key-value byte store provided by the host.
pub trait PersistentStore: Send + Sync {
    /// Reads the bytes stored under `key`, or `None` if the key is absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Stores `bytes` under `key`, replacing any previous value.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Removes `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<S: PersistentStore + ?Sized> PersistentStore for Arc<S> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        (**self).write(key, bytes)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// Lock filename, shared by every process writing to the same directory.
const LOCK_NAME: &str = ".lock";
/// Extension of value files.
const VALUE_EXT: &str = "json";

/// Store keeping each key in `<dir>/<key>.json`.
///
/// Writes go to a temp file that is fsynced and renamed over the target, so a
/// crash mid-write leaves either the old or the new value, never a torn one.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| storage_err("create", dir, e))?;
        Ok(FileStore {
            dir: dir.to_path_buf(),
        })
    }

    /// Directory the store lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{VALUE_EXT}")))
    }

    /// Takes the directory-wide advisory lock. Released when the file drops.
    fn lock(&self) -> Result<File> {
        let path = self.dir.join(LOCK_NAME);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| storage_err("open lock", &path, e))?;
        file.lock_exclusive()
            .map_err(|e| storage_err("lock", &path, e))?;
        Ok(file)
    }
}

impl PersistentStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err("read", &path, e)),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension(format!("{VALUE_EXT}.tmp"));
        let _lock = self.lock()?;

        let mut file = File::create(&tmp).map_err(|e| storage_err("create", &tmp, e))?;
        file.write_all(bytes)
            .and_then(|()| file.sync_all())
            .map_err(|e| storage_err("write", &tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| storage_err("replace", &path, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        let _lock = self.lock()?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_err("remove", &path, e)),
        }
    }
}

fn storage_err(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Storage(format!("failed to {action} {}: {e}", path.display()))
}

/// Keys become file names, so they are restricted to a safe alphabet.
fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "invalid store key '{key}': use letters, digits, '_', '-' or '.', not starting with '.'"
        )))
    }
}

/// In-memory store. Contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` currently holds a value.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(key)
    }
}

impl PersistentStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
