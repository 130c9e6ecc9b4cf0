//! Key-value engines owned by the persistence worker.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::json_file::{ensure_parent_dir, load_json_map, save_json_map};

const STORE_LABEL: &str = "store";

type EntryMap = BTreeMap<String, Value>;

/// Single-store key-value engine driven by the persistence worker thread.
///
/// The worker calls [`KvEngine::open`] exactly once, lazily, before the first request.
pub trait KvEngine {
    /// Opens or creates the backing store.
    fn open(&mut self) -> Result<(), String>;

    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Value>, String>;

    /// Stores `value` under `key`.
    fn put(&mut self, key: &str, value: Value) -> Result<(), String>;

    /// Removes `key`; missing keys are not an error.
    fn delete(&mut self, key: &str) -> Result<(), String>;

    /// Lists every stored key in ascending order.
    fn keys(&self) -> Result<Vec<String>, String>;
}

#[derive(Debug, Clone, Default)]
/// Volatile engine for tests and hosts without durable storage.
pub struct MemoryKvEngine {
    entries: EntryMap,
}

impl MemoryKvEngine {
    /// Creates an engine pre-populated with `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }
}

impl KvEngine for MemoryKvEngine {
    fn open(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, String> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), String> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), String> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, String> {
        Ok(self.entries.keys().cloned().collect())
    }
}

#[derive(Debug, Clone)]
/// Durable engine backed by a single JSON object file.
///
/// The whole map is rewritten on every mutation through a temporary sibling file and a rename,
/// so a crash leaves either the previous or the new map on disk.
pub struct JsonFileKvEngine {
    file: PathBuf,
    entries: EntryMap,
    opened: bool,
}

impl JsonFileKvEngine {
    /// Creates an engine for `file`; nothing touches the disk until [`KvEngine::open`].
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            entries: EntryMap::new(),
            opened: false,
        }
    }

    /// Path of the backing file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn ensure_opened(&self) -> Result<(), String> {
        if self.opened {
            Ok(())
        } else {
            Err(format!("store {} is not open", self.file.display()))
        }
    }

    fn persist(&self) -> Result<(), String> {
        save_json_map(&self.file, &self.entries, STORE_LABEL)
    }
}

impl KvEngine for JsonFileKvEngine {
    fn open(&mut self) -> Result<(), String> {
        if self.opened {
            return Ok(());
        }
        ensure_parent_dir(&self.file)?;
        self.entries = load_json_map(&self.file, STORE_LABEL)?;
        self.opened = true;
        log::debug!(
            "opened json store {} with {} key(s)",
            self.file.display(),
            self.entries.len()
        );
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, String> {
        self.ensure_opened()?;
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), String> {
        self.ensure_opened()?;
        let previous = self.entries.insert(key.to_string(), value);
        if let Err(err) = self.persist() {
            match previous {
                Some(previous) => self.entries.insert(key.to_string(), previous),
                None => self.entries.remove(key),
            };
            return Err(err);
        }
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), String> {
        self.ensure_opened()?;
        let Some(previous) = self.entries.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.persist() {
            self.entries.insert(key.to_string(), previous);
            return Err(err);
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, String> {
        self.ensure_opened()?;
        Ok(self.entries.keys().cloned().collect())
    }
}
