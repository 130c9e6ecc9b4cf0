//! File-backed [`PrefsStore`] for native hosts.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use platform_host::PrefsStore;

use crate::json_file::{ensure_parent_dir, load_json_map, save_json_map};

const PREFS_FILE_NAME: &str = "prefs.json";
const PREFS_LABEL: &str = "prefs map";

type PrefMap = BTreeMap<String, String>;

fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        Err("Preference key must not be empty".to_string())
    } else {
        Ok(())
    }
}

#[derive(Debug)]
/// Preference store keeping every key in one JSON map file.
///
/// The map is read once on first access and written through on every change.
pub struct FilePrefsStore {
    file: PathBuf,
    cache: Mutex<Option<PrefMap>>,
}

impl FilePrefsStore {
    /// Creates a store backed by `<root>/prefs.json`, creating `root` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn from_root(root: impl AsRef<Path>) -> Result<Self, String> {
        let file = root.as_ref().join(PREFS_FILE_NAME);
        ensure_parent_dir(&file)?;
        Ok(Self::from_file(file))
    }

    /// Creates a store backed by `file` without touching the disk.
    pub fn from_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            cache: Mutex::new(None),
        }
    }

    /// Path of the backing file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    fn with_map<T>(
        &self,
        op: impl FnOnce(&mut PrefMap) -> Result<(T, bool), String>,
    ) -> Result<T, String> {
        let mut cache = self.cache.lock();
        if cache.is_none() {
            *cache = Some(load_json_map(&self.file, PREFS_LABEL)?);
        }
        let map = cache.get_or_insert_with(PrefMap::new);
        let mut staged = map.clone();
        let (value, dirty) = op(&mut staged)?;
        if dirty {
            ensure_parent_dir(&self.file)?;
            save_json_map(&self.file, &staged, PREFS_LABEL)?;
            *map = staged;
        }
        Ok(value)
    }
}

impl PrefsStore for FilePrefsStore {
    fn load_pref(&self, key: &str) -> Result<Option<String>, String> {
        validate_key(key)?;
        self.with_map(|map| Ok((map.get(key).cloned(), false)))
    }

    fn save_pref(&self, key: &str, raw_json: &str) -> Result<(), String> {
        validate_key(key)?;
        self.with_map(|map| {
            map.insert(key.to_string(), raw_json.to_string());
            Ok(((), true))
        })
    }

    fn delete_pref(&self, key: &str) -> Result<(), String> {
        validate_key(key)?;
        self.with_map(|map| {
            let removed = map.remove(key).is_some();
            Ok(((), removed))
        })
    }
}
