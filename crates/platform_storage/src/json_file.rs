//! Whole-file JSON object maps shared by the file-backed engine and prefs store.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

/// Loads a JSON object map; missing or blank files yield an empty map.
pub(crate) fn load_json_map<V: DeserializeOwned>(
    path: &Path,
    label: &str,
) -> Result<BTreeMap<String, V>, String> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("failed to read {}: {err}", path.display()))?;
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&raw)
        .map_err(|err| format!("failed to parse {label} {}: {err}", path.display()))
}

/// Replaces `path` with `map` through a temporary sibling file and a rename.
pub(crate) fn save_json_map<V: Serialize>(
    path: &Path,
    map: &BTreeMap<String, V>,
    label: &str,
) -> Result<(), String> {
    let serialized =
        serde_json::to_string(map).map_err(|err| format!("failed to serialize {label}: {err}"))?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, serialized)
        .map_err(|err| format!("failed to write {}: {err}", tmp.display()))?;
    fs::rename(&tmp, path).map_err(|err| {
        format!(
            "failed to replace {} with {}: {err}",
            path.display(),
            tmp.display()
        )
    })
}

/// Creates the parent directory of `path` when it has one.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => fs::create_dir_all(parent)
            .map_err(|err| format!("failed to create dir {}: {err}", parent.display())),
        None => Ok(()),
    }
}
