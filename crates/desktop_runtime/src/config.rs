//! Runtime configuration loaded from TOML.
//!
//! Every section and field is optional; missing values fall back to the defaults below.
//!
//! ```toml
//! [vfs]
//! enforce_parent_directories = true
//! cache_fill_on_read = true
//!
//! [window_manager]
//! viewport = { width = 1280, height = 800 }
//! minimize_focus_policy = "clear-active"
//! persistence_key = "aether-os-state"
//!
//! [frame]
//! snap_threshold = 20
//! dock_reserve = 80
//!
//! [worker]
//! request_timeout_ms = 5000
//! thread_name = "aether-kernel"
//! ```

use std::{fs, io, path::Path};

use platform_storage::WorkerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Viewport;

/// Storage key of the persisted window layout.
pub const DEFAULT_PERSISTENCE_KEY: &str = "aether-os-state";

#[derive(Debug, Error)]
/// Failures while loading a [`RuntimeConfig`].
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that failed to load.
        path: String,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// The configuration text is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Virtual filesystem behavior switches.
pub struct VfsConfig {
    /// Reject writes whose parent is not an existing directory.
    pub enforce_parent_directories: bool,
    /// Keep nodes fetched by a cache-missing read in the in-memory tree.
    pub cache_fill_on_read: bool,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            enforce_parent_directories: true,
            cache_fill_on_read: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// What happens to the active-window pointer when a window is minimized.
pub enum MinimizeFocusPolicy {
    /// Always clear the active pointer.
    #[default]
    ClearActive,
    /// Activate the top-most remaining visible window.
    FocusNext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Window manager settings.
pub struct WindowManagerConfig {
    /// Initial desktop viewport used for centering and snapping.
    pub viewport: Viewport,
    /// Active-pointer policy applied on minimize.
    pub minimize_focus_policy: MinimizeFocusPolicy,
    /// Preference key under which the layout is persisted.
    pub persistence_key: String,
}

impl Default for WindowManagerConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            minimize_focus_policy: MinimizeFocusPolicy::default(),
            persistence_key: DEFAULT_PERSISTENCE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Window frame interaction settings.
pub struct FrameConfig {
    /// Pointer distance from a viewport edge that arms a snap.
    pub snap_threshold: i32,
    /// Height kept free for the dock when snapping to a half.
    pub dock_reserve: i32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            snap_threshold: 20,
            dock_reserve: 80,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Complete runtime configuration.
pub struct RuntimeConfig {
    /// Virtual filesystem section.
    pub vfs: VfsConfig,
    /// Window manager section.
    pub window_manager: WindowManagerConfig,
    /// Window frame section.
    pub frame: FrameConfig,
    /// Persistence worker section.
    pub worker: WorkerConfig,
}

impl RuntimeConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or mistyped fields.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and [`ConfigError::Parse`] when it
    /// does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("loaded runtime config from {}", path.display());
        Ok(config)
    }
}
