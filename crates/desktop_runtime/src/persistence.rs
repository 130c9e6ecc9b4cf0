//! Window layout persistence through a [`PrefsStore`].

use platform_host::{load_pref_with, save_pref_with, PrefsStore};

use crate::model::{DesktopState, WindowManagerSnapshot};

/// Loads the persisted window layout stored under `key`.
///
/// Missing and unreadable records both yield `None`; the latter is logged.
pub fn load_layout_snapshot<S: PrefsStore + ?Sized>(
    store: &S,
    key: &str,
) -> Option<WindowManagerSnapshot> {
    match load_pref_with::<S, WindowManagerSnapshot>(store, key) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            log::warn!("window layout load from `{key}` failed: {err}");
            None
        }
    }
}

/// Persists `{windows, windowOrder}` for `state` under `key`.
///
/// # Errors
///
/// Returns an error when serialization or the store write fails.
pub fn persist_layout_snapshot<S: PrefsStore + ?Sized>(
    store: &S,
    key: &str,
    state: &DesktopState,
) -> Result<(), String> {
    save_pref_with(store, key, &state.snapshot())
}
