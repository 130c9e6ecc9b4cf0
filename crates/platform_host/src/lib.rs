//! Typed host-domain contracts and shared models used by the desktop runtime and storage workers.
//!
//! This crate is the API-first boundary for platform services. It exposes the virtual filesystem
//! node model and path helpers, the [`DurableStore`] seam behind which persistence workers live,
//! the synchronous [`PrefsStore`] used for session restoration, and time helpers. Concrete
//! worker-backed adapters live in `platform_storage`.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod fs;
pub mod storage;
pub mod time;

pub use fs::path::{
    file_extension, is_descendant, is_direct_child, leaf_name, normalize_virtual_path,
    parent_path, ROOT_PATH,
};
pub use fs::types::{FileNode, NodeKind};
pub use storage::durable::{DurableStore, DurableStoreFuture, MemoryDurableStore, StorageError};
pub use storage::prefs::{
    load_pref_with, save_pref_with, MemoryPrefsStore, NoopPrefsStore, PrefsStore,
};
pub use time::{next_monotonic_timestamp_ms, unix_time_ms_now};
