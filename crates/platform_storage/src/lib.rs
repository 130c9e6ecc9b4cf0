//! Persistence worker plumbing for the desktop runtime.
//!
//! Durable filesystem storage runs on a dedicated worker thread that owns a [`KvEngine`]. Clients
//! talk to it through a correlated request/response channel: every request carries an id, the
//! worker echoes it back, and [`CorrelatedClient`] routes each response to the caller that issued
//! it. [`WorkerDurableStore`] exposes the worker behind [`platform_host::DurableStore`].
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use platform_host::{DurableStore, FileNode};
//! use platform_storage::{MemoryKvEngine, PersistenceWorker, WorkerConfig};
//!
//! let worker = PersistenceWorker::spawn(MemoryKvEngine::default(), &WorkerConfig::default())
//!     .expect("worker should start");
//! let store = worker.store();
//! block_on(store.write("/a.txt".into(), FileNode::file("/a.txt", "hi", 1))).expect("write");
//! assert_eq!(block_on(store.get_all_keys()).expect("keys"), vec!["/a.txt".to_string()]);
//! ```

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod channel;
pub mod engine;
mod json_file;
pub mod prefs_file;
pub mod protocol;
pub mod worker;

pub use channel::{CorrelatedClient, FrameTransport, PendingResponse, ResponseDispatcher};
pub use engine::{JsonFileKvEngine, KvEngine, MemoryKvEngine};
pub use prefs_file::FilePrefsStore;
pub use protocol::{RequestFrame, RequestId, ResponseFrame, ResponseStatus, WorkerRequest};
pub use worker::{
    PersistenceWorker, WorkerConfig, WorkerDurableStore, DEFAULT_REQUEST_TIMEOUT_MS,
    DEFAULT_WORKER_THREAD_NAME,
};
