//! Durable key-value contracts for mirroring the virtual filesystem.
//!
//! The VFS store owns the authoritative node tree; a [`DurableStore`] only keeps a mirror keyed by
//! absolute path. Implementations dispatch each request when the method is called and hand back a
//! future that merely observes completion, so dropping the future never cancels durability.

use std::{cell::RefCell, collections::BTreeMap, future::Future, pin::Pin, rc::Rc};

use thiserror::Error;

use crate::fs::types::FileNode;

/// Boxed future returned by [`DurableStore`] operations.
pub type DurableStoreFuture<T> = Pin<Box<dyn Future<Output = T>>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures reported by durable storage backends.
pub enum StorageError {
    /// The backend could not be constructed, or it stopped answering.
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    /// A single request was rejected by the backend.
    #[error("storage operation failed: {0}")]
    OperationFailed(String),
    /// A request did not complete within the configured deadline.
    #[error("storage request timed out")]
    Timeout,
    /// A payload could not be encoded or decoded.
    #[error("storage codec error: {0}")]
    Codec(String),
}

/// Durable mirror of the virtual filesystem keyed by absolute path.
pub trait DurableStore {
    /// Reads the node stored under `key`.
    fn read(&self, key: String) -> DurableStoreFuture<Result<Option<FileNode>, StorageError>>;

    /// Stores `value` under `key`, replacing any previous node.
    fn write(&self, key: String, value: FileNode) -> DurableStoreFuture<Result<(), StorageError>>;

    /// Removes `key`; removing a missing key succeeds.
    fn delete(&self, key: String) -> DurableStoreFuture<Result<(), StorageError>>;

    /// Lists every stored key.
    fn get_all_keys(&self) -> DurableStoreFuture<Result<Vec<String>, StorageError>>;
}

#[derive(Debug, Clone, Default)]
/// In-process durable store used by tests and single-context hosts.
pub struct MemoryDurableStore {
    inner: Rc<RefCell<BTreeMap<String, FileNode>>>,
}

impl MemoryDurableStore {
    /// Returns a copy of the node stored under `key`.
    pub fn get(&self, key: &str) -> Option<FileNode> {
        self.inner.borrow().get(key).cloned()
    }

    /// Returns the number of stored keys.
    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }
}

impl DurableStore for MemoryDurableStore {
    fn read(&self, key: String) -> DurableStoreFuture<Result<Option<FileNode>, StorageError>> {
        let node = self.inner.borrow().get(&key).cloned();
        Box::pin(async move { Ok(node) })
    }

    fn write(&self, key: String, value: FileNode) -> DurableStoreFuture<Result<(), StorageError>> {
        self.inner.borrow_mut().insert(key, value);
        Box::pin(async { Ok(()) })
    }

    fn delete(&self, key: String) -> DurableStoreFuture<Result<(), StorageError>> {
        self.inner.borrow_mut().remove(&key);
        Box::pin(async { Ok(()) })
    }

    fn get_all_keys(&self) -> DurableStoreFuture<Result<Vec<String>, StorageError>> {
        let keys = self.inner.borrow().keys().cloned().collect::<Vec<_>>();
        Box::pin(async move { Ok(keys) })
    }
}
