//! Virtual filesystem store: authoritative in-memory tree with write-through durability.
//!
//! Mutations replace the cached tree before any durability request is issued, so every reader on
//! the owning thread sees a write as soon as the call returns. The returned future only reports
//! whether the durable mirror acknowledged it. Dropping that future does not cancel durability;
//! [`VfsStore::flush`] awaits everything issued so far.

use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
    fmt,
    future::Future,
    rc::Rc,
};

use futures::{
    future::{self, join_all, LocalBoxFuture, Shared},
    FutureExt,
};
use platform_host::{
    is_descendant, is_direct_child, next_monotonic_timestamp_ms, normalize_virtual_path,
    parent_path, DurableStore, FileNode, StorageError, ROOT_PATH,
};
use thiserror::Error;

use crate::config::VfsConfig;

/// Cached node tree keyed by absolute path.
pub type FileTree = BTreeMap<String, FileNode>;

/// Future resolving once the durable mirror acknowledged a mutation.
pub type DurabilityFuture = LocalBoxFuture<'static, Result<(), VfsError>>;

type SharedDurability = Shared<DurabilityFuture>;

/// Prefix exported by [`VfsStore::export_user_files`] by default.
pub const DEFAULT_EXPORT_PREFIX: &str = "/home";

const SEED_DIRECTORIES: [&str; 4] = ["/", "/home", "/home/user", "/home/user/documents"];
const SEED_FILE_PATH: &str = "/home/user/documents/manifesto.txt";
const SEED_FILE_CONTENT: &str =
    "AetherOS: Weightless Computing.\n\nEverything is fluid. Everything is alive.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
/// Failures reported by [`VfsStore`] operations.
pub enum VfsError {
    /// Nothing exists at the path, in the cache or the durable mirror.
    #[error("no such file: {0}")]
    NotFound(String),
    /// The persistence worker is gone or stopped answering.
    #[error("persistence worker unavailable: {0}")]
    WorkerUnavailable(String),
    /// The persistence worker rejected this request.
    #[error("persistence operation failed: {0}")]
    OperationFailed(String),
    /// A file operation targeted a directory.
    #[error("is a directory: {0}")]
    IsADirectory(String),
    /// A directory operation targeted a file, or a parent is a file.
    #[error("not a directory: {0}")]
    NotADirectory(String),
    /// The parent directory of the path does not exist.
    #[error("parent directory does not exist: {0}")]
    ParentNotFound(String),
    /// The operation is not allowed on this path.
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl From<StorageError> for VfsError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(reason) => Self::WorkerUnavailable(reason),
            StorageError::Timeout => Self::WorkerUnavailable("request timed out".to_string()),
            StorageError::OperationFailed(reason) | StorageError::Codec(reason) => {
                Self::OperationFailed(reason)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Whether mutations reach a durable mirror.
pub enum DurabilityMode {
    /// Mutations are mirrored to the durable store.
    Durable,
    /// No durable store; the tree lives for this session only.
    MemoryOnly,
}

/// Builds the tree seeded into an empty filesystem.
pub fn default_tree(now: u64) -> FileTree {
    let mut tree = SEED_DIRECTORIES
        .iter()
        .map(|path| (path.to_string(), FileNode::directory(*path, now)))
        .collect::<FileTree>();
    tree.insert(
        SEED_FILE_PATH.to_string(),
        FileNode::file(SEED_FILE_PATH, SEED_FILE_CONTENT, now),
    );
    tree
}

enum DurableOp {
    Write(FileNode),
    Delete(String),
}

struct VfsInner {
    config: VfsConfig,
    backend: RefCell<Option<Rc<dyn DurableStore>>>,
    files: RefCell<Rc<FileTree>>,
    init_task: RefCell<Option<Shared<LocalBoxFuture<'static, ()>>>>,
    initialized: Cell<bool>,
    in_flight: RefCell<Vec<SharedDurability>>,
    deletions: Cell<u64>,
}

#[derive(Clone)]
/// Handle to the virtual filesystem; clones share one tree.
pub struct VfsStore {
    inner: Rc<VfsInner>,
}

impl fmt::Debug for VfsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VfsStore")
            .field("nodes", &self.inner.files.borrow().len())
            .field("mode", &self.durability_mode())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

fn ready<T: 'static>(value: T) -> LocalBoxFuture<'static, T> {
    future::ready(value).boxed_local()
}

impl VfsStore {
    /// Creates an empty store; `None` runs in memory only. Call [`Self::init`] before use.
    pub fn new(backend: Option<Rc<dyn DurableStore>>, config: VfsConfig) -> Self {
        Self {
            inner: Rc::new(VfsInner {
                config,
                backend: RefCell::new(backend),
                files: RefCell::new(Rc::new(FileTree::new())),
                init_task: RefCell::new(None),
                initialized: Cell::new(false),
                in_flight: RefCell::new(Vec::new()),
                deletions: Cell::new(0),
            }),
        }
    }

    /// Creates a store mirrored to `backend`.
    pub fn with_backend(backend: impl DurableStore + 'static, config: VfsConfig) -> Self {
        Self::new(Some(Rc::new(backend)), config)
    }

    /// Creates a store without durability.
    pub fn memory_only(config: VfsConfig) -> Self {
        Self::new(None, config)
    }

    /// Configuration in effect.
    pub fn config(&self) -> &VfsConfig {
        &self.inner.config
    }

    /// Current durability mode.
    pub fn durability_mode(&self) -> DurabilityMode {
        if self.inner.backend.borrow().is_some() {
            DurabilityMode::Durable
        } else {
            DurabilityMode::MemoryOnly
        }
    }

    /// Returns `true` once [`Self::init`] completed.
    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.get()
    }

    /// Current tree. Later mutations do not affect a snapshot already handed out.
    pub fn snapshot(&self) -> Rc<FileTree> {
        Rc::clone(&self.inner.files.borrow())
    }

    fn backend(&self) -> Option<Rc<dyn DurableStore>> {
        self.inner.backend.borrow().clone()
    }

    fn update_tree(&self, apply: impl FnOnce(&mut FileTree)) {
        let mut files = self.inner.files.borrow_mut();
        apply(Rc::make_mut(&mut files));
    }

    /// Loads the tree from the durable mirror, seeding it when empty.
    ///
    /// Idempotent: concurrent and repeated calls share one run. When the mirror is missing or
    /// fails, the default tree is seeded in memory and durability is switched off for the rest
    /// of the session.
    pub fn init(&self) -> impl Future<Output = ()> + 'static {
        self.inner
            .init_task
            .borrow_mut()
            .get_or_insert_with(|| {
                let inner = Rc::downgrade(&self.inner);
                async move {
                    if let Some(inner) = inner.upgrade() {
                        VfsStore { inner }.hydrate().await;
                    }
                }
                .boxed_local()
                .shared()
            })
            .clone()
    }

    async fn hydrate(self) {
        match self.backend() {
            Some(backend) => match self.load_or_seed(backend.as_ref()).await {
                Ok(loaded) => log::info!("filesystem ready with {loaded} node(s)"),
                Err(err) => {
                    log::warn!("persistence unavailable during init, continuing in memory: {err}");
                    self.degrade_to_memory();
                }
            },
            None => {
                log::warn!("no persistence backend, continuing in memory");
                self.degrade_to_memory();
            }
        }
        self.inner.initialized.set(true);
    }

    async fn load_or_seed(&self, backend: &dyn DurableStore) -> Result<usize, StorageError> {
        let keys = backend.get_all_keys().await?;
        if keys.is_empty() {
            let tree = default_tree(next_monotonic_timestamp_ms());
            self.merge_under_cache(tree.clone());
            let writes = tree
                .into_iter()
                .map(|(key, node)| backend.write(key, node))
                .collect::<Vec<_>>();
            for result in join_all(writes).await {
                result?;
            }
            return Ok(self.inner.files.borrow().len());
        }

        let reads = keys.iter().map(|key| backend.read(key.clone())).collect::<Vec<_>>();
        let mut loaded = FileTree::new();
        for (key, result) in keys.into_iter().zip(join_all(reads).await) {
            match result {
                Ok(Some(node)) => {
                    loaded.insert(key, node);
                }
                Ok(None) => {}
                Err(err @ (StorageError::Codec(_) | StorageError::OperationFailed(_))) => {
                    log::warn!("skipping unreadable node {key}: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        self.merge_under_cache(loaded);
        Ok(self.inner.files.borrow().len())
    }

    /// Installs `base` as the tree, keeping nodes written since the store was created.
    fn merge_under_cache(&self, base: FileTree) {
        self.update_tree(|tree| {
            let written = std::mem::replace(tree, base);
            tree.extend(written);
        });
    }

    fn degrade_to_memory(&self) {
        self.inner.backend.borrow_mut().take();
        self.merge_under_cache(default_tree(next_monotonic_timestamp_ms()));
    }

    /// Returns the content of the file at `path`.
    ///
    /// Cached files answer immediately. On a cache miss the durable mirror is consulted and, when
    /// [`VfsConfig::cache_fill_on_read`] is set, the node is kept in the cache.
    pub fn read_file(&self, path: &str) -> LocalBoxFuture<'static, Result<String, VfsError>> {
        let path = normalize_virtual_path(path);
        if let Some(node) = self.inner.files.borrow().get(&path) {
            let result = if node.is_dir() {
                Err(VfsError::IsADirectory(path))
            } else {
                Ok(node.content.clone().unwrap_or_default())
            };
            return ready(result);
        }

        let Some(backend) = self.backend() else {
            return ready(Err(VfsError::NotFound(path)));
        };
        let request = backend.read(path.clone());
        let store = self.clone();
        let deletions = self.inner.deletions.get();
        async move {
            match request.await? {
                None => Err(VfsError::NotFound(path)),
                Some(node) if node.is_dir() => Err(VfsError::IsADirectory(path)),
                Some(node) => {
                    let content = node.content.clone().unwrap_or_default();
                    if store.config().cache_fill_on_read {
                        store.fill_from_mirror(path, node, deletions);
                    }
                    Ok(content)
                }
            }
        }
        .boxed_local()
    }

    /// Caches a node fetched by a slow read unless the tree moved on while the read was pending.
    fn fill_from_mirror(&self, path: String, node: FileNode, deletions_at_read: u64) {
        if self.inner.deletions.get() != deletions_at_read {
            log::debug!("not caching {path}: a delete ran while it was being read");
            return;
        }
        {
            let files = self.inner.files.borrow();
            if files.contains_key(&path) || self.check_parent(&files, &path).is_err() {
                return;
            }
        }
        self.update_tree(|tree| {
            tree.insert(path, node);
        });
    }

    /// Creates or replaces the file at `path`.
    ///
    /// The cache is updated before this returns; the future resolves when the durable mirror
    /// acknowledged the write. An existing file keeps its creation time.
    pub fn write_file(&self, path: &str, content: impl Into<String>) -> DurabilityFuture {
        let path = normalize_virtual_path(path);
        let node = {
            let files = self.inner.files.borrow();
            match self.prepare_file(&files, &path, content.into()) {
                Ok(node) => node,
                Err(err) => return ready(Err(err)),
            }
        };
        self.update_tree(|tree| {
            tree.insert(path, node.clone());
        });
        self.persist(vec![DurableOp::Write(node)])
    }

    fn prepare_file(
        &self,
        files: &FileTree,
        path: &str,
        content: String,
    ) -> Result<FileNode, VfsError> {
        if path == ROOT_PATH {
            return Err(VfsError::InvalidPath(path.to_string()));
        }
        let existing = files.get(path);
        if existing.is_some_and(FileNode::is_dir) {
            return Err(VfsError::IsADirectory(path.to_string()));
        }
        self.check_parent(files, path)?;

        let now = next_monotonic_timestamp_ms();
        let mut node = FileNode::file(path, content, now);
        if let Some(existing) = existing {
            node.created_at = existing.created_at;
            node.updated_at = now.max(existing.created_at);
        }
        Ok(node)
    }

    fn check_parent(&self, files: &FileTree, path: &str) -> Result<(), VfsError> {
        if !self.inner.config.enforce_parent_directories {
            return Ok(());
        }
        let Some(parent) = parent_path(path) else {
            return Ok(());
        };
        match files.get(&parent) {
            Some(node) if node.is_dir() => Ok(()),
            Some(_) => Err(VfsError::NotADirectory(parent)),
            None => Err(VfsError::ParentNotFound(parent)),
        }
    }

    /// Creates a directory. An existing directory is left untouched.
    pub fn mkdir(&self, path: &str) -> DurabilityFuture {
        let path = normalize_virtual_path(path);
        let node = {
            let files = self.inner.files.borrow();
            match files.get(&path) {
                Some(existing) if existing.is_dir() => return ready(Ok(())),
                Some(_) => return ready(Err(VfsError::NotADirectory(path))),
                None => {}
            }
            if let Err(err) = self.check_parent(&files, &path) {
                return ready(Err(err));
            }
            FileNode::directory(path.clone(), next_monotonic_timestamp_ms())
        };
        self.update_tree(|tree| {
            tree.insert(path, node.clone());
        });
        self.persist(vec![DurableOp::Write(node)])
    }

    /// Removes `path` and everything below it from the cache and the durable mirror.
    ///
    /// The mirror is asked to delete `path` even when it is not cached, so nodes only the mirror
    /// knows about go away too. Deleting a path that exists nowhere succeeds.
    pub fn delete_file(&self, path: &str) -> DurabilityFuture {
        let path = normalize_virtual_path(path);
        if path == ROOT_PATH {
            return ready(Err(VfsError::InvalidPath(path)));
        }
        let cached = self
            .inner
            .files
            .borrow()
            .keys()
            .filter(|key| **key == path || is_descendant(&path, key))
            .cloned()
            .collect::<Vec<_>>();
        if !cached.is_empty() {
            self.update_tree(|tree| {
                for key in &cached {
                    tree.remove(key);
                }
            });
        }
        self.inner.deletions.set(self.inner.deletions.get().wrapping_add(1));
        log::debug!("deleted {path} ({} cached node(s))", cached.len());

        let mut keys = cached;
        if !keys.contains(&path) {
            keys.insert(0, path);
        }
        self.persist(keys.into_iter().map(DurableOp::Delete).collect())
    }

    /// Lists the direct children of `path`, directories first, then by name.
    pub fn readdir(&self, path: &str) -> Vec<FileNode> {
        let path = normalize_virtual_path(path);
        let mut children = self
            .inner
            .files
            .borrow()
            .values()
            .filter(|node| is_direct_child(&path, &node.path))
            .cloned()
            .collect::<Vec<_>>();
        children.sort_by(|a, b| {
            b.is_dir()
                .cmp(&a.is_dir())
                .then_with(|| a.name.cmp(&b.name))
        });
        children
    }

    /// Returns the cached node at `path`.
    pub fn stat(&self, path: &str) -> Option<FileNode> {
        let path = normalize_virtual_path(path);
        self.inner.files.borrow().get(&path).cloned()
    }

    /// Returns `true` when a node is cached at `path`.
    pub fn exists(&self, path: &str) -> bool {
        let path = normalize_virtual_path(path);
        self.inner.files.borrow().contains_key(&path)
    }

    /// Collects `(relative path, content)` for every non-empty file under `prefix`.
    ///
    /// Relative paths drop the leading `/`; results are sorted by path.
    pub fn export_user_files(&self, prefix: &str) -> Vec<(String, String)> {
        let prefix = normalize_virtual_path(prefix);
        self.inner
            .files
            .borrow()
            .values()
            .filter(|node| node.path == prefix || is_descendant(&prefix, &node.path))
            .filter_map(|node| match &node.content {
                Some(content) if node.is_file() && !content.is_empty() => Some((
                    node.path.trim_start_matches('/').to_string(),
                    content.clone(),
                )),
                _ => None,
            })
            .collect()
    }

    /// Waits for every durability request issued so far and reports the first failure.
    pub fn flush(&self) -> impl Future<Output = Result<(), VfsError>> + 'static {
        let pending = std::mem::take(&mut *self.inner.in_flight.borrow_mut());
        async move {
            join_all(pending)
                .await
                .into_iter()
                .find(Result::is_err)
                .unwrap_or(Ok(()))
        }
    }

    fn persist(&self, ops: Vec<DurableOp>) -> DurabilityFuture {
        let Some(backend) = self.backend() else {
            return ready(Ok(()));
        };
        let requests = ops
            .into_iter()
            .map(|op| match op {
                DurableOp::Write(node) => backend.write(node.path.clone(), node),
                DurableOp::Delete(key) => backend.delete(key),
            })
            .collect::<Vec<_>>();
        let task: SharedDurability = async move {
            for result in join_all(requests).await {
                result?;
            }
            Ok::<(), VfsError>(())
        }
        .boxed_local()
        .shared();

        let mut in_flight = self.inner.in_flight.borrow_mut();
        // Failures stay tracked until `flush` reports them.
        in_flight.retain(|pending| !matches!(pending.peek(), Some(Ok(()))));
        in_flight.push(task.clone());
        task.boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::{channel::oneshot, executor::block_on};
    use platform_host::{DurableStoreFuture, MemoryDurableStore, NodeKind};
    use pretty_assertions::assert_eq;

    use super::*;

    fn durable_store() -> (VfsStore, MemoryDurableStore) {
        let backend = MemoryDurableStore::default();
        let store = VfsStore::with_backend(backend.clone(), VfsConfig::default());
        block_on(store.init());
        (store, backend)
    }

    fn names(nodes: &[FileNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    struct UnavailableStore;

    impl DurableStore for UnavailableStore {
        fn read(&self, _key: String) -> DurableStoreFuture<Result<Option<FileNode>, StorageError>> {
            Box::pin(async { Err(StorageError::Unavailable("offline".into())) })
        }
        fn write(&self, _key: String, _value: FileNode) -> DurableStoreFuture<Result<(), StorageError>> {
            Box::pin(async { Err(StorageError::Unavailable("offline".into())) })
        }
        fn delete(&self, _key: String) -> DurableStoreFuture<Result<(), StorageError>> {
            Box::pin(async { Err(StorageError::Unavailable("offline".into())) })
        }
        fn get_all_keys(&self) -> DurableStoreFuture<Result<Vec<String>, StorageError>> {
            Box::pin(async { Err(StorageError::Unavailable("offline".into())) })
        }
    }

    /// Memory store whose writes stay pending until released, and which rejects `/locked` keys.
    #[derive(Clone, Default)]
    struct GatedStore {
        inner: MemoryDurableStore,
        gates: Rc<RefCell<Vec<oneshot::Sender<()>>>>,
        gated: Rc<Cell<bool>>,
    }

    impl GatedStore {
        fn release_all(&self) {
            for gate in self.gates.borrow_mut().drain(..) {
                let _ = gate.send(());
            }
        }
    }

    impl DurableStore for GatedStore {
        fn read(&self, key: String) -> DurableStoreFuture<Result<Option<FileNode>, StorageError>> {
            self.inner.read(key)
        }
        fn write(&self, key: String, value: FileNode) -> DurableStoreFuture<Result<(), StorageError>> {
            if key.starts_with("/locked") {
                return Box::pin(async { Err(StorageError::OperationFailed("locked".into())) });
            }
            let done = self.inner.write(key, value);
            if !self.gated.get() {
                return done;
            }
            let (tx, rx) = oneshot::channel();
            self.gates.borrow_mut().push(tx);
            Box::pin(async move {
                let _ = rx.await;
                done.await
            })
        }
        fn delete(&self, key: String) -> DurableStoreFuture<Result<(), StorageError>> {
            self.inner.delete(key)
        }
        fn get_all_keys(&self) -> DurableStoreFuture<Result<Vec<String>, StorageError>> {
            self.inner.get_all_keys()
        }
    }

    #[test]
    fn init_seeds_default_tree_durably_once() {
        let (store, backend) = durable_store();
        assert!(store.is_initialized());
        assert_eq!(store.durability_mode(), DurabilityMode::Durable);
        assert_eq!(backend.len(), 5);
        assert_eq!(
            block_on(store.read_file("/home/user/documents/manifesto.txt")).expect("read"),
            SEED_FILE_CONTENT
        );

        block_on(store.write_file("/home/user/notes.txt", "hi")).expect("write");
        block_on(store.init());
        assert_eq!(backend.len(), 6);
        assert!(store.exists("/home/user/notes.txt"));
    }

    #[test]
    fn init_hydrates_existing_nodes_instead_of_seeding() {
        let backend = MemoryDurableStore::default();
        block_on(backend.write("/".into(), FileNode::directory("/", 1))).expect("seed root");
        block_on(backend.write("/a.txt".into(), FileNode::file("/a.txt", "alpha", 1)))
            .expect("seed file");

        let store = VfsStore::with_backend(backend.clone(), VfsConfig::default());
        block_on(store.init());
        assert_eq!(names(&store.readdir("/")), vec!["a.txt"]);
        assert!(!store.exists("/home"));
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn unavailable_backend_degrades_to_memory() {
        let store = VfsStore::with_backend(UnavailableStore, VfsConfig::default());
        block_on(store.init());

        assert_eq!(store.durability_mode(), DurabilityMode::MemoryOnly);
        assert!(store.exists(SEED_FILE_PATH));
        block_on(store.write_file("/home/user/todo.txt", "ship it")).expect("memory write");
        assert_eq!(
            block_on(store.read_file("/home/user/todo.txt")).expect("read"),
            "ship it"
        );
        assert_eq!(
            block_on(store.read_file("/nowhere.txt")),
            Err(VfsError::NotFound("/nowhere.txt".into()))
        );
    }

    #[test]
    fn writes_are_visible_before_durability_completes() {
        let backend = GatedStore::default();
        let store = VfsStore::with_backend(backend.clone(), VfsConfig::default());
        block_on(store.init());
        backend.gated.set(true);

        let pending = store.write_file("/home/user/draft.txt", "v1");
        assert_eq!(
            block_on(store.read_file("/home/user/draft.txt")).expect("read"),
            "v1"
        );
        assert_eq!(backend.gates.borrow().len(), 1);

        backend.release_all();
        block_on(pending).expect("durable write");
        block_on(store.flush()).expect("flush");
    }

    #[test]
    fn rewrite_keeps_created_at_and_bumps_updated_at() {
        let (store, _) = durable_store();
        block_on(store.write_file("/home/user/log.txt", "one")).expect("write");
        let first = store.stat("/home/user/log.txt").expect("node");
        block_on(store.write_file("/home/user/log.txt", "two")).expect("rewrite");
        let second = store.stat("/home/user/log.txt").expect("node");

        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.name, "log.txt");
        assert_eq!(second.kind, NodeKind::File);
    }

    #[test]
    fn strict_mode_validates_targets_and_parents() {
        let (store, _) = durable_store();
        assert_eq!(
            block_on(store.write_file("/missing/a.txt", "x")),
            Err(VfsError::ParentNotFound("/missing".into()))
        );
        assert_eq!(
            block_on(store.write_file("/home/user", "x")),
            Err(VfsError::IsADirectory("/home/user".into()))
        );
        assert_eq!(
            block_on(store.write_file("/", "x")),
            Err(VfsError::InvalidPath("/".into()))
        );
        assert_eq!(
            block_on(store.mkdir("/home/user/documents/manifesto.txt/sub")),
            Err(VfsError::NotADirectory(
                "/home/user/documents/manifesto.txt".into()
            ))
        );
        assert_eq!(
            block_on(store.mkdir("/home/user/documents/manifesto.txt")),
            Err(VfsError::NotADirectory(
                "/home/user/documents/manifesto.txt".into()
            ))
        );
        assert!(!store.exists("/missing/a.txt"));
    }

    #[test]
    fn permissive_mode_accepts_orphans() {
        let store = VfsStore::memory_only(VfsConfig {
            enforce_parent_directories: false,
            ..VfsConfig::default()
        });
        block_on(store.init());
        block_on(store.write_file("/orphan/deep/file.txt", "x")).expect("orphan write");
        assert!(store.exists("/orphan/deep/file.txt"));
        assert!(!store.exists("/orphan"));
    }

    #[test]
    fn mkdir_on_existing_directory_is_a_noop() {
        let (store, backend) = durable_store();
        let before = store.stat("/home").expect("home");
        block_on(store.mkdir("/home/")).expect("mkdir existing");
        assert_eq!(store.stat("/home"), Some(before));
        assert_eq!(backend.len(), 5);
    }

    #[test]
    fn delete_removes_descendants_from_cache_and_mirror() {
        let (store, backend) = durable_store();
        block_on(store.mkdir("/home/user/projects")).expect("mkdir");
        block_on(store.write_file("/home/user/projects/a.rs", "fn main() {}")).expect("write");

        block_on(store.delete_file("/home/user")).expect("delete");
        assert_eq!(names(&store.readdir("/home")), Vec::<&str>::new());
        assert!(!store.exists("/home/user/projects/a.rs"));
        assert_eq!(backend.get("/home/user/projects/a.rs"), None);
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn deleting_missing_path_leaves_cache_untouched() {
        let (store, backend) = durable_store();
        let before = store.snapshot();
        block_on(store.delete_file("/home/user/ghost.txt")).expect("delete missing");
        assert!(Rc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(backend.len(), 5);
        assert_eq!(
            block_on(store.delete_file("/")),
            Err(VfsError::InvalidPath("/".into()))
        );
    }

    #[test]
    fn delete_reaches_nodes_only_the_mirror_knows() {
        let (store, backend) = durable_store();
        block_on(backend.write(
            "/home/user/late.txt".into(),
            FileNode::file("/home/user/late.txt", "from disk", 3),
        ))
        .expect("mirror write");
        let before = store.snapshot();

        block_on(store.delete_file("/home/user/late.txt")).expect("delete");
        assert!(Rc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(backend.get("/home/user/late.txt"), None);
        assert_eq!(
            block_on(store.read_file("/home/user/late.txt")),
            Err(VfsError::NotFound("/home/user/late.txt".into()))
        );
    }

    #[test]
    fn delete_removes_cached_orphans_below_a_missing_directory() {
        let backend = MemoryDurableStore::default();
        let store = VfsStore::with_backend(
            backend.clone(),
            VfsConfig {
                enforce_parent_directories: false,
                ..VfsConfig::default()
            },
        );
        block_on(store.init());
        block_on(store.write_file("/orphan/deep/file.txt", "x")).expect("orphan write");

        block_on(store.delete_file("/orphan")).expect("delete");
        assert!(!store.exists("/orphan/deep/file.txt"));
        assert_eq!(backend.get("/orphan/deep/file.txt"), None);
    }

    #[test]
    fn readdir_lists_direct_children_directories_first() {
        let (store, _) = durable_store();
        block_on(store.write_file("/home/user/b.txt", "b")).expect("write");
        block_on(store.mkdir("/home/user/zeta")).expect("mkdir");
        block_on(store.write_file("/home/user/a.txt", "a")).expect("write");

        assert_eq!(
            names(&store.readdir("/home/user")),
            vec!["documents", "zeta", "a.txt", "b.txt"]
        );
        assert_eq!(names(&store.readdir("/")), vec!["home"]);
    }

    #[test]
    fn cache_miss_reads_fall_back_to_the_mirror() {
        for cache_fill_on_read in [true, false] {
            let backend = MemoryDurableStore::default();
            let store = VfsStore::with_backend(
                backend.clone(),
                VfsConfig {
                    cache_fill_on_read,
                    ..VfsConfig::default()
                },
            );
            block_on(store.init());
            block_on(backend.write(
                "/home/user/late.txt".into(),
                FileNode::file("/home/user/late.txt", "from disk", 3),
            ))
            .expect("mirror write");

            assert_eq!(
                block_on(store.read_file("/home/user/late.txt")).expect("slow read"),
                "from disk"
            );
            assert_eq!(store.exists("/home/user/late.txt"), cache_fill_on_read);
        }
    }

    #[test]
    fn slow_read_does_not_restore_a_node_deleted_meanwhile() {
        let (store, backend) = durable_store();
        block_on(backend.write(
            "/home/user/late.txt".into(),
            FileNode::file("/home/user/late.txt", "from disk", 3),
        ))
        .expect("mirror write");

        let read = store.read_file("/home/user/late.txt");
        block_on(store.delete_file("/home/user/late.txt")).expect("delete");
        assert_eq!(block_on(read).expect("read started before delete"), "from disk");
        assert!(!store.exists("/home/user/late.txt"));
    }

    #[test]
    fn slow_read_skips_caching_orphans_when_parents_are_enforced() {
        let (store, backend) = durable_store();
        block_on(backend.write(
            "/srv/data/report.txt".into(),
            FileNode::file("/srv/data/report.txt", "q3", 3),
        ))
        .expect("mirror write");

        assert_eq!(
            block_on(store.read_file("/srv/data/report.txt")).expect("slow read"),
            "q3"
        );
        assert!(!store.exists("/srv/data/report.txt"));
    }

    #[test]
    fn cached_empty_files_and_directories_on_the_fast_path() {
        let (store, _) = durable_store();
        block_on(store.write_file("/home/user/empty.txt", "")).expect("write");
        assert_eq!(
            block_on(store.read_file("/home/user/empty.txt")).expect("read"),
            ""
        );
        assert_eq!(
            block_on(store.read_file("/home")),
            Err(VfsError::IsADirectory("/home".into()))
        );
    }

    #[test]
    fn durability_failures_reject_only_their_operation() {
        let backend = GatedStore::default();
        let store = VfsStore::with_backend(
            backend,
            VfsConfig {
                enforce_parent_directories: false,
                ..VfsConfig::default()
            },
        );
        block_on(store.init());

        let failing = store.write_file("/locked/a.txt", "x");
        let healthy = store.write_file("/home/user/b.txt", "y");
        assert_eq!(
            block_on(failing),
            Err(VfsError::OperationFailed("locked".into()))
        );
        block_on(healthy).expect("healthy write");
        assert_eq!(
            block_on(store.read_file("/locked/a.txt")).expect("cache keeps value"),
            "x"
        );
        // A later success does not hide the earlier failure from `flush`.
        block_on(store.write_file("/home/user/c.txt", "z")).expect("later write");
        assert_eq!(
            block_on(store.flush()),
            Err(VfsError::OperationFailed("locked".into()))
        );
        block_on(store.flush()).expect("nothing pending");
    }

    #[test]
    fn export_collects_non_empty_files_under_prefix() {
        let (store, _) = durable_store();
        block_on(store.write_file("/home/user/empty.txt", "")).expect("write");
        block_on(store.mkdir("/tmp")).expect("mkdir");
        block_on(store.write_file("/tmp/scratch.txt", "x")).expect("write");

        assert_eq!(
            store.export_user_files(DEFAULT_EXPORT_PREFIX),
            vec![(
                "home/user/documents/manifesto.txt".to_string(),
                SEED_FILE_CONTENT.to_string()
            )]
        );
    }
}
