//! Service bundle that builds the desktop core and injects its collaborators.
//!
//! [`DesktopRuntime`] owns one [`VfsStore`], one [`WindowManager`], one [`FrameController`] and,
//! when it spawned one, the [`PersistenceWorker`] behind the filesystem. Hosts construct it once
//! and hand out references; there are no process-wide singletons.

use std::{future::Future, path::Path, rc::Rc};

use platform_host::{DurableStore, NoopPrefsStore, PrefsStore};
use platform_storage::{FilePrefsStore, JsonFileKvEngine, KvEngine, PersistenceWorker};

use crate::{
    apps::BuiltinAppRegistry,
    config::RuntimeConfig,
    frame::FrameController,
    model::{PointerPosition, Position, ResizeEdge, SnapPreview, Viewport, WindowId, WindowRect},
    vfs::{VfsError, VfsStore},
    window_manager::WindowManager,
};

/// File holding the durable filesystem mirror under a native data directory.
pub const VFS_STORE_FILE: &str = "vfs.json";

/// Desktop core services for one session.
pub struct DesktopRuntime {
    config: RuntimeConfig,
    vfs: VfsStore,
    window_manager: WindowManager,
    frame: FrameController,
    worker: Option<PersistenceWorker>,
}

impl std::fmt::Debug for DesktopRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopRuntime")
            .field("vfs", &self.vfs)
            .field("window_manager", &self.window_manager)
            .field("frame", &self.frame)
            .field("worker", &self.worker.is_some())
            .finish_non_exhaustive()
    }
}

impl DesktopRuntime {
    /// Builds the runtime around an explicit durable backend (`None` for memory only).
    ///
    /// The window layout persisted in `prefs` is restored immediately; the filesystem is loaded
    /// by [`Self::boot`].
    pub fn new(
        config: RuntimeConfig,
        backend: Option<Rc<dyn DurableStore>>,
        prefs: Rc<dyn PrefsStore>,
    ) -> Self {
        Self::assemble(config, backend, prefs, None)
    }

    /// Builds the runtime with a persistence worker serving `engine`.
    ///
    /// When the worker cannot be started the runtime runs the filesystem in memory.
    pub fn with_worker<E>(config: RuntimeConfig, engine: E, prefs: Rc<dyn PrefsStore>) -> Self
    where
        E: KvEngine + Send + 'static,
    {
        match PersistenceWorker::spawn(engine, &config.worker) {
            Ok(worker) => {
                let backend: Rc<dyn DurableStore> = Rc::new(worker.store());
                Self::assemble(config, Some(backend), prefs, Some(worker))
            }
            Err(err) => {
                log::warn!("persistence worker unavailable, filesystem will not persist: {err}");
                Self::assemble(config, None, prefs, None)
            }
        }
    }

    /// Builds the runtime over JSON files in `data_dir`.
    ///
    /// The filesystem mirror lives in [`VFS_STORE_FILE`] and preferences in `prefs.json`. An
    /// unusable preference location disables layout persistence for the session.
    pub fn native(config: RuntimeConfig, data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        let prefs: Rc<dyn PrefsStore> = match FilePrefsStore::from_root(data_dir) {
            Ok(store) => Rc::new(store),
            Err(err) => {
                log::warn!("preferences unavailable, window layout will not persist: {err}");
                Rc::new(NoopPrefsStore)
            }
        };
        let engine = JsonFileKvEngine::new(data_dir.join(VFS_STORE_FILE));
        Self::with_worker(config, engine, prefs)
    }

    fn assemble(
        config: RuntimeConfig,
        backend: Option<Rc<dyn DurableStore>>,
        prefs: Rc<dyn PrefsStore>,
        worker: Option<PersistenceWorker>,
    ) -> Self {
        let vfs = VfsStore::new(backend, config.vfs.clone());
        let window_manager = WindowManager::restore(
            config.window_manager.clone(),
            Rc::new(BuiltinAppRegistry),
            prefs,
        );
        let frame = FrameController::new(config.frame);
        Self {
            config,
            vfs,
            window_manager,
            frame,
            worker,
        }
    }

    /// Loads or seeds the filesystem. Safe to await more than once.
    pub fn boot(&self) -> impl Future<Output = ()> + 'static {
        self.vfs.init()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Filesystem handle; clones share the same tree.
    pub fn vfs(&self) -> &VfsStore {
        &self.vfs
    }

    /// Window manager.
    pub fn window_manager(&self) -> &WindowManager {
        &self.window_manager
    }

    /// Mutable window manager.
    pub fn window_manager_mut(&mut self) -> &mut WindowManager {
        &mut self.window_manager
    }

    /// Window frame controller.
    pub fn frame(&self) -> &FrameController {
        &self.frame
    }

    /// Returns `true` when a persistence worker is running.
    pub fn has_worker(&self) -> bool {
        self.worker.is_some()
    }

    /// Updates the viewport after the host resized. Cancels any pointer session.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.frame.cancel();
        self.window_manager.set_viewport(viewport);
    }

    /// Opens `path` in the app registered for its extension.
    pub fn open_file(&mut self, path: &str) -> WindowId {
        self.window_manager.open_file(path)
    }

    /// See [`FrameController::begin_drag`].
    pub fn begin_drag(&mut self, window_id: &WindowId, pointer: PointerPosition) -> bool {
        self.frame.begin_drag(&mut self.window_manager, window_id, pointer)
    }

    /// See [`FrameController::drag_to`].
    pub fn drag_to(&mut self, pointer: PointerPosition) -> Option<Position> {
        self.frame.drag_to(&self.window_manager, pointer)
    }

    /// See [`FrameController::end_drag`].
    pub fn end_drag(&mut self, pointer: PointerPosition) -> Option<SnapPreview> {
        self.frame.end_drag(&mut self.window_manager, pointer)
    }

    /// See [`FrameController::begin_resize`].
    pub fn begin_resize(
        &mut self,
        window_id: &WindowId,
        edge: ResizeEdge,
        pointer: PointerPosition,
    ) -> bool {
        self.frame
            .begin_resize(&mut self.window_manager, window_id, edge, pointer)
    }

    /// See [`FrameController::resize_to`].
    pub fn resize_to(&mut self, pointer: PointerPosition) -> Option<WindowRect> {
        self.frame.resize_to(pointer)
    }

    /// See [`FrameController::end_resize`].
    pub fn end_resize(&mut self) -> Option<WindowRect> {
        self.frame.end_resize(&mut self.window_manager)
    }

    /// See [`FrameController::double_click_header`].
    pub fn double_click_header(&mut self, window_id: &WindowId) {
        self.frame.double_click_header(&mut self.window_manager, window_id);
    }

    /// Waits for outstanding durability, then stops the persistence worker.
    ///
    /// Every [`VfsStore`] clone obtained from [`Self::vfs`] must be dropped first, otherwise
    /// joining the worker blocks.
    ///
    /// # Errors
    ///
    /// Returns the first durability failure observed while flushing. The worker is stopped
    /// regardless.
    pub async fn shutdown(self) -> Result<(), VfsError> {
        let Self { vfs, worker, .. } = self;
        let flushed = vfs.flush().await;
        drop(vfs);
        if let Some(worker) = worker {
            worker.join();
            log::info!("persistence worker stopped");
        }
        flushed
    }
}
