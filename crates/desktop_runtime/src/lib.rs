//! Desktop core: virtual filesystem, window manager, and window frame interactions.
//!
//! [`VfsStore`] keeps the authoritative file tree in memory and mirrors it to a
//! [`platform_host::DurableStore`], usually a persistence worker from `platform_storage`.
//! [`WindowManager`] applies [`DesktopAction`]s through [`reduce_desktop`] and persists the layout
//! through a [`platform_host::PrefsStore`]. [`FrameController`] turns pointer gestures into window
//! manager operations. [`DesktopRuntime`] wires all of them from one [`RuntimeConfig`].

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod apps;
pub mod config;
pub mod frame;
pub mod model;
pub mod persistence;
pub mod reducer;
pub mod runtime;
pub mod vfs;
pub mod window_manager;

pub use apps::{
    app_for_file, app_registry, open_file_request, AppDescriptor, AppRegistry, BuiltinAppRegistry,
    FileOpenRequest,
};
pub use config::{
    ConfigError, FrameConfig, MinimizeFocusPolicy, RuntimeConfig, VfsConfig, WindowManagerConfig,
};
pub use frame::{resize_rect, snap_zone, snapped_rect, FrameController};
pub use model::*;
pub use persistence::{load_layout_snapshot, persist_layout_snapshot};
pub use reducer::{reduce_desktop, DesktopAction, ReducerError, RuntimeEffect};
pub use runtime::DesktopRuntime;
pub use vfs::{DurabilityMode, VfsError, VfsStore};
pub use window_manager::WindowManager;
