//! Window manager service: owns desktop state and executes reducer effects.

use std::rc::Rc;

use platform_host::{NoopPrefsStore, PrefsStore};
use serde_json::Value;

use crate::{
    apps::{open_file_request, AppRegistry, BuiltinAppRegistry},
    config::WindowManagerConfig,
    model::{
        AppId, DesktopState, OpenWindowRequest, Position, Size, Viewport, WindowId, WindowState,
    },
    persistence,
    reducer::{reduce_desktop, DesktopAction, ReducerError, RuntimeEffect},
};

/// Synchronous window manager.
///
/// Every transition goes through [`reduce_desktop`]; the resulting effects are executed before the
/// call returns, so the persisted layout always matches the in-memory state. Operations on unknown
/// window ids are ignored.
pub struct WindowManager {
    state: DesktopState,
    config: WindowManagerConfig,
    viewport: Viewport,
    registry: Rc<dyn AppRegistry>,
    prefs: Rc<dyn PrefsStore>,
}

impl std::fmt::Debug for WindowManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowManager")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

impl Default for WindowManager {
    fn default() -> Self {
        Self::new(
            WindowManagerConfig::default(),
            Rc::new(BuiltinAppRegistry),
            Rc::new(NoopPrefsStore),
        )
    }
}

impl WindowManager {
    /// Creates an empty window manager.
    pub fn new(
        config: WindowManagerConfig,
        registry: Rc<dyn AppRegistry>,
        prefs: Rc<dyn PrefsStore>,
    ) -> Self {
        Self {
            state: DesktopState::default(),
            viewport: config.viewport,
            config,
            registry,
            prefs,
        }
    }

    /// Creates a window manager and hydrates the layout persisted in `prefs`, if any.
    pub fn restore(
        config: WindowManagerConfig,
        registry: Rc<dyn AppRegistry>,
        prefs: Rc<dyn PrefsStore>,
    ) -> Self {
        let mut manager = Self::new(config, registry, prefs);
        match persistence::load_layout_snapshot(&*manager.prefs, &manager.config.persistence_key)
        {
            Some(snapshot) => {
                // Hydration reproduces what is stored; no write-back needed.
                let _ = reduce_desktop(
                    &mut manager.state,
                    DesktopAction::HydrateSnapshot { snapshot },
                );
                log::info!(
                    "restored {} window(s) from `{}`",
                    manager.state.windows.len(),
                    manager.config.persistence_key
                );
            }
            None => log::debug!("no persisted window layout"),
        }
        manager
    }

    /// Current state.
    pub fn state(&self) -> &DesktopState {
        &self.state
    }

    /// Looks up one window.
    pub fn window(&self, window_id: &WindowId) -> Option<&WindowState> {
        self.state.windows.get(window_id)
    }

    /// Stacking order, back to front.
    pub fn window_order(&self) -> &[WindowId] {
        &self.state.window_order
    }

    /// Focused window.
    pub fn active_window_id(&self) -> Option<&WindowId> {
        self.state.active_window_id.as_ref()
    }

    /// Configuration in effect.
    pub fn config(&self) -> &WindowManagerConfig {
        &self.config
    }

    /// Viewport used for centering and snapping.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Updates the viewport after the host resized.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Opens a window for `app_id` centered in the viewport and returns its id.
    ///
    /// An empty or absent `title` falls back to the registered app title.
    pub fn open_window(
        &mut self,
        app_id: impl Into<AppId>,
        title: Option<&str>,
        data: Option<Value>,
    ) -> WindowId {
        let app_id = app_id.into();
        let (default_title, size) = self.registry.window_defaults(&app_id);
        let title = title
            .filter(|title| !title.is_empty())
            .map_or(default_title, str::to_string);
        let window_id = WindowId::generate(&app_id);
        let request = OpenWindowRequest {
            window_id: window_id.clone(),
            position: self.viewport.centered(size),
            app_id,
            title,
            size,
            data,
        };
        self.dispatch(DesktopAction::OpenWindow(request));
        window_id
    }

    /// Opens `path` in the app registered for its extension.
    pub fn open_file(&mut self, path: &str) -> WindowId {
        let request = open_file_request(path);
        self.open_window(request.app_id, Some(&request.title), Some(request.data))
    }

    /// Closes a window.
    pub fn close_window(&mut self, window_id: &WindowId) {
        self.dispatch(DesktopAction::CloseWindow {
            window_id: window_id.clone(),
        });
    }

    /// Raises and activates a window, restoring it when minimized.
    pub fn focus_window(&mut self, window_id: &WindowId) {
        self.dispatch(DesktopAction::FocusWindow {
            window_id: window_id.clone(),
        });
    }

    /// Minimizes a window according to the configured focus policy.
    pub fn minimize_window(&mut self, window_id: &WindowId) {
        self.dispatch(DesktopAction::MinimizeWindow {
            window_id: window_id.clone(),
            policy: self.config.minimize_focus_policy,
        });
    }

    /// Maximizes and focuses a window.
    pub fn maximize_window(&mut self, window_id: &WindowId) {
        self.dispatch(DesktopAction::MaximizeWindow {
            window_id: window_id.clone(),
        });
    }

    /// Clears the minimized and maximized flags and focuses a window.
    pub fn restore_window(&mut self, window_id: &WindowId) {
        self.dispatch(DesktopAction::RestoreWindow {
            window_id: window_id.clone(),
        });
    }

    /// Switches a window between maximized and normal.
    pub fn toggle_maximize(&mut self, window_id: &WindowId) {
        self.dispatch(DesktopAction::ToggleMaximize {
            window_id: window_id.clone(),
        });
    }

    /// Moves a window.
    pub fn move_window(&mut self, window_id: &WindowId, position: Position) {
        self.dispatch(DesktopAction::MoveWindow {
            window_id: window_id.clone(),
            position,
        });
    }

    /// Resizes a window; sizes below the minimum are clamped.
    pub fn resize_window(&mut self, window_id: &WindowId, size: Size) {
        self.dispatch(DesktopAction::ResizeWindow {
            window_id: window_id.clone(),
            size,
        });
    }

    /// Moves and resizes a window in one transition.
    pub fn set_geometry(&mut self, window_id: &WindowId, position: Position, size: Size) {
        self.dispatch(DesktopAction::SetGeometry {
            window_id: window_id.clone(),
            position,
            size,
        });
    }

    /// Places a window on a viewport half without applying the minimum size.
    pub fn snap_window(&mut self, window_id: &WindowId, position: Position, size: Size) {
        self.dispatch(DesktopAction::SnapWindow {
            window_id: window_id.clone(),
            position,
            size,
        });
    }

    /// Renames a window.
    pub fn set_title(&mut self, window_id: &WindowId, title: impl Into<String>) {
        self.dispatch(DesktopAction::SetTitle {
            window_id: window_id.clone(),
            title: title.into(),
        });
    }

    /// Applies `action` and runs its effects. Returns `false` when the target window is unknown.
    pub fn dispatch(&mut self, action: DesktopAction) -> bool {
        match reduce_desktop(&mut self.state, action) {
            Ok(effects) => {
                for effect in effects {
                    self.run_effect(effect);
                }
                true
            }
            Err(ReducerError::WindowNotFound(window_id)) => {
                log::debug!("ignoring window action for unknown window {window_id}");
                false
            }
        }
    }

    fn run_effect(&self, effect: RuntimeEffect) {
        match effect {
            RuntimeEffect::PersistLayout => {
                if let Err(err) = persistence::persist_layout_snapshot(
                    &*self.prefs,
                    &self.config.persistence_key,
                    &self.state,
                ) {
                    log::warn!("persist window layout failed: {err}");
                }
            }
        }
    }
}
