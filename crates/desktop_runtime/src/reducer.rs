//! Reducer actions, side-effect intents, and transition logic for the window manager.

use thiserror::Error;

use crate::{
    config::MinimizeFocusPolicy,
    model::{
        normalize_window_stack, DesktopState, OpenWindowRequest, Position, Size, WindowId,
        WindowManagerSnapshot, WindowState,
    },
};

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_desktop`] to mutate [`DesktopState`].
pub enum DesktopAction {
    /// Open a new window on top of the stack and activate it.
    OpenWindow(OpenWindowRequest),
    /// Close a window by id.
    CloseWindow {
        /// Window to close.
        window_id: WindowId,
    },
    /// Focus (and raise) a window, restoring it first when minimized. Focusing the active window
    /// changes nothing.
    FocusWindow {
        /// Window to focus.
        window_id: WindowId,
    },
    /// Minimize a window.
    MinimizeWindow {
        /// Window to minimize.
        window_id: WindowId,
        /// How the active pointer is updated.
        policy: MinimizeFocusPolicy,
    },
    /// Maximize and focus a window. A minimized window is restored to normal instead, because
    /// focusing it clears both flags.
    MaximizeWindow {
        /// Window to maximize.
        window_id: WindowId,
    },
    /// Clear the minimized and maximized flags, then focus.
    RestoreWindow {
        /// Window to restore.
        window_id: WindowId,
    },
    /// Maximize a normal window or restore a maximized one.
    ToggleMaximize {
        /// Window to toggle.
        window_id: WindowId,
    },
    /// Move a window.
    MoveWindow {
        /// Window to move.
        window_id: WindowId,
        /// New top-left corner.
        position: Position,
    },
    /// Resize a window, clamped to the minimum size.
    ResizeWindow {
        /// Window to resize.
        window_id: WindowId,
        /// Requested size.
        size: Size,
    },
    /// Move and resize a window in one step.
    SetGeometry {
        /// Window to update.
        window_id: WindowId,
        /// New top-left corner.
        position: Position,
        /// Requested size.
        size: Size,
    },
    /// Place a window on a viewport half. The size is taken as is, even below the minimum.
    SnapWindow {
        /// Window to snap.
        window_id: WindowId,
        /// Top-left corner of the half.
        position: Position,
        /// Size of the half.
        size: Size,
    },
    /// Change a window title.
    SetTitle {
        /// Window to rename.
        window_id: WindowId,
        /// New title.
        title: String,
    },
    /// Replace the state with a persisted layout.
    HydrateSnapshot {
        /// Snapshot payload to restore.
        snapshot: WindowManagerSnapshot,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Side-effect intents emitted by [`reduce_desktop`] for the owner to execute.
pub enum RuntimeEffect {
    /// Persist the current window layout.
    PersistLayout,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Reducer errors for actions that reference missing windows.
pub enum ReducerError {
    /// The target window id was not found in the current state.
    #[error("window not found: {0}")]
    WindowNotFound(WindowId),
}

/// Applies a [`DesktopAction`] and collects resulting side effects.
///
/// An action that leaves the state untouched emits no effects.
///
/// # Errors
///
/// Returns [`ReducerError::WindowNotFound`] when an action references a window that is not
/// present; the state is left unchanged in that case.
pub fn reduce_desktop(
    state: &mut DesktopState,
    action: DesktopAction,
) -> Result<Vec<RuntimeEffect>, ReducerError> {
    let before = state.clone();
    match action {
        DesktopAction::OpenWindow(req) => {
            let window_id = req.window_id.clone();
            state.window_order.retain(|id| *id != window_id);
            state.windows.insert(
                window_id.clone(),
                WindowState {
                    id: window_id.clone(),
                    app_id: req.app_id,
                    title: req.title,
                    position: req.position,
                    size: req.size.clamped_min(),
                    is_minimized: false,
                    is_maximized: false,
                    z_index: 0,
                    data: req.data,
                },
            );
            state.window_order.push(window_id.clone());
            state.active_window_id = Some(window_id);
        }
        DesktopAction::CloseWindow { window_id } => {
            if state.windows.remove(&window_id).is_none() {
                return Err(ReducerError::WindowNotFound(window_id));
            }
            state.window_order.retain(|id| *id != window_id);
            if state.active_window_id.as_ref() == Some(&window_id) {
                state.active_window_id = state.top_visible_window_id();
            }
        }
        DesktopAction::FocusWindow { window_id } => {
            find_window_mut(state, &window_id)?;
            focus(state, window_id);
        }
        DesktopAction::MinimizeWindow { window_id, policy } => {
            find_window_mut(state, &window_id)?.is_minimized = true;
            state.active_window_id = match policy {
                MinimizeFocusPolicy::ClearActive => None,
                MinimizeFocusPolicy::FocusNext => state.top_visible_window_id(),
            };
        }
        DesktopAction::MaximizeWindow { window_id } => {
            find_window_mut(state, &window_id)?.is_maximized = true;
            focus(state, window_id);
        }
        DesktopAction::RestoreWindow { window_id } => {
            let window = find_window_mut(state, &window_id)?;
            window.is_maximized = false;
            window.is_minimized = false;
            focus(state, window_id);
        }
        DesktopAction::ToggleMaximize { window_id } => {
            let maximized = find_window_mut(state, &window_id)?.is_maximized;
            let next = if maximized {
                DesktopAction::RestoreWindow { window_id }
            } else {
                DesktopAction::MaximizeWindow { window_id }
            };
            return reduce_desktop(state, next);
        }
        DesktopAction::MoveWindow {
            window_id,
            position,
        } => {
            find_window_mut(state, &window_id)?.position = position;
        }
        DesktopAction::ResizeWindow { window_id, size } => {
            find_window_mut(state, &window_id)?.size = size.clamped_min();
        }
        DesktopAction::SetGeometry {
            window_id,
            position,
            size,
        } => {
            let window = find_window_mut(state, &window_id)?;
            window.position = position;
            window.size = size.clamped_min();
        }
        DesktopAction::SnapWindow {
            window_id,
            position,
            size,
        } => {
            let window = find_window_mut(state, &window_id)?;
            window.position = position;
            window.size = size;
        }
        DesktopAction::SetTitle { window_id, title } => {
            find_window_mut(state, &window_id)?.title = title;
        }
        DesktopAction::HydrateSnapshot { snapshot } => {
            *state = DesktopState::from_snapshot(snapshot);
        }
    }

    normalize_window_stack(state);
    if *state == before {
        Ok(Vec::new())
    } else {
        Ok(vec![RuntimeEffect::PersistLayout])
    }
}

fn find_window_mut<'a>(
    state: &'a mut DesktopState,
    window_id: &WindowId,
) -> Result<&'a mut WindowState, ReducerError> {
    state
        .windows
        .get_mut(window_id)
        .ok_or_else(|| ReducerError::WindowNotFound(window_id.clone()))
}

/// Restores a minimized window, then raises and activates it unless it already is active.
fn focus(state: &mut DesktopState, window_id: WindowId) {
    if let Some(window) = state.windows.get_mut(&window_id) {
        if window.is_minimized {
            window.is_minimized = false;
            window.is_maximized = false;
        } else if state.active_window_id.as_ref() == Some(&window_id) {
            return;
        }
    }
    raise_and_activate(state, window_id);
}

fn raise_and_activate(state: &mut DesktopState, window_id: WindowId) {
    state.window_order.retain(|id| *id != window_id);
    state.window_order.push(window_id.clone());
    state.active_window_id = Some(window_id);
}
