//! Window-manager state model, geometry types, and the persisted layout snapshot.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Width used for apps without registered defaults.
pub const DEFAULT_WINDOW_WIDTH: i32 = 420;
/// Height used for apps without registered defaults.
pub const DEFAULT_WINDOW_HEIGHT: i32 = 300;
/// Minimum allowed managed window width.
pub const MIN_WINDOW_WIDTH: i32 = 220;
/// Minimum allowed managed window height.
pub const MIN_WINDOW_HEIGHT: i32 = 140;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier of a mini-app; several windows may host the same app.
pub struct AppId(String);

impl AppId {
    /// Wraps an app id string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrowed id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Identifier of one window instance, stable for its lifetime.
pub struct WindowId(String);

impl WindowId {
    /// Generates a fresh id of the form `{app}-{8 hex digits}`.
    pub fn generate(app_id: &AppId) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{}-{}", app_id, &suffix[..8]))
    }

    /// Borrowed id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Top-left corner of a window in viewport pixels.
pub struct Position {
    /// Horizontal offset.
    pub x: i32,
    /// Vertical offset.
    pub y: i32,
}

impl Position {
    /// Builds a position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by `(dx, dy)`.
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Window dimensions in pixels.
pub struct Size {
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Size {
    /// Builds a size.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Returns this size grown to at least the managed window minimum.
    pub fn clamped_min(self) -> Self {
        Self {
            width: self.width.max(MIN_WINDOW_WIDTH),
            height: self.height.max(MIN_WINDOW_HEIGHT),
        }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Visible desktop area.
pub struct Viewport {
    /// Viewport width.
    pub width: i32,
    /// Viewport height.
    pub height: i32,
}

impl Viewport {
    /// Builds a viewport.
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Position that centers a window of `size`.
    pub fn centered(self, size: Size) -> Position {
        Position::new(
            self.width / 2 - size.width / 2,
            self.height / 2 - size.height / 2,
        )
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 800)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Window bounds combining [`Position`] and [`Size`].
pub struct WindowRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub w: i32,
    /// Height.
    pub h: i32,
}

impl WindowRect {
    /// Builds a rect from its parts.
    pub fn from_parts(position: Position, size: Size) -> Self {
        Self {
            x: position.x,
            y: position.y,
            w: size.width,
            h: size.height,
        }
    }

    /// Top-left corner.
    pub fn position(self) -> Position {
        Position::new(self.x, self.y)
    }

    /// Dimensions.
    pub fn size(self) -> Size {
        Size::new(self.w, self.h)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// One open window.
pub struct WindowState {
    /// Window instance id.
    pub id: WindowId,
    /// Hosted app.
    pub app_id: AppId,
    /// Title bar text.
    pub title: String,
    /// Top-left corner when not maximized.
    pub position: Position,
    /// Dimensions when not maximized.
    pub size: Size,
    /// Hidden in the dock.
    pub is_minimized: bool,
    /// Filling the viewport.
    pub is_maximized: bool,
    /// Dense 1-based stacking index; the top window has the highest value.
    pub z_index: u32,
    /// Opaque launch payload, such as `{"filePath": "/x.txt"}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl WindowState {
    /// Current bounds.
    pub fn rect(&self) -> WindowRect {
        WindowRect::from_parts(self.position, self.size)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// Fully resolved request to open a window.
pub struct OpenWindowRequest {
    /// Id of the new window.
    pub window_id: WindowId,
    /// Hosted app.
    pub app_id: AppId,
    /// Title bar text.
    pub title: String,
    /// Initial position.
    pub position: Position,
    /// Initial size.
    pub size: Size,
    /// Launch payload.
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
/// Window-manager state.
pub struct DesktopState {
    /// Open windows by id.
    pub windows: BTreeMap<WindowId, WindowState>,
    /// Stacking order; the last entry is the front window.
    pub window_order: Vec<WindowId>,
    /// Focused window, never a minimized one.
    pub active_window_id: Option<WindowId>,
}

impl DesktopState {
    /// Window at the front of the stack.
    pub fn top_window_id(&self) -> Option<&WindowId> {
        self.window_order.last()
    }

    /// Front-most window that is not minimized.
    pub fn top_visible_window_id(&self) -> Option<WindowId> {
        self.window_order
            .iter()
            .rev()
            .find(|id| self.windows.get(*id).is_some_and(|w| !w.is_minimized))
            .cloned()
    }

    /// Windows in stacking order, back to front.
    pub fn ordered_windows(&self) -> impl Iterator<Item = &WindowState> + '_ {
        self.window_order.iter().filter_map(|id| self.windows.get(id))
    }

    /// Builds the persisted layout record.
    pub fn snapshot(&self) -> WindowManagerSnapshot {
        WindowManagerSnapshot {
            windows: self.windows.clone(),
            window_order: self.window_order.clone(),
        }
    }

    /// Rebuilds state from a persisted layout, repairing the stacking order.
    ///
    /// Order entries without a window are dropped, duplicates keep their last occurrence, and
    /// windows missing from the order are appended in their previous z order. The active pointer
    /// is not part of the snapshot and starts out empty.
    pub fn from_snapshot(snapshot: WindowManagerSnapshot) -> Self {
        let WindowManagerSnapshot {
            mut windows,
            window_order,
        } = snapshot;

        // Keys are authoritative; a record's own id field may be stale.
        for (id, window) in windows.iter_mut() {
            window.id = id.clone();
        }

        let mut order = Vec::with_capacity(windows.len());
        for id in window_order.into_iter().rev() {
            if windows.contains_key(&id) && !order.contains(&id) {
                order.push(id);
            }
        }
        order.reverse();

        let mut missing = windows
            .values()
            .filter(|w| !order.contains(&w.id))
            .map(|w| (w.z_index, w.id.clone()))
            .collect::<Vec<_>>();
        missing.sort();
        order.extend(missing.into_iter().map(|(_, id)| id));

        let mut state = Self {
            windows,
            window_order: order,
            active_window_id: None,
        };
        normalize_window_stack(&mut state);
        state
    }
}

/// Renumbers z indices densely from the stacking order and drops an invalid active pointer.
pub fn normalize_window_stack(state: &mut DesktopState) {
    for (idx, id) in state.window_order.iter().enumerate() {
        if let Some(window) = state.windows.get_mut(id) {
            window.z_index = (idx + 1) as u32;
        }
    }

    let active_is_valid = state
        .active_window_id
        .as_ref()
        .and_then(|id| state.windows.get(id))
        .is_some_and(|w| !w.is_minimized);
    if !active_is_valid {
        state.active_window_id = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Persisted layout record: windows and stacking order only.
pub struct WindowManagerSnapshot {
    /// Open windows by id.
    pub windows: BTreeMap<WindowId, WindowState>,
    /// Stacking order, back to front.
    pub window_order: Vec<WindowId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Pointer coordinates in viewport pixels.
pub struct PointerPosition {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl PointerPosition {
    /// Builds a pointer position.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Edge or corner grabbed for a resize.
pub enum ResizeEdge {
    /// Top edge.
    North,
    /// Bottom edge.
    South,
    /// Right edge.
    East,
    /// Left edge.
    West,
    /// Top-right corner.
    NorthEast,
    /// Top-left corner.
    NorthWest,
    /// Bottom-right corner.
    SouthEast,
    /// Bottom-left corner.
    SouthWest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Snap target armed while dragging near a viewport edge.
pub enum SnapPreview {
    /// Left half of the viewport.
    Left,
    /// Right half of the viewport.
    Right,
    /// Maximize.
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// In-progress header drag.
pub struct DragSession {
    /// Window being dragged.
    pub window_id: WindowId,
    /// Pointer position at drag start.
    pub pointer_start: PointerPosition,
    /// Window position at drag start.
    pub position_start: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// In-progress edge resize.
pub struct ResizeSession {
    /// Window being resized.
    pub window_id: WindowId,
    /// Edge or corner being dragged.
    pub edge: ResizeEdge,
    /// Pointer position at resize start.
    pub pointer_start: PointerPosition,
    /// Window bounds at resize start.
    pub rect_start: WindowRect,
    /// Bounds the window will take when the resize ends.
    pub rect_preview: WindowRect,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Pointer interaction state owned by the frame controller.
pub struct InteractionState {
    /// Active drag, if any.
    pub dragging: Option<DragSession>,
    /// Active resize, if any.
    pub resizing: Option<ResizeSession>,
    /// Snap target armed by the last drag update.
    pub snap_preview: Option<SnapPreview>,
}
