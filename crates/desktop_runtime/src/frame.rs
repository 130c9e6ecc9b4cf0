//! Window frame interactions: header drag with edge snapping, edge resize, and header
//! double-click.
//!
//! The controller keeps the pointer session and live preview; the window manager only sees the
//! final geometry when the pointer is released.

use crate::{
    config::FrameConfig,
    model::{
        DragSession, InteractionState, PointerPosition, Position, ResizeEdge, ResizeSession,
        SnapPreview, Viewport, WindowId, WindowRect, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH,
    },
    window_manager::WindowManager,
};

/// Returns the snap target armed by a pointer at `pointer`, if any.
///
/// Left and right edges win over the top edge in the corners.
pub fn snap_zone(
    pointer: PointerPosition,
    viewport: Viewport,
    threshold: i32,
) -> Option<SnapPreview> {
    if pointer.x < threshold {
        Some(SnapPreview::Left)
    } else if pointer.x > viewport.width - threshold {
        Some(SnapPreview::Right)
    } else if pointer.y < threshold {
        Some(SnapPreview::Full)
    } else {
        None
    }
}

/// Geometry of a half-screen snap, leaving `dock_reserve` pixels free at the bottom.
pub fn snapped_rect(
    preview: SnapPreview,
    viewport: Viewport,
    dock_reserve: i32,
) -> Option<WindowRect> {
    let half = viewport.width / 2;
    let height = viewport.height - dock_reserve;
    match preview {
        SnapPreview::Left => Some(WindowRect {
            x: 0,
            y: 0,
            w: half,
            h: height,
        }),
        SnapPreview::Right => Some(WindowRect {
            x: half,
            y: 0,
            w: half,
            h: height,
        }),
        SnapPreview::Full => None,
    }
}

/// Bounds after dragging `edge` by `(dx, dy)` from `start`.
///
/// Only the grabbed edges move, and the result never drops below the minimum window size: a
/// grabbed left or top edge stops where the opposite edge would otherwise be pushed.
pub fn resize_rect(start: WindowRect, edge: ResizeEdge, dx: i32, dy: i32) -> WindowRect {
    use ResizeEdge::{East, North, NorthEast, NorthWest, South, SouthEast, SouthWest, West};

    let horizontal = match edge {
        West | NorthWest | SouthWest => AxisGrip::Near,
        East | NorthEast | SouthEast => AxisGrip::Far,
        North | South => AxisGrip::Fixed,
    };
    let vertical = match edge {
        North | NorthWest | NorthEast => AxisGrip::Near,
        South | SouthWest | SouthEast => AxisGrip::Far,
        East | West => AxisGrip::Fixed,
    };
    let (x, w) = horizontal.apply(start.x, start.w, dx, MIN_WINDOW_WIDTH);
    let (y, h) = vertical.apply(start.y, start.h, dy, MIN_WINDOW_HEIGHT);
    WindowRect { x, y, w, h }
}

#[derive(Clone, Copy)]
/// Which end of one axis a resize grip drags.
enum AxisGrip {
    Near,
    Far,
    Fixed,
}

impl AxisGrip {
    /// Returns the new `(origin, extent)` of the axis.
    fn apply(self, origin: i32, extent: i32, delta: i32, min: i32) -> (i32, i32) {
        match self {
            Self::Near => {
                let resized = (extent - delta).max(min);
                (origin + extent - resized, resized)
            }
            Self::Far => (origin, (extent + delta).max(min)),
            Self::Fixed => (origin, extent),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Pointer-driven frame interactions on top of a [`WindowManager`].
pub struct FrameController {
    config: FrameConfig,
    interaction: InteractionState,
}

impl FrameController {
    /// Creates an idle controller.
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            interaction: InteractionState::default(),
        }
    }

    /// Current pointer session state.
    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    /// Snap target armed by the last drag update, for rendering the overlay.
    pub fn snap_preview(&self) -> Option<SnapPreview> {
        self.interaction.snap_preview
    }

    /// Window being dragged, if any.
    pub fn dragging(&self) -> Option<&WindowId> {
        self.interaction.dragging.as_ref().map(|s| &s.window_id)
    }

    /// Window being resized, if any.
    pub fn resizing(&self) -> Option<&WindowId> {
        self.interaction.resizing.as_ref().map(|s| &s.window_id)
    }

    /// Header press: focuses the window and starts a drag unless it is maximized.
    ///
    /// Returns `true` when a drag session started.
    pub fn begin_drag(
        &mut self,
        wm: &mut WindowManager,
        window_id: &WindowId,
        pointer: PointerPosition,
    ) -> bool {
        self.cancel();
        wm.focus_window(window_id);
        let Some(window) = wm.window(window_id) else {
            return false;
        };
        if window.is_maximized {
            return false;
        }
        self.interaction.dragging = Some(DragSession {
            window_id: window_id.clone(),
            pointer_start: pointer,
            position_start: window.position,
        });
        true
    }

    /// Pointer move during a drag. Returns the live window position.
    pub fn drag_to(&mut self, wm: &WindowManager, pointer: PointerPosition) -> Option<Position> {
        let session = self.interaction.dragging.as_ref()?;
        let position = session.position_start.offset(
            pointer.x - session.pointer_start.x,
            pointer.y - session.pointer_start.y,
        );
        self.interaction.snap_preview =
            snap_zone(pointer, wm.viewport(), self.config.snap_threshold);
        Some(position)
    }

    /// Pointer release: applies the armed snap, or the free-drag position.
    ///
    /// The release pointer is checked for a snap zone as well, so a release without a preceding
    /// move still snaps. Returns the applied snap target.
    pub fn end_drag(
        &mut self,
        wm: &mut WindowManager,
        pointer: PointerPosition,
    ) -> Option<SnapPreview> {
        let armed = self.interaction.snap_preview.take();
        let session = self.interaction.dragging.take()?;
        let viewport = wm.viewport();
        let preview = snap_zone(pointer, viewport, self.config.snap_threshold).or(armed);

        match preview {
            Some(SnapPreview::Full) => wm.maximize_window(&session.window_id),
            Some(side) => {
                if let Some(rect) = snapped_rect(side, viewport, self.config.dock_reserve) {
                    wm.snap_window(&session.window_id, rect.position(), rect.size());
                }
            }
            None => {
                let position = session.position_start.offset(
                    pointer.x - session.pointer_start.x,
                    pointer.y - session.pointer_start.y,
                );
                wm.move_window(&session.window_id, position);
            }
        }
        log::debug!("drag of {} ended with snap {preview:?}", session.window_id);
        preview
    }

    /// Edge press: focuses the window and starts a resize unless it is maximized.
    ///
    /// Returns `true` when a resize session started.
    pub fn begin_resize(
        &mut self,
        wm: &mut WindowManager,
        window_id: &WindowId,
        edge: ResizeEdge,
        pointer: PointerPosition,
    ) -> bool {
        self.cancel();
        wm.focus_window(window_id);
        let Some(window) = wm.window(window_id) else {
            return false;
        };
        if window.is_maximized {
            return false;
        }
        let rect = window.rect();
        self.interaction.resizing = Some(ResizeSession {
            window_id: window_id.clone(),
            edge,
            pointer_start: pointer,
            rect_start: rect,
            rect_preview: rect,
        });
        true
    }

    /// Pointer move during a resize. Returns the live, clamped bounds.
    pub fn resize_to(&mut self, pointer: PointerPosition) -> Option<WindowRect> {
        let session = self.interaction.resizing.as_mut()?;
        let dx = pointer.x - session.pointer_start.x;
        let dy = pointer.y - session.pointer_start.y;
        session.rect_preview = resize_rect(session.rect_start, session.edge, dx, dy);
        Some(session.rect_preview)
    }

    /// Pointer release: commits the previewed bounds.
    pub fn end_resize(&mut self, wm: &mut WindowManager) -> Option<WindowRect> {
        let session = self.interaction.resizing.take()?;
        let rect = session.rect_preview;
        if rect != session.rect_start {
            wm.set_geometry(&session.window_id, rect.position(), rect.size());
        }
        Some(rect)
    }

    /// Header double-click toggles maximized and normal.
    pub fn double_click_header(&mut self, wm: &mut WindowManager, window_id: &WindowId) {
        self.cancel();
        wm.toggle_maximize(window_id);
    }

    /// Drops any pointer session without applying it.
    pub fn cancel(&mut self) {
        self.interaction = InteractionState::default();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::Size;

    fn setup() -> (WindowManager, FrameController, WindowId) {
        let mut wm = WindowManager::default();
        let id = wm.open_window("terminal", None, None);
        (wm, FrameController::new(FrameConfig::default()), id)
    }

    #[test]
    fn snap_zone_matches_edges() {
        let viewport = Viewport::new(1280, 800);
        let zone = |x, y| snap_zone(PointerPosition::new(x, y), viewport, 20);
        assert_eq!(zone(19, 400), Some(SnapPreview::Left));
        assert_eq!(zone(20, 400), None);
        assert_eq!(zone(1261, 400), Some(SnapPreview::Right));
        assert_eq!(zone(640, 5), Some(SnapPreview::Full));
        assert_eq!(zone(5, 5), Some(SnapPreview::Left));
        assert_eq!(zone(640, 400), None);
    }

    #[test]
    fn free_drag_moves_by_pointer_delta_only() {
        let (mut wm, mut frame, id) = setup();
        let start = wm.window(&id).expect("window").position;

        assert!(frame.begin_drag(&mut wm, &id, PointerPosition::new(400, 210)));
        assert_eq!(
            frame.drag_to(&wm, PointerPosition::new(450, 260)),
            Some(start.offset(50, 50))
        );
        assert_eq!(frame.snap_preview(), None);
        assert_eq!(frame.end_drag(&mut wm, PointerPosition::new(430, 300)), None);

        let window = wm.window(&id).expect("window");
        assert_eq!(window.position, start.offset(30, 90));
        assert_eq!(window.size, Size::new(600, 400));
        assert_eq!(frame.dragging(), None);
    }

    #[test]
    fn drag_to_right_edge_snaps_to_right_half() {
        let (mut wm, mut frame, id) = setup();
        frame.begin_drag(&mut wm, &id, PointerPosition::new(400, 210));
        frame.drag_to(&wm, PointerPosition::new(1275, 300));
        assert_eq!(frame.snap_preview(), Some(SnapPreview::Right));

        frame.end_drag(&mut wm, PointerPosition::new(1275, 300));
        let window = wm.window(&id).expect("window");
        assert_eq!(window.position, Position::new(640, 0));
        assert_eq!(window.size, Size::new(640, 720));
        assert_eq!(frame.snap_preview(), None);
    }

    #[test]
    fn snapping_on_a_small_viewport_uses_the_exact_half() {
        let (mut wm, mut frame, id) = setup();
        wm.set_viewport(Viewport::new(400, 200));

        assert!(frame.begin_drag(&mut wm, &id, PointerPosition::new(200, 100)));
        assert_eq!(
            frame.end_drag(&mut wm, PointerPosition::new(5, 100)),
            Some(SnapPreview::Left)
        );
        assert_eq!(
            wm.window(&id).expect("window").rect(),
            WindowRect {
                x: 0,
                y: 0,
                w: 200,
                h: 120,
            }
        );
    }

    #[test]
    fn resize_rect_moves_only_the_grabbed_edges() {
        let start = WindowRect {
            x: 100,
            y: 100,
            w: 600,
            h: 400,
        };
        assert_eq!(
            resize_rect(start, ResizeEdge::SouthWest, -50, 30),
            WindowRect {
                x: 50,
                y: 100,
                w: 650,
                h: 430,
            }
        );
        assert_eq!(
            resize_rect(start, ResizeEdge::North, 90, 1000),
            WindowRect {
                x: 100,
                y: 360,
                w: 600,
                h: 140,
            }
        );
        assert_eq!(resize_rect(start, ResizeEdge::South, 0, -1000).h, 140);
    }

    #[test]
    fn drag_to_top_edge_maximizes() {
        let (mut wm, mut frame, id) = setup();
        frame.begin_drag(&mut wm, &id, PointerPosition::new(400, 210));
        frame.drag_to(&wm, PointerPosition::new(600, 3));
        assert_eq!(
            frame.end_drag(&mut wm, PointerPosition::new(600, 3)),
            Some(SnapPreview::Full)
        );
        assert!(wm.window(&id).expect("window").is_maximized);
    }

    #[test]
    fn maximized_windows_do_not_start_drags_or_resizes() {
        let (mut wm, mut frame, id) = setup();
        wm.maximize_window(&id);
        assert!(!frame.begin_drag(&mut wm, &id, PointerPosition::new(10, 10)));
        assert!(!frame.begin_resize(
            &mut wm,
            &id,
            ResizeEdge::East,
            PointerPosition::new(10, 10)
        ));
        assert_eq!(frame.end_drag(&mut wm, PointerPosition::new(5, 5)), None);
        assert!(wm.window(&id).expect("window").is_maximized);
    }

    #[test]
    fn resize_clamps_and_keeps_opposite_edge_fixed() {
        let (mut wm, mut frame, id) = setup();
        let start = wm.window(&id).expect("window").rect();

        assert!(frame.begin_resize(
            &mut wm,
            &id,
            ResizeEdge::NorthWest,
            PointerPosition::new(0, 0)
        ));
        let preview = frame
            .resize_to(PointerPosition::new(500, 500))
            .expect("preview");
        assert_eq!(preview.w, 220);
        assert_eq!(preview.h, 140);
        assert_eq!(preview.x + preview.w, start.x + start.w);
        assert_eq!(preview.y + preview.h, start.y + start.h);
        assert_eq!(wm.window(&id).expect("window").rect(), start);

        frame.end_resize(&mut wm);
        assert_eq!(wm.window(&id).expect("window").rect(), preview);
    }

    #[test]
    fn east_resize_grows_width() {
        let (mut wm, mut frame, id) = setup();
        frame.begin_resize(&mut wm, &id, ResizeEdge::East, PointerPosition::new(940, 300));
        frame.resize_to(PointerPosition::new(1000, 320));
        frame.end_resize(&mut wm);
        assert_eq!(wm.window(&id).expect("window").size, Size::new(660, 400));
    }

    #[test]
    fn header_double_click_toggles_maximize() {
        let (mut wm, mut frame, id) = setup();
        frame.double_click_header(&mut wm, &id);
        assert!(wm.window(&id).expect("window").is_maximized);
        frame.double_click_header(&mut wm, &id);
        assert!(!wm.window(&id).expect("window").is_maximized);
    }
}
