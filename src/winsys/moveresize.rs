use crate::aerosnap::SnapRegions;
use crate::aerosnap::SnapTracker;
use crate::geometry::Dim;
use crate::geometry::Padding;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::hints::GeometryHints;
use crate::indicator::Indicator;
use crate::input::DeviceId;
use crate::window::WindowEdge;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DragOp {
    Move,
    Resize(WindowEdge),
}

impl DragOp {
    pub fn cursor_name(&self) -> &'static str {
        match self {
            DragOp::Move => "move",
            DragOp::Resize(edge) => edge.cursor_name(),
        }
    }

    pub fn edge(&self) -> Option<WindowEdge> {
        match self {
            DragOp::Move => None,
            DragOp::Resize(edge) => Some(*edge),
        }
    }
}

/// An interactive move or resize in progress. Lives on the window being
/// dragged and is fed every pointer sample until the button is released.
#[derive(Debug, Clone)]
pub struct MoveResizeContext {
    pub op: DragOp,
    pub device: DeviceId,
    pub button: u32,
    pub start_root: Pos,
    /// Logical root geometry of the window when the drag began.
    pub start_rect: Region,
    pub timestamp: u32,
    pub regions: SnapRegions,
    pub snap: SnapTracker,
    pub indicator: Indicator,
    pub native_move_resize_pending: bool,
}

impl MoveResizeContext {
    pub fn new(
        op: DragOp,
        device: DeviceId,
        button: u32,
        start_root: Pos,
        start_rect: Region,
        timestamp: u32,
        regions: SnapRegions,
        scale: i32,
    ) -> Self {
        Self {
            op,
            device,
            button,
            start_root,
            start_rect,
            timestamp,
            regions,
            snap: SnapTracker::default(),
            indicator: Indicator::new(scale, op.edge()),
            native_move_resize_pending: false,
        }
    }

    /// The geometry the window should take with the pointer at `root`.
    /// Resizes hold the edges opposite the grabbed one fixed and clamp the
    /// client size (margins excluded) to `hints`.
    pub fn candidate(
        &self,
        root: Pos,
        hints: &GeometryHints,
        margins: Padding,
    ) -> Region {
        let (dx, dy) = (root - self.start_root).values();
        let start = self.start_rect;

        let edge = match self.op {
            DragOp::Move => return start.translated(dx, dy),
            DragOp::Resize(edge) => edge,
        };

        let mut left = start.pos.x;
        let mut top = start.pos.y;
        let mut right = start.right();
        let mut bottom = start.bottom();

        if edge.moves_left() {
            left += dx;
        }

        if edge.moves_right() {
            right += dx;
        }

        if edge.moves_top() {
            top += dy;
        }

        if edge.moves_bottom() {
            bottom += dy;
        }

        let requested = Dim::new(
            right - left - margins.horizontal(),
            bottom - top - margins.vertical(),
        );

        let constrained = hints.constrain(requested);
        let width = constrained.w + margins.horizontal();
        let height = constrained.h + margins.vertical();

        let x = if edge.moves_left() {
            right - width
        } else {
            left
        };

        let y = if edge.moves_top() {
            bottom - height
        } else {
            top
        };

        Region::new(x, y, width, height)
    }
}

/// Where a window that is about to leave its maximized or snapped state
/// goes, so the pointer at `root` keeps its offset from the nearer
/// horizontal edge of `visible`. `restored` is the size it returns to.
pub fn unsnap_placement(
    root: Pos,
    visible: Region,
    restored: Dim,
    margins: Padding,
) -> Region {
    let mut offset_x = root.x - visible.pos.x;
    let offset_y = root.y - visible.pos.y;
    let left_half = offset_x < visible.dim.w / 2;

    if !left_half {
        offset_x = visible.dim.w - offset_x;
    }

    let inner = Dim::new(
        restored.w - margins.horizontal(),
        restored.h - margins.vertical(),
    );

    let top = root.y - offset_y - margins.top;

    if offset_x < inner.w / 2 && offset_y < inner.h / 2 {
        let x = if left_half {
            root.x - offset_x - margins.left
        } else {
            root.x + offset_x + margins.right - restored.w
        };

        Region::new(x, top, restored.w, restored.h)
    } else {
        let y = if offset_y < inner.h / 2 {
            top
        } else {
            root.y - restored.h / 2
        };

        Region::new(root.x - restored.w / 2, y, restored.w, restored.h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(op: DragOp) -> MoveResizeContext {
        MoveResizeContext::new(
            op,
            1,
            1,
            Pos::new(300, 300),
            Region::new(100, 100, 200, 200),
            0,
            SnapRegions::default(),
            1,
        )
    }

    #[test]
    fn resize_snaps_to_the_increment_grid() {
        let hints = GeometryHints::default()
            .with_min(Dim::new(100, 100))
            .with_max(Dim::new(400, 300))
            .with_inc(Dim::new(50, 50));

        let context = context(DragOp::Resize(WindowEdge::SouthEast));
        let candidate = context.candidate(Pos::new(347, 373), &hints, Padding::default());

        assert_eq!(candidate, Region::new(100, 100, 250, 250));
    }

    #[test]
    fn shrinking_from_the_top_left_holds_the_bottom_right() {
        let hints = GeometryHints::default().with_min(Dim::new(150, 150));
        let context = context(DragOp::Resize(WindowEdge::NorthWest));

        let candidate = context.candidate(Pos::new(400, 400), &hints, Padding::default());

        assert_eq!(candidate, Region::new(150, 150, 150, 150));
        assert_eq!((candidate.right(), candidate.bottom()), (300, 300));
    }

    #[test]
    fn margins_are_outside_the_hinted_size() {
        let hints = GeometryHints::default().with_max(Dim::new(200, 200));
        let margins = Padding::with_each_edge(10);
        let context = context(DragOp::Resize(WindowEdge::East));

        let candidate = context.candidate(Pos::new(500, 300), &hints, margins);

        assert_eq!(candidate, Region::new(100, 100, 220, 200));
    }

    #[test]
    fn moves_translate_the_start_rectangle() {
        let context = context(DragOp::Move);

        assert_eq!(
            context.candidate(Pos::new(250, 330), &GeometryHints::default(), Padding::default()),
            Region::new(50, 130, 200, 200)
        );
        assert_eq!(DragOp::Move.cursor_name(), "move");
        assert_eq!(DragOp::Resize(WindowEdge::SouthWest).cursor_name(), "sw-resize");
    }

    #[test]
    fn unsnapping_keeps_the_pointer_offset_from_the_nearer_edge() {
        let visible = Region::new(960, 0, 960, 1040);
        let restored = Dim::new(400, 300);

        let left = unsnap_placement(Pos::new(1000, 20), visible, restored, Padding::default());
        assert_eq!(left, Region::new(960, 0, 400, 300));

        let right = unsnap_placement(Pos::new(1900, 20), visible, restored, Padding::default());
        assert_eq!(right, Region::new(1520, 0, 400, 300));

        let centered = unsnap_placement(Pos::new(1400, 600), visible, restored, Padding::default());
        assert_eq!(centered, Region::new(1200, 450, 400, 300));
    }
}
