use crate::geometry::Padding;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::monitor::Monitor;
use crate::window::WindowEdge;
use crate::window::WindowState;

use strum::EnumIter;

/// Thickness of the edge strips, in logical pixels.
pub const REGION_THICKNESS: i32 = 20;
/// Thickness of the outer trigger strips, in logical pixels.
pub const REGION_TRIGGER_THICKNESS: i32 = 1;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, EnumIter)]
pub enum SnapState {
    Undetermined,
    Maximize,
    HalfLeft,
    HalfRight,
    FullUp,
}

impl SnapState {
    pub fn is_half_or_full_up(&self) -> bool {
        match self {
            SnapState::HalfLeft | SnapState::HalfRight | SnapState::FullUp => true,
            _ => false,
        }
    }
}

/// The pre-snap geometry of a window, both as fractions of the workarea it
/// was snapped on and as integers relative to that workarea.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SnapStash {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub region: Region,
}

impl SnapStash {
    pub fn new(
        region: Region,
        workarea: Region,
    ) -> Self {
        let relative = Region {
            pos: region.pos.relative_to(workarea.pos),
            dim: region.dim,
        };

        let ww = std::cmp::max(workarea.dim.w, 1) as f64;
        let wh = std::cmp::max(workarea.dim.h, 1) as f64;

        Self {
            x: relative.pos.x as f64 / ww,
            y: relative.pos.y as f64 / wh,
            w: relative.dim.w as f64 / ww,
            h: relative.dim.h as f64 / wh,
            region: relative,
        }
    }

    /// Places the stashed window into `workarea`. A window that fits keeps
    /// its size and the ratio of its distances to opposite workarea edges;
    /// one that does not is scaled by its stashed fractions.
    pub fn restore(
        &self,
        workarea: Region,
    ) -> Region {
        let (wa_pos, wa_dim) = workarea.values();
        let (width, height) = self.region.dim.values();

        if wa_dim.w >= width && wa_dim.h >= height {
            let left = self.x;
            let right = 1f64 - (self.x + self.w);
            let up = self.y;
            let down = 1f64 - (self.y + self.h);

            let hscale = if right > 0.001 {
                let ratio = left / right;
                ratio / (1f64 + ratio)
            } else {
                1f64
            };

            let vscale = if down > 0.001 {
                let ratio = up / down;
                ratio / (1f64 + ratio)
            } else {
                1f64
            };

            let new_left = (wa_dim.w - width) as f64 * hscale;
            let new_up = (wa_dim.h - height) as f64 * vscale;

            Region::new(
                (wa_pos.x as f64 + new_left).round() as i32,
                (wa_pos.y as f64 + new_up).round() as i32,
                width,
                height,
            )
        } else {
            Region::new(
                wa_pos.x + (wa_dim.w as f64 * self.x).round() as i32,
                wa_pos.y + (wa_dim.h as f64 * self.y).round() as i32,
                (wa_dim.w as f64 * self.w).round() as i32,
                (wa_dim.h as f64 * self.h).round() as i32,
            )
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EdgeRegion {
    pub edge: Region,
    pub trigger: Region,
}

impl EdgeRegion {
    /// One point for the edge strip, one for the trigger strip.
    pub fn score(
        &self,
        pos: Pos,
    ) -> u8 {
        self.edge.encompasses(pos) as u8 + self.trigger.encompasses(pos) as u8
    }
}

fn best_score(
    regions: &[EdgeRegion],
    pos: Pos,
) -> u8 {
    regions
        .iter()
        .map(|region| region.score(pos))
        .find(|&score| score > 0)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SnapRegions {
    pub maximize: Vec<EdgeRegion>,
    pub half_left: Vec<EdgeRegion>,
    pub half_right: Vec<EdgeRegion>,
    pub full_up: Vec<EdgeRegion>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SnapScores {
    pub maximize: u8,
    pub half_left: u8,
    pub half_right: u8,
    pub full_up: u8,
}

impl SnapRegions {
    /// An edge only triggers when no other monitor lies beyond it.
    pub fn for_monitors(monitors: &[Monitor]) -> Self {
        let mut regions = Self::default();

        for (index, monitor) in monitors.iter().enumerate() {
            let wa = monitor.workarea;
            let geometry = monitor.geometry;

            let mut move_up = true;
            let mut move_left = true;
            let mut move_right = true;
            let mut resize_up = true;
            let mut resize_down = true;

            for (other_index, other) in monitors.iter().enumerate() {
                if other_index == index {
                    continue;
                }

                let other_wa = other.workarea;

                if other_wa.pos.x >= wa.right() {
                    move_right = false;
                }

                if other_wa.right() <= wa.pos.x {
                    move_left = false;
                }

                if other_wa.bottom() <= wa.pos.y {
                    move_up = false;
                    resize_up = false;
                }

                if other_wa.pos.y >= wa.bottom() {
                    resize_down = false;
                }
            }

            let thickness = REGION_THICKNESS;
            let trigger = REGION_TRIGGER_THICKNESS;

            let diff = wa.pos.y - geometry.pos.y;
            let top = EdgeRegion {
                edge: Region::new(wa.pos.x, wa.pos.y - diff, wa.dim.w, thickness + diff),
                trigger: Region::new(wa.pos.x, wa.pos.y - diff, wa.dim.w, trigger + diff),
            };

            if move_up {
                regions.maximize.push(top);
            }

            if resize_up {
                regions.full_up.push(top);
            }

            let diff = wa.pos.x - geometry.pos.x;
            let left = EdgeRegion {
                edge: Region::new(wa.pos.x - diff, wa.pos.y, thickness + diff, wa.dim.h),
                trigger: Region::new(wa.pos.x - diff, wa.pos.y, trigger + diff, wa.dim.h),
            };

            if move_left {
                regions.half_left.push(left);
            }

            let diff = geometry.right() - wa.right();
            let right = EdgeRegion {
                edge: Region::new(wa.right() - thickness, wa.pos.y, thickness + diff, wa.dim.h),
                trigger: Region::new(wa.right() - trigger, wa.pos.y, trigger + diff, wa.dim.h),
            };

            if move_right {
                regions.half_right.push(right);
            }

            let diff = geometry.bottom() - wa.bottom();
            let bottom = EdgeRegion {
                edge: Region::new(wa.pos.x, wa.bottom() - thickness, wa.dim.w, thickness + diff),
                trigger: Region::new(wa.pos.x, wa.bottom() - trigger, wa.dim.w, trigger + diff),
            };

            if resize_down {
                regions.full_up.push(bottom);
            }
        }

        regions
    }

    pub fn scores(
        &self,
        pos: Pos,
    ) -> SnapScores {
        SnapScores {
            maximize: best_score(&self.maximize, pos),
            half_left: best_score(&self.half_left, pos),
            half_right: best_score(&self.half_right, pos),
            full_up: best_score(&self.full_up, pos),
        }
    }
}

/// What the indicator overlay must do after a pointer sample.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IndicatorCommand {
    Keep,
    Show(SnapState),
    Retarget(SnapState),
    Hide,
}

/// The per-drag snap state machine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SnapTracker {
    pub revealed: bool,
    pub current: SnapState,
}

impl Default for SnapTracker {
    fn default() -> Self {
        Self {
            revealed: false,
            current: SnapState::Undetermined,
        }
    }
}

impl SnapTracker {
    /// Feeds one pointer sample. `resize_edge` is `None` for moves.
    pub fn update(
        &mut self,
        regions: &SnapRegions,
        resize_edge: Option<WindowEdge>,
        pos: Pos,
    ) -> IndicatorCommand {
        let is_move = resize_edge.is_none();
        let is_resize = !is_move;
        let fullup_edge = resize_edge.map_or(false, |edge| edge.is_vertical());
        let scores = regions.scores(pos);

        if !self.revealed {
            let revealed = if is_move && scores.maximize == 2 {
                SnapState::Maximize
            } else if is_move && scores.half_left == 2 {
                SnapState::HalfLeft
            } else if is_move && scores.half_right == 2 {
                SnapState::HalfRight
            } else if is_resize && scores.full_up == 2 && fullup_edge {
                SnapState::FullUp
            } else {
                return IndicatorCommand::Keep;
            };

            self.revealed = true;
            self.current = revealed;
            return IndicatorCommand::Show(revealed);
        }

        let switch_to = |state: SnapState, tracker: &mut Self| {
            tracker.current = state;
            IndicatorCommand::Show(state)
        };

        match self.current {
            SnapState::Undetermined => {
                if is_resize && scores.full_up > 0 {
                    switch_to(SnapState::FullUp, self)
                } else {
                    IndicatorCommand::Keep
                }
            },
            SnapState::Maximize if is_move && scores.maximize > 0 => IndicatorCommand::Keep,
            SnapState::HalfLeft if is_move && scores.half_left > 0 => IndicatorCommand::Keep,
            SnapState::HalfRight if is_move && scores.half_right > 0 => IndicatorCommand::Keep,
            SnapState::FullUp => {
                if is_resize && scores.full_up > 0 && fullup_edge {
                    IndicatorCommand::Retarget(SnapState::FullUp)
                } else {
                    self.current = SnapState::Undetermined;
                    IndicatorCommand::Hide
                }
            },
            current => {
                let next = if is_move && scores.maximize > 0 && current != SnapState::Maximize {
                    Some(SnapState::Maximize)
                } else if is_move && scores.half_left > 0 && current != SnapState::HalfLeft {
                    Some(SnapState::HalfLeft)
                } else if is_move && scores.half_right > 0 && current != SnapState::HalfRight {
                    Some(SnapState::HalfRight)
                } else {
                    None
                };

                match next {
                    Some(next) => switch_to(next, self),
                    None => {
                        self.current = SnapState::Undetermined;
                        self.revealed = false;
                        IndicatorCommand::Hide
                    },
                }
            },
        }
    }
}

/// Where a window ends up once snapped into `state` on a monitor with
/// `workarea`. Maximize is left to the platform.
pub fn snap_target(
    state: SnapState,
    workarea: Region,
    virtual_screen: Region,
    current: Region,
    margins: Padding,
) -> Option<Region> {
    let target = match state {
        SnapState::Undetermined | SnapState::Maximize => return None,
        SnapState::HalfLeft => Region::new(
            workarea.pos.x,
            workarea.pos.y,
            workarea.dim.w / 2,
            workarea.dim.h,
        ),
        SnapState::HalfRight => Region::new(
            workarea.pos.x + workarea.dim.w / 2,
            workarea.pos.y,
            workarea.dim.w / 2,
            workarea.dim.h,
        ),
        SnapState::FullUp => {
            let current = current - margins;
            Region::new(
                current.pos.x,
                virtual_screen.pos.y,
                current.dim.w,
                virtual_screen.dim.h,
            )
        },
    };

    Some(target + margins)
}

/// The rectangle the indicator animates toward for `state`.
pub fn indicator_target(
    state: SnapState,
    workarea: Region,
    virtual_screen: Region,
    current: Region,
) -> Option<Region> {
    match state {
        SnapState::Undetermined => None,
        SnapState::Maximize => Some(workarea),
        SnapState::FullUp => Some(Region::new(
            current.pos.x,
            virtual_screen.pos.y,
            current.dim.w,
            virtual_screen.dim.h,
        )),
        state => snap_target(state, workarea, virtual_screen, current, Padding::default()),
    }
}

/// Keyboard snap gestures, as recognised by the low-level keyboard hook.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, EnumIter)]
pub enum SnapCombo {
    Nothing,
    Up,
    Down,
    Left,
    Right,
    ShiftUp,
    ShiftDown,
    ShiftLeft,
    ShiftRight,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SnapAction {
    /// Restore the stashed geometry on the given monitor.
    Unsnap(usize),
    Maximize,
    Unmaximize,
    Iconify,
    SnapLeft(usize),
    SnapRight(usize),
    SnapUp,
}

/// The actions a keyboard gesture performs on a window on `monitor`.
pub fn plan_combo(
    combo: SnapCombo,
    state: WindowState,
    snap: SnapState,
    monitor: usize,
    monitor_count: usize,
) -> Vec<SnapAction> {
    use SnapAction::*;

    let maximized = state.contains(WindowState::MAXIMIZED);
    let minimized = state.contains(WindowState::ICONIFIED) && !maximized;
    let count = std::cmp::max(monitor_count, 1);

    match combo {
        SnapCombo::Nothing | SnapCombo::ShiftLeft | SnapCombo::ShiftRight => Vec::new(),
        SnapCombo::Up if !maximized => vec![Unsnap(monitor), Maximize],
        SnapCombo::Up => Vec::new(),
        SnapCombo::Down | SnapCombo::ShiftDown => {
            if maximized {
                vec![Unmaximize, Unsnap(monitor)]
            } else if snap.is_half_or_full_up() {
                vec![Unsnap(monitor)]
            } else if !minimized {
                vec![Iconify]
            } else {
                Vec::new()
            }
        },
        SnapCombo::Left => {
            let mut actions = if maximized {
                vec![Unmaximize]
            } else {
                Vec::new()
            };

            match snap {
                SnapState::Undetermined | SnapState::FullUp | SnapState::Maximize => {
                    actions.extend(vec![Unsnap(monitor), SnapLeft(monitor)])
                },
                SnapState::HalfLeft => actions.extend(vec![
                    Unsnap(monitor),
                    SnapRight((monitor + count - 1) % count),
                ]),
                SnapState::HalfRight => actions.push(Unsnap(monitor)),
            }

            actions
        },
        SnapCombo::Right => {
            let mut actions = if maximized {
                vec![Unmaximize]
            } else {
                Vec::new()
            };

            match snap {
                SnapState::Undetermined | SnapState::FullUp | SnapState::Maximize => {
                    actions.extend(vec![Unsnap(monitor), SnapRight(monitor)])
                },
                SnapState::HalfLeft => actions.push(Unsnap(monitor)),
                SnapState::HalfRight => {
                    actions.extend(vec![Unsnap(monitor), SnapLeft((monitor + 1) % count)])
                },
            }

            actions
        },
        SnapCombo::ShiftUp if !maximized && snap == SnapState::Undetermined => vec![SnapUp],
        SnapCombo::ShiftUp => Vec::new(),
    }
}

/// The actions that apply a snap revealed during an interactive drag.
pub fn plan_release(
    snap: SnapState,
    monitor: usize,
) -> Vec<SnapAction> {
    match snap {
        SnapState::Undetermined => Vec::new(),
        SnapState::Maximize => vec![SnapAction::Unsnap(monitor), SnapAction::Maximize],
        SnapState::HalfLeft => vec![SnapAction::Unsnap(monitor), SnapAction::SnapLeft(monitor)],
        SnapState::HalfRight => vec![SnapAction::Unsnap(monitor), SnapAction::SnapRight(monitor)],
        SnapState::FullUp => vec![SnapAction::SnapUp],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single() -> Vec<Monitor> {
        vec![Monitor::new(
            Region::new(0, 0, 1920, 1080),
            Region::new(0, 0, 1920, 1040),
        )]
    }

    #[test]
    fn inner_edges_between_monitors_never_trigger() {
        let monitors = vec![
            Monitor::new(Region::new(0, 0, 1920, 1080), Region::new(0, 0, 1920, 1080)),
            Monitor::new(Region::new(1920, 0, 1920, 1080), Region::new(1920, 0, 1920, 1080)),
        ];

        let regions = SnapRegions::for_monitors(&monitors);

        assert_eq!(regions.half_left.len(), 1);
        assert_eq!(regions.half_right.len(), 1);
        assert_eq!(regions.maximize.len(), 2);
        assert_eq!(regions.half_right[0].trigger.pos.x, 3839);
    }

    #[test]
    fn taskbar_space_extends_the_bottom_strip() {
        let regions = SnapRegions::for_monitors(&single());
        let bottom = regions.full_up[1];

        assert_eq!(bottom.edge, Region::new(0, 1020, 1920, 60));
        assert_eq!(bottom.score(Pos::new(100, 1079)), 2);
        assert_eq!(bottom.score(Pos::new(100, 1030)), 1);
    }

    #[test]
    fn trigger_reveals_and_edge_holds() {
        let regions = SnapRegions::for_monitors(&single());
        let mut tracker = SnapTracker::default();

        assert_eq!(tracker.update(&regions, None, Pos::new(10, 500)), IndicatorCommand::Keep);
        assert!(!tracker.revealed);

        assert_eq!(
            tracker.update(&regions, None, Pos::new(0, 500)),
            IndicatorCommand::Show(SnapState::HalfLeft)
        );
        assert_eq!(tracker.update(&regions, None, Pos::new(10, 500)), IndicatorCommand::Keep);
        assert_eq!(tracker.current, SnapState::HalfLeft);

        assert_eq!(tracker.update(&regions, None, Pos::new(400, 500)), IndicatorCommand::Hide);
        assert_eq!(tracker.current, SnapState::Undetermined);
        assert!(!tracker.revealed);
    }

    #[test]
    fn revealed_snap_follows_the_pointer_between_regions() {
        let regions = SnapRegions::for_monitors(&single());
        let mut tracker = SnapTracker::default();

        tracker.update(&regions, None, Pos::new(0, 500));
        assert_eq!(
            tracker.update(&regions, None, Pos::new(1915, 500)),
            IndicatorCommand::Show(SnapState::HalfRight)
        );
        assert_eq!(
            tracker.update(&regions, None, Pos::new(900, 5)),
            IndicatorCommand::Show(SnapState::Maximize)
        );
    }

    #[test]
    fn full_up_needs_a_vertical_resize() {
        let regions = SnapRegions::for_monitors(&single());

        let mut tracker = SnapTracker::default();
        assert_eq!(
            tracker.update(&regions, Some(WindowEdge::East), Pos::new(500, 0)),
            IndicatorCommand::Keep
        );

        let mut tracker = SnapTracker::default();
        assert_eq!(
            tracker.update(&regions, Some(WindowEdge::North), Pos::new(500, 0)),
            IndicatorCommand::Show(SnapState::FullUp)
        );
        assert_eq!(
            tracker.update(&regions, Some(WindowEdge::North), Pos::new(500, 10)),
            IndicatorCommand::Retarget(SnapState::FullUp)
        );
        assert_eq!(
            tracker.update(&regions, Some(WindowEdge::North), Pos::new(500, 300)),
            IndicatorCommand::Hide
        );
    }

    #[test]
    fn unsnap_restores_the_stash_on_an_unchanged_workarea() {
        let workarea = Region::new(0, 0, 1920, 1040);

        for &region in &[
            Region::new(100, 120, 640, 480),
            Region::new(0, 0, 300, 200),
            Region::new(1620, 840, 300, 200),
            Region::new(1, 500, 1919, 480),
        ] {
            let stash = SnapStash::new(region, workarea);
            assert_eq!(stash.restore(workarea), region);
        }
    }

    #[test]
    fn unsnap_scales_windows_that_no_longer_fit() {
        let stash = SnapStash::new(Region::new(200, 100, 1600, 800), Region::new(0, 0, 2000, 1000));

        assert_eq!(
            stash.restore(Region::new(0, 0, 1000, 500)),
            Region::new(100, 50, 800, 400)
        );
    }

    #[test]
    fn half_snaps_split_the_workarea_and_keep_margins() {
        let workarea = Region::new(0, 0, 1920, 1040);
        let margins = Padding::with_each_edge(10);
        let screen = Region::new(0, 0, 1920, 1080);

        assert_eq!(
            snap_target(SnapState::HalfRight, workarea, screen, Region::default(), margins),
            Some(Region::new(950, -10, 980, 1060))
        );
        assert_eq!(
            snap_target(SnapState::FullUp, workarea, screen, Region::new(90, 90, 520, 420), margins),
            Some(Region::new(90, -10, 520, 1100))
        );
    }

    #[test]
    fn keyboard_gestures_cycle_across_monitors() {
        use SnapAction::*;

        let normal = WindowState::empty();

        assert_eq!(
            plan_combo(SnapCombo::Left, normal, SnapState::Undetermined, 0, 2),
            vec![Unsnap(0), SnapLeft(0)]
        );
        assert_eq!(
            plan_combo(SnapCombo::Left, normal, SnapState::HalfLeft, 0, 2),
            vec![Unsnap(0), SnapRight(1)]
        );
        assert_eq!(
            plan_combo(SnapCombo::Right, normal, SnapState::HalfRight, 1, 2),
            vec![Unsnap(1), SnapLeft(0)]
        );
        assert_eq!(
            plan_combo(SnapCombo::Down, WindowState::MAXIMIZED, SnapState::Undetermined, 0, 1),
            vec![Unmaximize, Unsnap(0)]
        );
        assert_eq!(plan_combo(SnapCombo::Down, normal, SnapState::Undetermined, 0, 1), vec![Iconify]);
        assert!(plan_combo(SnapCombo::ShiftUp, normal, SnapState::HalfLeft, 0, 1).is_empty());
    }
}
