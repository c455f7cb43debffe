pub use crate::Result;

use crate::aerosnap::indicator_target;
use crate::aerosnap::plan_combo;
use crate::aerosnap::plan_release;
use crate::aerosnap::snap_target;
use crate::aerosnap::IndicatorCommand;
use crate::aerosnap::SnapAction;
use crate::aerosnap::SnapCombo;
use crate::aerosnap::SnapStash;
use crate::aerosnap::SnapState;
use crate::display::DisplayCore;
use crate::display::ModalOperation;
use crate::display::SNAP_INDICATOR_TIMER;
use crate::event::Event;
use crate::event::EventKind;
use crate::event::EventMask;
use crate::event::GrabStatus;
use crate::geometry::Padding;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::grab::GrabOwnership;
use crate::indicator::ANIMATION_TICK;
use crate::indicator::OPACITY;
use crate::input::DeviceId;
use crate::monitor::monitor_for_region;
use crate::moveresize::unsnap_placement;
use crate::moveresize::DragOp;
use crate::moveresize::MoveResizeContext;
use crate::platform::NativeWindowAttributes;
use crate::platform::ShowCommand;
use crate::window::Hwnd;
use crate::window::Window;
use crate::window::WindowEdge;
use crate::window::WindowState;
use crate::window::WindowType;

impl DisplayCore {
    /// Starts moving `window` with the pointer, which is at `root` with
    /// `button` held. Only button 1 drives a move.
    pub fn begin_move(
        &mut self,
        window: Window,
        device: DeviceId,
        button: u32,
        root: Pos,
        time: u32,
    ) -> GrabStatus {
        self.begin_move_resize(window, DragOp::Move, device, button, root, time)
    }

    pub fn begin_resize(
        &mut self,
        window: Window,
        edge: WindowEdge,
        device: DeviceId,
        button: u32,
        root: Pos,
        time: u32,
    ) -> GrabStatus {
        self.begin_move_resize(window, DragOp::Resize(edge), device, button, root, time)
    }

    fn begin_move_resize(
        &mut self,
        window: Window,
        op: DragOp,
        device: DeviceId,
        button: u32,
        root: Pos,
        time: u32,
    ) -> GrabStatus {
        let usable = self.registry.get(window).map_or(false, |data| {
            data.is_toplevel() && data.is_viewable() && !data.state.contains(WindowState::ICONIFIED)
        });

        if !usable || button != 1 {
            debug!("refusing {:?} of window {} with button {}", op, window, button);
            return GrabStatus::Failed;
        }

        if let Some(moving) = self.moving {
            self.end_move_resize(moving, time);
        }

        let root = self.leave_snapped_state(window, op, root);

        let start_rect = match self.registry.get(window) {
            Some(data) => data.region,
            None => return GrabStatus::Failed,
        };

        let status = self.grab_device(
            device,
            window,
            GrabOwnership::None,
            false,
            EventMask::all_events(),
            Some(op.cursor_name()),
            time,
        );

        if status != GrabStatus::Success {
            warn!("unable to grab the pointer for {:?} of window {}: {:?}", op, window, status);
            return status;
        }

        let context = MoveResizeContext::new(
            op,
            device,
            button,
            root,
            start_rect,
            time,
            self.snap_regions.clone(),
            self.scale,
        );

        if let Some(data) = self.registry.get_mut(window) {
            data.drag = Some(context);
        }

        self.moving = Some(window);
        self.begin_modal(ModalOperation::MOVE_RESIZE);

        info!("began {:?} of window {} at {:?}", op, window, root);
        status
    }

    /// Undoes maximization or snapping before a drag, so the pointer keeps
    /// its place on the restored window. Returns the pointer position the
    /// drag starts from.
    fn leave_snapped_state(
        &mut self,
        window: Window,
        op: DragOp,
        root: Pos,
    ) -> Pos {
        let (hwnd, region, margins, maximized, snap, stash) = match self.registry.get(window) {
            Some(data) => (
                data.hwnd,
                data.region,
                data.margins,
                data.state.contains(WindowState::MAXIMIZED),
                data.snap,
                data.stash,
            ),
            None => return root,
        };

        if let DragOp::Resize(_) = op {
            if snap.is_half_or_full_up() {
                self.discard_snap(window);
                return root;
            }
        }

        if !maximized && !snap.is_half_or_full_up() {
            return root;
        }

        // shadows are not part of what the user grabbed
        let visible = if op == DragOp::Move && !maximized {
            region - margins
        } else {
            region
        };

        let outside = !visible.contains_point(root);

        if !outside && maximized {
            let restored = self
                .platform
                .normal_placement(hwnd)
                .map(|placement| placement.dim.unscaled(self.scale));

            if let Some(restored) = restored {
                let placement = unsnap_placement(root, visible, restored, margins);
                let native = self.device_region(placement);
                self.platform.set_normal_placement(hwnd, native);

                self.unmaximize(window);
                self.move_resize(window, placement);
            } else {
                self.unmaximize(window);
            }
        } else if !outside && stash.is_some() {
            let restored = stash.map_or(region.dim, |stash| stash.region.dim);
            let margins = if op == DragOp::Move {
                margins
            } else {
                Padding::default()
            };

            let placement = unsnap_placement(root, visible, restored, margins);
            self.discard_snap(window);
            self.move_resize(window, placement);
        } else if maximized {
            self.unmaximize(window);
        } else {
            let monitor = monitor_for_region(&self.monitors, region).unwrap_or(0);
            self.unsnap(window, monitor);
        }

        if !outside {
            return root;
        }

        let center = region.center();
        let screen = self.screen_from_root(center);
        debug!("warping pointer into window {} at {:?}", window, center);
        self.platform.warp_pointer(screen);

        center
    }

    /// Follows the pointer at `root` with the window being dragged.
    pub(crate) fn drag_motion(
        &mut self,
        window: Window,
        root: Pos,
        time: u32,
    ) {
        let (candidate, current, selects, edge) = match self.registry.get(window) {
            Some(data) => match data.drag.as_ref() {
                Some(drag) => (
                    drag.candidate(root, &data.hints, data.margins),
                    data.region,
                    data.event_mask.contains(EventMask::STRUCTURE),
                    drag.op.edge(),
                ),
                None => return,
            },
            None => return,
        };

        if candidate != current {
            self.move_resize(window, candidate);

            if let Some(drag) = self.registry.get_mut(window).and_then(|data| data.drag.as_mut()) {
                drag.native_move_resize_pending = edge.is_some();
            }

            if selects {
                let event = Event::new(
                    EventKind::Configure {
                        region: candidate,
                    },
                    Some(window),
                )
                .with_time(time);

                self.emit(event);
            }
        }

        let command = match self.registry.get_mut(window).and_then(|data| data.drag.as_mut()) {
            Some(drag) => drag.snap.update(&drag.regions, edge, root),
            None => return,
        };

        match command {
            IndicatorCommand::Keep => {},
            IndicatorCommand::Show(state) => self.show_indicator(window, state, root, false),
            IndicatorCommand::Retarget(state) => self.show_indicator(window, state, root, true),
            IndicatorCommand::Hide => self.hide_indicator(window),
        }
    }

    fn show_indicator(
        &mut self,
        window: Window,
        state: SnapState,
        root: Pos,
        retarget: bool,
    ) {
        let monitor = self.monitor_index_at(root);
        let workarea = match self.monitors.get(monitor) {
            Some(monitor) => monitor.workarea,
            None => return,
        };

        let virtual_screen = self.virtual_screen();
        let now = self.platform.tick_count();

        let (hwnd, started) = match self.registry.get_mut(window) {
            Some(data) => {
                let region = data.region;
                let drag = match data.drag.as_mut() {
                    Some(drag) => drag,
                    None => return,
                };

                let target = match indicator_target(state, workarea, virtual_screen, region) {
                    Some(target) => target,
                    None => return,
                };

                debug!("snap indicator for {:?} toward {:?}", state, target);

                let started = if retarget {
                    drag.indicator.retarget(target, now)
                } else {
                    drag.indicator.start(region, target, now)
                };

                (data.hwnd, started)
            },
            None => return,
        };

        if started && self.ensure_indicator_window(window).is_some() {
            self.platform.set_timer(hwnd, SNAP_INDICATOR_TIMER, ANIMATION_TICK);
        }
    }

    fn hide_indicator(
        &mut self,
        window: Window,
    ) {
        let (hwnd, indicator) = match self.registry.get_mut(window) {
            Some(data) => match data.drag.as_mut() {
                Some(drag) => {
                    drag.indicator.stop();
                    (data.hwnd, drag.indicator.hwnd)
                },
                None => return,
            },
            None => return,
        };

        self.platform.kill_timer(hwnd, SNAP_INDICATOR_TIMER);

        if let Some(indicator) = indicator {
            self.platform.show_window(indicator, ShowCommand::Hide);
        }
    }

    /// The helper window the indicator is presented in, created on first
    /// use. A failure disables the indicator for the rest of the drag.
    fn ensure_indicator_window(
        &mut self,
        window: Window,
    ) -> Option<Hwnd> {
        let drag = self.registry.get(window)?.drag.as_ref()?;

        if drag.indicator.disabled {
            return None;
        }

        if let Some(hwnd) = drag.indicator.hwnd {
            return Some(hwnd);
        }

        let attributes = NativeWindowAttributes {
            parent: None,
            region: Region::new(0, 0, 1, 1),
            kind: WindowType::Temp,
            layered: true,
            topmost: true,
        };

        let created = self.platform.create_native_window(attributes);
        let drag = self.registry.get_mut(window)?.drag.as_mut()?;

        match created {
            Ok(hwnd) => {
                drag.indicator.hwnd = Some(hwnd);
                Some(hwnd)
            },
            Err(err) => {
                warn!("unable to create the snap indicator window: {}", err);
                drag.indicator.disabled = true;
                None
            },
        }
    }

    /// Advances the indicator animation by one frame.
    pub(crate) fn indicator_tick(&mut self) {
        let window = match self.moving {
            Some(window) => window,
            None => return,
        };

        let now = self.platform.tick_count();

        let (hwnd, indicator, frame) = match self.registry.get_mut(window) {
            Some(data) => match data.drag.as_mut() {
                Some(drag) => (data.hwnd, drag.indicator.hwnd, drag.indicator.frame(now)),
                None => return,
            },
            None => return,
        };

        let (indicator, frame) = match (indicator, frame) {
            (Some(indicator), Some(frame)) => (indicator, frame),
            _ => {
                self.platform.kill_timer(hwnd, SNAP_INDICATOR_TIMER);
                return;
            },
        };

        let native = self.device_region(frame.window_rect);

        let presented = match self
            .registry
            .get(window)
            .and_then(|data| data.drag.as_ref())
            .and_then(|drag| drag.indicator.surface())
        {
            Some(surface) => self.platform.update_layered_window(indicator, native, surface, OPACITY),
            None => return,
        };

        match presented {
            Ok(()) => self.platform.show_window(indicator, ShowCommand::ShowNoActivate),
            Err(err) => {
                warn!("unable to present the snap indicator: {}", err);

                if let Some(drag) = self.registry.get_mut(window).and_then(|data| data.drag.as_mut()) {
                    drag.indicator.disabled = true;
                }
            },
        }

        if frame.last {
            self.platform.kill_timer(hwnd, SNAP_INDICATOR_TIMER);
        }
    }

    /// Ends the drag of `window`, applying the snap it revealed.
    pub fn end_move_resize(
        &mut self,
        window: Window,
        time: u32,
    ) {
        let (hwnd, drag) = match self.registry.get_mut(window) {
            Some(data) => match data.drag.take() {
                Some(drag) => (data.hwnd, drag),
                None => return,
            },
            None => return,
        };

        if self.moving == Some(window) {
            self.moving = None;
        }

        self.end_modal(ModalOperation::MOVE_RESIZE);
        self.ungrab_device(drag.device, time);

        self.platform.kill_timer(hwnd, SNAP_INDICATOR_TIMER);

        if let Some(indicator) = drag.indicator.hwnd {
            self.platform.destroy_native_window(indicator);
        }

        info!("ended {:?} of window {}", drag.op, window);

        let snap = drag.snap.current;

        if snap != SnapState::Undetermined {
            let region = self.registry.get(window).map_or(drag.start_rect, |data| data.region);
            let monitor = monitor_for_region(&self.monitors, region).unwrap_or(0);

            info!("applying {:?} to window {}", snap, window);
            self.apply_snap_actions(window, &plan_release(snap, monitor), Some(drag.start_rect));
        }
    }

    /// Runs a keyboard snap gesture on `window`.
    pub fn aerosnap(
        &mut self,
        window: Window,
        combo: SnapCombo,
        time: u32,
    ) {
        let (state, snap, region) = match self.registry.get(window) {
            Some(data) if data.is_toplevel() => (data.state, data.snap, data.region),
            _ => return,
        };

        let monitor = monitor_for_region(&self.monitors, region).unwrap_or(0);
        let actions = plan_combo(combo, state, snap, monitor, self.monitors.len());

        debug!("snap gesture {:?} on window {} at {}: {:?}", combo, window, time, actions);
        self.apply_snap_actions(window, &actions, None);
    }

    fn apply_snap_actions(
        &mut self,
        window: Window,
        actions: &[SnapAction],
        pre_snap: Option<Region>,
    ) {
        for action in actions {
            match *action {
                SnapAction::Unsnap(monitor) => self.unsnap(window, monitor),
                SnapAction::Maximize => self.maximize(window),
                SnapAction::Unmaximize => self.unmaximize(window),
                SnapAction::Iconify => self.iconify(window),
                SnapAction::SnapLeft(monitor) => {
                    self.snap(window, SnapState::HalfLeft, monitor, pre_snap)
                },
                SnapAction::SnapRight(monitor) => {
                    self.snap(window, SnapState::HalfRight, monitor, pre_snap)
                },
                SnapAction::SnapUp => {
                    let region = self.registry.get(window).map(|data| data.region);
                    let monitor = region
                        .and_then(|region| monitor_for_region(&self.monitors, region))
                        .unwrap_or(0);

                    self.snap(window, SnapState::FullUp, monitor, pre_snap)
                },
            }
        }
    }

    /// Restores the stashed geometry into the workarea of `monitor`.
    fn unsnap(
        &mut self,
        window: Window,
        monitor: usize,
    ) {
        let stash = match self.registry.get_mut(window) {
            Some(data) => {
                data.snap = SnapState::Undetermined;
                data.stash.take()
            },
            None => return,
        };

        let (stash, workarea) = match (stash, self.monitors.get(monitor)) {
            (Some(stash), Some(monitor)) => (stash, monitor.workarea),
            _ => return,
        };

        let region = stash.restore(workarea);
        debug!("unsnapping window {} to {:?}", window, region);
        self.move_resize(window, region);
    }

    fn discard_snap(
        &mut self,
        window: Window,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.snap = SnapState::Undetermined;
            data.stash = None;
        }
    }

    /// Records the geometry `window` returns to when unsnapped, relative
    /// to the workarea of the monitor it is on.
    fn stash(
        &mut self,
        window: Window,
        pre_snap: Option<Region>,
    ) {
        let (hwnd, region) = match self.registry.get(window) {
            Some(data) => (data.hwnd, data.region),
            None => return,
        };

        let workarea = match monitor_for_region(&self.monitors, region) {
            Some(monitor) => self.monitors[monitor].workarea,
            None => return,
        };

        let stashed = pre_snap
            .or_else(|| {
                self.platform
                    .normal_placement(hwnd)
                    .map(|placement| self.logical_region(placement))
            })
            .unwrap_or(region);

        if let Some(data) = self.registry.get_mut(window) {
            data.stash = Some(SnapStash::new(stashed, workarea));
        }
    }

    fn snap(
        &mut self,
        window: Window,
        state: SnapState,
        monitor: usize,
        pre_snap: Option<Region>,
    ) {
        let workarea = match self.monitors.get(monitor) {
            Some(monitor) => monitor.workarea,
            None => return,
        };

        self.stash(window, pre_snap);

        let virtual_screen = self.virtual_screen();
        let target = match self.registry.get_mut(window) {
            Some(data) => {
                data.snap = state;
                snap_target(state, workarea, virtual_screen, data.region, data.margins)
            },
            None => return,
        };

        if let Some(target) = target {
            info!("snapping window {} {:?} to {:?}", window, state, target);
            self.move_resize(window, target);
        }
    }
}
