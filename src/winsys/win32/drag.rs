pub use crate::Result;

use crate::atoms::Atom;
use crate::atoms::KnownAtom;
use crate::display::DisplayCore;
use crate::display::DRAG_ANIMATION_TIMER;
use crate::dnd::current_actions;
use crate::dnd::cursor_for_action;
use crate::dnd::grab_break_cancels;
use crate::dnd::key_navigation;
use crate::dnd::DndState;
use crate::dnd::DragAction;
use crate::dnd::DragAnimation;
use crate::dnd::DragCancelReason;
use crate::dnd::DragProtocol;
use crate::dnd::DragStatus;
use crate::dnd::KeyNavigation;
use crate::dnd::SourceCapabilities;
use crate::dnd::ANIMATION_TICK;
use crate::event::DndData;
use crate::event::DragContextId;
use crate::event::Event;
use crate::event::EventKind;
use crate::event::EventMask;
use crate::event::GrabStatus;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::input::DeviceId;
use crate::input::Key;
use crate::input::ModifierType;
use crate::registry::WindowAttributes;
use crate::win32::keyboard::drag_key_state;
use crate::win32::keyboard::modifier_state;
use crate::window::TypeHint;
use crate::window::Window;

impl DisplayCore {
    /// Starts a source drag from `window` offering `targets`. The pointer
    /// is at `root`. The drag runs once `manage_dnd` grabs the seat.
    pub fn drag_begin(
        &mut self,
        window: Window,
        device: DeviceId,
        targets: &[Atom],
        actions: DragAction,
        root: Pos,
    ) -> Option<DragContextId> {
        if !self.registry.get(window).map_or(false, |data| !data.destroyed) {
            warn!("unable to begin a drag from window {}: window is gone", window);
            return None;
        }

        if let Some(current) = self.dnd.source {
            warn!("unable to begin a drag from window {}: drag {} in progress", window, current);
            return None;
        }

        let protocol = if self.config.use_ole2_dnd {
            DragProtocol::Ole2
        } else {
            DragProtocol::Local
        };

        let mut formats = Vec::new();

        for &target in targets {
            self.selection
                .add_target_to_formats(self.platform.as_mut(), &self.atoms, target, &mut formats);
        }

        let capabilities =
            SourceCapabilities::for_targets(&self.atoms, targets, self.selection.pixbuf_targets());
        let key_state = drag_key_state(self.platform.as_ref());
        let (suggested, _) = current_actions(modifier_state(self.platform.as_ref()), 1, actions);

        let attributes = WindowAttributes::temp(Region::new(root.x, root.y, 1, 1))
            .with_type_hint(TypeHint::Dnd);
        let drag_window = match self.create_window(None, &attributes) {
            Ok(drag_window) => Some(drag_window),
            Err(err) => {
                warn!("{}", err);
                None
            },
        };

        let id = self.dnd.create(protocol, true, device, self.scale);

        if let Some(context) = self.dnd.get_mut(id) {
            context.source_window = Some(window);
            context.targets = targets.to_vec();
            context.actions = actions;
            context.suggested_action = suggested;
            context.start = root;
            context.last = root;
            context.last_key_state = key_state;
            context.formats = formats.clone();
            context.capabilities = capabilities;
            context.drag_window = drag_window;
        }

        self.dnd.source = Some(id);
        self.selection.dnd_targets = formats;

        if protocol == DragProtocol::Ole2 {
            self.dnd.source_state = DndState::Pending;
        }

        info!("drag {} begins on window {} over {:?}", id, window, protocol);
        Some(id)
    }

    /// Hands the drag to `ipc_window`, which holds the seat until the
    /// drag ends.
    pub fn manage_dnd(
        &mut self,
        id: DragContextId,
        ipc_window: Window,
        actions: DragAction,
    ) -> bool {
        let (suggested, cursor) = match self.dnd.get_mut(id) {
            Some(context) if context.is_source => {
                context.protocol = if self.config.use_ole2_dnd {
                    DragProtocol::Ole2
                } else {
                    DragProtocol::Local
                };
                context.ipc_window = Some(ipc_window);
                context.actions = actions;
                (context.suggested_action, cursor_for_action(context.suggested_action))
            },
            _ => return false,
        };

        let time = self.next_tick(0);

        if self.grab_seat(ipc_window, false, Some(cursor), time) != GrabStatus::Success {
            warn!("unable to grab the seat for drag {}", id);
            return false;
        }

        if let Some(context) = self.dnd.get_mut(id) {
            context.grabbed = true;
            context.current_action = suggested;
        }

        debug!("drag {} managed by window {}", id, ipc_window);
        true
    }

    /// Re-evaluates the destination and actions of the source drag for a
    /// pointer at `root`.
    pub fn drag_update(
        &mut self,
        root: Pos,
        state: ModifierType,
        time: u32,
    ) {
        let id = match self.dnd.source {
            Some(id) => id,
            None => return,
        };

        let actions = match self.dnd.get(id) {
            Some(context) => context.actions,
            None => return,
        };

        let (suggested, possible) = current_actions(state, 1, actions);
        let (dest, protocol) = self.find_drop_window(id, root);

        self.dnd_motion(id, dest, protocol, root, suggested, possible, time);
    }

    /// The registered drop target under `root`, skipping the drag's own
    /// windows.
    fn find_drop_window(
        &self,
        id: DragContextId,
        root: Pos,
    ) -> (Option<Window>, DragProtocol) {
        let own = self
            .dnd
            .get(id)
            .map_or((None, None), |context| (context.drag_window, context.ipc_window));

        let under = self
            .window_at_screen_point(self.screen_from_root(root))
            .filter(|&window| Some(window) != own.0);

        let target = under.and_then(|window| {
            self.registry
                .ancestry(window)
                .into_iter()
                .find(|&window| self.registry.get(window).map_or(false, |data| data.drop_target))
        });

        match target {
            Some(_) if self.config.use_ole2_dnd => (target, DragProtocol::Ole2),
            Some(_) => (target, DragProtocol::Local),
            None => (None, DragProtocol::None),
        }
    }

    /// Moves the source drag to `root` over `dest`. Returns false when
    /// the context is gone.
    fn dnd_motion(
        &mut self,
        id: DragContextId,
        dest: Option<Window>,
        protocol: DragProtocol,
        root: Pos,
        suggested: DragAction,
        possible: DragAction,
        time: u32,
    ) -> bool {
        let (previous, source_protocol, drag_window, hot) = match self.dnd.get(id) {
            Some(context) => (context.dest_window, context.protocol, context.drag_window, context.hot),
            None => return false,
        };

        let local = source_protocol == DragProtocol::Local;

        if previous != dest {
            if local && previous.is_some() {
                self.local_send_leave(id, time);
            }

            if let Some(context) = self.dnd.get_mut(id) {
                context.status = DragStatus::Drag;
                context.dest_window = dest;
                context.suggested_action = suggested;
                context.action = if dest.is_some() {
                    suggested
                } else {
                    DragAction::empty()
                };

                if dest.is_some() && protocol != DragProtocol::None {
                    context.protocol = protocol;
                }
            }

            if local {
                if let Some(dest) = dest {
                    self.local_send_enter(id, dest, time);
                }
            }

            self.emit_drag_status(id, root, true, time);
        } else if let Some(context) = self.dnd.get_mut(id) {
            if context.suggested_action != suggested {
                context.suggested_action = suggested;
                context.action = suggested;
            }
        }

        let status = match self.dnd.get_mut(id) {
            Some(context) => {
                context.last = root;
                context.status
            },
            None => return false,
        };

        if let Some(drag_window) = drag_window {
            if self.registry.get(drag_window).map_or(false, |data| data.mapped) {
                self.move_to(drag_window, Pos::new(root.x - hot.x, root.y - hot.y));
            }
        }

        if local && dest.is_some() && status == DragStatus::Drag {
            self.local_send_motion(id, root, possible, time);
        }

        true
    }

    fn emit_drag_status(
        &mut self,
        id: DragContextId,
        root: Pos,
        send_event: bool,
        time: u32,
    ) {
        let source_window = match self.dnd.get(id).and_then(|context| context.source_window) {
            Some(window) => window,
            None => return,
        };

        let mut event = self.pointer_event(
            EventKind::DragStatus(DndData {
                context: id,
                x_root: root.x,
                y_root: root.y,
            }),
            source_window,
            time,
        );

        event.send_event = send_event;
        self.emit(event);
    }

    fn local_send_enter(
        &mut self,
        id: DragContextId,
        dest: Window,
        time: u32,
    ) {
        let source = match self.dnd.get(id) {
            Some(context) => context.clone(),
            None => return,
        };

        for stale in self.dnd.destinations_of(source.source_window) {
            trace!("dropping stale destination context {}", stale);
            self.dnd.remove(stale);
        }

        let dest_id = self.dnd.create(DragProtocol::Local, false, source.device, source.scale);

        if let Some(context) = self.dnd.get_mut(dest_id) {
            context.source_window = source.source_window;
            context.dest_window = Some(dest);
            context.targets = source.targets.clone();
            context.actions = source.actions;
            context.suggested_action = source.suggested_action;
            context.last = source.last;
        }

        if let Some(window) = source.source_window {
            if let Some(data) = self.registry.get_mut(window) {
                data.event_mask |= EventMask::PROPERTY_CHANGE;
            }
        }

        self.dnd.dest = Some(dest_id);

        debug!("local drag {} enters window {}", id, dest);

        let event = self.pointer_event(
            EventKind::DragEnter(DndData {
                context: dest_id,
                x_root: source.last.x,
                y_root: source.last.y,
            }),
            dest,
            time,
        );

        self.emit(event);
    }

    fn local_dest(
        &self,
        id: DragContextId,
    ) -> Option<(DragContextId, Window)> {
        let source_window = self.dnd.get(id)?.source_window;
        let dest = self.dnd.get(self.dnd.dest?)?;

        if dest.protocol != DragProtocol::Local || dest.source_window != source_window {
            return None;
        }

        Some((dest.id, dest.dest_window?))
    }

    fn local_send_motion(
        &mut self,
        id: DragContextId,
        root: Pos,
        actions: DragAction,
        time: u32,
    ) {
        let (dest_id, window) = match self.local_dest(id) {
            Some(dest) => dest,
            None => return,
        };

        let suggested = match self.dnd.get_mut(id) {
            Some(context) => {
                context.status = DragStatus::MotionWait;
                context.suggested_action
            },
            None => return,
        };

        if let Some(dest) = self.dnd.get_mut(dest_id) {
            dest.suggested_action = suggested;
            dest.actions = actions;
            dest.last = root;
        }

        let event = self.pointer_event(
            EventKind::DragMotion(DndData {
                context: dest_id,
                x_root: root.x,
                y_root: root.y,
            }),
            window,
            time,
        );

        self.emit(event);
    }

    fn local_send_leave(
        &mut self,
        id: DragContextId,
        time: u32,
    ) {
        let (dest_id, window) = match self.local_dest(id) {
            Some(dest) => dest,
            None => return,
        };

        let last = self.dnd.get(dest_id).map_or(Pos::default(), |dest| dest.last);

        debug!("local drag {} leaves window {}", id, window);

        let event = self.pointer_event(
            EventKind::DragLeave(DndData {
                context: dest_id,
                x_root: last.x,
                y_root: last.y,
            }),
            window,
            time,
        );

        self.emit(event);
        self.dnd.dest = None;
    }

    fn local_send_drop(
        &mut self,
        id: DragContextId,
        time: u32,
    ) {
        let (dest_id, window) = match self.local_dest(id) {
            Some(dest) => dest,
            None => return,
        };

        let last = match self.dnd.get_mut(dest_id) {
            Some(dest) => {
                dest.status = DragStatus::Drop;
                dest.last
            },
            None => return,
        };

        info!("local drag {} drops on window {}", id, window);

        let event = self.pointer_event(
            EventKind::DropStart(DndData {
                context: dest_id,
                x_root: last.x,
                y_root: last.y,
            }),
            window,
            time,
        );

        self.dnd.dest = None;
        self.emit(event);
    }

    /// The destination's answer to a motion: the action it would take.
    pub fn drag_status(
        &mut self,
        dest_id: DragContextId,
        action: DragAction,
        time: u32,
    ) {
        let (source_window, dest_window) = match self.dnd.get_mut(dest_id) {
            Some(dest) if !dest.is_source => {
                dest.action = action;
                (dest.source_window, dest.dest_window)
            },
            _ => return,
        };

        let source = match self.dnd.find(true, source_window, dest_window) {
            Some(source) => source,
            None => return,
        };

        let action = if action == DragAction::DEFAULT {
            DragAction::empty()
        } else {
            action
        };

        let last = match self.dnd.get_mut(source) {
            Some(context) => {
                if context.status == DragStatus::MotionWait {
                    context.status = DragStatus::Drag;
                }

                context.action = action;
                context.last
            },
            None => return,
        };

        self.emit_drag_status(source, last, false, time);
    }

    /// Accepts or refuses a drop before the data moves.
    pub fn drop_reply(
        &mut self,
        dest_id: DragContextId,
        accepted: bool,
    ) {
        let protocol = match self.dnd.get(dest_id) {
            Some(dest) if dest.dest_window.is_some() => dest.protocol,
            _ => return,
        };

        debug!("drop on context {} {}", dest_id, if accepted { "accepted" } else { "refused" });

        if protocol == DragProtocol::Dropfiles {
            self.selection.dropfiles = None;
        }
    }

    /// The destination is done with the drop.
    pub fn drop_finish(
        &mut self,
        dest_id: DragContextId,
        success: bool,
        time: u32,
    ) {
        let (protocol, source_window, dest_window) = match self.dnd.get(dest_id) {
            Some(dest) if !dest.is_source => (dest.protocol, dest.source_window, dest.dest_window),
            _ => return,
        };

        info!("drop on context {} finished: {}", dest_id, success);

        match protocol {
            DragProtocol::Ole2 => {
                self.dnd.target_state = if success {
                    DndState::Dropped
                } else {
                    DndState::Failed
                };
            },
            DragProtocol::Local => {
                let source = match self.dnd.find(true, source_window, dest_window) {
                    Some(source) => source,
                    None => return,
                };

                let moved = self.dnd.get(source).map_or(false, |context| context.action == DragAction::MOVE);

                if moved {
                    self.request_source_delete(source, time);
                }

                if let Some(context) = self.dnd.get_mut(source) {
                    context.drop_failed = !success;
                }

                if let Some(window) = source_window {
                    let event = self.pointer_event(
                        EventKind::DropFinished {
                            context: source,
                            success,
                        },
                        window,
                        time,
                    );

                    self.emit(event);
                }
            },
            DragProtocol::Dropfiles | DragProtocol::None => {
                self.dnd.remove(dest_id);
            },
        }
    }

    /// Asks the source to delete what was moved away.
    pub(crate) fn request_source_delete(
        &mut self,
        id: DragContextId,
        time: u32,
    ) {
        let (selection, source_window) = match self.dnd.get(id) {
            Some(context) => (context.selection(&self.atoms), context.source_window),
            None => return,
        };

        let (selection, window) = match (selection, source_window) {
            (Some(selection), Some(window)) => (selection, window),
            _ => return,
        };

        let delete = self.atoms.known(KnownAtom::Delete);
        self.selection.property_change_target = Some(delete);

        let event = Event::new(
            EventKind::SelectionRequest {
                selection,
                target: delete,
                property: selection,
                requestor: Some(window),
            },
            Some(window),
        )
        .with_time(time);

        self.emit(event);
    }

    fn drag_drop_performed(
        &mut self,
        id: DragContextId,
        time: u32,
    ) {
        let protocol = match self.dnd.get(id) {
            Some(context) => context.protocol,
            None => return,
        };

        match protocol {
            DragProtocol::Ole2 => self.dnd.source_state = DndState::Dropped,
            _ => self.local_send_drop(id, time),
        }

        self.drag_ungrab(id, time);
    }

    /// Ends the source drag without a drop.
    pub fn drag_cancel(
        &mut self,
        id: DragContextId,
        reason: DragCancelReason,
        time: u32,
    ) {
        let (protocol, source_window) = match self.dnd.get_mut(id) {
            Some(context) if context.is_source => {
                context.cancel_reason = Some(reason);
                context.drop_failed = true;
                (context.protocol, context.source_window)
            },
            _ => return,
        };

        info!("drag {} cancelled: {:?}", id, reason);

        self.drag_ungrab(id, time);

        match protocol {
            DragProtocol::Ole2 => self.dnd.source_state = DndState::None,
            _ => {
                self.local_send_leave(id, time);

                if let Some(window) = source_window {
                    let event = self.pointer_event(
                        EventKind::DropFinished {
                            context: id,
                            success: false,
                        },
                        window,
                        time,
                    );

                    self.emit(event);
                }
            },
        }
    }

    fn drag_ungrab(
        &mut self,
        id: DragContextId,
        time: u32,
    ) {
        let grabbed = match self.dnd.get_mut(id) {
            Some(context) => std::mem::replace(&mut context.grabbed, false),
            None => return,
        };

        if grabbed {
            self.platform.set_cursor(None);
            self.ungrab_seat(time);
        }
    }

    /// Routes events of the running source drag. Returns true when the
    /// event was consumed by the drag.
    pub(crate) fn handle_drag_event(
        &mut self,
        event: &Event,
    ) -> bool {
        let id = match self.dnd.source {
            Some(id) => id,
            None => return false,
        };

        let (grabbed, device) = match self.dnd.get(id) {
            Some(context) => (context.grabbed, context.device),
            None => return false,
        };

        match &event.kind {
            EventKind::DropFinished {
                context, ..
            } if *context == id => {
                self.drop_done(id, event.time);
                false
            },
            EventKind::DragStatus(data) if data.context == id => {
                let action = self.dnd.get(id).map_or(DragAction::empty(), |context| context.action);

                if let Some(context) = self.dnd.get_mut(id) {
                    context.current_action = action;
                }

                if grabbed {
                    self.platform.set_cursor(Some(cursor_for_action(action)));
                }

                false
            },
            _ if !grabbed => false,
            EventKind::Motion {
                x_root,
                y_root,
                state,
                ..
            } => {
                self.drag_update(Pos::new(*x_root as i32, *y_root as i32), *state, event.time);
                true
            },
            EventKind::ButtonRelease {
                ..
            } => {
                let droppable = self
                    .dnd
                    .get(id)
                    .map_or(false, |context| context.dest_window.is_some() && !context.action.is_empty());

                if droppable {
                    self.drag_drop_performed(id, event.time);
                } else {
                    self.drag_cancel(id, DragCancelReason::NoTarget, event.time);
                }

                true
            },
            EventKind::KeyPress(key) => {
                self.drag_key(id, key.keyval, key.state, event.time);
                true
            },
            EventKind::KeyRelease(key) => {
                let last = self.dnd.get(id).map_or(Pos::default(), |context| context.last);
                self.drag_update(last, key.state, event.time);
                true
            },
            EventKind::GrabBroken {
                implicit,
                grab_window,
                ..
            } => {
                let broken = event.device.map(|broken| {
                    self.devices
                        .get(broken)
                        .filter(|data| data.is_keyboard())
                        .and_then(|data| data.associated)
                        .unwrap_or(broken)
                });

                let cancels = self.dnd.get(id).map_or(false, |context| {
                    grab_break_cancels(context, *implicit, *grab_window, broken.or(Some(device)))
                });

                if cancels {
                    self.drag_cancel(id, DragCancelReason::Error, event.time);
                }

                cancels
            },
            _ => false,
        }
    }

    fn drag_key(
        &mut self,
        id: DragContextId,
        keyval: Option<Key>,
        state: ModifierType,
        time: u32,
    ) {
        let last = self.dnd.get(id).map_or(Pos::default(), |context| context.last);

        match key_navigation(keyval, state) {
            KeyNavigation::Cancel => self.drag_cancel(id, DragCancelReason::UserCancelled, time),
            KeyNavigation::Drop => {
                let droppable = self
                    .dnd
                    .get(id)
                    .map_or(false, |context| context.dest_window.is_some() && !context.action.is_empty());

                if droppable {
                    self.drag_drop_performed(id, time);
                } else {
                    self.drag_cancel(id, DragCancelReason::NoTarget, time);
                }
            },
            KeyNavigation::Step(dx, dy) => {
                let root = Pos::new(last.x + dx, last.y + dy);
                let screen = self.screen_from_root(root);

                self.platform.warp_pointer(screen);
                self.drag_update(root, state, time);
            },
            KeyNavigation::Refresh => self.drag_update(last, state, time),
        }
    }

    /// Cleans up after the source learned how its drop ended. A failed
    /// drop slides the drag icon back to where the drag started.
    fn drop_done(
        &mut self,
        id: DragContextId,
        time: u32,
    ) {
        let (success, drag_window, source_window, start, last, hot) = match self.dnd.get(id) {
            Some(context) => (
                !context.drop_failed,
                context.drag_window,
                context.source_window,
                context.start,
                context.last,
                context.hot,
            ),
            None => return,
        };

        info!("drag {} done: {}", id, if success { "dropped" } else { "failed" });

        self.dnd.source = None;
        self.selection.dnd_targets.clear();

        for dest in self.dnd.destinations_of(source_window) {
            if self.dnd.get(dest).map_or(false, |dest| dest.protocol == DragProtocol::Local) {
                self.dnd.remove(dest);
            }
        }

        let animated = !success
            && drag_window
                .and_then(|window| self.registry.get(window))
                .map_or(false, |data| data.mapped);

        if !animated {
            self.drag_finished(id);
            return;
        }

        let start_time = self.next_tick(time);

        if let Some(context) = self.dnd.get_mut(id) {
            context.animation = Some(DragAnimation {
                start_time,
                from: last,
                to: start,
                hot,
            });
        }

        if let Some(hwnd) = drag_window.and_then(|window| self.registry.hwnd(window)) {
            self.platform.set_timer(hwnd, DRAG_ANIMATION_TIMER, ANIMATION_TICK);
        }
    }

    fn drag_finished(
        &mut self,
        id: DragContextId,
    ) {
        if let Some(context) = self.dnd.remove(id) {
            if let Some(window) = context.drag_window {
                self.hide(window);
                self.destroy(window);
            }
        }
    }

    /// One frame of every running slide-back animation.
    pub(crate) fn drag_animation_tick(&mut self) {
        let now = self.platform.tick_count();

        for id in self.dnd.animating() {
            let (animation, drag_window) = match self.dnd.get(id) {
                Some(context) => match context.animation {
                    Some(animation) => (animation, context.drag_window),
                    None => continue,
                },
                None => continue,
            };

            match (animation.frame(now), drag_window) {
                (Some((pos, _)), Some(window)) => self.move_to(window, pos),
                _ => {
                    if let Some(hwnd) = drag_window.and_then(|window| self.registry.hwnd(window)) {
                        self.platform.kill_timer(hwnd, DRAG_ANIMATION_TIMER);
                    }

                    debug!("slide-back of drag {} ended", id);
                    self.drag_finished(id);
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;
    use crate::display::testing::*;
    use crate::headless::HeadlessPlatform;
    use crate::win32::message::NativeMessage;
    use crate::win32::message::WM_KILLFOCUS;

    struct Drag {
        core: DisplayCore,
        platform: HeadlessPlatform,
        events: Events,
        source: Window,
        target: Window,
        id: DragContextId,
    }

    fn local_drag() -> Drag {
        let (mut core, platform, events) = headless(Config::default());
        let source = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::all_events());
        let target = shown_toplevel(&mut core, Region::new(200, 0, 100, 100), EventMask::all_events());
        core.register_dnd(target);

        let utf8 = core.atoms().known(KnownAtom::Utf8String);
        let device = core.devices().core_pointer;
        let actions = DragAction::COPY | DragAction::MOVE;
        let id = core.drag_begin(source, device, &[utf8], actions, Pos::new(50, 50)).unwrap();

        let drag_window = core.dnd.get(id).unwrap().drag_window.unwrap();
        core.show(drag_window);

        assert!(core.manage_dnd(id, source, actions));
        core.dispatch_pending();
        events.borrow_mut().clear();

        Drag {
            core,
            platform,
            events,
            source,
            target,
            id,
        }
    }

    fn dnd_names(events: &Events) -> Vec<(&'static str, Option<Window>)> {
        names(events)
            .into_iter()
            .filter(|(name, _)| name.starts_with("drag") || name.starts_with("drop"))
            .collect()
    }

    #[test]
    fn losing_focus_cancels_the_drag_with_an_error() {
        let mut drag = local_drag();

        let hwnd = drag.core.registry().hwnd(drag.source).unwrap();
        drag.core.handle_message(NativeMessage::new(hwnd, WM_KILLFOCUS, 0, 0));

        let context = drag.core.dnd.get(drag.id).unwrap();
        assert_eq!(context.cancel_reason, Some(DragCancelReason::Error));
        assert!(!context.grabbed);

        let finished: Vec<_> = drag
            .events
            .borrow()
            .iter()
            .filter_map(|event| match event.kind {
                EventKind::DropFinished {
                    context,
                    success,
                } => Some((context, success, event.window)),
                _ => None,
            })
            .collect();

        assert_eq!(finished, vec![(drag.id, false, Some(drag.source))]);
        assert!(drag.core.dnd.source.is_none());
    }

    #[test]
    fn local_drags_enter_move_and_drop_on_registered_windows() {
        let mut drag = local_drag();
        let time = 10;

        drag.core.drag_update(Pos::new(250, 50), ModifierType::empty(), time);
        drag.core.dispatch_pending();

        let dest = drag.core.dnd.dest.unwrap();
        assert_eq!(dnd_names(&drag.events), vec![
            ("drag-enter", Some(drag.target)),
            ("drag-status", Some(drag.source)),
            ("drag-motion", Some(drag.target)),
        ]);
        assert_eq!(drag.core.dnd.get(drag.id).unwrap().status, DragStatus::MotionWait);

        drag.core.drag_status(dest, DragAction::COPY, time);
        drag.core.dispatch_pending();
        assert_eq!(drag.core.dnd.get(drag.id).unwrap().status, DragStatus::Drag);
        assert_eq!(drag.platform.state().cursor.as_deref(), Some("dnd-copy"));

        drag.events.borrow_mut().clear();
        drag.core.drag_key(drag.id, Some(Key::Return), ModifierType::empty(), time);
        drag.core.dispatch_pending();
        assert_eq!(dnd_names(&drag.events), vec![("drop-start", Some(drag.target))]);

        drag.core.drop_finish(dest, true, time);
        drag.core.dispatch_pending();

        assert_eq!(dnd_names(&drag.events).last(), Some(&("drop-finished", Some(drag.source))));
        assert!(drag.core.dnd.source.is_none());
        assert!(drag.core.dnd.get(drag.id).is_none());
    }

    #[test]
    fn moves_ask_the_source_to_delete() {
        let mut drag = local_drag();

        drag.core.drag_update(Pos::new(250, 50), ModifierType::SHIFT, 1);
        let dest = drag.core.dnd.dest.unwrap();
        drag.core.drag_status(dest, DragAction::MOVE, 1);
        drag.core.drag_drop_performed(drag.id, 1);
        drag.core.drop_finish(dest, true, 1);
        drag.core.dispatch_pending();

        let delete = drag.core.atoms().known(KnownAtom::Delete);
        let requested = drag.events.borrow().iter().any(|event| match event.kind {
            EventKind::SelectionRequest {
                target, ..
            } => target == delete && event.window == Some(drag.source),
            _ => false,
        });

        assert!(requested);
    }

    #[test]
    fn escape_cancels_and_release_without_target_fails() {
        let mut drag = local_drag();

        drag.core.drag_key(drag.id, Some(Key::Escape), ModifierType::empty(), 1);
        assert_eq!(
            drag.core.dnd.get(drag.id).unwrap().cancel_reason,
            Some(DragCancelReason::UserCancelled)
        );

        let mut drag = local_drag();
        drag.core.drag_update(Pos::new(500, 500), ModifierType::empty(), 1);
        let release = drag.core.pointer_event(
            EventKind::ButtonRelease {
                button: 1,
                x: 0f64,
                y: 0f64,
                x_root: 500f64,
                y_root: 500f64,
                state: ModifierType::BUTTON1,
            },
            drag.source,
            2,
        );

        assert!(drag.core.handle_drag_event(&release));
        assert_eq!(
            drag.core.dnd.get(drag.id).unwrap().cancel_reason,
            Some(DragCancelReason::NoTarget)
        );
    }

    #[test]
    fn arrow_keys_warp_the_pointer() {
        let mut drag = local_drag();

        drag.core.drag_key(drag.id, Some(Key::Right), ModifierType::MOD1, 1);

        assert_eq!(drag.platform.state().warps.last(), Some(&Pos::new(70, 50)));
        assert_eq!(drag.core.dnd.get(drag.id).unwrap().last, Pos::new(70, 50));
    }

    #[test]
    fn failed_drops_slide_the_icon_back() {
        let mut drag = local_drag();
        let drag_window = drag.core.dnd.get(drag.id).unwrap().drag_window.unwrap();

        drag.core.drag_update(Pos::new(40, 40), ModifierType::empty(), 1);
        drag.core.drag_cancel(drag.id, DragCancelReason::NoTarget, 1);
        drag.core.dispatch_pending();

        assert!(drag.core.dnd.get(drag.id).unwrap().animation.is_some());

        drag.platform.state().tick_step = 600;
        drag.core.drag_animation_tick();
        drag.core.drag_animation_tick();

        assert!(drag.core.dnd.get(drag.id).is_none());
        assert!(drag.core.registry().get(drag_window).is_none());
    }
}
