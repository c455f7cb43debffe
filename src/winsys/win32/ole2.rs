pub use crate::Result;

use crate::atoms::Format;
use crate::atoms::KnownAtom;
use crate::display::DisplayCore;
use crate::display::ModalOperation;
use crate::dnd::action_for_drop_effect;
use crate::dnd::drop_effect_for_action;
use crate::dnd::suggested_action;
use crate::dnd::DndState;
use crate::dnd::DragAction;
use crate::dnd::DragProtocol;
use crate::dnd::DROPEFFECT_NONE;
use crate::event::DndData;
use crate::event::DragContextId;
use crate::event::EventKind;
use crate::geometry::Pos;
use crate::selection::RenderSlot;
use crate::selection::SelFormat;
use crate::selection::RENDER_DEADLINE;
use crate::win32::message::make_lparam;
use crate::win32::message::NativeMessage;
use crate::win32::message::MK_CONTROL;
use crate::win32::message::MK_LBUTTON;
use crate::win32::message::MK_MBUTTON;
use crate::win32::message::MK_RBUTTON;
use crate::win32::message::MK_SHIFT;
use crate::win32::message::VK_CONTROL;
use crate::win32::message::VK_ESCAPE;
use crate::win32::message::VK_SHIFT;
use crate::win32::message::WM_KEYDOWN;
use crate::win32::message::WM_KEYUP;
use crate::win32::message::WM_LBUTTONDOWN;
use crate::win32::message::WM_LBUTTONUP;
use crate::win32::message::WM_MBUTTONDOWN;
use crate::win32::message::WM_MBUTTONUP;
use crate::win32::message::WM_MOUSEMOVE;
use crate::win32::message::WM_RBUTTONDOWN;
use crate::win32::message::WM_RBUTTONUP;
use crate::window::Window;

use anyhow::anyhow;

/// Data offered by the other side of an OLE2 drag.
pub trait DataObject {
    fn formats(&self) -> Vec<Format>;

    fn data(
        &mut self,
        core: &mut DisplayCore,
        format: Format,
    ) -> Option<Vec<u8>>;

    /// The source context when the drag started in this process.
    fn source_context(&self) -> Option<DragContextId> {
        None
    }
}

/// The data object handed to the platform drag loop for a drag started
/// here. Reads are answered by the source window through a selection
/// request.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDataObject {
    pub context: DragContextId,
    pub formats: Vec<SelFormat>,
}

impl DataObject for SourceDataObject {
    fn formats(&self) -> Vec<Format> {
        let mut formats: Vec<Format> = Vec::new();

        for sel in self.formats.iter().filter(|sel| sel.format != 0) {
            if !formats.contains(&sel.format) {
                formats.push(sel.format);
            }
        }

        formats
    }

    fn data(
        &mut self,
        core: &mut DisplayCore,
        format: Format,
    ) -> Option<Vec<u8>> {
        match core.ole2_get_data(format) {
            Ok(data) => Some(data),
            Err(err) => {
                warn!("{}", err);
                None
            },
        }
    }

    fn source_context(&self) -> Option<DragContextId> {
        Some(self.context)
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DragLoopVerdict {
    Continue,
    Drop,
    Cancel,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DragDropOutcome {
    Dropped(u32),
    Cancelled,
    Failed,
}

/// The modal platform drag loop. Implementations call back into the
/// core through the `ole2_*` methods until the loop ends.
pub trait DragDropDriver {
    fn do_drag_drop(
        &mut self,
        core: &mut DisplayCore,
        data: SourceDataObject,
        allowed_effects: u32,
    ) -> DragDropOutcome;
}

impl DisplayCore {
    /// Polled by the drag loop with the escape flag and the `MK_*` key
    /// state. Changes since the last poll are replayed to the source
    /// window as input messages.
    pub fn ole2_query_continue(
        &mut self,
        escape: bool,
        key_state: usize,
    ) -> DragLoopVerdict {
        if self.replay_drag_input(escape, key_state) {
            self.process_pending();
        }

        match self.dnd.source_state {
            DndState::Dropped => DragLoopVerdict::Drop,
            DndState::None => DragLoopVerdict::Cancel,
            _ => DragLoopVerdict::Continue,
        }
    }

    fn replay_drag_input(
        &mut self,
        escape: bool,
        key_state: usize,
    ) -> bool {
        let context = match self.dnd.source.and_then(|id| self.dnd.get(id)) {
            Some(context) => context,
            None => return false,
        };

        let hwnd = match context.source_window.and_then(|window| self.registry.hwnd(window)) {
            Some(hwnd) => hwnd,
            None => return false,
        };

        let screen = self.platform.pointer_position();
        let client = self
            .platform
            .window_rect(hwnd)
            .map_or(screen, |rect| screen.relative_to(rect.pos));
        let root = self.root_from_screen(screen);
        let (id, last, last_key_state) = (context.id, context.last, context.last_key_state);

        let mut messages = Vec::new();

        if root != last || key_state != last_key_state {
            let lparam = make_lparam(client.x, client.y);

            if root != last {
                messages.push((WM_MOUSEMOVE, key_state, lparam));
            }

            let buttons = [
                (MK_LBUTTON, WM_LBUTTONDOWN, WM_LBUTTONUP),
                (MK_MBUTTON, WM_MBUTTONDOWN, WM_MBUTTONUP),
                (MK_RBUTTON, WM_RBUTTONDOWN, WM_RBUTTONUP),
            ];

            for &(bit, down, up) in buttons.iter() {
                if key_state & bit != last_key_state & bit {
                    let message = if key_state & bit != 0 {
                        down
                    } else {
                        up
                    };

                    messages.push((message, key_state, lparam));
                }
            }

            for &(bit, virtual_key) in [(MK_CONTROL, VK_CONTROL), (MK_SHIFT, VK_SHIFT)].iter() {
                if key_state & bit != last_key_state & bit {
                    let message = if key_state & bit != 0 {
                        WM_KEYDOWN
                    } else {
                        WM_KEYUP
                    };

                    messages.push((message, virtual_key as usize, 0));
                }
            }

            if let Some(context) = self.dnd.get_mut(id) {
                context.last = root;
                context.last_key_state = key_state;
            }
        }

        if escape {
            debug!("replaying escape to the drag source");
            messages.push((WM_KEYDOWN, VK_ESCAPE as usize, 0));
        }

        let changed = !messages.is_empty();

        for (message, wparam, lparam) in messages {
            let mut msg = NativeMessage::new(hwnd, message, wparam, lparam).at(0, screen);
            self.translate(&mut msg);
        }

        changed
    }

    /// The effect the target under the pointer settled on.
    pub fn ole2_give_feedback(
        &mut self,
        effect: u32,
    ) {
        let id = match self.dnd.source {
            Some(id) => id,
            None => return,
        };

        let root = self.registry.root();
        let last = self.root_from_screen(self.platform.pointer_position());

        let source_window = match self.dnd.get_mut(id) {
            Some(context) => {
                context.action = action_for_drop_effect(effect);

                if effect == DROPEFFECT_NONE {
                    context.dest_window = None;
                } else if context.dest_window.is_none() {
                    context.dest_window = Some(root);
                }

                context.last = last;
                context.source_window
            },
            None => return,
        };

        trace!("drop effect {:#x} for drag {}", effect, id);

        if let Some(window) = source_window {
            let status = EventKind::DragStatus(DndData {
                context: id,
                x_root: last.x,
                y_root: last.y,
            });
            let event = self.pointer_event(status, window, 0);

            self.emit(event);
        }

        self.process_pending();
    }

    /// Asks the source window for `format` and waits for the answer.
    pub fn ole2_get_data(
        &mut self,
        format: Format,
    ) -> Result<Vec<u8>> {
        let context = self
            .dnd
            .source
            .and_then(|id| self.dnd.get(id))
            .ok_or_else(|| anyhow!("unable to render format {:#x}: no drag in progress", format))?;

        let sel = context
            .formats
            .iter()
            .find(|sel| sel.format == format && sel.format != 0)
            .copied()
            .ok_or_else(|| anyhow!("unable to render format {:#x}: not offered", format))?;

        let requestor = context.source_window;
        let time = self.next_tick(0);
        let ole2 = self.atoms.known(KnownAtom::Ole2Dnd);

        self.selection.render = Some(RenderSlot::new(sel));
        self.selection.property_change_target = Some(sel.target);

        debug!("requesting target {:?} for format {:#x}", self.atoms.name(sel.target), format);

        if let Some(window) = requestor {
            let event = self.pointer_event(
                EventKind::SelectionRequest {
                    selection: ole2,
                    target: sel.target,
                    property: ole2,
                    requestor,
                },
                window,
                time,
            );

            self.emit(event);
        }

        self.spin_until(RENDER_DEADLINE, |core| {
            core.selection.render.as_ref().map_or(true, |slot| slot.data.is_some())
        });

        self.selection.property_change_target = None;

        self.selection
            .render
            .take()
            .and_then(|slot| slot.data)
            .ok_or_else(|| anyhow!("unable to render format {:#x}: the source did not answer", format))
    }

    /// Runs the platform drag loop for a drag that is waiting to start.
    pub(crate) fn run_drag_drop(&mut self) {
        let (id, formats, actions, source_window) = match self.dnd.source.and_then(|id| self.dnd.get(id)) {
            Some(context) => (context.id, context.formats.clone(), context.actions, context.source_window),
            None => {
                self.dnd.source_state = DndState::None;
                return;
            },
        };

        let mut driver = match self.drag_driver.take() {
            Some(driver) => driver,
            None => {
                warn!("unable to start drag {}: no drag loop installed", id);
                self.dnd.source_state = DndState::None;
                return;
            },
        };

        let mut allowed = 0;

        for action in [DragAction::COPY, DragAction::MOVE, DragAction::LINK].iter() {
            if actions.contains(*action) {
                allowed |= drop_effect_for_action(*action);
            }
        }

        info!("entering drag loop for drag {}", id);

        self.dnd.source_state = DndState::Dragging;
        self.begin_modal(ModalOperation::DRAG_DROP);

        let data = SourceDataObject {
            context: id,
            formats,
        };
        let outcome = driver.do_drag_drop(self, data, allowed);

        self.end_modal(ModalOperation::DRAG_DROP);

        if self.drag_driver.is_none() {
            self.drag_driver = Some(driver);
        }

        debug!("drag loop for drag {} ended with {:?}", id, outcome);

        let time = self.next_tick(0);
        let success = match outcome {
            DragDropOutcome::Dropped(effect) => {
                let action = action_for_drop_effect(effect);

                if let Some(context) = self.dnd.get_mut(id) {
                    context.action = action;
                }

                if action == DragAction::MOVE {
                    self.request_source_delete(id, time);
                }

                true
            },
            DragDropOutcome::Cancelled | DragDropOutcome::Failed => false,
        };

        if let Some(context) = self.dnd.get_mut(id) {
            context.drop_failed = !success;
        }

        if let Some(window) = source_window {
            let event = self.pointer_event(
                EventKind::DropFinished {
                    context: id,
                    success,
                },
                window,
                time,
            );

            self.emit(event);
        }

        self.dnd.source_state = DndState::None;
        self.dispatch_pending();
    }

    /// A drag entered one of our drop targets.
    pub fn ole2_drag_enter(
        &mut self,
        window: Window,
        data: Box<dyn DataObject>,
        key_state: usize,
        screen: Pos,
    ) -> u32 {
        let root = self.registry.root();
        let source = self.dnd.source.filter(|_| self.dnd.source_state != DndState::None);
        let source_window = source
            .and_then(|id| self.dnd.get(id))
            .and_then(|context| context.source_window)
            .unwrap_or(root);

        if let Some(stale) = self.dnd.dest.take() {
            self.dnd.remove(stale);
        }

        let mut targets = Vec::new();

        for format in data.formats() {
            self.selection.add_format_to_targets(
                self.platform.as_ref(),
                &mut self.atoms,
                format,
                &mut targets,
            );
        }

        let source_targets = data
            .source_context()
            .and_then(|id| self.dnd.get(id))
            .map(|context| context.targets.clone());

        let internal = source_targets.is_some();
        let action = suggested_action(key_state, internal);
        let position = self.root_from_screen(screen);

        let device = self.devices.core_pointer;
        let id = self.dnd.create(DragProtocol::Ole2, false, device, self.scale);

        if let Some(context) = self.dnd.get_mut(id) {
            context.source_window = Some(source_window);
            context.dest_window = Some(window);
            context.actions = DragAction::DEFAULT | DragAction::COPY | DragAction::MOVE;
            context.suggested_action = action;
            context.action = action;
            context.targets = source_targets
                .unwrap_or_else(|| targets.iter().map(|sel| sel.target).collect());
            context.formats = targets;
            context.last = position;
            context.last_key_state = key_state;
        }

        debug!("drag {} entered window {}", id, window);

        self.dnd.dest = Some(id);
        self.dnd.target_state = DndState::Pending;
        self.target_data = Some(data);

        let kinds: [fn(DndData) -> EventKind; 2] = [EventKind::DragEnter, EventKind::DragMotion];

        for kind in kinds.iter() {
            let event = self.pointer_event(kind(DndData {
                context: id,
                x_root: position.x,
                y_root: position.y,
            }), window, 0);

            self.emit(event);
        }

        self.process_pending();
        self.ole2_current_effect(id)
    }

    pub fn ole2_drag_over(
        &mut self,
        key_state: usize,
        screen: Pos,
    ) -> u32 {
        let id = match self.dnd.dest {
            Some(id) => id,
            None => return DROPEFFECT_NONE,
        };

        let position = self.root_from_screen(screen);
        let internal = self.target_data.as_ref().map_or(false, |data| data.source_context().is_some());

        let changed = match self.dnd.get_mut(id) {
            Some(context) => {
                let action = suggested_action(key_state, internal);
                let changed = position != context.last
                    || key_state != context.last_key_state
                    || action != context.suggested_action;

                context.suggested_action = action;
                context.last = position;
                context.last_key_state = key_state;

                changed.then(|| context.dest_window).flatten()
            },
            None => return DROPEFFECT_NONE,
        };

        if let Some(window) = changed {
            let event = self.pointer_event(EventKind::DragMotion(DndData {
                context: id,
                x_root: position.x,
                y_root: position.y,
            }), window, 0);

            self.emit(event);
            self.process_pending();
        }

        self.ole2_current_effect(id)
    }

    pub fn ole2_drag_leave(&mut self) {
        let id = match self.dnd.dest {
            Some(id) => id,
            None => return,
        };

        if let Some(context) = self.dnd.get(id) {
            if let Some(window) = context.dest_window {
                let event = self.pointer_event(EventKind::DragLeave(DndData {
                    context: id,
                    x_root: context.last.x,
                    y_root: context.last.y,
                }), window, 0);

                self.emit(event);
            }
        }

        debug!("drag {} left", id);

        self.process_pending();
        self.dnd.remove(id);
        self.dnd.target_state = DndState::None;
        self.target_data = None;
    }

    pub fn ole2_drop(
        &mut self,
        key_state: usize,
        screen: Pos,
    ) -> u32 {
        let id = match self.dnd.dest {
            Some(id) => id,
            None => return DROPEFFECT_NONE,
        };

        let position = self.root_from_screen(screen);

        let window = match self.dnd.get_mut(id) {
            Some(context) => {
                context.last = position;
                context.last_key_state = key_state;
                context.dest_window
            },
            None => return DROPEFFECT_NONE,
        };

        self.dnd.target_state = DndState::Pending;

        if let Some(window) = window {
            let event = self.pointer_event(EventKind::DropStart(DndData {
                context: id,
                x_root: position.x,
                y_root: position.y,
            }), window, 0);

            self.emit(event);
        }

        self.process_pending();

        let effect = if self.dnd.target_state == DndState::Dropped {
            self.ole2_current_effect(id)
        } else {
            DROPEFFECT_NONE
        };

        info!("drop on drag {} finished with effect {:#x}", id, effect);

        self.dnd.remove(id);
        self.dnd.target_state = DndState::None;
        self.target_data = None;

        effect
    }

    fn ole2_current_effect(
        &self,
        id: DragContextId,
    ) -> u32 {
        self.dnd
            .get(id)
            .filter(|context| context.dest_window.is_some())
            .map_or(DROPEFFECT_NONE, |context| drop_effect_for_action(context.action))
    }

    /// Reads `format` from the data object of the drag over us.
    pub(crate) fn ole2_target_data(
        &mut self,
        format: Format,
    ) -> Option<Vec<u8>> {
        let mut data = self.target_data.take()?;
        let result = data.data(self, format);

        if self.target_data.is_none() {
            self.target_data = Some(data);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;
    use crate::display::testing::*;
    use crate::dnd::DROPEFFECT_COPY;
    use crate::dnd::DROPEFFECT_MOVE;
    use crate::event::EventMask;
    use crate::geometry::Region;
    use crate::headless::HeadlessPlatform;
    use crate::atoms::CF_UNICODETEXT;
    use crate::win32::message::VK_LBUTTON;

    use std::cell::RefCell;
    use std::rc::Rc;

    struct Files;

    impl DataObject for Files {
        fn formats(&self) -> Vec<Format> {
            vec![CF_UNICODETEXT]
        }

        fn data(
            &mut self,
            _: &mut DisplayCore,
            _: Format,
        ) -> Option<Vec<u8>> {
            Some(vec![b'h', 0, b'i', 0, 0, 0])
        }
    }

    fn ole2() -> Config {
        Config {
            use_ole2_dnd: true,
            ..Config::default()
        }
    }

    /// A drag loop that runs a fixed sequence of calls into the core.
    struct Scripted<F>(F);

    impl<F> DragDropDriver for Scripted<F>
    where
        F: FnMut(&mut DisplayCore, SourceDataObject, u32) -> DragDropOutcome,
    {
        fn do_drag_drop(
            &mut self,
            core: &mut DisplayCore,
            data: SourceDataObject,
            allowed_effects: u32,
        ) -> DragDropOutcome {
            (self.0)(core, data, allowed_effects)
        }
    }

    struct SourceDrag {
        core: DisplayCore,
        events: Events,
        source: Window,
        id: DragContextId,
    }

    /// Starts a drag from a window with the left button held and runs
    /// `script` as the platform drag loop.
    fn source_drag<F>(
        prepare: impl FnOnce(&HeadlessPlatform),
        script: F,
    ) -> SourceDrag
    where
        F: FnMut(&mut DisplayCore, SourceDataObject, u32) -> DragDropOutcome + 'static,
    {
        let (mut core, platform, events) = headless(ole2());
        let source = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::all_events());
        core.dispatch_pending();

        platform.state().pointer = Pos::new(50, 50);
        platform.state().keys_down.insert(VK_LBUTTON);
        prepare(&platform);

        let utf8 = core.atoms().known(KnownAtom::Utf8String);
        let device = core.devices().core_pointer;
        let actions = DragAction::COPY | DragAction::MOVE;
        let id = core.drag_begin(source, device, &[utf8], actions, Pos::new(50, 50)).unwrap();

        assert_eq!(core.dnd.source_state, DndState::Pending);
        assert!(core.manage_dnd(id, source, actions));

        core.set_drag_driver(Scripted(script));
        events.borrow_mut().clear();
        core.dispatch_pending();

        SourceDrag {
            core,
            events,
            source,
            id,
        }
    }

    fn finished(events: &Events) -> Vec<(DragContextId, bool, Option<Window>)> {
        events
            .borrow()
            .iter()
            .filter_map(|event| match event.kind {
                EventKind::DropFinished {
                    context,
                    success,
                } => Some((context, success, event.window)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn foreign_drags_enter_move_and_leave() {
        let (mut core, _, events) = headless(ole2());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 200, 200), EventMask::empty());
        core.dispatch_pending();
        events.borrow_mut().clear();

        let effect = core.ole2_drag_enter(window, Box::new(Files), 0, Pos::new(10, 10));
        assert_eq!(effect, crate::dnd::DROPEFFECT_COPY);

        let id = core.dnd.dest.unwrap();
        let context = core.dnd.get(id).unwrap();
        assert_eq!(context.source_window, Some(core.root()));
        assert!(context.targets.contains(&core.atoms().known(KnownAtom::CfUnicodeText)));

        core.ole2_drag_over(0, Pos::new(10, 10));
        core.ole2_drag_over(0, Pos::new(12, 10));
        core.ole2_drag_leave();

        let names: Vec<_> = names(&events).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["drag-enter", "drag-motion", "drag-motion", "drag-leave"]);
        assert!(core.dnd.dest.is_none());
        assert!(core.target_data.is_none());
    }

    #[test]
    fn drops_report_no_effect_unless_finished() {
        let (mut core, _, _) = headless(ole2());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 200, 200), EventMask::empty());

        core.ole2_drag_enter(window, Box::new(Files), 0, Pos::new(10, 10));
        assert_eq!(core.ole2_drop(0, Pos::new(10, 10)), DROPEFFECT_NONE);
        assert_eq!(core.dnd.len(), 0);
    }

    #[test]
    fn target_data_is_read_through_the_data_object() {
        let (mut core, _, _) = headless(ole2());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 200, 200), EventMask::empty());

        core.ole2_drag_enter(window, Box::new(Files), 0, Pos::new(10, 10));

        assert_eq!(core.ole2_target_data(CF_UNICODETEXT), Some(vec![b'h', 0, b'i', 0, 0, 0]));
        assert!(core.target_data.is_some());
    }

    #[test]
    fn source_data_objects_list_each_format_once() {
        let data = SourceDataObject {
            context: 1,
            formats: vec![
                SelFormat::new(5, 0, false),
                SelFormat::new(6, CF_UNICODETEXT, true),
                SelFormat::new(7, CF_UNICODETEXT, false),
            ],
        };

        assert_eq!(data.formats(), vec![CF_UNICODETEXT]);
        assert_eq!(data.source_context(), Some(1));
    }

    #[test]
    fn escape_in_the_drag_loop_cancels_the_drag() {
        let verdicts = Rc::new(RefCell::new(Vec::new()));
        let seen = verdicts.clone();

        let drag = source_drag(|_| {}, move |core, _, _| {
            seen.borrow_mut().push(core.ole2_query_continue(false, MK_LBUTTON));
            seen.borrow_mut().push(core.ole2_query_continue(true, MK_LBUTTON));
            DragDropOutcome::Cancelled
        });

        assert_eq!(*verdicts.borrow(), vec![DragLoopVerdict::Continue, DragLoopVerdict::Cancel]);
        assert_eq!(finished(&drag.events), vec![(drag.id, false, Some(drag.source))]);
        assert_eq!(drag.core.dnd.source_state, DndState::None);
        assert!(drag.core.dnd.source.is_none());
        assert!(!drag.core.is_modal());
    }

    #[test]
    fn releasing_over_an_accepting_target_drops() {
        let verdicts = Rc::new(RefCell::new(Vec::new()));
        let seen = verdicts.clone();

        let drag = source_drag(|_| {}, move |core, _, allowed| {
            assert_eq!(allowed, DROPEFFECT_COPY | DROPEFFECT_MOVE);
            assert!(core.is_modal());

            core.ole2_give_feedback(DROPEFFECT_COPY);
            seen.borrow_mut().push(core.ole2_query_continue(false, 0));
            DragDropOutcome::Dropped(DROPEFFECT_COPY)
        });

        assert_eq!(*verdicts.borrow(), vec![DragLoopVerdict::Drop]);

        let dnd: Vec<_> = names(&drag.events)
            .into_iter()
            .filter(|(name, _)| name.starts_with("drag") || name.starts_with("drop"))
            .collect();

        assert_eq!(dnd, vec![
            ("drag-status", Some(drag.source)),
            ("drop-finished", Some(drag.source)),
        ]);
        assert_eq!(finished(&drag.events), vec![(drag.id, true, Some(drag.source))]);
        assert!(drag.core.dnd.source.is_none());
    }

    #[test]
    fn feedback_sets_the_action_the_source_sees() {
        let actions = Rc::new(RefCell::new(Vec::new()));
        let seen = actions.clone();

        let drag = source_drag(|_| {}, move |core, _, _| {
            let id = core.dnd.source.unwrap();

            core.ole2_give_feedback(DROPEFFECT_MOVE);
            seen.borrow_mut().push(core.dnd.get(id).unwrap().current_action);

            core.ole2_give_feedback(DROPEFFECT_NONE);
            seen.borrow_mut().push(core.dnd.get(id).unwrap().current_action);
            assert!(core.dnd.get(id).unwrap().dest_window.is_none());

            DragDropOutcome::Cancelled
        });

        assert_eq!(*actions.borrow(), vec![DragAction::MOVE, DragAction::empty()]);

        let status = drag
            .events
            .borrow()
            .iter()
            .filter(|event| match event.kind {
                EventKind::DragStatus(ref data) => data.context == drag.id,
                _ => false,
            })
            .count();

        assert_eq!(status, 2);
    }

    #[test]
    fn unanswered_data_requests_give_up_at_the_deadline() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let seen = errors.clone();

        let drag = source_drag(
            |platform| platform.state().tick_step = 100,
            move |core, data, _| {
                let format = data.formats()[0];

                if let Err(err) = core.ole2_get_data(format) {
                    seen.borrow_mut().push(err.to_string());
                }

                if let Err(err) = core.ole2_get_data(0xdead) {
                    seen.borrow_mut().push(err.to_string());
                }

                DragDropOutcome::Failed
            },
        );

        let errors = errors.borrow();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].ends_with("the source did not answer"));
        assert!(errors[1].ends_with("not offered"));
        assert!(drag.core.selection.render.is_none());

        let ole2 = drag.core.atoms().known(KnownAtom::Ole2Dnd);
        let requests: Vec<_> = drag
            .events
            .borrow()
            .iter()
            .filter(|event| match event.kind {
                EventKind::SelectionRequest {
                    selection, ..
                } => selection == ole2,
                _ => false,
            })
            .map(|event| (event.window, event.device, event.seat))
            .collect();

        assert_eq!(requests, vec![(
            Some(drag.source),
            Some(drag.core.devices().core_pointer),
            Some(drag.core.devices().seat),
        )]);
        assert_eq!(finished(&drag.events), vec![(drag.id, false, Some(drag.source))]);
    }

    #[test]
    fn moves_dropped_by_the_loop_ask_the_source_to_delete() {
        let drag = source_drag(|_| {}, |_, _, _| DragDropOutcome::Dropped(DROPEFFECT_MOVE));

        let delete = drag.core.atoms().known(KnownAtom::Delete);
        let requested = drag.events.borrow().iter().any(|event| match event.kind {
            EventKind::SelectionRequest {
                target, ..
            } => target == delete && event.window == Some(drag.source),
            _ => false,
        });

        assert!(requested);
        assert_eq!(finished(&drag.events), vec![(drag.id, true, Some(drag.source))]);
    }

    #[test]
    fn data_requests_without_a_drag_fail() {
        let (mut core, _, _) = headless(ole2());

        assert!(core.ole2_get_data(CF_UNICODETEXT).is_err());
        assert_eq!(core.ole2_query_continue(false, 0), DragLoopVerdict::Cancel);
    }
}
