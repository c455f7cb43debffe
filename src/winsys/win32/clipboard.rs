pub use crate::Result;

use crate::atoms::format_name;
use crate::atoms::Atom;
use crate::atoms::Format;
use crate::atoms::KnownAtom;
use crate::atoms::NONE;
use crate::display::DisplayCore;
use crate::display::CLIPBOARD_RETRY_TIMER;
use crate::dnd::DragProtocol;
use crate::event::Event;
use crate::event::EventKind;
use crate::event::OwnerChangeReason;
use crate::selection::encode_atoms;
use crate::selection::ClipboardRequest;
use crate::selection::ClipboardState;
use crate::selection::QueueAction;
use crate::selection::RenderSlot;
use crate::selection::SelectionProperty;
use crate::selection::CLIPBOARD_IDLE_ABORT_TIME;
use crate::selection::CLIPBOARD_RETRY_INTERVAL;
use crate::selection::RENDER_DEADLINE;
use crate::window::Hwnd;
use crate::window::Window;

impl DisplayCore {
    fn is_live(
        &self,
        window: Window,
    ) -> bool {
        self.registry.get(window).map_or(false, |data| !data.destroyed)
    }

    fn open_clipboard(
        &mut self,
        owner: Option<Hwnd>,
    ) -> bool {
        if !self.platform.open_clipboard(owner) {
            return false;
        }

        debug!("opened clipboard for {:?}", owner);
        self.selection.clipboard = ClipboardState::from_owner(owner);
        true
    }

    fn close_clipboard(&mut self) {
        if self.selection.clipboard.is_open() {
            self.platform.close_clipboard();
            self.selection.clipboard = ClipboardState::Closed;
            debug!("closed clipboard");
        }
    }

    fn selection_notify(
        &mut self,
        requestor: Window,
        selection: Atom,
        target: Atom,
        property: Option<Atom>,
        time: u32,
    ) {
        let event = Event::new(
            EventKind::SelectionNotify {
                selection,
                target,
                property,
            },
            Some(requestor),
        )
        .with_time(time);

        self.emit(event);
    }

    /// Makes `owner` the owner of `selection`. Taking the clipboard
    /// empties it and asks the new owner for the targets to announce.
    pub fn set_selection_owner(
        &mut self,
        owner: Option<Window>,
        selection: Atom,
        time: u32,
    ) -> bool {
        if selection == NONE {
            warn!("unable to set the owner of selection NONE");
            return false;
        }

        if !self.atoms.is(selection, KnownAtom::Clipboard) {
            match owner {
                Some(owner) => self.selection.owners.insert(selection, owner),
                None => self.selection.owners.remove(&selection),
            };

            return true;
        }

        let hwnd = match owner {
            Some(window) if !self.is_live(window) => return false,
            Some(window) => self.registry.hwnd(window),
            None => None,
        };

        let wanted = ClipboardState::from_owner(hwnd);

        if self.selection.clipboard.is_open() && self.selection.clipboard != wanted {
            self.close_clipboard();
        }

        if !self.selection.clipboard.is_open() && !self.open_clipboard(hwnd) {
            warn!("unable to open the clipboard for window {:?}", owner);
            return false;
        }

        self.selection.ignore_destroy_clipboard = true;
        let emptied = self.platform.empty_clipboard();
        self.selection.ignore_destroy_clipboard = false;

        if !emptied {
            warn!("unable to empty the clipboard");
            self.close_clipboard();
            return false;
        }

        self.clear_clipboard_queue(time);
        self.selection.stored_clipboard_owner = hwnd;

        if owner.is_none() {
            self.close_clipboard();
        }

        info!("clipboard now owned by {:?}", owner);

        self.send_targets_request(time);
        true
    }

    pub fn selection_owner(
        &self,
        selection: Atom,
    ) -> Option<Window> {
        if self.atoms.is(selection, KnownAtom::Clipboard) {
            self.platform
                .clipboard_owner()
                .and_then(|hwnd| self.registry.lookup(hwnd))
        } else {
            self.selection.owners.get(&selection).copied()
        }
    }

    /// Registers the formats `targets` travel as. New clipboard formats
    /// are announced again.
    pub fn add_selection_targets(
        &mut self,
        owner: Window,
        selection: Atom,
        targets: &[Atom],
    ) {
        let clipboard = self.atoms.is(selection, KnownAtom::Clipboard);
        let dnd = self.atoms.is(selection, KnownAtom::Ole2Dnd)
            || self.atoms.is(selection, KnownAtom::LocalDndSelection);

        if !clipboard && !dnd {
            if !self.atoms.is(selection, KnownAtom::Primary) {
                warn!("unsupported selection {:?}", self.atoms.name(selection));
            }

            return;
        }

        debug!("window {} offers {} target(s) on {:?}", owner, targets.len(), self.atoms.name(selection));

        let mut formats = if clipboard {
            std::mem::take(&mut self.selection.clipboard_targets)
        } else {
            std::mem::take(&mut self.selection.dnd_targets)
        };

        let mut added = 0;

        for &target in targets {
            added += self.selection.add_target_to_formats(
                self.platform.as_mut(),
                &self.atoms,
                target,
                &mut formats,
            );
        }

        if clipboard {
            self.selection.clipboard_targets = formats;
        } else {
            self.selection.dnd_targets = formats;
        }

        if added > 0 {
            self.send_targets_request(0);
        }
    }

    pub fn clear_selection_targets(
        &mut self,
        selection: Atom,
    ) {
        self.selection.clear_targets(&self.atoms, selection);
    }

    /// Asks the clipboard owner for its targets so that their formats
    /// can be announced for delayed rendering.
    pub(crate) fn send_targets_request(
        &mut self,
        time: u32,
    ) {
        if self.selection.targets_request_pending {
            return;
        }

        let clipboard = self.atoms.known(KnownAtom::Clipboard);

        let owner = match self.selection_owner(clipboard) {
            Some(owner) => owner,
            None => return,
        };

        if !self.selection.clipboard.is_open() {
            let hwnd = self.registry.hwnd(owner);
            self.open_clipboard(hwnd);
        }

        let targets = self.atoms.known(KnownAtom::Targets);
        let event = Event::new(
            EventKind::SelectionRequest {
                selection: clipboard,
                target: targets,
                property: self.atoms.known(KnownAtom::CdkSelection),
                requestor: Some(owner),
            },
            Some(owner),
        )
        .with_time(time);

        self.emit(event);

        self.selection.property_change_target = Some(targets);
        self.selection.targets_request_pending = true;
    }

    fn clear_clipboard_queue(
        &mut self,
        time: u32,
    ) {
        let clipboard = self.atoms.known(KnownAtom::Clipboard);

        for request in std::mem::take(&mut self.selection.queue) {
            if request.action == QueueAction::Convert {
                self.selection_notify(request.requestor, clipboard, request.target, None, time);
            }
        }

        self.selection.targets_request_pending = false;
        self.sync_retry_timer();
    }

    fn queue_clipboard_request(
        &mut self,
        action: QueueAction,
        requestor: Window,
        target: Atom,
        time: u32,
    ) {
        let request = ClipboardRequest {
            requestor,
            selection: self.atoms.known(KnownAtom::Clipboard),
            target,
            time,
            idle: 0,
            action,
        };

        if self.selection.enqueue(request) {
            debug!("queued clipboard {:?} for window {}", action, requestor);
        }
    }

    /// Keeps the retry timer running exactly while requests wait.
    fn sync_retry_timer(&mut self) {
        let first = self.selection.queue.first().map(|request| request.requestor);

        match (first, self.selection.retry_timer) {
            (None, Some(hwnd)) => {
                self.platform.kill_timer(hwnd, CLIPBOARD_RETRY_TIMER);
                self.selection.retry_timer = None;
                debug!("stopped clipboard retry timer");
            },
            (Some(requestor), None) => {
                if let Some(hwnd) = self.registry.hwnd(requestor) {
                    self.platform
                        .set_timer(hwnd, CLIPBOARD_RETRY_TIMER, CLIPBOARD_RETRY_INTERVAL);
                    self.selection.retry_timer = Some(hwnd);
                    debug!("started clipboard retry timer");
                }
            },
            _ => {},
        }
    }

    /// Retries the queued clipboard requests. Requests waiting too long,
    /// or whose requestor is gone, are answered with no property.
    pub(crate) fn clipboard_retry_tick(
        &mut self,
        time: u32,
    ) {
        let clipboard = self.atoms.known(KnownAtom::Clipboard);
        let queue = std::mem::take(&mut self.selection.queue);

        let (expired, mut waiting): (Vec<ClipboardRequest>, Vec<ClipboardRequest>) =
            queue.into_iter().partition(|request| {
                !self.is_live(request.requestor) || request.idle >= CLIPBOARD_IDLE_ABORT_TIME
            });

        for request in expired {
            debug!("abandoning clipboard {:?} for window {}", request.action, request.requestor);

            if request.action == QueueAction::Convert && self.is_live(request.requestor) {
                self.selection_notify(request.requestor, clipboard, request.target, None, request.time);
            }
        }

        let mut remaining = Vec::new();

        for mut request in waiting.drain(..) {
            if request.action == QueueAction::Targets && self.selection.clipboard == ClipboardState::Anonymous
            {
                self.close_clipboard();
            }

            if !self.selection.clipboard.is_open() {
                let hwnd = self.registry.hwnd(request.requestor);

                if !self.open_clipboard(hwnd) {
                    request.idle += 1;
                    remaining.push(request);
                    continue;
                }
            }

            match request.action {
                QueueAction::Convert => {
                    let property = self.convert_opened_clipboard(request.requestor, request.target);
                    self.selection_notify(request.requestor, clipboard, request.target, property, request.time);
                },
                QueueAction::Targets => self.announce_clipboard_targets(),
            }
        }

        remaining.append(&mut self.selection.queue);
        self.selection.queue = remaining;

        if self.selection.queue.is_empty() {
            self.close_clipboard();
        }

        trace!("clipboard retry at {} leaves {} request(s)", time, self.selection.queue.len());
        self.sync_retry_timer();
    }

    /// Every clipboard format we can render, announced without data.
    fn announce_clipboard_targets(&mut self) {
        let formats: Vec<Format> = self
            .selection
            .clipboard_targets
            .iter()
            .map(|sel| sel.format)
            .filter(|&format| format != 0)
            .collect();

        for format in formats {
            if !self.platform.set_clipboard_data(format, None) {
                warn!("unable to announce clipboard format {:#x}", format);
            }
        }
    }

    fn convert_opened_clipboard(
        &mut self,
        requestor: Window,
        target: Atom,
    ) -> Option<Atom> {
        if self.atoms.is(target, KnownAtom::Targets) {
            return self.clipboard_targets_property(requestor);
        }

        let formats = self.platform.clipboard_formats();
        let name = self.atoms.name(target).map(str::to_owned);

        let named = formats
            .iter()
            .copied()
            .find(|&format| name.is_some() && format_name(self.platform.as_ref(), format) == name);

        let (format, transmute) = match named {
            Some(format) => (format, false),
            None => self
                .selection
                .compat_formats_for(target)
                .into_iter()
                .find(|sel| self.platform.is_clipboard_format_available(sel.format))
                .map(|sel| (sel.format, sel.transmute))?,
        };

        let raw = self.platform.clipboard_data(format)?;

        let data = if transmute {
            match self
                .selection
                .transmute_format(self.platform.as_ref(), &self.atoms, format, target, &raw)
            {
                Ok(data) => data,
                Err(err) => {
                    warn!("unable to convert clipboard format {:#x}: {}", format, err);
                    return None;
                },
            }
        } else {
            raw
        };

        debug!("clipboard format {:#x} converted, {} bytes", format, data.len());

        self.selection.store_property(requestor, target, 8, data);
        Some(self.atoms.known(KnownAtom::CdkSelection))
    }

    fn clipboard_targets_property(
        &mut self,
        requestor: Window,
    ) -> Option<Atom> {
        let mut targets = Vec::new();

        for format in self.platform.clipboard_formats() {
            self.selection.add_format_to_targets(
                self.platform.as_ref(),
                &mut self.atoms,
                format,
                &mut targets,
            );
        }

        if targets.is_empty() {
            return None;
        }

        let atoms: Vec<Atom> = targets.iter().map(|sel| sel.target).collect();
        let kind = self.atoms.intern("ATOM");

        self.selection.store_property(requestor, kind, 32, encode_atoms(&atoms));
        Some(self.atoms.known(KnownAtom::CdkSelection))
    }

    /// Requests `selection` converted to `target` for `requestor`. The
    /// answer arrives as a `selection-notify`, possibly later when the
    /// clipboard is busy.
    pub fn convert_selection(
        &mut self,
        requestor: Window,
        selection: Atom,
        target: Atom,
        time: u32,
    ) {
        if !self.is_live(requestor) {
            return;
        }

        debug!(
            "window {} converts {:?} to {:?}",
            requestor,
            self.atoms.name(selection),
            self.atoms.name(target)
        );

        if self.atoms.is(selection, KnownAtom::Clipboard) {
            let hwnd = self.registry.hwnd(requestor);
            let open = self.selection.clipboard.is_open() || self.open_clipboard(hwnd);

            self.queue_clipboard_request(QueueAction::Convert, requestor, target, time);

            if open {
                self.clipboard_retry_tick(time);
            } else {
                self.sync_retry_timer();
            }

            return;
        }

        let property = if self.atoms.is(selection, KnownAtom::DropfilesDnd) {
            if let Some(dropped) = self.selection.dropfiles.take() {
                self.selection
                    .store_property(requestor, dropped.kind, dropped.bitness, dropped.data);
            }

            Some(self.atoms.known(KnownAtom::CdkSelection))
        } else if self.atoms.is(selection, KnownAtom::Ole2Dnd) {
            self.convert_dnd_selection(requestor, target)
        } else if self.atoms.is(selection, KnownAtom::LocalDndSelection) {
            if self.forward_local_request(requestor, target, time) {
                return;
            }

            None
        } else {
            None
        };

        self.selection_notify(requestor, selection, target, property, time);
    }

    /// Reads `target` from the data object of the foreign drag over us.
    fn convert_dnd_selection(
        &mut self,
        requestor: Window,
        target: Atom,
    ) -> Option<Atom> {
        let ole2 = self.atoms.known(KnownAtom::Ole2Dnd);

        // Moves are deleted by the toolkit itself.
        if self.atoms.is(target, KnownAtom::Delete) {
            return Some(ole2);
        }

        let formats = self.dnd.dest.and_then(|id| self.dnd.get(id))?.formats.clone();
        let available = self.target_data.as_ref()?.formats();

        let sel = [false, true].iter().find_map(|&transmute| {
            formats
                .iter()
                .find(|sel| sel.target == target && sel.transmute == transmute && available.contains(&sel.format))
                .copied()
        })?;

        let raw = self.ole2_target_data(sel.format)?;

        let data = if sel.transmute {
            match self
                .selection
                .transmute_format(self.platform.as_ref(), &self.atoms, sel.format, target, &raw)
            {
                Ok(data) => data,
                Err(err) => {
                    warn!("unable to convert dropped format {:#x}: {}", sel.format, err);
                    return None;
                },
            }
        } else {
            raw
        };

        self.selection.store_property(requestor, target, 8, data);
        Some(ole2)
    }

    /// Passes a local drop's conversion on to the drag source, which
    /// answers with `change_property` on the requestor.
    fn forward_local_request(
        &mut self,
        requestor: Window,
        target: Atom,
        time: u32,
    ) -> bool {
        let source = self
            .dnd
            .source
            .and_then(|id| self.dnd.get(id))
            .filter(|context| context.protocol == DragProtocol::Local)
            .and_then(|context| context.source_window);

        let source = match source {
            Some(source) => source,
            None => return false,
        };

        let local = self.atoms.known(KnownAtom::LocalDndSelection);
        let event = Event::new(
            EventKind::SelectionRequest {
                selection: local,
                target,
                property: local,
                requestor: Some(requestor),
            },
            Some(source),
        )
        .with_time(time);

        self.emit(event);
        true
    }

    /// The owner's answer to a `selection-request`.
    pub fn change_property(
        &mut self,
        window: Window,
        property: Atom,
        kind: Atom,
        bitness: u8,
        data: Vec<u8>,
    ) {
        let pending = self.selection.property_change_target;
        let ole2 = self.atoms.known(KnownAtom::Ole2Dnd);
        let local = self.atoms.known(KnownAtom::LocalDndSelection);

        if self.atoms.is(property, KnownAtom::CdkSelection)
            && pending == Some(self.atoms.known(KnownAtom::Targets))
        {
            self.selection.property_change_target = None;
            self.selection.targets_request_pending = false;

            let hwnd = self.registry.hwnd(window);
            let open = self.selection.clipboard.is_open() || self.open_clipboard(hwnd);

            self.queue_clipboard_request(QueueAction::Targets, window, kind, 0);

            if open {
                let time = self.next_tick(0);
                self.clipboard_retry_tick(time);
            } else {
                self.sync_retry_timer();
            }

            return;
        }

        if (property == ole2 || property == local) && pending == Some(self.atoms.known(KnownAtom::Delete)) {
            self.selection.property_change_target = None;
            return;
        }

        let slot = self
            .selection
            .render
            .clone()
            .filter(|slot| slot.data.is_none());

        if let Some(slot) = slot {
            self.render_answer(slot, kind, data);
            return;
        }

        if property == local {
            let time = self.next_tick(0);

            self.selection.store_property(window, kind, bitness, data);
            self.selection_notify(window, local, kind, Some(local), time);
            return;
        }

        warn!(
            "unsupported property change on window {}: {:?} of type {:?}, {} bytes",
            window,
            self.atoms.name(property),
            self.atoms.name(kind),
            data.len()
        );
    }

    fn render_answer(
        &mut self,
        slot: RenderSlot,
        kind: Atom,
        data: Vec<u8>,
    ) {
        self.selection.property_change_target = None;

        let converted = if slot.transmute {
            self.selection
                .transmute_target(&self.atoms, kind, slot.format, &data)
        } else {
            Ok(data)
        };

        match converted {
            Ok(data) if data.is_empty() => warn!("owner rendered format {:#x} empty", slot.format),
            Ok(data) => {
                if let Some(render) = self.selection.render.as_mut() {
                    render.data = Some(data);
                }
            },
            Err(err) => warn!("unable to render format {:#x}: {}", slot.format, err),
        }
    }

    pub fn selection_property(
        &self,
        requestor: Window,
    ) -> Option<SelectionProperty> {
        self.selection.property(requestor).cloned()
    }

    pub fn delete_selection_property(
        &mut self,
        requestor: Window,
    ) {
        self.selection.delete_property(requestor);
    }

    /// Delayed rendering of one announced clipboard format.
    pub(crate) fn render_format(
        &mut self,
        format: Format,
    ) {
        let sel = match self.selection.clipboard_target_for(format) {
            Some(sel) => sel,
            None => {
                debug!("no target renders clipboard format {:#x}", format);
                return;
            },
        };

        let clipboard = self.atoms.known(KnownAtom::Clipboard);

        let owner = match self.selection_owner(clipboard) {
            Some(owner) => owner,
            None => {
                warn!("unable to render clipboard format {:#x}: no owner", format);
                return;
            },
        };

        let time = self.next_tick(0);

        self.selection.render = Some(RenderSlot::new(sel));
        self.selection.property_change_target = Some(sel.target);

        let event = Event::new(
            EventKind::SelectionRequest {
                selection: clipboard,
                target: sel.target,
                property: self.atoms.known(KnownAtom::CdkSelection),
                requestor: Some(owner),
            },
            Some(owner),
        )
        .with_time(time);

        self.emit(event);

        self.spin_until(RENDER_DEADLINE, |core| {
            core.selection.render.as_ref().map_or(true, |slot| slot.data.is_some())
        });

        if self.selection.property_change_target == Some(sel.target) {
            self.selection.property_change_target = None;
        }

        match self.selection.render.take().and_then(|slot| slot.data) {
            Some(data) => {
                debug!("rendered clipboard format {:#x}, {} bytes", format, data.len());

                if !self.platform.set_clipboard_data(format, Some(data)) {
                    warn!("unable to set clipboard data for format {:#x}", format);
                }
            },
            None => debug!("owner did not render clipboard format {:#x}", format),
        }
    }

    /// Renders every announced format before the owner goes away.
    pub(crate) fn render_all_formats(&mut self) {
        let owner = self.platform.clipboard_owner();
        let opened = !self.selection.clipboard.is_open() && self.open_clipboard(owner);

        if !self.selection.clipboard.is_open() {
            warn!("unable to open the clipboard to render all formats");
            return;
        }

        let mut formats: Vec<Format> = self
            .selection
            .clipboard_targets
            .iter()
            .map(|sel| sel.format)
            .filter(|&format| format != 0)
            .collect();
        formats.dedup();

        for format in formats {
            self.render_format(format);
        }

        if opened {
            self.close_clipboard();
        }
    }

    /// Hands the clipboard contents over before `window` goes away.
    pub fn store_clipboard(
        &mut self,
        window: Window,
        time: u32,
    ) {
        self.render_all_formats();

        let selection = self.atoms.known(KnownAtom::ClipboardManager);
        self.selection_notify(window, selection, NONE, None, time);
    }

    /// Someone else emptied the clipboard we owned.
    pub(crate) fn clipboard_destroyed(
        &mut self,
        window: Window,
        time: u32,
    ) {
        if self.selection.ignore_destroy_clipboard {
            return;
        }

        let event = Event::new(
            EventKind::SelectionClear {
                selection: self.atoms.known(KnownAtom::Clipboard),
            },
            Some(window),
        )
        .with_time(time);

        self.emit(event);
    }

    /// The clipboard contents changed. An `owner-change` still waiting
    /// in the queue is replaced by the new one.
    pub(crate) fn clipboard_updated(
        &mut self,
        time: u32,
    ) {
        let hwnd = self.platform.clipboard_owner();

        if hwnd != self.selection.stored_clipboard_owner {
            self.close_clipboard();
            self.clear_clipboard_queue(time);
            self.selection.stored_clipboard_owner = hwnd;
        }

        let clipboard = self.atoms.known(KnownAtom::Clipboard);
        let root = self.registry.root();
        let owner = hwnd.and_then(|hwnd| self.registry.lookup(hwnd));

        self.queue.retain(|event| match event.kind {
            EventKind::OwnerChange {
                selection, ..
            } => !(event.window == Some(root) && selection == clipboard),
            _ => true,
        });

        let event = Event::new(
            EventKind::OwnerChange {
                owner,
                reason: OwnerChangeReason::NewOwner,
                selection: clipboard,
            },
            Some(root),
        )
        .with_time(time);

        self.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::atoms::CF_UNICODETEXT;
    use crate::config::Config;
    use crate::display::testing::*;
    use crate::event::EventMask;
    use crate::geometry::Region;
    use crate::platform::DisplayPlatform;
    use crate::win32::message::NativeMessage;
    use crate::win32::message::WM_CLIPBOARDUPDATE;
    use crate::win32::message::WM_DESTROYCLIPBOARD;
    use crate::win32::message::WM_RENDERFORMAT;

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16()
            .chain(Some(0))
            .flat_map(|unit| unit.to_le_bytes().to_vec())
            .collect()
    }

    #[test]
    fn utf8_text_is_rendered_as_unicode_text() {
        let (mut core, platform, _) = headless(Config::default());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let clipboard = core.atoms().known(KnownAtom::Clipboard);
        let utf8 = core.atoms().known(KnownAtom::Utf8String);

        core.set_event_handler(move |core: &mut DisplayCore, event: Event| {
            if let EventKind::SelectionRequest {
                target,
                property,
                requestor: Some(requestor),
                ..
            } = event.kind
            {
                if core.atoms().is(target, KnownAtom::Targets) {
                    core.change_property(requestor, property, target, 32, encode_atoms(&[utf8]));
                } else if target == utf8 {
                    core.change_property(requestor, property, utf8, 8, "héllo".as_bytes().to_vec());
                }
            }
        });

        core.add_selection_targets(window, clipboard, &[utf8]);
        assert!(core.set_selection_owner(Some(window), clipboard, 1));
        core.dispatch_pending();

        assert!(platform.state().clipboard.contains(&(CF_UNICODETEXT, None)));
        assert_eq!(platform.state().clipboard_open, None);
        assert_eq!(core.selection_owner(clipboard), Some(window));

        // The consumer holds the clipboard open while it asks.
        platform.state().clipboard_open = Some(None);
        let hwnd = core.registry().hwnd(window).unwrap();
        core.handle_message(NativeMessage::new(hwnd, WM_RENDERFORMAT, CF_UNICODETEXT as usize, 0));

        assert_eq!(platform.clipboard_data(CF_UNICODETEXT), Some(utf16("héllo")));
        assert!(core.selection.render.is_none());
    }

    #[test]
    fn foreign_text_is_read_as_utf8() {
        let (mut core, platform, events) = headless(Config::default());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let clipboard = core.atoms().known(KnownAtom::Clipboard);
        let utf8 = core.atoms().known(KnownAtom::Utf8String);

        platform.state().clipboard = vec![(CF_UNICODETEXT, Some(utf16("hi\r\n")))];

        core.convert_selection(window, clipboard, utf8, 5);
        core.dispatch_pending();

        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].kind, EventKind::SelectionNotify {
            selection: clipboard,
            target: utf8,
            property: Some(core.atoms().known(KnownAtom::CdkSelection)),
        });

        let property = core.selection_property(window).unwrap();
        assert_eq!(property.kind, utf8);
        assert_eq!(property.data, b"hi\n".to_vec());
        assert_eq!(platform.state().clipboard_open, None);
    }

    #[test]
    fn targets_list_every_readable_target() {
        let (mut core, platform, _) = headless(Config::default());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let clipboard = core.atoms().known(KnownAtom::Clipboard);
        let targets = core.atoms().known(KnownAtom::Targets);

        platform.state().clipboard = vec![(CF_UNICODETEXT, Some(utf16("x")))];

        core.convert_selection(window, clipboard, targets, 0);

        let property = core.selection_property(window).unwrap();
        assert_eq!(property.bitness, 32);
        assert_eq!(
            crate::selection::decode_atoms(&property.data),
            vec![
                core.atoms().known(KnownAtom::CfUnicodeText),
                core.atoms().known(KnownAtom::Utf8String),
            ]
        );
    }

    #[test]
    fn busy_clipboards_are_retried_then_abandoned() {
        let (mut core, platform, events) = headless(Config::default());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let hwnd = core.registry().hwnd(window).unwrap();
        let clipboard = core.atoms().known(KnownAtom::Clipboard);
        let utf8 = core.atoms().known(KnownAtom::Utf8String);

        platform.state().clipboard_busy = true;
        core.convert_selection(window, clipboard, utf8, 0);
        core.convert_selection(window, clipboard, utf8, 0);

        assert_eq!(core.selection.queue.len(), 1);
        assert!(platform.state().timers.contains_key(&(hwnd, CLIPBOARD_RETRY_TIMER)));

        for tick in 0..CLIPBOARD_IDLE_ABORT_TIME {
            core.clipboard_retry_tick(tick);
        }

        core.dispatch_pending();
        assert!(events.borrow().is_empty());

        core.clipboard_retry_tick(100);
        core.dispatch_pending();

        assert_eq!(events.borrow().len(), 1);
        assert_eq!(events.borrow()[0].kind, EventKind::SelectionNotify {
            selection: clipboard,
            target: utf8,
            property: None,
        });
        assert!(core.selection.queue.is_empty());
        assert!(!platform.state().timers.contains_key(&(hwnd, CLIPBOARD_RETRY_TIMER)));
    }

    #[test]
    fn losing_the_clipboard_clears_the_selection() {
        let (mut core, _, events) = headless(Config::default());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let hwnd = core.registry().hwnd(window).unwrap();
        core.dispatch_pending();
        events.borrow_mut().clear();

        core.handle_message(NativeMessage::new(hwnd, WM_DESTROYCLIPBOARD, 0, 0));

        assert_eq!(names(&events), vec![("selection-clear", Some(window))]);
    }

    #[test]
    fn owner_changes_are_coalesced() {
        let (mut core, platform, events) = headless(Config::default());
        let window = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let hwnd = core.registry().hwnd(window).unwrap();
        core.dispatch_pending();
        events.borrow_mut().clear();

        platform.state().clipboard_owner = Some(hwnd);

        let root = core.root();
        let mut first = NativeMessage::new(hwnd, WM_CLIPBOARDUPDATE, 0, 0);
        let mut second = first.clone();
        core.translate(&mut first);
        core.translate(&mut second);
        core.dispatch_pending();

        assert_eq!(names(&events), vec![("owner-change", Some(root))]);
        match &events.borrow()[0].kind {
            EventKind::OwnerChange {
                owner, ..
            } => assert_eq!(*owner, Some(window)),
            kind => panic!("unexpected {:?}", kind),
        };
    }

    #[test]
    fn local_conversions_are_answered_by_the_source() {
        let (mut core, _, events) = headless(Config::default());
        let source = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let target = shown_toplevel(&mut core, Region::new(200, 0, 100, 100), EventMask::empty());
        let utf8 = core.atoms().known(KnownAtom::Utf8String);
        let local = core.atoms().known(KnownAtom::LocalDndSelection);
        let device = core.devices().core_pointer;

        core.drag_begin(source, device, &[utf8], crate::dnd::DragAction::COPY, crate::geometry::Pos::new(5, 5));
        core.dispatch_pending();
        events.borrow_mut().clear();

        core.convert_selection(target, local, utf8, 0);
        core.dispatch_pending();

        assert_eq!(names(&events), vec![("selection-request", Some(source))]);
        events.borrow_mut().clear();

        core.change_property(target, local, utf8, 8, b"moved".to_vec());
        core.dispatch_pending();

        assert_eq!(names(&events), vec![("selection-notify", Some(target))]);
        assert_eq!(core.selection_property(target).unwrap().data, b"moved".to_vec());
    }
}
