pub use crate::Result;

use crate::aerosnap::SnapRegions;
use crate::atoms::AtomTable;
use crate::atoms::FormatTable;
use crate::config::Config;
use crate::crossing::synthesize_crossings;
use crate::crossing::CrossingContext;
use crate::dnd::DndManager;
use crate::event::CrossingMode;
use crate::event::Event;
use crate::event::EventKind;
use crate::event::EventMask;
use crate::event::GrabStatus;
use crate::event::Serial;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::grab::GrabInfo;
use crate::grab::GrabOwnership;
use crate::grab::GrabRegistry;
use crate::grab::GrabTransition;
use crate::grab::TouchGrab;
use crate::input::ClickTracker;
use crate::input::DeviceId;
use crate::input::DeviceManager;
use crate::monitor::monitor_at;
use crate::monitor::Monitor;
use crate::platform::DisplayPlatform;
use crate::pointer::PointerTracker;
use crate::queue::EventQueue;
use crate::registry::WindowRegistry;
use crate::selection::SelectionBroker;
use crate::win32::keyboard::modifier_state;
use crate::win32::keyboard::KeyboardState;
use crate::win32::keyboard::SnapKeyHook;
use crate::win32::ole2::DataObject;
use crate::win32::ole2::DragDropDriver;
use crate::window::Window;

use bitflags::bitflags;

/// Upper bound, in milliseconds, of every nested wait on the toolkit.
pub const SPIN_TIMEOUT: u32 = 1000;

pub const SNAP_INDICATOR_TIMER: usize = 1;
pub const DRAG_ANIMATION_TIMER: usize = 2;
pub const CLIPBOARD_RETRY_TIMER: usize = 3;

bitflags! {
    /// Native modal loops currently running on the display thread.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ModalOperation: u8 {
        const MOVE_RESIZE = 1 << 0;
        const DRAG_DROP   = 1 << 1;
    }
}

pub trait EventHandler {
    fn handle_event(
        &mut self,
        core: &mut DisplayCore,
        event: Event,
    );
}

impl<F> EventHandler for F
where
    F: FnMut(&mut DisplayCore, Event),
{
    fn handle_event(
        &mut self,
        core: &mut DisplayCore,
        event: Event,
    ) {
        self(core, event)
    }
}

/// All state of an open display. Translation, grabs, drags and the
/// selection broker are methods on this one value, driven from the
/// thread that owns the native windows.
pub struct DisplayCore {
    pub(crate) platform: Box<dyn DisplayPlatform>,
    pub(crate) config: Config,

    pub(crate) registry: WindowRegistry,
    pub(crate) devices: DeviceManager,
    pub(crate) grabs: GrabRegistry,
    pub(crate) pointer: PointerTracker,
    pub(crate) queue: EventQueue,
    pub(crate) atoms: AtomTable,
    pub(crate) selection: SelectionBroker,

    pub(crate) monitors: Vec<Monitor>,
    pub(crate) snap_regions: SnapRegions,
    /// Logical position of the device origin in root coordinates.
    pub(crate) offset: Pos,
    pub(crate) scale: i32,

    pub(crate) keyboard: KeyboardState,
    pub(crate) snap_hook: SnapKeyHook,
    pub(crate) clicks: ClickTracker,
    pub(crate) dnd: DndManager,
    pub(crate) target_data: Option<Box<dyn DataObject>>,
    pub(crate) drag_driver: Option<Box<dyn DragDropDriver>>,

    pub(crate) grab_cursor: Option<String>,
    pub(crate) modal: ModalOperation,
    pub(crate) moving: Option<Window>,
    pub(crate) mouse_window: Option<Window>,
    /// Last pointer position in device screen coordinates.
    pub(crate) last_pointer: Pos,
    pub(crate) last_root: Option<Pos>,
    pub(crate) in_ime_composition: bool,

    serial: Serial,
    last_tick: u32,
    handler: Option<Box<dyn EventHandler>>,
    dispatching: bool,
}

impl DisplayCore {
    pub fn new(
        mut platform: Box<dyn DisplayPlatform>,
        config: Config,
    ) -> Self {
        let formats = FormatTable::register(platform.as_mut());
        let mut atoms = AtomTable::new();
        let selection = SelectionBroker::new(&mut atoms, formats);

        let registry = WindowRegistry::new(platform.desktop_window(), Region::default());
        let keyboard = KeyboardState::new(platform.keyboard_layout());
        let last_pointer = platform.pointer_position();

        let mut core = Self {
            platform,
            config,

            registry,
            devices: DeviceManager::new(),
            grabs: GrabRegistry::new(),
            pointer: PointerTracker::new(),
            queue: EventQueue::new(),
            atoms,
            selection,

            monitors: Vec::new(),
            snap_regions: SnapRegions::default(),
            offset: Pos::default(),
            scale: 1,

            keyboard,
            snap_hook: SnapKeyHook::new(),
            clicks: ClickTracker::new(),
            dnd: DndManager::new(),
            target_data: None,
            drag_driver: None,

            grab_cursor: None,
            modal: ModalOperation::empty(),
            moving: None,
            mouse_window: None,
            last_pointer,
            last_root: None,
            in_ime_composition: false,

            serial: 0,
            last_tick: 0,
            handler: None,
            dispatching: false,
        };

        core.refresh_monitors();

        info!(
            "opened {} display with {} monitor(s) at scale {}",
            core.platform.name(),
            core.monitors.len(),
            core.scale
        );

        core
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn devices(&self) -> &DeviceManager {
        &self.devices
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn atoms_mut(&mut self) -> &mut AtomTable {
        &mut self.atoms
    }

    pub fn platform(&self) -> &dyn DisplayPlatform {
        self.platform.as_ref()
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }

    pub fn root(&self) -> Window {
        self.registry.root()
    }

    pub fn set_event_handler<H>(
        &mut self,
        handler: H,
    ) where
        H: EventHandler + 'static,
    {
        self.handler = Some(Box::new(handler));
    }

    pub fn set_drag_driver<D>(
        &mut self,
        driver: D,
    ) where
        D: DragDropDriver + 'static,
    {
        self.drag_driver = Some(Box::new(driver));
    }

    pub fn next_serial(&mut self) -> Serial {
        self.serial += 1;
        self.serial
    }

    pub fn current_serial(&self) -> Serial {
        self.serial
    }

    /// Event time never runs backwards. A smaller timestamp is only taken
    /// as a wrap of the 32-bit clock when it is more than half the range
    /// behind.
    pub fn next_tick(
        &mut self,
        suggested: u32,
    ) -> u32 {
        let suggested = if suggested == 0 {
            self.platform.tick_count()
        } else {
            suggested
        };

        if suggested > self.last_tick || self.last_tick - suggested > u32::MAX / 2 {
            self.last_tick = suggested;
        }

        self.last_tick
    }

    pub(crate) fn emit(
        &mut self,
        event: Event,
    ) {
        trace!("queueing {} for window {:?}", event.name(), event.window);
        self.queue.push(event);
    }

    pub(crate) fn pointer_event(
        &self,
        kind: EventKind,
        window: Window,
        time: u32,
    ) -> Event {
        Event::new(kind, Some(window))
            .with_time(time)
            .with_device(self.devices.core_pointer, self.devices.system_pointer)
            .with_seat(self.devices.seat)
    }

    pub(crate) fn keyboard_event(
        &self,
        kind: EventKind,
        window: Window,
        time: u32,
    ) -> Event {
        Event::new(kind, Some(window))
            .with_time(time)
            .with_device(self.devices.core_keyboard, self.devices.system_keyboard)
            .with_seat(self.devices.seat)
    }

    /// Hands every dispatchable event to the drag machinery and then to
    /// the handler. Does nothing when called from within the handler;
    /// the outer dispatch picks the new events up.
    pub fn dispatch_pending(&mut self) -> usize {
        if self.dispatching {
            return 0;
        }

        self.dispatching = true;
        let mut count = 0;

        while let Some(event) = self.queue.unqueue() {
            count += 1;

            if self.handle_drag_event(&event) {
                continue;
            }

            match self.handler.take() {
                Some(mut handler) => {
                    handler.handle_event(self, event);

                    if self.handler.is_none() {
                        self.handler = Some(handler);
                    }
                },
                None => trace!("dropping {} without a handler", event.name()),
            }
        }

        self.dispatching = false;

        if self.dnd.source_state == crate::dnd::DndState::Pending {
            self.run_drag_drop();
        }

        count
    }

    /// Translates and dispatches one native message.
    pub fn handle_message(
        &mut self,
        mut msg: crate::win32::message::NativeMessage,
    ) -> Option<isize> {
        let result = self.translate(&mut msg);
        self.dispatch_pending();
        result
    }

    /// Drains the native queue, translating and dispatching as it goes.
    pub fn process_pending(&mut self) {
        if self.queue.is_paused() {
            return;
        }

        while let Some(mut msg) = self.platform.next_message() {
            self.translate(&mut msg);
            self.dispatch_pending();
        }

        self.dispatch_pending();
    }

    /// Pumps events until `done` holds or `timeout` milliseconds pass.
    pub(crate) fn spin_until<F>(
        &mut self,
        timeout: u32,
        mut done: F,
    ) -> bool
    where
        F: FnMut(&DisplayCore) -> bool,
    {
        let start = self.platform.tick_count();

        loop {
            if done(&*self) {
                return true;
            }

            if self.platform.tick_count().wrapping_sub(start) >= timeout {
                return done(&*self);
            }

            self.process_pending();
        }
    }

    pub fn root_point(
        &self,
        pt: Pos,
    ) -> (f64, f64) {
        let scale = self.scale as f64;

        (
            pt.x as f64 / scale + self.offset.x as f64,
            pt.y as f64 / scale + self.offset.y as f64,
        )
    }

    pub fn root_from_screen(
        &self,
        pt: Pos,
    ) -> Pos {
        pt.unscaled(self.scale) + self.offset
    }

    pub fn screen_from_root(
        &self,
        pos: Pos,
    ) -> Pos {
        pos.relative_to(self.offset).scaled(self.scale)
    }

    /// A device-pixel screen rectangle in logical root coordinates.
    pub fn logical_region(
        &self,
        region: Region,
    ) -> Region {
        Region {
            pos: self.root_from_screen(region.pos),
            dim: region.dim.unscaled(self.scale),
        }
    }

    pub fn device_region(
        &self,
        region: Region,
    ) -> Region {
        Region {
            pos: self.screen_from_root(region.pos),
            dim: region.dim.scaled(self.scale),
        }
    }

    /// Re-reads the monitor layout, the display scale and the origin
    /// offset, and rebuilds the snap regions.
    pub fn refresh_monitors(&mut self) {
        let native = self.platform.monitors();

        self.scale = std::cmp::max(
            self.config
                .scale
                .unwrap_or_else(|| native.first().map_or(1, |monitor| monitor.scale)),
            1,
        );

        let virtual_screen = self.platform.virtual_screen();
        self.offset = Pos::new(
            -(virtual_screen.pos.x / self.scale),
            -(virtual_screen.pos.y / self.scale),
        );

        let monitors: Vec<Monitor> = native
            .into_iter()
            .map(|mut monitor| {
                monitor.geometry = self.logical_region(monitor.geometry);
                monitor.workarea = self.logical_region(monitor.workarea);
                monitor.scale = self.scale;
                monitor
            })
            .collect();

        let root_region = monitors
            .iter()
            .map(|monitor| monitor.geometry)
            .fold(None, |acc: Option<Region>, geometry| {
                Some(acc.map_or(geometry, |acc| acc.union(geometry)))
            })
            .unwrap_or_default();

        let root = self.registry.root();
        if let Some(data) = self.registry.get_mut(root) {
            data.region = root_region;
        }

        self.snap_regions = SnapRegions::for_monitors(&monitors);
        self.monitors = monitors;

        debug!("monitor layout {:?}, offset {:?}", self.monitors, self.offset);
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    /// The logical virtual screen.
    pub fn virtual_screen(&self) -> Region {
        self.registry
            .get(self.registry.root())
            .map_or(Region::default(), |data| data.region)
    }

    /// Index of the monitor under a logical root position, falling back
    /// to the first monitor.
    pub(crate) fn monitor_index_at(
        &self,
        pos: Pos,
    ) -> usize {
        monitor_at(&self.monitors, pos).unwrap_or(0)
    }

    pub(crate) fn window_at_screen_point(
        &self,
        pt: Pos,
    ) -> Option<Window> {
        self.platform
            .window_from_point(pt)
            .and_then(|hwnd| self.registry.lookup(hwnd))
    }

    pub fn pointer_grab(&self) -> Option<GrabInfo> {
        self.grabs
            .active_at(self.devices.core_pointer, self.serial)
            .filter(|grab| grab.activated)
            .cloned()
    }

    pub fn keyboard_grab(&self) -> Option<GrabInfo> {
        self.grabs
            .active_at(self.devices.core_keyboard, self.serial)
            .filter(|grab| grab.activated)
            .cloned()
    }

    /// The window an event of `mask` aimed at `window` is delivered to:
    /// the first ancestor selecting it, or the grab window when a grab
    /// confines the device.
    pub(crate) fn propagate(
        &self,
        window: Window,
        mask: EventMask,
        grab: Option<&GrabInfo>,
    ) -> Option<Window> {
        if let Some(grab) = grab.filter(|grab| !grab.owner_events) {
            return Some(grab.window).filter(|_| grab.event_mask.intersects(mask));
        }

        let mut current = window;

        loop {
            let data = self.registry.get(current)?;

            if data.event_mask.intersects(mask) {
                return Some(current);
            }

            match self.registry.native_parent(current) {
                Some(parent) => current = parent,
                None => {
                    return grab
                        .filter(|grab| grab.event_mask.intersects(mask))
                        .map(|grab| grab.window)
                },
            }
        }
    }

    pub(crate) fn set_window_under_pointer(
        &mut self,
        device: DeviceId,
        window: Option<Window>,
    ) {
        self.mouse_window = window;

        let toplevel = window.and_then(|window| self.registry.toplevel(window));
        let info = self.pointer.info_mut(&self.devices, device);
        info.window_under_pointer = window;
        info.toplevel_under_pointer = toplevel;
    }

    /// Emits the crossing sequence from `src` to `dest` to the windows
    /// selecting it.
    pub(crate) fn cross(
        &mut self,
        src: Option<Window>,
        dest: Option<Window>,
        mode: CrossingMode,
        device: DeviceId,
        time: u32,
        grab: Option<(Window, bool)>,
    ) {
        let (x_root, y_root) = self.root_point(self.last_pointer);
        let state = modifier_state(self.platform.as_ref());

        let ctx = CrossingContext {
            mode,
            x_root,
            y_root,
            state,
            time,
            device,
            source_device: self.devices.system_pointer,
            seat: self.devices.seat,
            grab,
        };

        let events = synthesize_crossings(&self.registry, src, dest, &ctx, false);

        for event in events {
            let selected = event.window.map_or(false, |window| {
                self.registry
                    .get(window)
                    .map_or(false, |data| data.event_mask.intersects(event.kind.mask()))
            });

            if selected {
                self.emit(event);
            }
        }
    }

    pub fn grab_device(
        &mut self,
        device: DeviceId,
        window: Window,
        ownership: GrabOwnership,
        owner_events: bool,
        event_mask: EventMask,
        cursor: Option<&str>,
        time: u32,
    ) -> GrabStatus {
        let viewable = self.registry.get(window).map_or(false, |data| data.is_viewable());

        if !viewable {
            warn!("unable to grab device {}: window {} is not viewable", device, window);
            return GrabStatus::NotViewable;
        }

        let serial = self.serial;

        if let Some(grab) = self.grabs.active_at(device, serial) {
            if time != 0 && grab.time != 0 && time < grab.time {
                return GrabStatus::InvalidTime;
            }
        }

        if self.grabs.blocks_grab(&self.devices, device, ownership, serial) {
            debug!("grab of device {} refused by a stronger grab", device);
            return GrabStatus::AlreadyGrabbed;
        }

        if !self.devices.is_keyboard(device) {
            if let Some(hwnd) = self.registry.hwnd(window) {
                self.platform.set_capture(hwnd);
            }

            if let Some(cursor) = cursor {
                self.grab_cursor = Some(cursor.to_owned());
                self.platform.set_cursor(Some(cursor));
            }
        }

        let serial = self.next_serial();

        self.grabs.add(GrabInfo {
            window,
            native_window: window,
            device,
            serial_start: serial,
            serial_end: None,
            event_mask,
            time,
            ownership,
            activated: false,
            implicit_ungrab: false,
            owner_events,
            implicit: false,
        });

        info!("device {} grabbed by window {} at serial {}", device, window, serial);

        self.update_grabs(device, serial, time);
        GrabStatus::Success
    }

    pub fn grab_pointer(
        &mut self,
        window: Window,
        owner_events: bool,
        event_mask: EventMask,
        cursor: Option<&str>,
        time: u32,
    ) -> GrabStatus {
        let device = self.devices.core_pointer;
        self.grab_device(
            device,
            window,
            GrabOwnership::None,
            owner_events,
            event_mask,
            cursor,
            time,
        )
    }

    pub fn grab_keyboard(
        &mut self,
        window: Window,
        owner_events: bool,
        time: u32,
    ) -> GrabStatus {
        let device = self.devices.core_keyboard;
        self.grab_device(
            device,
            window,
            GrabOwnership::None,
            owner_events,
            EventMask::all_events(),
            None,
            time,
        )
    }

    /// Pointer and keyboard together; a failed keyboard grab rolls the
    /// pointer grab back.
    pub fn grab_seat(
        &mut self,
        window: Window,
        owner_events: bool,
        cursor: Option<&str>,
        time: u32,
    ) -> GrabStatus {
        let status = self.grab_pointer(window, owner_events, EventMask::all_events(), cursor, time);

        if status != GrabStatus::Success {
            return status;
        }

        let status = self.grab_keyboard(window, owner_events, time);

        if status != GrabStatus::Success {
            self.ungrab_pointer(time);
        }

        status
    }

    /// Ending a grab the device does not hold is a no-op.
    pub fn ungrab_device(
        &mut self,
        device: DeviceId,
        time: u32,
    ) {
        let serial = self.next_serial();

        let grab_window = match self.grabs.active_at(device, serial) {
            Some(grab) => grab.window,
            None => return,
        };

        if !self.devices.is_keyboard(device) {
            for (sequence, _) in self.grabs.touch_grabs_broken_by(device, grab_window) {
                self.grabs.remove_touch_grab(device, sequence);
            }
        }

        let registry = &self.registry;
        self.grabs.end(device, serial, None, false, |ancestor, window| {
            registry.is_ancestor_or_self(ancestor, window)
        });

        info!("device {} ungrabbed at serial {}", device, serial);
        self.update_grabs(device, serial, time);
    }

    pub fn ungrab_pointer(
        &mut self,
        time: u32,
    ) {
        let device = self.devices.core_pointer;
        self.ungrab_device(device, time);
    }

    pub fn ungrab_keyboard(
        &mut self,
        time: u32,
    ) {
        let device = self.devices.core_keyboard;
        self.ungrab_device(device, time);
    }

    pub fn ungrab_seat(
        &mut self,
        time: u32,
    ) {
        self.ungrab_pointer(time);
        self.ungrab_keyboard(time);
    }

    /// The grab a button press starts when nothing holds the pointer.
    pub(crate) fn begin_implicit_grab(
        &mut self,
        window: Window,
        device: DeviceId,
        serial: Serial,
        time: u32,
    ) {
        if self.grabs.active_at(device, serial).is_some() {
            return;
        }

        let event_mask = self
            .registry
            .get(window)
            .map_or(EventMask::empty(), |data| data.event_mask);

        if let Some(hwnd) = self.registry.hwnd(window) {
            self.platform.set_capture(hwnd);
        }

        self.grabs.add(GrabInfo {
            window,
            native_window: window,
            device,
            serial_start: serial,
            serial_end: None,
            event_mask,
            time,
            ownership: GrabOwnership::None,
            activated: false,
            implicit_ungrab: false,
            owner_events: false,
            implicit: true,
        });

        self.update_grabs(device, serial, time);
    }

    pub(crate) fn end_implicit_grab(
        &mut self,
        device: DeviceId,
        serial: Serial,
        time: u32,
    ) {
        let implicit = self
            .grabs
            .active_at(device, serial)
            .map_or(false, |grab| grab.implicit);

        if !implicit {
            return;
        }

        let registry = &self.registry;
        self.grabs.end(device, serial, None, false, |ancestor, window| {
            registry.is_ancestor_or_self(ancestor, window)
        });

        self.update_grabs(device, serial, time);
    }

    /// Applies the grab transitions of `device` up to `serial`.
    pub(crate) fn update_grabs(
        &mut self,
        device: DeviceId,
        serial: Serial,
        time: u32,
    ) {
        let keyboard = self.devices.is_keyboard(device);

        for transition in self.grabs.update(device, serial) {
            match transition {
                GrabTransition::Activated {
                    grab,
                }
                | GrabTransition::Switched {
                    grab: Some(grab),
                    ..
                } => self.grab_activated(&grab, time),
                GrabTransition::BreakTouch {
                    new_window,
                } => {
                    for (sequence, window) in self.grabs.touch_grabs_broken_by(device, new_window) {
                        debug!("touch sequence {} on window {} broken by grab", sequence, window);
                        self.grabs.remove_touch_grab(device, sequence);
                    }
                },
                GrabTransition::Broken {
                    window,
                    implicit,
                    grab_window,
                } => {
                    if self.registry.contains(window) {
                        let event = Event::new(
                            EventKind::GrabBroken {
                                keyboard,
                                implicit,
                                grab_window,
                            },
                            Some(window),
                        )
                        .with_time(time)
                        .with_device(device, device)
                        .with_seat(self.devices.seat);

                        self.emit(event);
                    }
                },
                GrabTransition::Switched {
                    grab: None,
                    last,
                } => self.grab_released(&last, time),
            }
        }
    }

    fn grab_activated(
        &mut self,
        grab: &GrabInfo,
        time: u32,
    ) {
        if self.devices.is_keyboard(grab.device) || grab.implicit {
            return;
        }

        let src = self.mouse_window;

        if src != Some(grab.window) {
            self.cross(src, Some(grab.window), CrossingMode::Grab, grab.device, time, None);
            self.set_window_under_pointer(grab.device, Some(grab.window));
        }
    }

    fn grab_released(
        &mut self,
        last: &GrabInfo,
        time: u32,
    ) {
        if self.devices.is_keyboard(last.device) {
            return;
        }

        self.platform.release_capture();

        if self.grab_cursor.take().is_some() {
            let cursor = self
                .mouse_window
                .and_then(|window| self.registry.get(window))
                .and_then(|data| data.cursor.clone());

            self.platform.set_cursor(cursor.as_deref());
        }

        let pointer_window = self.window_at_screen_point(self.last_pointer);

        if pointer_window != self.mouse_window {
            self.cross(self.mouse_window, pointer_window, CrossingMode::Ungrab, last.device, time, None);
            self.set_window_under_pointer(last.device, pointer_window);
        }

        if let Some(hwnd) = pointer_window.and_then(|window| self.registry.hwnd(window)) {
            self.platform.track_mouse_leave(hwnd);
        }
    }

    pub fn add_touch_grab(
        &mut self,
        device: DeviceId,
        sequence: u32,
        window: Window,
        event_mask: EventMask,
        time: u32,
    ) {
        let serial = self.next_serial();

        self.grabs.add_touch_grab(TouchGrab {
            device,
            sequence,
            window,
            native_window: window,
            serial,
            event_mask,
            time,
        });
    }

    pub fn remove_touch_grab(
        &mut self,
        device: DeviceId,
        sequence: u32,
    ) -> bool {
        self.grabs.remove_touch_grab(device, sequence)
    }

    pub fn find_touch_grab(
        &self,
        device: DeviceId,
        sequence: u32,
    ) -> Option<&TouchGrab> {
        self.grabs.find_touch_grab(device, sequence)
    }

    pub fn has_touch_grab(
        &self,
        device: DeviceId,
        sequence: u32,
    ) -> bool {
        self.grabs.has_touch_grab(device, sequence, self.serial).is_some()
    }

    pub fn is_modal(&self) -> bool {
        !self.modal.is_empty()
    }

    pub(crate) fn begin_modal(
        &mut self,
        operation: ModalOperation,
    ) {
        debug!("entering modal {:?}", operation);
        self.modal.insert(operation);
    }

    pub(crate) fn end_modal(
        &mut self,
        operation: ModalOperation,
    ) {
        if !self.modal.contains(operation) {
            warn!("ending modal {:?} that is not running", operation);
        }

        self.modal.remove(operation);
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    use crate::headless::HeadlessPlatform;
    use crate::registry::WindowAttributes;

    use std::cell::RefCell;
    use std::rc::Rc;

    pub type Events = Rc<RefCell<Vec<Event>>>;

    pub fn headless(config: Config) -> (DisplayCore, HeadlessPlatform, Events) {
        let platform = HeadlessPlatform::new();
        let mut core = DisplayCore::new(Box::new(platform.clone()), config);
        let events: Events = Rc::new(RefCell::new(Vec::new()));

        let sink = events.clone();
        core.set_event_handler(move |_: &mut DisplayCore, event: Event| {
            sink.borrow_mut().push(event);
        });

        (core, platform, events)
    }

    pub fn shown_toplevel(
        core: &mut DisplayCore,
        region: Region,
        event_mask: EventMask,
    ) -> Window {
        let attributes = WindowAttributes::toplevel(region).with_event_mask(event_mask);
        let window = core.create_window(None, &attributes).unwrap();
        core.show(window);
        window
    }

    pub fn shown_child(
        core: &mut DisplayCore,
        parent: Window,
        region: Region,
        event_mask: EventMask,
    ) -> Window {
        let attributes = WindowAttributes::child(region).with_event_mask(event_mask);
        let window = core.create_window(Some(parent), &attributes).unwrap();
        core.show(window);
        window
    }

    pub fn names(events: &Events) -> Vec<(&'static str, Option<Window>)> {
        events
            .borrow()
            .iter()
            .map(|event| (event.name(), event.window))
            .collect()
    }
}
