pub use crate::Result;

use crate::atoms::Format;
use crate::display::DisplayCore;
use crate::display::CLIPBOARD_RETRY_TIMER;
use crate::display::DRAG_ANIMATION_TIMER;
use crate::display::SNAP_INDICATOR_TIMER;
use crate::event::CrossingMode;
use crate::event::Event;
use crate::event::EventFlags;
use crate::event::EventKind;
use crate::event::EventMask;
use crate::event::KeyData;
use crate::event::ScrollDirection;
use crate::event::SettingAction;
use crate::geometry::Dim;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::input::Key;
use crate::input::ModifierType;
use crate::monitor::monitor_for_region;
use crate::queue::FilterReturn;
use crate::win32::keyboard::combo_from_wparam;
use crate::win32::keyboard::combo_to_wparam;
use crate::win32::keyboard::is_modifier_key;
use crate::win32::keyboard::key_for_virtual_key;
use crate::win32::keyboard::modifier_state;
use crate::win32::keyboard::pointer_state;
use crate::win32::keyboard::HookVerdict;
use crate::win32::message::*;
use crate::window::Hwnd;
use crate::window::Window;
use crate::window::WindowEdge;
use crate::window::WindowState;
use crate::window::WindowType;

impl DisplayCore {
    /// Turns one native message into events. `Some` carries the result
    /// for the native loop, `None` leaves the message to the default
    /// window procedure.
    pub(crate) fn translate(
        &mut self,
        msg: &mut NativeMessage,
    ) -> Option<isize> {
        trace!(
            "{} for {:#x}: wparam {:#x}, lparam {:#x}",
            message_name(msg.message),
            msg.hwnd,
            msg.wparam,
            msg.lparam
        );

        let window = self.registry.lookup(msg.hwnd);

        match self.queue.apply_filters(msg, window) {
            FilterReturn::Continue => {},
            FilterReturn::Translate(event) => {
                self.emit(event);
                return Some(0);
            },
            FilterReturn::Remove => return Some(0),
        }

        let time = self.next_tick(msg.time);

        match msg.message {
            WM_INPUTLANGCHANGE => self.input_language_changed(window?, msg, time),
            WM_SYSKEYDOWN | WM_SYSKEYUP | WM_KEYDOWN | WM_KEYUP => {
                self.translate_key(window?, msg, time)
            },
            WM_SYSCHAR if msg.wparam != VK_SPACE as usize => Some(0),
            WM_SYSCHAR => None,
            WM_CHAR => Some(0),
            WM_IME_STARTCOMPOSITION => {
                self.in_ime_composition = true;
                None
            },
            WM_IME_ENDCOMPOSITION => {
                self.in_ime_composition = false;
                None
            },
            WM_LBUTTONDOWN | WM_LBUTTONDBLCLK => self.translate_button(window?, msg, 1, true, time),
            WM_MBUTTONDOWN | WM_MBUTTONDBLCLK => self.translate_button(window?, msg, 2, true, time),
            WM_RBUTTONDOWN | WM_RBUTTONDBLCLK => self.translate_button(window?, msg, 3, true, time),
            WM_LBUTTONUP => self.translate_button(window?, msg, 1, false, time),
            WM_MBUTTONUP => self.translate_button(window?, msg, 2, false, time),
            WM_RBUTTONUP => self.translate_button(window?, msg, 3, false, time),
            WM_XBUTTONDOWN | WM_XBUTTONDBLCLK | WM_XBUTTONUP => {
                let button = if msg.wparam_high() == XBUTTON1 {
                    4
                } else {
                    5
                };

                let press = msg.message != WM_XBUTTONUP;
                self.translate_button(window?, msg, button, press, time)?;
                Some(1)
            },
            WM_MOUSEMOVE => self.translate_motion(window?, msg, time),
            WM_MOUSELEAVE => self.translate_mouse_leave(msg, time),
            WM_MOUSEWHEEL | WM_MOUSEHWHEEL => self.translate_wheel(window?, msg, time),
            WM_MOUSEACTIVATE => self.mouse_activate(window?),
            WM_ACTIVATE => self.activate(window?, msg),
            WM_SETFOCUS => self.focus_change(window?, true, time),
            WM_KILLFOCUS => self.focus_change(window?, false, time),
            WM_NCHITTEST => self.hit_test(window?, msg),
            WM_SETCURSOR => self.cursor_request(window?, msg),
            WM_CAPTURECHANGED => self.capture_changed(window?, msg, time),
            WM_GETMINMAXINFO => self.min_max_info(window?, msg),
            WM_SIZING => self.sizing(window?, msg),
            WM_WINDOWPOSCHANGED => self.window_pos_changed(window?, time),
            WM_PAINT => self.paint(window?, time),
            WM_CLOSE => {
                let event = Event::new(EventKind::Delete, Some(window?)).with_time(time);
                self.emit(event);
                Some(0)
            },
            WM_DESTROY => {
                self.native_destroyed(msg.hwnd, time);
                None
            },
            WM_TIMER => self.timer(msg.wparam, time),
            WM_AEROSNAP => {
                self.aerosnap(window?, combo_from_wparam(msg.wparam), time);
                Some(0)
            },
            WM_DISPLAYCHANGE => {
                self.refresh_monitors();
                None
            },
            WM_SETTINGCHANGE => {
                self.refresh_settings(time);
                None
            },
            WM_DROPFILES => {
                self.drop_files(window?, msg, time);
                Some(0)
            },
            WM_RENDERFORMAT => {
                self.render_format(msg.wparam as Format);
                Some(0)
            },
            WM_RENDERALLFORMATS => {
                self.render_all_formats();
                Some(0)
            },
            WM_DESTROYCLIPBOARD => {
                self.clipboard_destroyed(window?, time);
                Some(0)
            },
            WM_CLIPBOARDUPDATE => {
                self.clipboard_updated(time);
                Some(0)
            },
            _ => None,
        }
    }

    /// Entry point of the low-level keyboard hook. Returns true when the
    /// stroke must not reach the window manager.
    pub fn low_level_key(
        &mut self,
        message: u32,
        virtual_key: u32,
    ) -> bool {
        let focused = self
            .platform
            .foreground_window()
            .and_then(|hwnd| self.registry.lookup(hwnd))
            .and_then(|window| self.registry.toplevel(window))
            .and_then(|window| self.registry.get(window))
            .map(|data| {
                (
                    data.hwnd,
                    data.decorations.map_or(false, |decorations| decorations.is_empty()),
                    data.state.contains(WindowState::MAXIMIZED),
                )
            });

        let (csd, maximized) = focused.map_or((false, false), |(_, csd, maximized)| (csd, maximized));
        let verdict = self
            .snap_hook
            .stroke(self.platform.as_ref(), message, virtual_key, csd, maximized);

        match (verdict, focused) {
            (HookVerdict::Snap(combo), Some((hwnd, ..))) => {
                debug!("posting snap gesture {:?} to {:#x}", combo, hwnd);
                self.platform
                    .post_message(NativeMessage::new(hwnd, WM_AEROSNAP, combo_to_wparam(combo), 0));
                true
            },
            _ => false,
        }
    }

    /// Re-reads the double-click metrics after a settings change.
    pub fn refresh_settings(
        &mut self,
        time: u32,
    ) {
        let (double_click_time, double_click_distance) = self.platform.double_click_metrics();

        if double_click_time == self.config.double_click_time
            && double_click_distance == self.config.double_click_distance
        {
            return;
        }

        self.config.double_click_time = double_click_time;
        self.config.double_click_distance = double_click_distance;

        debug!("double click now {} ms within {} px", double_click_time, double_click_distance);

        let event = Event::new(
            EventKind::Setting {
                action: SettingAction::Changed,
                name: "double-click-time".to_owned(),
            },
            None,
        )
        .with_time(time);

        self.emit(event);
    }

    /// Re-arms hint motion delivery for the core pointer.
    pub fn request_motions(&mut self) {
        let device = self.devices.core_pointer;
        let serial = self.current_serial() + 1;
        self.pointer.enable_motion_hints(device, serial);
    }

    fn input_language_changed(
        &mut self,
        window: Window,
        msg: &NativeMessage,
        time: u32,
    ) -> Option<isize> {
        self.keyboard.layout = msg.lparam as u32;
        debug!("keyboard layout {:#x}", self.keyboard.layout);

        let setting = Event::new(
            EventKind::Setting {
                action: SettingAction::Changed,
                name: "input-language".to_owned(),
            },
            None,
        )
        .with_time(time);

        self.emit(setting);

        let data = KeyData {
            keyval: Some(Key::VoidSymbol),
            virtual_key: 0,
            scan_code: 0,
            state: ModifierType::empty(),
            string: String::new(),
            is_modifier: false,
            group: 0,
        };

        let event = self.keyboard_event(EventKind::KeyPress(data), window, time);
        self.emit(event);

        Some(1)
    }

    fn translate_key(
        &mut self,
        window: Window,
        msg: &NativeMessage,
        time: u32,
    ) -> Option<isize> {
        let virtual_key = msg.wparam as u32;
        let keyboard_grab = self.keyboard_grab();

        match msg.message {
            WM_SYSKEYDOWN | WM_SYSKEYUP => {
                // posted without keyboard focus
                if virtual_key != VK_F10
                    && virtual_key != VK_MENU
                    && msg.key_flags() & KF_ALTDOWN == 0
                {
                    return None;
                }

                // Alt-Tab, Alt-Space and Alt-F4 belong to the system
                // unless the keyboard is grabbed
                if keyboard_grab.is_none()
                    && (virtual_key == VK_TAB || virtual_key == VK_SPACE || virtual_key == VK_F4)
                {
                    return None;
                }
            },
            _ => {
                if virtual_key == VK_PROCESSKEY || self.in_ime_composition {
                    return None;
                }

                if msg.message == WM_KEYDOWN && is_modifier_key(virtual_key) && msg.is_key_repeat() {
                    return None;
                }
            },
        }

        let press = msg.message == WM_KEYDOWN || msg.message == WM_SYSKEYDOWN;
        let mask = if press {
            EventMask::KEY_PRESS
        } else {
            EventMask::KEY_RELEASE
        };

        let target = self.propagate(window, mask, keyboard_grab.as_ref())?;

        let string = if press {
            self.collect_characters(msg.hwnd)
        } else {
            String::new()
        };

        let missing_release = self.keyboard.track_shift(msg);

        let data = self.key_data(msg, string);
        let kind = if press {
            EventKind::KeyPress(data)
        } else {
            EventKind::KeyRelease(data)
        };

        let event = self.keyboard_event(kind, target, time);
        self.emit(event);

        if let Some(release) = missing_release {
            let data = self.key_data(&release, String::new());
            let event = self.keyboard_event(EventKind::KeyRelease(data), target, time);
            self.emit(event);
        }

        Some(0)
    }

    /// Drains the character messages the key press produced.
    fn collect_characters(
        &mut self,
        hwnd: Hwnd,
    ) -> String {
        let mut units = Vec::new();

        while let Some(msg) = self.platform.take_char_message(hwnd) {
            let unit = msg.wparam as u16;

            if unit >= 0x20 && unit != 0x7f {
                units.push(unit);
            }
        }

        String::from_utf16_lossy(&units)
    }

    fn key_data(
        &self,
        msg: &NativeMessage,
        string: String,
    ) -> KeyData {
        let virtual_key = msg.wparam as u32;
        let scan_code = msg.scan_code();
        let mut state = modifier_state(self.platform.as_ref());

        if virtual_key == VK_MENU {
            state.remove(ModifierType::MOD1);
        }

        let keyval = key_for_virtual_key(virtual_key, scan_code, msg.is_extended_key()).or_else(|| {
            let mut chars = string.chars();

            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(Key::Unicode(c)),
                _ => None,
            }
        });

        KeyData {
            keyval,
            virtual_key,
            scan_code,
            state,
            string,
            is_modifier: is_modifier_key(virtual_key),
            group: 0,
        }
    }

    fn translate_button(
        &mut self,
        window: Window,
        msg: &NativeMessage,
        button: u32,
        press: bool,
        time: u32,
    ) -> Option<isize> {
        let device = self.devices.core_pointer;
        self.last_pointer = msg.pt;

        let (x_root, y_root) = self.root_point(msg.pt);
        let state = pointer_state(self.platform.as_ref(), msg.wparam);
        let serial = self.next_serial();

        if press {
            self.begin_implicit_grab(window, device, serial, time);
        }

        let grab = self.pointer_grab();
        let mask = if press {
            EventMask::BUTTON_PRESS
        } else {
            EventMask::BUTTON_RELEASE
        };

        if let Some(target) = self.propagate(window, mask, grab.as_ref()) {
            let origin = self.registry.root_origin(target);
            let x = x_root - origin.x as f64;
            let y = y_root - origin.y as f64;

            let kind = if press {
                let click = self.clicks.press(
                    device,
                    target,
                    button,
                    time,
                    (x_root as i32, y_root as i32),
                    self.config.double_click_time,
                    self.config.double_click_distance,
                );

                EventKind::ButtonPress {
                    button,
                    x,
                    y,
                    x_root,
                    y_root,
                    state,
                    click,
                }
            } else {
                EventKind::ButtonRelease {
                    button,
                    x,
                    y,
                    x_root,
                    y_root,
                    state,
                }
            };

            let event = self.pointer_event(kind, target, time);
            self.emit(event);
        }

        if !press {
            if let Some(moving) = self.moving {
                let drag_button = self
                    .registry
                    .get(moving)
                    .and_then(|data| data.drag.as_ref())
                    .map(|drag| drag.button);

                if drag_button == Some(button) {
                    self.end_move_resize(moving, time);
                }
            }

            let held = state - ModifierType::for_button(button);

            if !held.intersects(ModifierType::buttons()) {
                self.end_implicit_grab(device, serial, time);
            }
        }

        Some(0)
    }

    fn translate_motion(
        &mut self,
        window: Window,
        msg: &NativeMessage,
        time: u32,
    ) -> Option<isize> {
        let device = self.devices.core_pointer;
        self.last_pointer = msg.pt;

        let grab = self.pointer_grab();

        let new_window = match grab.as_ref() {
            Some(grab) => {
                let under = self.window_at_screen_point(msg.pt);

                if !grab.owner_events && under.map_or(false, |under| under != grab.native_window) {
                    None
                } else {
                    under
                }
            },
            None => Some(window),
        };

        if new_window != self.mouse_window {
            let confine = grab.as_ref().map(|grab| (grab.window, grab.owner_events));
            self.cross(self.mouse_window, new_window, CrossingMode::Normal, device, time, confine);
            self.set_window_under_pointer(device, new_window);

            if let Some(hwnd) = new_window.and_then(|window| self.registry.hwnd(window)) {
                self.platform.track_mouse_leave(hwnd);
            }

            self.request_motions();
        }

        let root = self.root_from_screen(msg.pt);

        if self.last_root == Some(root) {
            return Some(0);
        }

        self.last_root = Some(root);

        if let Some(moving) = self.moving {
            self.drag_motion(moving, root, time);
            return Some(0);
        }

        let state = pointer_state(self.platform.as_ref(), msg.wparam);

        let target = match self.propagate(window, EventMask::for_motion(state), grab.as_ref()) {
            Some(target) => target,
            None => return Some(0),
        };

        let serial = self.next_serial();
        let wants_hints = self
            .registry
            .get(target)
            .map_or(false, |data| data.event_mask.contains(EventMask::POINTER_MOTION_HINT));

        let is_hint = wants_hints && self.pointer.consume_motion_hint(device, serial);

        if wants_hints && !is_hint {
            return Some(0);
        }

        let (x_root, y_root) = self.root_point(msg.pt);
        let origin = self.registry.root_origin(target);

        let kind = EventKind::Motion {
            x: x_root - origin.x as f64,
            y: y_root - origin.y as f64,
            x_root,
            y_root,
            state,
            is_hint,
        };

        let event = self.pointer_event(kind, target, time);
        self.emit(event);

        Some(0)
    }

    fn translate_mouse_leave(
        &mut self,
        msg: &NativeMessage,
        time: u32,
    ) -> Option<isize> {
        if self.pointer_grab().is_some() {
            return Some(0);
        }

        let device = self.devices.core_pointer;
        self.last_pointer = msg.pt;

        let under = self.window_at_screen_point(msg.pt);

        if under != self.mouse_window {
            self.cross(self.mouse_window, under, CrossingMode::Normal, device, time, None);
            self.set_window_under_pointer(device, under);
        }

        Some(0)
    }

    /// A smooth scroll followed by its discrete emulation.
    fn translate_wheel(
        &mut self,
        window: Window,
        msg: &NativeMessage,
        time: u32,
    ) -> Option<isize> {
        let screen = msg.lparam_point();
        self.last_pointer = screen;

        let window = self.window_at_screen_point(screen).unwrap_or(window);
        let grab = self.pointer_grab();

        let target = match self.propagate(
            window,
            EventMask::SCROLL | EventMask::SMOOTH_SCROLL,
            grab.as_ref(),
        ) {
            Some(target) => target,
            None => return Some(0),
        };

        let delta = msg.wheel_delta() as f64 / WHEEL_DELTA as f64;
        let horizontal = msg.message == WM_MOUSEHWHEEL;

        let (delta_x, delta_y, direction) = if horizontal {
            let direction = if delta > 0f64 {
                ScrollDirection::Right
            } else {
                ScrollDirection::Left
            };

            (delta, 0f64, direction)
        } else {
            let direction = if delta > 0f64 {
                ScrollDirection::Up
            } else {
                ScrollDirection::Down
            };

            (0f64, -delta, direction)
        };

        let (x_root, y_root) = self.root_point(screen);
        let origin = self.registry.root_origin(target);
        let state = pointer_state(self.platform.as_ref(), msg.wparam);

        let scroll = |direction, delta_x, delta_y| EventKind::Scroll {
            x: x_root - origin.x as f64,
            y: y_root - origin.y as f64,
            x_root,
            y_root,
            state,
            direction,
            delta_x,
            delta_y,
        };

        let smooth = self.pointer_event(scroll(ScrollDirection::Smooth, delta_x, delta_y), target, time);
        self.emit(smooth);

        // a zero delta has no direction to emulate
        if delta != 0f64 {
            let discrete = self
                .pointer_event(scroll(direction, 0f64, 0f64), target, time)
                .with_flags(EventFlags::POINTER_EMULATED);
            self.emit(discrete);
        }

        Some(0)
    }

    fn mouse_activate(
        &self,
        window: Window,
    ) -> Option<isize> {
        let data = self.registry.get(window)?;
        let toplevel = self.registry.toplevel(window).unwrap_or(window);

        if self.registry.is_blocked(toplevel) {
            return Some(MA_NOACTIVATEANDEAT);
        }

        if data.kind == WindowType::Temp || !data.accept_focus {
            return Some(MA_NOACTIVATE);
        }

        None
    }

    fn activate(
        &mut self,
        window: Window,
        msg: &NativeMessage,
    ) -> Option<isize> {
        let activation = msg.wparam_low() as usize;

        if activation == WA_ACTIVE && self.registry.is_blocked(window) {
            let modal = self
                .registry
                .current_modal()
                .and_then(|modal| self.registry.hwnd(modal));

            if let Some(hwnd) = modal {
                debug!("redirecting activation of {} to modal {:#x}", window, hwnd);
                self.platform.set_foreground_window(hwnd);
            }

            return Some(0);
        }

        let mut state = self.registry.get(window)?.state;
        state.set(WindowState::FOCUSED, activation != WA_INACTIVE);
        self.set_window_state(window, state);

        None
    }

    fn focus_change(
        &mut self,
        window: Window,
        focus_in: bool,
        time: u32,
    ) -> Option<isize> {
        if !focus_in {
            if let Some(grab) = self.keyboard_grab() {
                if self.registry.contains(grab.window) {
                    let event = Event::new(
                        EventKind::GrabBroken {
                            keyboard: true,
                            implicit: false,
                            grab_window: None,
                        },
                        Some(grab.window),
                    )
                    .with_time(time)
                    .with_device(self.devices.core_keyboard, self.devices.system_keyboard)
                    .with_seat(self.devices.seat);

                    self.emit(event);
                }
            }
        }

        let selects = self
            .registry
            .get(window)
            .map_or(false, |data| data.event_mask.contains(EventMask::FOCUS_CHANGE));

        if selects {
            let event = self.keyboard_event(
                EventKind::FocusChange {
                    focus_in,
                },
                window,
                time,
            );

            self.emit(event);
        }

        Some(0)
    }

    fn hit_test(
        &self,
        window: Window,
        msg: &NativeMessage,
    ) -> Option<isize> {
        let shape = self.registry.get(window)?.input_shape.as_ref()?;
        let root = self.root_from_screen(msg.lparam_point());
        let local = root.relative_to(self.registry.root_origin(window));

        if shape.iter().any(|region| region.contains_point(local)) {
            None
        } else {
            Some(HTNOWHERE)
        }
    }

    fn cursor_request(
        &mut self,
        window: Window,
        msg: &NativeMessage,
    ) -> Option<isize> {
        if msg.lparam_low() as isize != HTCLIENT {
            return None;
        }

        let grab_cursor = self.grab_cursor.clone().filter(|_| self.pointer_grab().is_some());
        let cursor = grab_cursor.or_else(|| self.registry.get(window).and_then(|data| data.cursor.clone()))?;

        self.platform.set_cursor(Some(cursor.as_str()));
        Some(1)
    }

    /// Capture taken by another window breaks the pointer grab of this
    /// one, and any move or resize it drives.
    fn capture_changed(
        &mut self,
        window: Window,
        msg: &NativeMessage,
        time: u32,
    ) -> Option<isize> {
        let new_capture = msg.lparam as Hwnd;

        if new_capture == msg.hwnd {
            return Some(0);
        }

        if self.moving == Some(window) {
            self.end_move_resize(window, time);
        }

        let device = self.devices.core_pointer;
        let grabbed_here = self
            .pointer_grab()
            .map_or(false, |grab| grab.native_window == window);

        if grabbed_here {
            debug!("capture of {} lost to {:#x}", window, new_capture);

            let serial = self.next_serial();
            let registry = &self.registry;
            self.grabs.end(device, serial, None, true, |ancestor, grabbed| {
                registry.is_ancestor_or_self(ancestor, grabbed)
            });

            self.update_grabs(device, serial, time);
        }

        Some(0)
    }

    fn min_max_info(
        &mut self,
        window: Window,
        msg: &mut NativeMessage,
    ) -> Option<isize> {
        let data = self.registry.get(window).filter(|data| data.is_toplevel())?;
        let (hints, margins, region) = (data.hints, data.margins, data.region);
        let scale = self.scale;

        let mut info = match &msg.payload {
            Payload::MinMaxInfo(info) => *info,
            _ => MinMaxInfo::default(),
        };

        if !hints.is_empty() {
            let min = hints.min();
            let max = hints.max();

            info.min_track_size =
                Dim::new(min.w + margins.horizontal(), min.h + margins.vertical()).scaled(scale);

            if hints.max_width.is_some() {
                info.max_track_size.w = (max.w + margins.horizontal()) * scale;
            }

            if hints.max_height.is_some() {
                info.max_track_size.h = (max.h + margins.vertical()) * scale;
            }
        }

        if let Some(index) = monitor_for_region(&self.monitors, region) {
            let monitor = &self.monitors[index];
            let offset = monitor.workarea.pos.relative_to(monitor.geometry.pos);

            info.max_position = Pos::new(offset.x - margins.left, offset.y - margins.top).scaled(scale);
            info.max_size = Dim::new(
                monitor.workarea.dim.w + margins.horizontal(),
                monitor.workarea.dim.h + margins.vertical(),
            )
            .scaled(scale);
        }

        msg.payload = Payload::MinMaxInfo(info);
        Some(0)
    }

    /// Keeps a native frame drag on the size increment and aspect grid,
    /// holding the edges opposite the dragged one.
    fn sizing(
        &mut self,
        window: Window,
        msg: &mut NativeMessage,
    ) -> Option<isize> {
        let rect = match msg.payload {
            Payload::Rect(rect) => rect,
            _ => return None,
        };

        let data = self.registry.get(window)?;

        if data.hints.is_empty() {
            return None;
        }

        let edge = match msg.wparam {
            WMSZ_LEFT => WindowEdge::West,
            WMSZ_RIGHT => WindowEdge::East,
            WMSZ_TOP => WindowEdge::North,
            WMSZ_TOPLEFT => WindowEdge::NorthWest,
            WMSZ_TOPRIGHT => WindowEdge::NorthEast,
            WMSZ_BOTTOM => WindowEdge::South,
            WMSZ_BOTTOMLEFT => WindowEdge::SouthWest,
            _ => WindowEdge::SouthEast,
        };

        let (hints, margins) = (data.hints, data.margins);
        let scale = self.scale;

        let logical = rect.dim.unscaled(scale);
        let requested = Dim::new(logical.w - margins.horizontal(), logical.h - margins.vertical());
        let constrained = hints.constrain(requested);

        let dim = Dim::new(
            constrained.w + margins.horizontal(),
            constrained.h + margins.vertical(),
        )
        .scaled(scale);

        let x = if edge.moves_left() {
            rect.right() - dim.w
        } else {
            rect.pos.x
        };

        let y = if edge.moves_top() {
            rect.bottom() - dim.h
        } else {
            rect.pos.y
        };

        msg.payload = Payload::Rect(Region::new(x, y, dim.w, dim.h));
        Some(1)
    }

    fn window_pos_changed(
        &mut self,
        window: Window,
        time: u32,
    ) -> Option<isize> {
        let (hwnd, toplevel, old_region, old_state, selects, scale) = {
            let data = self.registry.get(window)?;
            (
                data.hwnd,
                data.is_toplevel(),
                data.region,
                data.state,
                data.event_mask.contains(EventMask::STRUCTURE),
                data.scale,
            )
        };

        let rect = match self.platform.window_rect(hwnd) {
            Some(rect) => rect,
            None => {
                debug!("dropping configure of {}: no geometry", window);
                return None;
            },
        };

        let region = if toplevel {
            self.logical_region(rect)
        } else {
            let parent = self
                .registry
                .native_parent(window)
                .and_then(|parent| self.registry.hwnd(parent))
                .and_then(|parent| self.platform.window_rect(parent))?;

            Region {
                pos: rect.pos.relative_to(parent.pos).unscaled(scale),
                dim: rect.dim.unscaled(scale),
            }
        };

        if region != old_region {
            if let Some(data) = self.registry.get_mut(window) {
                data.region = region;
            }
        }

        // the region may already be current when the move came from us
        if selects {
            let event = Event::new(
                EventKind::Configure {
                    region,
                },
                Some(window),
            )
            .with_time(time);

            self.emit(event);
        }

        if toplevel {
            let mut state = old_state;
            state.set(WindowState::ICONIFIED, self.platform.is_iconic(hwnd));
            state.set(WindowState::MAXIMIZED, self.platform.is_zoomed(hwnd));
            state.set(WindowState::WITHDRAWN, !self.platform.is_visible(hwnd));

            // fullscreen raises natively without asking to stay above
            if !state.contains(WindowState::FULLSCREEN) {
                state.set(WindowState::ABOVE, self.platform.is_topmost(hwnd));
            }

            self.set_window_state(window, state);
        }

        None
    }

    fn paint(
        &mut self,
        window: Window,
        time: u32,
    ) -> Option<isize> {
        let (hwnd, scale, selects) = {
            let data = self.registry.get(window)?;
            (data.hwnd, data.scale, data.event_mask.contains(EventMask::EXPOSURE))
        };

        let area = match self.platform.take_update_region(hwnd) {
            Some(area) if !area.is_empty() => area.unscaled(scale),
            _ => return Some(0),
        };

        if selects {
            let event = Event::new(
                EventKind::Expose {
                    area,
                    count: 0,
                },
                Some(window),
            )
            .with_time(time);

            self.emit(event);
        }

        Some(0)
    }

    fn timer(
        &mut self,
        id: usize,
        time: u32,
    ) -> Option<isize> {
        match id {
            SNAP_INDICATOR_TIMER => self.indicator_tick(),
            DRAG_ANIMATION_TIMER => self.drag_animation_tick(),
            CLIPBOARD_RETRY_TIMER => self.clipboard_retry_tick(time),
            _ => return None,
        }

        Some(0)
    }
}
