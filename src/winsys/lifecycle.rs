pub use crate::Result;

use crate::display::DisplayCore;
use crate::event::CrossingData;
use crate::event::CrossingMode;
use crate::event::Event;
use crate::event::EventKind;
use crate::event::EventMask;
use crate::event::NotifyDetail;
use crate::geometry::Dim;
use crate::geometry::Padding;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::hints::GeometryHints;
use crate::indicator::Surface;
use crate::monitor::monitor_for_region;
use crate::platform::NativeWindowAttributes;
use crate::platform::ShowCommand;
use crate::platform::StackMode;
use crate::registry::WindowAttributes;
use crate::win32::keyboard::modifier_state;
use crate::window::Decorations;
use crate::window::Functions;
use crate::window::Hwnd;
use crate::window::TypeHint;
use crate::window::Window;
use crate::window::WindowState;
use crate::window::WindowType;

use anyhow::anyhow;

/// Nominal edge of the large and small window icons, in logical pixels.
const BIG_ICON_SIZE: i32 = 32;
const SMALL_ICON_SIZE: i32 = 16;
const LAYERED_OPACITY: f64 = 1f64;

impl DisplayCore {
    /// Creates a window and its native counterpart. Toplevels are placed
    /// in root coordinates, children relative to their parent.
    pub fn create_window(
        &mut self,
        parent: Option<Window>,
        attributes: &WindowAttributes,
    ) -> Result<Window> {
        let root = self.registry.root();
        let parent = parent.unwrap_or(root);

        if !self.registry.contains(parent) {
            return Err(anyhow!("unable to create window: parent {} does not exist", parent));
        }

        let mut attributes = attributes.clone();

        if parent == root && attributes.kind == WindowType::Child {
            attributes.kind = WindowType::Toplevel;
        } else if parent != root {
            attributes.kind = WindowType::Child;
        }

        let scale = if parent == root {
            self.scale
        } else {
            self.registry.scale(parent)
        };

        let native_region = if parent == root {
            self.device_region(attributes.region)
        } else {
            attributes.region.scaled(scale)
        };

        let hwnd = self.platform.create_native_window(NativeWindowAttributes {
            parent: self.registry.hwnd(parent).filter(|_| parent != root),
            region: native_region,
            kind: attributes.kind,
            layered: attributes.type_hint == TypeHint::Dnd,
            topmost: attributes.type_hint == TypeHint::Tooltip || attributes.type_hint == TypeHint::Dnd,
        })?;

        let window = self.registry.insert(Some(parent), hwnd, &attributes, scale);

        info!(
            "created {:?} window {} ({:#x}) under {} at {:?}",
            attributes.kind, window, hwnd, parent, attributes.region
        );

        Ok(window)
    }

    /// Registers a native window created outside the toolkit.
    pub fn adopt_native_window(
        &mut self,
        hwnd: Hwnd,
    ) -> Option<Window> {
        if let Some(window) = self.registry.lookup(hwnd) {
            return Some(window);
        }

        let region = self.logical_region(self.platform.window_rect(hwnd)?);
        let attributes = WindowAttributes {
            kind: WindowType::Foreign,
            region,
            ..WindowAttributes::default()
        };

        let root = self.registry.root();
        let window = self.registry.insert(Some(root), hwnd, &attributes, self.scale);

        if self.platform.is_visible(hwnd) {
            if let Some(data) = self.registry.get_mut(window) {
                data.mapped = true;
                data.state.remove(WindowState::WITHDRAWN);
            }
        }

        debug!("adopted foreign window {:#x} as {}", hwnd, window);
        Some(window)
    }

    /// Destroys `window`, its children and their native handles. No
    /// `destroy` event is generated for an explicit destruction.
    pub fn destroy(
        &mut self,
        window: Window,
    ) {
        let hwnd = match self.registry.hwnd(window) {
            Some(hwnd) if window != self.registry.root() => hwnd,
            _ => return,
        };

        let time = self.next_tick(0);
        self.tear_down(window, time);

        let mut subtree = self.registry.descendants(window);
        subtree.push(window);

        for target in subtree {
            let registered = self.registry.get(target).filter(|data| data.drop_target);

            if let Some(data) = registered {
                if self.config.use_ole2_dnd {
                    self.platform.revoke_drop_target(data.hwnd);
                } else {
                    self.platform.accept_files(data.hwnd, false);
                }
            }
        }

        for (removed, _) in self.registry.remove(window) {
            self.forget_window(removed);
        }

        self.platform.destroy_native_window(hwnd);
        info!("destroyed window {}", window);
    }

    /// The platform destroyed a native window we still know about.
    pub(crate) fn native_destroyed(
        &mut self,
        hwnd: Hwnd,
        time: u32,
    ) {
        let window = match self.registry.lookup(hwnd) {
            Some(window) if window != self.registry.root() => window,
            _ => return,
        };

        self.tear_down(window, time);

        for (removed, _) in self.registry.remove(window) {
            self.forget_window(removed);
            self.emit(Event::new(EventKind::Destroy, Some(removed)).with_time(time));
        }

        info!("window {} destroyed by the platform", window);
    }

    /// Ends grabs on the subtree of `window` and lets the pointer leave it.
    fn tear_down(
        &mut self,
        window: Window,
        time: u32,
    ) {
        let serial = self.next_serial();

        for device in self.grabs.devices() {
            let registry = &self.registry;
            self.grabs.end(device, serial, Some(window), true, |ancestor, grabbed| {
                registry.is_ancestor_or_self(ancestor, grabbed)
            });

            self.update_grabs(device, serial, time);
        }

        let inside = self
            .mouse_window
            .map_or(false, |mouse| self.registry.is_ancestor_or_self(window, mouse));

        if !inside {
            return;
        }

        if let Some(mouse) = self.mouse_window {
            let selects = self
                .registry
                .get(mouse)
                .map_or(false, |data| data.event_mask.contains(EventMask::LEAVE_NOTIFY));

            if selects {
                let (x_root, y_root) = self.root_point(self.last_pointer);
                let origin = self.registry.root_origin(mouse);

                let data = CrossingData {
                    x: x_root - origin.x as f64,
                    y: y_root - origin.y as f64,
                    x_root,
                    y_root,
                    mode: CrossingMode::Normal,
                    detail: NotifyDetail::Unknown,
                    subwindow: None,
                    state: modifier_state(self.platform.as_ref()),
                    focus: false,
                };

                let event = self.pointer_event(EventKind::Leave(data), mouse, time);
                self.emit(event);
            }
        }

        let device = self.devices.core_pointer;
        self.set_window_under_pointer(device, None);
    }

    /// Drops every reference the core holds to a window that is gone.
    pub(crate) fn forget_window(
        &mut self,
        window: Window,
    ) {
        self.grabs.forget_window(window);
        self.pointer.forget_window(window);
        self.queue.remove_window_filters(window);
        self.clicks.forget_window(window);
        self.selection.forget_window(window);

        for context in self.dnd.forget_window(window) {
            debug!("drag context {} dropped with window {}", context, window);
        }

        if self.mouse_window == Some(window) {
            self.mouse_window = None;
        }

        if self.moving == Some(window) {
            self.moving = None;
        }
    }

    pub fn show(
        &mut self,
        window: Window,
    ) {
        self.show_with(window, true);
    }

    pub fn show_unraised(
        &mut self,
        window: Window,
    ) {
        self.show_with(window, false);
    }

    fn show_with(
        &mut self,
        window: Window,
        activate: bool,
    ) {
        let (hwnd, command, toplevel, emit_map) = match self.registry.get_mut(window) {
            Some(data) => {
                let was_mapped = data.mapped;
                data.mapped = true;
                data.state.remove(WindowState::WITHDRAWN);

                let command = if data.state.contains(WindowState::ICONIFIED) {
                    ShowCommand::Minimize
                } else if data.state.contains(WindowState::MAXIMIZED) {
                    ShowCommand::Maximize
                } else if !activate
                    || !data.focus_on_map
                    || !data.accept_focus
                    || data.kind == WindowType::Temp
                {
                    ShowCommand::ShowNoActivate
                } else {
                    ShowCommand::Show
                };

                (
                    data.hwnd,
                    command,
                    data.is_toplevel(),
                    !was_mapped && data.event_mask.contains(EventMask::STRUCTURE),
                )
            },
            None => return,
        };

        self.platform.show_window(hwnd, command);

        if toplevel {
            for (transient, command) in self.registry.show_transients(window) {
                self.platform.show_window(transient, command);
            }

            if self.registry.get(window).map_or(false, |data| data.modal_hint) {
                self.push_modal(window);
            }
        }

        if emit_map {
            let time = self.next_tick(0);
            self.emit(Event::new(EventKind::Map, Some(window)).with_time(time));
        }
    }

    pub fn hide(
        &mut self,
        window: Window,
    ) {
        let (hwnd, toplevel, emit_unmap) = match self.registry.get_mut(window) {
            Some(data) if data.mapped => {
                data.mapped = false;
                data.state.insert(WindowState::WITHDRAWN);

                (
                    data.hwnd,
                    data.is_toplevel(),
                    data.event_mask.contains(EventMask::STRUCTURE),
                )
            },
            _ => return,
        };

        let time = self.next_tick(0);
        let serial = self.next_serial();

        for device in [self.devices.core_pointer, self.devices.core_keyboard].iter().copied() {
            let registry = &self.registry;
            self.grabs.end(device, serial, Some(window), true, |ancestor, grabbed| {
                registry.is_ancestor_or_self(ancestor, grabbed)
            });

            self.update_grabs(device, serial, time);
        }

        if toplevel {
            for (transient, command) in self.registry.hide_transients(window) {
                self.platform.show_window(transient, command);
            }

            if self.registry.remove_modal(window) {
                debug!("modal {} hidden", window);
            }
        }

        self.platform.show_window(hwnd, ShowCommand::Hide);

        if emit_unmap {
            self.emit(Event::new(EventKind::Unmap, Some(window)).with_time(time));
        }
    }

    /// The native rectangle of `window` for a logical `region`.
    pub(crate) fn native_region(
        &self,
        window: Window,
        region: Region,
    ) -> Region {
        match self.registry.get(window) {
            Some(data) if data.is_toplevel() => self.device_region(region),
            Some(data) => region.scaled(data.scale),
            None => region,
        }
    }

    pub fn move_resize(
        &mut self,
        window: Window,
        region: Region,
    ) {
        let region = Region {
            pos: region.pos,
            dim: Dim::new(std::cmp::max(region.dim.w, 1), std::cmp::max(region.dim.h, 1)),
        };

        let hwnd = match self.registry.get_mut(window) {
            Some(data) => {
                data.region = region;
                data.hwnd
            },
            None => return,
        };

        let native = self.native_region(window, region);

        // A layered window keeps its contents while only its position
        // changes; any other change needs a new surface.
        let cached = self
            .registry
            .get(window)
            .filter(|data| data.layered)
            .and_then(|data| data.surface.as_ref())
            .filter(|surface| {
                surface.width() as i32 == native.dim.w && surface.height() as i32 == native.dim.h
            });

        if let Some(surface) = cached {
            match self.platform.update_layered_window(hwnd, native, surface, LAYERED_OPACITY) {
                Ok(()) => return,
                Err(err) => warn!("unable to reposition layered window {}: {}", window, err),
            }
        }

        if let Err(err) = self.platform.set_window_pos(hwnd, native) {
            warn!("unable to move window {}: {}", window, err);
        }
    }

    /// Presents `surface` as the contents of a layered window and keeps
    /// it for later moves. Returns whether the platform took it.
    pub fn present_layered(
        &mut self,
        window: Window,
        surface: Surface,
    ) -> bool {
        let (hwnd, region) = match self.registry.get(window) {
            Some(data) if data.layered => (data.hwnd, data.region),
            _ => return false,
        };

        let native = self.native_region(window, region);
        let native = Region {
            pos: native.pos,
            dim: Dim::new(surface.width() as i32, surface.height() as i32),
        };

        if let Err(err) = self.platform.update_layered_window(hwnd, native, &surface, LAYERED_OPACITY) {
            warn!("unable to present layered window {}: {}", window, err);
            return false;
        }

        if let Some(data) = self.registry.get_mut(window) {
            data.surface = Some(surface);
        }

        true
    }

    pub fn move_to(
        &mut self,
        window: Window,
        pos: Pos,
    ) {
        if let Some(dim) = self.registry.get(window).map(|data| data.region.dim) {
            self.move_resize(window, Region {
                pos,
                dim,
            });
        }
    }

    pub fn resize(
        &mut self,
        window: Window,
        dim: Dim,
    ) {
        if let Some(pos) = self.registry.get(window).map(|data| data.region.pos) {
            self.move_resize(window, Region {
                pos,
                dim,
            });
        }
    }

    pub fn reparent(
        &mut self,
        window: Window,
        parent: Window,
        pos: Pos,
    ) -> bool {
        if !self.registry.reparent(window, parent) {
            warn!("unable to reparent window {} under {}", window, parent);
            return false;
        }

        let root = self.registry.root();
        let hwnd = self.registry.hwnd(window);
        let parent_hwnd = self.registry.hwnd(parent).filter(|_| parent != root);

        if let Some(hwnd) = hwnd {
            self.platform.set_parent(hwnd, parent_hwnd);
        }

        self.move_to(window, pos);
        true
    }

    pub fn raise(
        &mut self,
        window: Window,
    ) {
        if let Some(hwnd) = self.registry.hwnd(window) {
            self.platform.restack_window(hwnd, StackMode::Raise);
        }
    }

    pub fn lower(
        &mut self,
        window: Window,
    ) {
        if let Some(hwnd) = self.registry.hwnd(window) {
            self.platform.restack_window(hwnd, StackMode::Lower);
        }
    }

    /// Replaces the state bits of `window` and reports the difference.
    pub(crate) fn set_window_state(
        &mut self,
        window: Window,
        new: WindowState,
    ) {
        let (old, selects) = match self.registry.get_mut(window) {
            Some(data) => {
                let old = data.state;
                data.state = new;
                (old, data.event_mask.contains(EventMask::STRUCTURE))
            },
            None => return,
        };

        if old == new {
            return;
        }

        if new.contains(WindowState::WITHDRAWN) != old.contains(WindowState::WITHDRAWN) {
            if let Some(data) = self.registry.get_mut(window) {
                data.mapped = !new.contains(WindowState::WITHDRAWN);
            }
        }

        debug!("window {} state {:?} -> {:?}", window, old, new);

        if selects {
            let time = self.next_tick(0);
            self.emit(
                Event::new(
                    EventKind::WindowState {
                        changed: old ^ new,
                        new,
                    },
                    Some(window),
                )
                .with_time(time),
            );
        }
    }

    fn change_state<F>(
        &mut self,
        window: Window,
        command: ShowCommand,
        change: F,
    ) where
        F: FnOnce(&mut WindowState),
    {
        let (hwnd, mapped, mut state) = match self.registry.get(window) {
            Some(data) if data.is_toplevel() => (data.hwnd, data.mapped, data.state),
            _ => return,
        };

        change(&mut state);

        if mapped {
            self.platform.show_window(hwnd, command);
        }

        self.set_window_state(window, state);
    }

    pub fn iconify(
        &mut self,
        window: Window,
    ) {
        self.change_state(window, ShowCommand::Minimize, |state| {
            state.insert(WindowState::ICONIFIED)
        });
    }

    pub fn deiconify(
        &mut self,
        window: Window,
    ) {
        let maximized = self
            .registry
            .get(window)
            .map_or(false, |data| data.state.contains(WindowState::MAXIMIZED));

        let command = if maximized {
            ShowCommand::Maximize
        } else {
            ShowCommand::Restore
        };

        self.change_state(window, command, |state| state.remove(WindowState::ICONIFIED));
    }

    pub fn maximize(
        &mut self,
        window: Window,
    ) {
        self.change_state(window, ShowCommand::Maximize, |state| {
            state.insert(WindowState::MAXIMIZED)
        });
    }

    pub fn unmaximize(
        &mut self,
        window: Window,
    ) {
        self.change_state(window, ShowCommand::Restore, |state| {
            state.remove(WindowState::MAXIMIZED)
        });
    }

    /// Covers the monitor the window is mostly on, above other windows.
    pub fn fullscreen(
        &mut self,
        window: Window,
    ) {
        let (hwnd, region, state) = match self.registry.get(window) {
            Some(data) if data.is_toplevel() && !data.state.contains(WindowState::FULLSCREEN) => {
                (data.hwnd, data.region, data.state)
            },
            _ => return,
        };

        let mut monitor = match monitor_for_region(&self.monitors, region) {
            Some(index) => self.monitors[index].geometry,
            None => return,
        };

        // The bordered window hangs one pixel past every monitor edge so
        // its border stays out of sight.
        if self.config.gl_fullscreen_workaround {
            debug!("fullscreen workaround enabled for window {}", window);
            monitor = monitor.inset(-1);
        }

        if let Some(data) = self.registry.get_mut(window) {
            data.pre_fullscreen = Some(region);
        }

        self.platform.restack_window(hwnd, StackMode::Topmost);
        self.move_resize(window, monitor);
        self.set_window_state(window, state | WindowState::FULLSCREEN);
    }

    pub fn unfullscreen(
        &mut self,
        window: Window,
    ) {
        let (hwnd, restore, state) = match self.registry.get_mut(window) {
            Some(data) if data.state.contains(WindowState::FULLSCREEN) => {
                (data.hwnd, data.pre_fullscreen.take(), data.state)
            },
            _ => return,
        };

        let above = state.contains(WindowState::ABOVE);

        if !above {
            self.platform.restack_window(hwnd, StackMode::NoTopmost);
        }

        if let Some(restore) = restore {
            self.move_resize(window, restore);
        }

        self.set_window_state(window, state - WindowState::FULLSCREEN);
    }

    pub fn set_keep_above(
        &mut self,
        window: Window,
        above: bool,
    ) {
        let (hwnd, state) = match self.registry.get(window) {
            Some(data) if data.is_toplevel() => (data.hwnd, data.state),
            _ => return,
        };

        self.platform.restack_window(
            hwnd,
            if above {
                StackMode::Topmost
            } else {
                StackMode::NoTopmost
            },
        );

        let mut new = state;
        new.set(WindowState::ABOVE, above);
        self.set_window_state(window, new);
    }

    pub fn set_transient_for(
        &mut self,
        window: Window,
        owner: Option<Window>,
    ) {
        self.registry.set_transient_for(window, owner);
    }

    pub fn push_modal(
        &mut self,
        window: Window,
    ) {
        if self.registry.contains(window) {
            self.registry.push_modal(window);
        }
    }

    pub fn remove_modal(
        &mut self,
        window: Window,
    ) {
        if !self.registry.remove_modal(window) {
            warn!("window {} is not on the modal stack", window);
        }
    }

    pub fn set_modal_hint(
        &mut self,
        window: Window,
        modal: bool,
    ) {
        let mapped = match self.registry.get_mut(window) {
            Some(data) if data.modal_hint != modal => {
                data.modal_hint = modal;
                data.mapped
            },
            _ => return,
        };

        if modal && mapped {
            self.push_modal(window);
        } else if !modal {
            self.registry.remove_modal(window);
        }
    }

    pub fn set_geometry_hints(
        &mut self,
        window: Window,
        hints: GeometryHints,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.hints = hints;
        }
    }

    pub fn set_type_hint(
        &mut self,
        window: Window,
        type_hint: TypeHint,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.type_hint = type_hint;
        }
    }

    pub fn set_decorations(
        &mut self,
        window: Window,
        decorations: Option<Decorations>,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.decorations = decorations;
        }
    }

    pub fn set_functions(
        &mut self,
        window: Window,
        functions: Option<Functions>,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.functions = functions;
        }
    }

    pub fn set_accept_focus(
        &mut self,
        window: Window,
        accept_focus: bool,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.accept_focus = accept_focus;
        }
    }

    pub fn set_event_mask(
        &mut self,
        window: Window,
        event_mask: EventMask,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.event_mask = event_mask;
        }
    }

    /// CSD shadow extents. A toplevel with margins is presented as a
    /// layered window when layering is enabled.
    pub fn set_shadow_margins(
        &mut self,
        window: Window,
        margins: Padding,
    ) {
        let layered = self.config.layered;

        if let Some(data) = self.registry.get_mut(window) {
            if !data.is_toplevel() {
                return;
            }

            data.margins = margins;
            data.layered = layered && margins != Padding::default();

            if !data.layered {
                data.surface = None;
            }
        }
    }

    pub fn set_input_shape(
        &mut self,
        window: Window,
        shape: Option<Vec<Region>>,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.input_shape = shape;
        }
    }

    pub fn set_opaque_shape(
        &mut self,
        window: Window,
        shape: Option<Vec<Region>>,
    ) {
        if let Some(data) = self.registry.get_mut(window) {
            data.opaque_shape = shape;
        }
    }

    pub fn set_cursor(
        &mut self,
        window: Window,
        cursor: Option<&str>,
    ) {
        match self.registry.get_mut(window) {
            Some(data) => data.cursor = cursor.map(str::to_owned),
            None => return,
        }

        if self.grab_cursor.is_none() && self.mouse_window == Some(window) {
            self.platform.set_cursor(cursor);
        }
    }

    /// Stores the icon sizes and picks the ones closest to the large and
    /// small icon sizes at the window scale. Returns their indices.
    pub fn set_icon_list(
        &mut self,
        window: Window,
        icons: &[(i32, i32)],
    ) -> Option<(usize, usize)> {
        let data = self.registry.get_mut(window)?;
        data.icons = icons.to_vec();

        let scale = data.scale;
        let closest = |size: i32| {
            icons
                .iter()
                .enumerate()
                .min_by_key(|(_, &(w, h))| (w - size).abs() + (h - size).abs())
                .map(|(index, _)| index)
        };

        Some((closest(BIG_ICON_SIZE * scale)?, closest(SMALL_ICON_SIZE * scale)?))
    }

    /// Gives keyboard focus to the toplevel of `window`.
    pub fn focus(
        &mut self,
        window: Window,
    ) -> bool {
        let toplevel = match self.registry.toplevel(window) {
            Some(toplevel) => toplevel,
            None => return false,
        };

        let hwnd = match self.registry.get(toplevel) {
            Some(data) if data.mapped && data.accept_focus => data.hwnd,
            _ => return false,
        };

        if !self.platform.set_foreground_window(hwnd) {
            debug!("foreground refused for window {}", toplevel);
            return false;
        }

        self.platform.set_focus(hwnd);
        true
    }

    /// Makes `window` a drop destination: an OLE2 drop target when that
    /// protocol is enabled, otherwise a file-drop acceptor.
    pub fn register_dnd(
        &mut self,
        window: Window,
    ) {
        let hwnd = match self.registry.get_mut(window) {
            Some(data) if !data.drop_target => {
                data.drop_target = true;
                data.hwnd
            },
            _ => return,
        };

        if self.config.use_ole2_dnd {
            if !self.platform.register_drop_target(hwnd) {
                warn!("unable to register window {} as a drop target", window);
            }
        } else {
            self.platform.accept_files(hwnd, true);
        }

        debug!("window {} accepts drops", window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::config::Config;
    use crate::display::testing::*;
    use crate::event::EventMask;

    #[test]
    fn children_are_placed_relative_to_their_parent() {
        let config = Config {
            scale: Some(2),
            ..Config::default()
        };
        let (mut core, platform, _) = headless(config);

        let top = shown_toplevel(&mut core, Region::new(100, 100, 200, 100), EventMask::empty());
        let child = shown_child(&mut core, top, Region::new(10, 10, 20, 20), EventMask::empty());

        let top_hwnd = core.registry().hwnd(top).unwrap();
        let child_hwnd = core.registry().hwnd(child).unwrap();
        let state = platform.state();

        assert_eq!(state.windows[&top_hwnd].region, Region::new(200, 200, 400, 200));
        assert_eq!(state.windows[&child_hwnd].region, Region::new(20, 20, 40, 40));
        assert_eq!(state.windows[&child_hwnd].parent, Some(top_hwnd));
        drop(state);

        assert_eq!(core.registry().scale(child), 2);
    }

    #[test]
    fn creating_under_a_missing_parent_fails() {
        let (mut core, _, _) = headless(Config::default());

        assert!(core.create_window(Some(99), &WindowAttributes::default()).is_err());
    }

    #[test]
    fn native_destruction_fires_destroy_once() {
        let (mut core, _, events) = headless(Config::default());
        let top = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let child = shown_child(&mut core, top, Region::new(0, 0, 10, 10), EventMask::empty());
        let hwnd = core.registry().hwnd(top).unwrap();

        core.native_destroyed(hwnd, 5);
        core.native_destroyed(hwnd, 6);
        core.dispatch_pending();

        assert_eq!(names(&events), vec![("destroy", Some(child)), ("destroy", Some(top))]);
        assert!(!core.registry().contains(top));
    }

    #[test]
    fn destroying_the_window_under_the_pointer_leaves_it() {
        let (mut core, platform, events) = headless(Config::default());
        let top = shown_toplevel(
            &mut core,
            Region::new(0, 0, 100, 100),
            EventMask::ENTER_NOTIFY | EventMask::LEAVE_NOTIFY,
        );

        let hwnd = core.registry().hwnd(top).unwrap();
        let device = core.devices().core_pointer;
        core.set_window_under_pointer(device, Some(top));
        core.grab_pointer(top, false, EventMask::all_events(), None, 0);
        core.dispatch_pending();
        events.borrow_mut().clear();

        core.destroy(top);
        core.dispatch_pending();

        let leaves: Vec<NotifyDetail> = events
            .borrow()
            .iter()
            .filter_map(|event| match &event.kind {
                EventKind::Leave(data) => Some(data.detail),
                _ => None,
            })
            .collect();

        assert_eq!(leaves, vec![NotifyDetail::Unknown]);
        assert!(core.pointer_grab().is_none());
        assert!(core.mouse_window.is_none());
        assert!(platform.state().destroyed.contains(&hwnd));
    }

    #[test]
    fn hiding_an_owner_hides_and_restores_its_transients() {
        let (mut core, platform, _) = headless(Config::default());
        let owner = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let dialog = shown_toplevel(&mut core, Region::new(10, 10, 50, 50), EventMask::empty());
        core.set_transient_for(dialog, Some(owner));
        core.maximize(dialog);

        core.hide(owner);
        assert!(core.registry().get(dialog).unwrap().state.contains(WindowState::ICONIFIED));

        core.show(owner);
        let state = core.registry().get(dialog).unwrap().state;
        assert!(state.contains(WindowState::MAXIMIZED));
        assert!(!state.contains(WindowState::ICONIFIED));

        let dialog_hwnd = core.registry().hwnd(dialog).unwrap();
        assert_eq!(
            platform.state().shows.last().copied(),
            Some((dialog_hwnd, ShowCommand::Maximize))
        );
    }

    #[test]
    fn state_changes_report_the_difference() {
        let (mut core, _, events) = headless(Config::default());
        let top = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::STRUCTURE);
        core.dispatch_pending();
        events.borrow_mut().clear();

        core.maximize(top);
        core.maximize(top);
        core.dispatch_pending();

        let events = events.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::WindowState {
            changed: WindowState::MAXIMIZED,
            new: WindowState::MAXIMIZED,
        });
    }

    #[test]
    fn fullscreen_round_trips_the_geometry() {
        let (mut core, platform, _) = headless(Config::default());
        let top = shown_toplevel(&mut core, Region::new(30, 40, 300, 200), EventMask::empty());

        core.fullscreen(top);
        assert_eq!(core.registry().get(top).unwrap().region, Region::new(0, 0, 1920, 1080));
        let hwnd = core.registry().hwnd(top).unwrap();
        assert!(platform.state().windows[&hwnd].topmost);

        core.unfullscreen(top);
        assert_eq!(core.registry().get(top).unwrap().region, Region::new(30, 40, 300, 200));
        assert!(!platform.state().windows[&hwnd].topmost);
    }

    #[test]
    fn modal_windows_block_others_while_mapped() {
        let (mut core, _, _) = headless(Config::default());
        let main = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let dialog = shown_toplevel(&mut core, Region::new(10, 10, 50, 50), EventMask::empty());

        core.set_modal_hint(dialog, true);
        assert!(core.registry().is_blocked(main));

        core.hide(dialog);
        assert!(!core.registry().is_blocked(main));
        assert!(core.registry().modal_stack().is_empty());
    }

    #[test]
    fn icons_closest_to_the_nominal_sizes_win() {
        let (mut core, _, _) = headless(Config::default());
        let top = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());

        assert_eq!(core.set_icon_list(top, &[(16, 16), (48, 48), (30, 30)]), Some((2, 0)));
        assert_eq!(core.set_icon_list(top, &[]), None);
    }

    #[test]
    fn destroying_a_drop_destination_revokes_it() {
        let config = Config {
            use_ole2_dnd: true,
            ..Config::default()
        };

        let (mut core, platform, _) = headless(config);
        let top = shown_toplevel(&mut core, Region::new(0, 0, 100, 100), EventMask::empty());
        let child = shown_child(&mut core, top, Region::new(0, 0, 50, 50), EventMask::empty());
        let hwnd = core.registry().hwnd(child).unwrap();

        core.register_dnd(child);
        assert!(platform.state().drop_targets.contains(&hwnd));

        core.destroy(top);
        assert!(platform.state().drop_targets.is_empty());
    }

    #[test]
    fn moving_a_layered_window_only_repositions_its_surface() {
        let (mut core, platform, _) = headless(Config::default());
        let top = shown_toplevel(&mut core, Region::new(0, 0, 100, 80), EventMask::empty());
        let hwnd = core.registry().hwnd(top).unwrap();

        core.set_shadow_margins(top, Padding::with_each_edge(10));
        assert!(core.present_layered(top, Surface::new(100, 80).unwrap()));

        let positions = platform.state().positions.len();
        let updates = platform.state().layered_updates.len();

        core.move_to(top, Pos::new(30, 40));

        assert_eq!(platform.state().positions.len(), positions);
        assert_eq!(platform.state().layered_updates.len(), updates + 1);
        assert_eq!(
            platform.state().layered_updates.last(),
            Some(&(hwnd, Region::new(30, 40, 100, 80), LAYERED_OPACITY))
        );
        assert_eq!(platform.state().windows[&hwnd].region, Region::new(30, 40, 100, 80));

        core.resize(top, Dim::new(120, 80));
        assert_eq!(platform.state().positions.len(), positions + 1);
    }

    #[test]
    fn windows_without_margins_are_never_layered() {
        let (mut core, _, _) = headless(Config::default());
        let top = shown_toplevel(&mut core, Region::new(0, 0, 100, 80), EventMask::empty());

        assert!(!core.present_layered(top, Surface::new(100, 80).unwrap()));

        core.set_shadow_margins(top, Padding::with_each_edge(4));
        assert!(core.present_layered(top, Surface::new(100, 80).unwrap()));

        core.set_shadow_margins(top, Padding::default());
        assert!(core.registry().get(top).unwrap().surface.is_none());
    }

    #[test]
    fn fullscreen_workaround_overhangs_the_monitor() {
        let config = Config {
            gl_fullscreen_workaround: true,
            ..Config::default()
        };

        let (mut core, _, _) = headless(config);
        let top = shown_toplevel(&mut core, Region::new(30, 40, 300, 200), EventMask::empty());

        core.fullscreen(top);
        assert_eq!(core.registry().get(top).unwrap().region, Region::new(-1, -1, 1922, 1082));

        core.unfullscreen(top);
        assert_eq!(core.registry().get(top).unwrap().region, Region::new(30, 40, 300, 200));
    }
}
