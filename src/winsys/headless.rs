pub use crate::Result;

use crate::atoms::Format;
use crate::atoms::FIRST_REGISTERED_FORMAT;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::indicator::Surface;
use crate::monitor::Monitor;
use crate::platform::DisplayPlatform;
use crate::platform::NativeWindowAttributes;
use crate::platform::ShowCommand;
use crate::platform::StackMode;
use crate::win32::message::NativeMessage;
use crate::win32::message::WM_CHAR;
use crate::win32::message::WM_SYSCHAR;
use crate::window::Hwnd;
use crate::window::WindowType;

use std::cell::RefCell;
use std::cell::RefMut;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::rc::Rc;

use anyhow::anyhow;

pub const DESKTOP_HWND: Hwnd = 0x10;
const FIRST_HWND: Hwnd = 0x100;

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessWindow {
    pub parent: Option<Hwnd>,
    /// Screen geometry for toplevels, parent-relative for children.
    pub region: Region,
    pub kind: WindowType,
    pub visible: bool,
    pub iconic: bool,
    pub zoomed: bool,
    pub layered: bool,
    pub topmost: bool,
    pub normal: Option<Region>,
    pub update: Option<Region>,
}

/// Everything the in-memory backend knows. Tests reach in through
/// `HeadlessPlatform::state` to script input and inspect side effects.
#[derive(Debug)]
pub struct HeadlessState {
    next_hwnd: Hwnd,
    pub windows: BTreeMap<Hwnd, HeadlessWindow>,
    /// Bottom to top.
    pub stacking: Vec<Hwnd>,

    pub tick: u32,
    pub tick_step: u32,
    pub capture: Option<Hwnd>,
    pub pointer: Pos,
    pub cursor: Option<String>,
    pub focus: Option<Hwnd>,
    pub foreground: Option<Hwnd>,
    pub refuse_foreground: bool,
    pub keys_down: HashSet<u32>,
    pub keys_toggled: HashSet<u32>,
    pub layout: u32,
    pub double_click: (u32, i32),
    pub wm_handles_super_down: bool,
    pub posted: VecDeque<NativeMessage>,
    pub timers: BTreeMap<(Hwnd, usize), u32>,
    pub monitors: Vec<Monitor>,
    pub mouse_tracking: HashSet<Hwnd>,

    pub clipboard_open: Option<Option<Hwnd>>,
    pub clipboard_owner: Option<Hwnd>,
    pub clipboard: Vec<(Format, Option<Vec<u8>>)>,
    pub registered_formats: Vec<String>,
    pub clipboard_busy: bool,

    pub links: HashMap<String, String>,
    pub drop_targets: HashSet<Hwnd>,
    pub accepting_files: HashSet<Hwnd>,

    pub positions: Vec<(Hwnd, Region)>,
    pub shows: Vec<(Hwnd, ShowCommand)>,
    pub warps: Vec<Pos>,
    pub layered_updates: Vec<(Hwnd, Region, f64)>,
    pub destroyed: Vec<Hwnd>,
}

impl Default for HeadlessState {
    fn default() -> Self {
        Self {
            next_hwnd: FIRST_HWND,
            windows: BTreeMap::new(),
            stacking: Vec::new(),

            tick: 0,
            tick_step: 1,
            capture: None,
            pointer: Pos::default(),
            cursor: None,
            focus: None,
            foreground: None,
            refuse_foreground: false,
            keys_down: HashSet::new(),
            keys_toggled: HashSet::new(),
            layout: 0x0409_0409,
            double_click: (400, 5),
            wm_handles_super_down: true,
            posted: VecDeque::new(),
            timers: BTreeMap::new(),
            monitors: vec![Monitor::new(
                Region::new(0, 0, 1920, 1080),
                Region::new(0, 0, 1920, 1040),
            )],
            mouse_tracking: HashSet::new(),

            clipboard_open: None,
            clipboard_owner: None,
            clipboard: Vec::new(),
            registered_formats: Vec::new(),
            clipboard_busy: false,

            links: HashMap::new(),
            drop_targets: HashSet::new(),
            accepting_files: HashSet::new(),

            positions: Vec::new(),
            shows: Vec::new(),
            warps: Vec::new(),
            layered_updates: Vec::new(),
            destroyed: Vec::new(),
        }
    }
}

impl HeadlessState {
    /// Declares a visible toplevel under a caller-chosen handle.
    pub fn insert_window(
        &mut self,
        hwnd: Hwnd,
        region: Region,
    ) {
        self.windows.insert(hwnd, HeadlessWindow {
            parent: None,
            region,
            kind: WindowType::Foreign,
            visible: true,
            iconic: false,
            zoomed: false,
            layered: false,
            topmost: false,
            normal: None,
            update: None,
        });

        self.stacking.retain(|&other| other != hwnd);
        self.stacking.push(hwnd);
        self.next_hwnd = std::cmp::max(self.next_hwnd, hwnd + 0x10);
    }

    pub fn screen_rect(
        &self,
        hwnd: Hwnd,
    ) -> Option<Region> {
        let window = self.windows.get(&hwnd)?;
        let mut region = window.region;
        let mut parent = window.parent;

        while let Some(data) = parent.and_then(|parent| self.windows.get(&parent)) {
            region = region.translated(data.region.pos.x, data.region.pos.y);
            parent = data.parent;
        }

        Some(region)
    }

    fn children(
        &self,
        hwnd: Hwnd,
    ) -> Vec<Hwnd> {
        self.stacking
            .iter()
            .copied()
            .filter(|&child| self.windows.get(&child).map_or(false, |w| w.parent == Some(hwnd)))
            .collect()
    }

    fn deepest_at(
        &self,
        hwnd: Hwnd,
        pos: Pos,
    ) -> Hwnd {
        for child in self.children(hwnd).into_iter().rev() {
            let visible = self.windows.get(&child).map_or(false, |w| w.visible);

            if visible && self.screen_rect(child).map_or(false, |r| r.contains_point(pos)) {
                return self.deepest_at(child, pos);
            }
        }

        hwnd
    }

    fn remove_tree(
        &mut self,
        hwnd: Hwnd,
    ) {
        for child in self.children(hwnd) {
            self.remove_tree(child);
        }

        self.windows.remove(&hwnd);
        self.stacking.retain(|&other| other != hwnd);
        self.drop_targets.remove(&hwnd);
        self.timers.retain(|&(owner, _), _| owner != hwnd);
        self.destroyed.push(hwnd);

        if self.capture == Some(hwnd) {
            self.capture = None;
        }
    }
}

/// An in-memory backend: windows, monitors, clipboard and key state live
/// in a shared state block, and every side effect is recorded.
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(HeadlessState::default())),
        }
    }

    pub fn state(&self) -> RefMut<'_, HeadlessState> {
        self.state.borrow_mut()
    }
}

impl DisplayPlatform for HeadlessPlatform {
    fn name(&self) -> &str {
        "headless"
    }

    fn tick_count(&mut self) -> u32 {
        let mut state = self.state();
        let now = state.tick;
        state.tick = now.wrapping_add(state.tick_step);
        now
    }

    fn desktop_window(&self) -> Hwnd {
        DESKTOP_HWND
    }

    fn create_native_window(
        &mut self,
        attributes: NativeWindowAttributes,
    ) -> Result<Hwnd> {
        let mut state = self.state();

        if let Some(parent) = attributes.parent {
            if parent != DESKTOP_HWND && !state.windows.contains_key(&parent) {
                return Err(anyhow!("unable to create window: invalid parent {:#x}", parent));
            }
        }

        let hwnd = state.next_hwnd;
        state.next_hwnd += 0x10;

        state.windows.insert(hwnd, HeadlessWindow {
            parent: attributes.parent.filter(|&parent| parent != DESKTOP_HWND),
            region: attributes.region,
            kind: attributes.kind,
            visible: false,
            iconic: false,
            zoomed: false,
            layered: attributes.layered,
            topmost: attributes.topmost,
            normal: None,
            update: None,
        });
        state.stacking.push(hwnd);

        Ok(hwnd)
    }

    fn destroy_native_window(
        &mut self,
        hwnd: Hwnd,
    ) {
        self.state().remove_tree(hwnd);
    }

    fn show_window(
        &mut self,
        hwnd: Hwnd,
        command: ShowCommand,
    ) {
        let mut state = self.state();
        state.shows.push((hwnd, command));

        if let Some(window) = state.windows.get_mut(&hwnd) {
            match command {
                ShowCommand::Hide => window.visible = false,
                ShowCommand::Show | ShowCommand::ShowNoActivate => {
                    window.visible = true;
                },
                ShowCommand::Minimize => {
                    window.visible = true;
                    window.iconic = true;
                },
                ShowCommand::Maximize => {
                    window.visible = true;
                    window.iconic = false;
                    window.zoomed = true;
                },
                ShowCommand::Restore => {
                    window.visible = true;
                    window.iconic = false;
                    window.zoomed = false;
                },
            }

            if window.visible && !window.layered {
                window.update = Some(Region::new(0, 0, window.region.dim.w, window.region.dim.h));
            }
        }
    }

    fn set_window_pos(
        &mut self,
        hwnd: Hwnd,
        region: Region,
    ) -> Result<()> {
        let mut state = self.state();

        match state.windows.get_mut(&hwnd) {
            Some(window) => window.region = region,
            None => return Err(anyhow!("unable to position unknown window {:#x}", hwnd)),
        }

        state.positions.push((hwnd, region));
        Ok(())
    }

    fn restack_window(
        &mut self,
        hwnd: Hwnd,
        mode: StackMode,
    ) {
        let mut state = self.state();

        if !state.stacking.contains(&hwnd) {
            return;
        }

        match mode {
            StackMode::Raise | StackMode::Topmost => {
                state.stacking.retain(|&other| other != hwnd);
                state.stacking.push(hwnd);
            },
            StackMode::Lower => {
                state.stacking.retain(|&other| other != hwnd);
                state.stacking.insert(0, hwnd);
            },
            StackMode::NoTopmost => {},
        }

        if let Some(window) = state.windows.get_mut(&hwnd) {
            match mode {
                StackMode::Topmost => window.topmost = true,
                StackMode::NoTopmost => window.topmost = false,
                _ => {},
            }
        }
    }

    fn set_parent(
        &mut self,
        hwnd: Hwnd,
        parent: Option<Hwnd>,
    ) {
        if let Some(window) = self.state().windows.get_mut(&hwnd) {
            window.parent = parent.filter(|&parent| parent != DESKTOP_HWND);
        }
    }

    fn window_rect(
        &self,
        hwnd: Hwnd,
    ) -> Option<Region> {
        self.state.borrow().screen_rect(hwnd)
    }

    fn window_from_point(
        &self,
        pos: Pos,
    ) -> Option<Hwnd> {
        let state = self.state.borrow();

        // Layered windows are click-through.
        state
            .stacking
            .iter()
            .rev()
            .copied()
            .filter(|hwnd| {
                state.windows.get(hwnd).map_or(false, |window| {
                    window.parent.is_none() && window.visible && !window.iconic && !window.layered
                })
            })
            .find(|&hwnd| state.screen_rect(hwnd).map_or(false, |r| r.contains_point(pos)))
            .map(|hwnd| state.deepest_at(hwnd, pos))
    }

    fn is_iconic(
        &self,
        hwnd: Hwnd,
    ) -> bool {
        self.state.borrow().windows.get(&hwnd).map_or(false, |w| w.iconic)
    }

    fn is_zoomed(
        &self,
        hwnd: Hwnd,
    ) -> bool {
        self.state.borrow().windows.get(&hwnd).map_or(false, |w| w.zoomed)
    }

    fn is_topmost(
        &self,
        hwnd: Hwnd,
    ) -> bool {
        self.state.borrow().windows.get(&hwnd).map_or(false, |w| w.topmost)
    }

    fn is_visible(
        &self,
        hwnd: Hwnd,
    ) -> bool {
        self.state.borrow().windows.get(&hwnd).map_or(false, |w| w.visible)
    }

    fn normal_placement(
        &self,
        hwnd: Hwnd,
    ) -> Option<Region> {
        let state = self.state.borrow();
        let window = state.windows.get(&hwnd)?;

        window.normal.or(Some(window.region))
    }

    fn set_normal_placement(
        &mut self,
        hwnd: Hwnd,
        region: Region,
    ) {
        if let Some(window) = self.state().windows.get_mut(&hwnd) {
            window.normal = Some(region);
        }
    }

    fn take_update_region(
        &mut self,
        hwnd: Hwnd,
    ) -> Option<Region> {
        self.state().windows.get_mut(&hwnd).and_then(|window| window.update.take())
    }

    fn set_capture(
        &mut self,
        hwnd: Hwnd,
    ) {
        self.state().capture = Some(hwnd);
    }

    fn release_capture(&mut self) {
        self.state().capture = None;
    }

    fn capture(&self) -> Option<Hwnd> {
        self.state.borrow().capture
    }

    fn warp_pointer(
        &mut self,
        pos: Pos,
    ) {
        let mut state = self.state();
        state.pointer = pos;
        state.warps.push(pos);
    }

    fn pointer_position(&self) -> Pos {
        self.state.borrow().pointer
    }

    fn set_cursor(
        &mut self,
        name: Option<&str>,
    ) {
        self.state().cursor = name.map(str::to_owned);
    }

    fn track_mouse_leave(
        &mut self,
        hwnd: Hwnd,
    ) {
        self.state().mouse_tracking.insert(hwnd);
    }

    fn foreground_window(&self) -> Option<Hwnd> {
        self.state.borrow().foreground
    }

    fn set_foreground_window(
        &mut self,
        hwnd: Hwnd,
    ) -> bool {
        let mut state = self.state();

        if state.refuse_foreground {
            return false;
        }

        state.foreground = Some(hwnd);
        true
    }

    fn set_focus(
        &mut self,
        hwnd: Hwnd,
    ) {
        self.state().focus = Some(hwnd);
    }

    fn key_down(
        &self,
        virtual_key: u32,
    ) -> bool {
        self.state.borrow().keys_down.contains(&virtual_key)
    }

    fn key_toggled(
        &self,
        virtual_key: u32,
    ) -> bool {
        self.state.borrow().keys_toggled.contains(&virtual_key)
    }

    fn take_char_message(
        &mut self,
        hwnd: Hwnd,
    ) -> Option<NativeMessage> {
        let mut state = self.state();
        let index = state.posted.iter().position(|msg| msg.hwnd == hwnd)?;
        let message = state.posted[index].message;

        match message {
            WM_CHAR | WM_SYSCHAR => state.posted.remove(index),
            _ => None,
        }
    }

    fn keyboard_layout(&self) -> u32 {
        self.state.borrow().layout
    }

    fn double_click_metrics(&self) -> (u32, i32) {
        self.state.borrow().double_click
    }

    fn post_message(
        &mut self,
        message: NativeMessage,
    ) {
        self.state().posted.push_back(message);
    }

    fn next_message(&mut self) -> Option<NativeMessage> {
        self.state().posted.pop_front()
    }

    fn set_timer(
        &mut self,
        hwnd: Hwnd,
        id: usize,
        interval: u32,
    ) {
        self.state().timers.insert((hwnd, id), interval);
    }

    fn kill_timer(
        &mut self,
        hwnd: Hwnd,
        id: usize,
    ) {
        self.state().timers.remove(&(hwnd, id));
    }

    fn monitors(&self) -> Vec<Monitor> {
        self.state.borrow().monitors.clone()
    }

    fn virtual_screen(&self) -> Region {
        self.state
            .borrow()
            .monitors
            .iter()
            .map(|monitor| monitor.geometry)
            .fold(None, |acc: Option<Region>, geometry| {
                Some(acc.map_or(geometry, |acc| acc.union(geometry)))
            })
            .unwrap_or_default()
    }

    fn wm_handles_maximized_super_down(&self) -> bool {
        self.state.borrow().wm_handles_super_down
    }

    fn update_layered_window(
        &mut self,
        hwnd: Hwnd,
        region: Region,
        surface: &Surface,
        opacity: f64,
    ) -> Result<()> {
        let mut state = self.state();

        if surface.width() == 0 || surface.height() == 0 {
            return Err(anyhow!("unable to present an empty surface"));
        }

        match state.windows.get_mut(&hwnd) {
            Some(window) => window.region = region,
            None => return Err(anyhow!("unable to update unknown layered window {:#x}", hwnd)),
        }

        state.layered_updates.push((hwnd, region, opacity));
        Ok(())
    }

    fn open_clipboard(
        &mut self,
        owner: Option<Hwnd>,
    ) -> bool {
        let mut state = self.state();

        if state.clipboard_busy || state.clipboard_open.is_some() {
            return false;
        }

        state.clipboard_open = Some(owner);
        true
    }

    fn close_clipboard(&mut self) {
        self.state().clipboard_open = None;
    }

    fn empty_clipboard(&mut self) -> bool {
        let mut state = self.state();

        match state.clipboard_open {
            Some(opener) => {
                state.clipboard.clear();
                state.clipboard_owner = opener;
                true
            },
            None => false,
        }
    }

    fn clipboard_formats(&self) -> Vec<Format> {
        self.state.borrow().clipboard.iter().map(|&(format, _)| format).collect()
    }

    fn is_clipboard_format_available(
        &self,
        format: Format,
    ) -> bool {
        self.state.borrow().clipboard.iter().any(|&(known, _)| known == format)
    }

    fn clipboard_data(
        &self,
        format: Format,
    ) -> Option<Vec<u8>> {
        self.state
            .borrow()
            .clipboard
            .iter()
            .find(|&&(known, _)| known == format)
            .and_then(|(_, data)| data.clone())
    }

    fn set_clipboard_data(
        &mut self,
        format: Format,
        data: Option<Vec<u8>>,
    ) -> bool {
        let mut state = self.state();

        if state.clipboard_open.is_none() {
            return false;
        }

        match state.clipboard.iter_mut().find(|(known, _)| *known == format) {
            Some(entry) => entry.1 = data,
            None => state.clipboard.push((format, data)),
        }

        true
    }

    fn clipboard_owner(&self) -> Option<Hwnd> {
        self.state.borrow().clipboard_owner
    }

    fn register_clipboard_format(
        &mut self,
        name: &str,
    ) -> Format {
        let mut state = self.state();

        let index = match state.registered_formats.iter().position(|known| known == name) {
            Some(index) => index,
            None => {
                state.registered_formats.push(name.to_owned());
                state.registered_formats.len() - 1
            },
        };

        FIRST_REGISTERED_FORMAT + index as Format
    }

    fn clipboard_format_name(
        &self,
        format: Format,
    ) -> Option<String> {
        if format < FIRST_REGISTERED_FORMAT {
            return None;
        }

        self.state
            .borrow()
            .registered_formats
            .get((format - FIRST_REGISTERED_FORMAT) as usize)
            .cloned()
    }

    fn resolve_link(
        &self,
        path: &str,
    ) -> Option<String> {
        self.state.borrow().links.get(path).cloned()
    }

    /// Scripted id lists are NUL-separated UTF-8 paths.
    fn shell_id_list_paths(
        &self,
        data: &[u8],
    ) -> Vec<String> {
        data.split(|&byte| byte == 0)
            .filter(|path| !path.is_empty())
            .map(|path| String::from_utf8_lossy(path).into_owned())
            .collect()
    }

    fn register_drop_target(
        &mut self,
        hwnd: Hwnd,
    ) -> bool {
        let mut state = self.state();

        if !state.windows.contains_key(&hwnd) {
            return false;
        }

        state.drop_targets.insert(hwnd)
    }

    fn revoke_drop_target(
        &mut self,
        hwnd: Hwnd,
    ) {
        self.state().drop_targets.remove(&hwnd);
    }

    fn accept_files(
        &mut self,
        hwnd: Hwnd,
        accept: bool,
    ) {
        let mut state = self.state();

        if accept {
            state.accepting_files.insert(hwnd);
        } else {
            state.accepting_files.remove(&hwnd);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attributes(
        parent: Option<Hwnd>,
        region: Region,
    ) -> NativeWindowAttributes {
        NativeWindowAttributes {
            parent,
            region,
            kind: if parent.is_some() {
                WindowType::Child
            } else {
                WindowType::Toplevel
            },
            layered: false,
            topmost: false,
        }
    }

    #[test]
    fn hit_testing_finds_the_deepest_visible_child() {
        let mut platform = HeadlessPlatform::new();
        let top = platform
            .create_native_window(attributes(None, Region::new(100, 100, 200, 200)))
            .unwrap();
        let child = platform
            .create_native_window(attributes(Some(top), Region::new(10, 10, 50, 50)))
            .unwrap();

        assert_eq!(platform.window_from_point(Pos::new(120, 120)), None);

        platform.show_window(top, ShowCommand::Show);
        assert_eq!(platform.window_from_point(Pos::new(120, 120)), Some(top));

        platform.show_window(child, ShowCommand::Show);
        assert_eq!(platform.window_from_point(Pos::new(120, 120)), Some(child));
        assert_eq!(platform.window_rect(child), Some(Region::new(110, 110, 50, 50)));
    }

    #[test]
    fn only_the_opener_can_fill_the_clipboard() {
        let mut platform = HeadlessPlatform::new();

        assert!(!platform.set_clipboard_data(13, Some(vec![1])));
        assert!(platform.open_clipboard(Some(0x100)));
        assert!(!platform.open_clipboard(None));
        assert!(platform.empty_clipboard());
        assert!(platform.set_clipboard_data(13, None));
        platform.close_clipboard();

        assert_eq!(platform.clipboard_owner(), Some(0x100));
        assert!(platform.is_clipboard_format_available(13));
        assert_eq!(platform.clipboard_data(13), None);
    }

    #[test]
    fn registered_formats_are_stable() {
        let mut platform = HeadlessPlatform::new();
        let png = platform.register_clipboard_format("PNG");

        assert!(png >= FIRST_REGISTERED_FORMAT);
        assert_eq!(platform.register_clipboard_format("PNG"), png);
        assert_eq!(platform.clipboard_format_name(png).as_deref(), Some("PNG"));
    }

    #[test]
    fn only_a_leading_char_message_is_taken() {
        let mut platform = HeadlessPlatform::new();
        platform.post_message(NativeMessage::new(0x100, WM_CHAR, 'a' as usize, 0));
        platform.post_message(NativeMessage::new(0x100, 0x0200, 0, 0));
        platform.post_message(NativeMessage::new(0x100, WM_CHAR, 'b' as usize, 0));

        assert_eq!(platform.take_char_message(0x100).map(|msg| msg.wparam), Some('a' as usize));
        assert!(platform.take_char_message(0x100).is_none());
    }
}
