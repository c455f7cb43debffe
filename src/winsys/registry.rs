use crate::aerosnap::SnapStash;
use crate::aerosnap::SnapState;
use crate::event::EventMask;
use crate::geometry::Padding;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::hints::GeometryHints;
use crate::indicator::Surface;
use crate::moveresize::MoveResizeContext;
use crate::platform::ShowCommand;
use crate::window::Decorations;
use crate::window::Functions;
use crate::window::Hwnd;
use crate::window::TypeHint;
use crate::window::Window;
use crate::window::WindowState;
use crate::window::WindowType;

use std::collections::HashMap;
use std::collections::HashSet;

pub const ROOT_WINDOW: Window = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct WindowAttributes {
    pub kind: WindowType,
    pub region: Region,
    pub event_mask: EventMask,
    pub type_hint: TypeHint,
    pub accept_focus: bool,
    pub focus_on_map: bool,
}

impl Default for WindowAttributes {
    fn default() -> Self {
        Self {
            kind: WindowType::Toplevel,
            region: Region::new(0, 0, 1, 1),
            event_mask: EventMask::empty(),
            type_hint: TypeHint::Normal,
            accept_focus: true,
            focus_on_map: true,
        }
    }
}

impl WindowAttributes {
    pub fn toplevel(region: Region) -> Self {
        Self {
            region,
            ..Default::default()
        }
    }

    pub fn child(region: Region) -> Self {
        Self {
            kind: WindowType::Child,
            region,
            ..Default::default()
        }
    }

    pub fn temp(region: Region) -> Self {
        Self {
            kind: WindowType::Temp,
            region,
            type_hint: TypeHint::PopupMenu,
            accept_focus: false,
            ..Default::default()
        }
    }

    pub fn with_event_mask(
        mut self,
        event_mask: EventMask,
    ) -> Self {
        self.event_mask = event_mask;
        self
    }

    pub fn with_type_hint(
        mut self,
        type_hint: TypeHint,
    ) -> Self {
        self.type_hint = type_hint;
        self
    }
}

#[derive(Debug, Clone)]
pub struct WindowData {
    pub id: Window,
    pub hwnd: Hwnd,
    pub parent: Option<Window>,
    pub children: Vec<Window>,
    pub kind: WindowType,
    pub event_mask: EventMask,
    pub state: WindowState,
    pub mapped: bool,
    pub destroyed: bool,
    /// Logical geometry, relative to the parent (the root for toplevels).
    pub region: Region,
    pub scale: i32,
    pub margins: Padding,
    pub hints: GeometryHints,
    pub type_hint: TypeHint,
    pub decorations: Option<Decorations>,
    pub functions: Option<Functions>,
    pub accept_focus: bool,
    pub focus_on_map: bool,
    pub modal_hint: bool,
    pub layered: bool,
    /// Last contents presented for a layered window.
    pub surface: Option<Surface>,
    pub transient_owner: Option<Window>,
    pub transient_children: Vec<Window>,
    pub hidden_state: Option<WindowState>,
    pub cursor: Option<String>,
    pub input_shape: Option<Vec<Region>>,
    pub opaque_shape: Option<Vec<Region>>,
    pub icons: Vec<(i32, i32)>,
    pub snap: SnapState,
    pub stash: Option<SnapStash>,
    pub drag: Option<MoveResizeContext>,
    pub maximizing: bool,
    pub pre_fullscreen: Option<Region>,
    pub drop_target: bool,
}

impl WindowData {
    fn new(
        id: Window,
        hwnd: Hwnd,
        parent: Option<Window>,
        attributes: &WindowAttributes,
        scale: i32,
    ) -> Self {
        Self {
            id,
            hwnd,
            parent,
            children: Vec::new(),
            kind: attributes.kind,
            event_mask: attributes.event_mask,
            state: WindowState::WITHDRAWN,
            mapped: false,
            destroyed: false,
            region: attributes.region,
            scale,
            margins: Padding::default(),
            hints: GeometryHints::default(),
            type_hint: attributes.type_hint,
            decorations: None,
            functions: None,
            accept_focus: attributes.accept_focus,
            focus_on_map: attributes.focus_on_map,
            modal_hint: false,
            layered: false,
            surface: None,
            transient_owner: None,
            transient_children: Vec::new(),
            hidden_state: None,
            cursor: None,
            input_shape: None,
            opaque_shape: None,
            icons: Vec::new(),
            snap: SnapState::Undetermined,
            stash: None,
            drag: None,
            maximizing: false,
            pre_fullscreen: None,
            drop_target: false,
        }
    }

    pub fn is_toplevel(&self) -> bool {
        self.kind.is_toplevel()
    }

    pub fn is_viewable(&self) -> bool {
        self.mapped && !self.destroyed
    }
}

pub struct WindowRegistry {
    windows: HashMap<Window, WindowData>,
    handles: HashMap<Hwnd, Window>,
    modal_stack: Vec<Window>,
    next_id: Window,
}

impl WindowRegistry {
    pub fn new(
        root_hwnd: Hwnd,
        root_region: Region,
    ) -> Self {
        let mut registry = Self {
            windows: HashMap::new(),
            handles: HashMap::new(),
            modal_stack: Vec::new(),
            next_id: ROOT_WINDOW,
        };

        let attributes = WindowAttributes {
            kind: WindowType::Root,
            region: root_region,
            event_mask: EventMask::STRUCTURE,
            ..Default::default()
        };

        registry.insert(None, root_hwnd, &attributes, 1);

        if let Some(root) = registry.windows.get_mut(&ROOT_WINDOW) {
            root.mapped = true;
            root.state = WindowState::empty();
        }

        registry
    }

    pub fn root(&self) -> Window {
        ROOT_WINDOW
    }

    /// Registers a window whose native handle already exists.
    pub fn insert(
        &mut self,
        parent: Option<Window>,
        hwnd: Hwnd,
        attributes: &WindowAttributes,
        scale: i32,
    ) -> Window {
        let id = self.next_id;
        self.next_id += 1;

        let scale = match (attributes.kind, parent) {
            (WindowType::Child, Some(parent)) => self.scale(parent),
            _ => scale,
        };

        self.windows
            .insert(id, WindowData::new(id, hwnd, parent, attributes, scale));
        self.handles.insert(hwnd, id);

        if let Some(parent) = parent.and_then(|parent| self.windows.get_mut(&parent)) {
            parent.children.push(id);
        }

        id
    }

    /// Live windows only; destroyed windows are never handed out.
    pub fn get(
        &self,
        window: Window,
    ) -> Option<&WindowData> {
        self.windows.get(&window).filter(|data| !data.destroyed)
    }

    pub fn get_mut(
        &mut self,
        window: Window,
    ) -> Option<&mut WindowData> {
        self.windows.get_mut(&window).filter(|data| !data.destroyed)
    }

    pub fn contains(
        &self,
        window: Window,
    ) -> bool {
        self.get(window).is_some()
    }

    pub fn lookup(
        &self,
        hwnd: Hwnd,
    ) -> Option<Window> {
        self.handles.get(&hwnd).copied().filter(|&window| self.contains(window))
    }

    pub fn hwnd(
        &self,
        window: Window,
    ) -> Option<Hwnd> {
        self.get(window).map(|data| data.hwnd)
    }

    pub fn windows(&self) -> Vec<Window> {
        let mut windows: Vec<Window> = self
            .windows
            .values()
            .filter(|data| !data.destroyed)
            .map(|data| data.id)
            .collect();

        windows.sort();
        windows
    }

    pub fn kind(
        &self,
        window: Window,
    ) -> Option<WindowType> {
        self.get(window).map(|data| data.kind)
    }

    pub fn scale(
        &self,
        window: Window,
    ) -> i32 {
        self.get(window).map_or(1, |data| data.scale)
    }

    pub fn parent(
        &self,
        window: Window,
    ) -> Option<Window> {
        self.get(window).and_then(|data| data.parent)
    }

    /// The parent, unless that is the root.
    pub fn native_parent(
        &self,
        window: Window,
    ) -> Option<Window> {
        self.parent(window).filter(|&parent| parent != ROOT_WINDOW)
    }

    pub fn toplevel(
        &self,
        window: Window,
    ) -> Option<Window> {
        let mut current = window;

        loop {
            let data = self.get(current)?;

            if data.kind == WindowType::Root {
                return None;
            }

            match data.parent {
                Some(parent) if parent != ROOT_WINDOW => current = parent,
                _ => return Some(current),
            }
        }
    }

    /// `window` and its ancestors, innermost first, excluding the root.
    pub fn ancestry(
        &self,
        window: Window,
    ) -> Vec<Window> {
        let mut path = Vec::new();
        let mut current = Some(window);

        while let Some(window) = current {
            match self.get(window) {
                Some(data) if data.kind != WindowType::Root => {
                    path.push(window);
                    current = data.parent;
                },
                _ => break,
            }
        }

        path
    }

    pub fn is_ancestor_or_self(
        &self,
        ancestor: Window,
        window: Window,
    ) -> bool {
        ancestor == window || self.ancestry(window).contains(&ancestor)
    }

    pub fn common_ancestor(
        &self,
        a: Window,
        b: Window,
    ) -> Option<Window> {
        let mut path_a = self.ancestry(a);
        let mut path_b = self.ancestry(b);
        path_a.reverse();
        path_b.reverse();

        path_a
            .iter()
            .zip(path_b.iter())
            .take_while(|(a, b)| a == b)
            .last()
            .map(|(&a, _)| a)
    }

    /// Logical position of the window origin relative to the root.
    pub fn root_origin(
        &self,
        window: Window,
    ) -> Pos {
        self.ancestry(window)
            .iter()
            .filter_map(|&window| self.get(window))
            .fold(Pos::default(), |origin, data| origin + data.region.pos)
    }

    pub fn descendants(
        &self,
        window: Window,
    ) -> Vec<Window> {
        let mut descendants = Vec::new();

        if let Some(data) = self.get(window) {
            for &child in data.children.iter() {
                descendants.extend(self.descendants(child));
                descendants.push(child);
            }
        }

        descendants
    }

    /// Unregisters `window` and its children, deepest first. Returns the
    /// removed windows and their handles.
    pub fn remove(
        &mut self,
        window: Window,
    ) -> Vec<(Window, Hwnd)> {
        if window == ROOT_WINDOW || !self.contains(window) {
            return Vec::new();
        }

        let mut removed: Vec<Window> = self.descendants(window);
        removed.push(window);

        self.remove_modal(window);

        let transients = self
            .get(window)
            .map(|data| data.transient_children.clone())
            .unwrap_or_default();

        transients
            .into_iter()
            .for_each(|child| self.set_transient_for(child, None));
        self.set_transient_for(window, None);

        if let Some(parent) = self.parent(window).and_then(|parent| self.windows.get_mut(&parent)) {
            parent.children.retain(|&child| child != window);
        }

        removed
            .into_iter()
            .filter_map(|window| {
                self.modal_stack.retain(|&modal| modal != window);

                self.windows.remove(&window).map(|data| {
                    self.handles.remove(&data.hwnd);
                    (window, data.hwnd)
                })
            })
            .collect()
    }

    /// Moves `window` under `parent`. Refuses to create a cycle.
    pub fn reparent(
        &mut self,
        window: Window,
        parent: Window,
    ) -> bool {
        if window == ROOT_WINDOW
            || !self.contains(window)
            || !self.contains(parent)
            || self.is_ancestor_or_self(window, parent)
        {
            return false;
        }

        if let Some(old) = self.parent(window).and_then(|old| self.windows.get_mut(&old)) {
            old.children.retain(|&child| child != window);
        }

        let scale = self.scale(parent);

        if let Some(data) = self.windows.get_mut(&parent) {
            data.children.push(window);
        }

        if let Some(data) = self.windows.get_mut(&window) {
            data.parent = Some(parent);

            if parent == ROOT_WINDOW {
                if data.kind == WindowType::Child {
                    data.kind = WindowType::Toplevel;
                }
            } else {
                data.kind = WindowType::Child;
                data.scale = scale;
            }
        }

        true
    }

    pub fn set_transient_for(
        &mut self,
        window: Window,
        owner: Option<Window>,
    ) {
        match self.get(window) {
            Some(data) if data.kind != WindowType::Child => {
                if data.transient_owner == owner {
                    return;
                }
            },
            _ => return,
        }

        if let Some(owner) = owner {
            if !self.contains(owner) || owner == window {
                return;
            }
        }

        let previous = self.get(window).and_then(|data| data.transient_owner);

        if let Some(previous) = previous.and_then(|previous| self.windows.get_mut(&previous)) {
            previous.transient_children.retain(|&child| child != window);
        }

        if let Some(owner_data) = owner.and_then(|owner| self.windows.get_mut(&owner)) {
            owner_data.transient_children.push(window);
        }

        if let Some(data) = self.windows.get_mut(&window) {
            data.transient_owner = owner;
        }
    }

    pub fn transient_owner(
        &self,
        window: Window,
    ) -> Option<Window> {
        self.get(window).and_then(|data| data.transient_owner)
    }

    /// The eldest owner in the transient chain of `window`.
    pub fn transient_root(
        &self,
        window: Window,
    ) -> Window {
        let mut visited = HashSet::new();
        let mut current = window;

        while visited.insert(current) {
            match self.transient_owner(current) {
                Some(owner) => current = owner,
                None => break,
            }
        }

        current
    }

    /// Transient descendants of `owner`, children before their owners.
    pub fn transient_descendants(
        &self,
        owner: Window,
    ) -> Vec<Window> {
        let mut visited = HashSet::new();
        let mut windows = Vec::new();

        self.collect_transients(owner, &mut visited, &mut windows);
        windows.retain(|&window| window != owner);
        windows
    }

    fn collect_transients(
        &self,
        window: Window,
        visited: &mut HashSet<Window>,
        windows: &mut Vec<Window>,
    ) {
        if !visited.insert(window) {
            return;
        }

        if let Some(data) = self.get(window) {
            for &child in data.transient_children.iter() {
                self.collect_transients(child, visited, windows);
            }
        }

        windows.push(window);
    }

    /// Records the state of every mapped transient descendant of `owner`
    /// and iconifies it. Returns the native commands to issue.
    pub fn hide_transients(
        &mut self,
        owner: Window,
    ) -> Vec<(Hwnd, ShowCommand)> {
        let mut commands = Vec::new();

        for window in self.transient_descendants(owner) {
            if let Some(data) = self.get_mut(window) {
                if !data.mapped {
                    continue;
                }

                data.hidden_state = Some(data.state.restorable());
                data.state.insert(WindowState::ICONIFIED);
                commands.push((data.hwnd, ShowCommand::Minimize));
            }
        }

        commands
    }

    /// Restores the state recorded by `hide_transients`.
    pub fn show_transients(
        &mut self,
        owner: Window,
    ) -> Vec<(Hwnd, ShowCommand)> {
        let mut commands = Vec::new();
        let restorable = WindowState::ICONIFIED
            | WindowState::MAXIMIZED
            | WindowState::WITHDRAWN
            | WindowState::ABOVE;

        for window in self.transient_descendants(owner) {
            if let Some(data) = self.get_mut(window) {
                let saved = match data.hidden_state.take() {
                    Some(saved) => saved,
                    None => continue,
                };

                data.state = (data.state - restorable) | saved;

                if !saved.contains(WindowState::ICONIFIED) {
                    commands.push((
                        data.hwnd,
                        if saved.contains(WindowState::MAXIMIZED) {
                            ShowCommand::Maximize
                        } else {
                            ShowCommand::Restore
                        },
                    ));
                }
            }
        }

        commands
    }

    pub fn push_modal(
        &mut self,
        window: Window,
    ) {
        self.modal_stack.push(window);
    }

    pub fn remove_modal(
        &mut self,
        window: Window,
    ) -> bool {
        match self.modal_stack.iter().rposition(|&modal| modal == window) {
            Some(index) => {
                self.modal_stack.remove(index);
                true
            },
            None => false,
        }
    }

    pub fn modal_stack(&self) -> &[Window] {
        &self.modal_stack
    }

    /// The topmost mapped modal window.
    pub fn current_modal(&self) -> Option<Window> {
        self.modal_stack
            .iter()
            .rev()
            .copied()
            .find(|&modal| self.get(modal).map_or(false, |data| data.mapped))
    }

    /// Whether a mapped modal sits above `window` in the stack.
    pub fn is_blocked(
        &self,
        window: Window,
    ) -> bool {
        for &modal in self.modal_stack.iter().rev() {
            if modal == window {
                return false;
            }

            if self.get(modal).map_or(false, |data| data.mapped) {
                return true;
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> WindowRegistry {
        WindowRegistry::new(0x10, Region::new(0, 0, 1920, 1080))
    }

    fn toplevel(
        registry: &mut WindowRegistry,
        hwnd: Hwnd,
    ) -> Window {
        let root = registry.root();
        registry.insert(
            Some(root),
            hwnd,
            &WindowAttributes::toplevel(Region::new(10, 10, 100, 100)),
            1,
        )
    }

    #[test]
    fn children_inherit_scale_and_root_origin() {
        let mut registry = registry();
        let root = registry.root();
        let top = registry.insert(
            Some(root),
            0x20,
            &WindowAttributes::toplevel(Region::new(100, 50, 400, 300)),
            2,
        );
        let child = registry.insert(
            Some(top),
            0x21,
            &WindowAttributes::child(Region::new(5, 7, 20, 20)),
            1,
        );

        assert_eq!(registry.scale(child), 2);
        assert_eq!(registry.root_origin(child), Pos::new(105, 57));
        assert_eq!(registry.toplevel(child), Some(top));
        assert_eq!(registry.lookup(0x21), Some(child));
    }

    #[test]
    fn common_ancestor_stops_below_root() {
        let mut registry = registry();
        let a = toplevel(&mut registry, 0x20);
        let b = toplevel(&mut registry, 0x30);
        let a1 = registry.insert(Some(a), 0x21, &WindowAttributes::child(Region::new(0, 0, 5, 5)), 1);
        let a2 = registry.insert(Some(a), 0x22, &WindowAttributes::child(Region::new(0, 0, 5, 5)), 1);

        assert_eq!(registry.common_ancestor(a1, a2), Some(a));
        assert_eq!(registry.common_ancestor(a1, a), Some(a));
        assert_eq!(registry.common_ancestor(a1, b), None);
    }

    #[test]
    fn removal_unregisters_the_whole_subtree() {
        let mut registry = registry();
        let top = toplevel(&mut registry, 0x20);
        let child = registry.insert(Some(top), 0x21, &WindowAttributes::child(Region::new(0, 0, 5, 5)), 1);

        let removed = registry.remove(top);

        assert_eq!(removed, vec![(child, 0x21), (top, 0x20)]);
        assert!(registry.lookup(0x21).is_none());
        assert!(registry.get(top).is_none());
        assert_eq!(registry.windows(), vec![registry.root()]);
    }

    #[test]
    fn reparenting_refuses_cycles() {
        let mut registry = registry();
        let a = toplevel(&mut registry, 0x20);
        let b = toplevel(&mut registry, 0x30);
        let child = registry.insert(Some(a), 0x21, &WindowAttributes::child(Region::new(0, 0, 5, 5)), 1);

        assert!(!registry.reparent(a, child));
        assert!(registry.reparent(child, b));
        assert_eq!(registry.parent(child), Some(b));
        assert!(registry.get(a).unwrap().children.is_empty());

        assert!(registry.reparent(child, registry.root()));
        assert_eq!(registry.kind(child), Some(WindowType::Toplevel));
    }

    #[test]
    fn clearing_the_owner_drops_the_back_link() {
        let mut registry = registry();
        let owner = toplevel(&mut registry, 0x20);
        let dialog = toplevel(&mut registry, 0x30);

        registry.set_transient_for(dialog, Some(owner));
        assert_eq!(registry.get(owner).unwrap().transient_children, vec![dialog]);

        registry.set_transient_for(dialog, None);
        assert!(registry.get(owner).unwrap().transient_children.is_empty());
        assert!(registry.transient_owner(dialog).is_none());
    }

    #[test]
    fn transient_cycles_terminate() {
        let mut registry = registry();
        let a = toplevel(&mut registry, 0x20);
        let b = toplevel(&mut registry, 0x30);

        registry.set_transient_for(a, Some(b));
        registry.set_transient_for(b, Some(a));

        assert!(registry.transient_root(a) == a || registry.transient_root(a) == b);
        assert_eq!(registry.transient_descendants(a), vec![b]);
    }

    #[test]
    fn hide_then_show_restores_transient_state() {
        let mut registry = registry();
        let owner = toplevel(&mut registry, 0x20);
        let dialog = toplevel(&mut registry, 0x30);
        let nested = toplevel(&mut registry, 0x40);
        let minimized = toplevel(&mut registry, 0x50);

        registry.set_transient_for(dialog, Some(owner));
        registry.set_transient_for(nested, Some(dialog));
        registry.set_transient_for(minimized, Some(owner));

        for (window, state) in vec![
            (dialog, WindowState::MAXIMIZED | WindowState::ABOVE | WindowState::FOCUSED),
            (nested, WindowState::empty()),
            (minimized, WindowState::ICONIFIED),
        ] {
            let data = registry.get_mut(window).unwrap();
            data.mapped = true;
            data.state = state;
        }

        let before: Vec<WindowState> = vec![dialog, nested, minimized]
            .into_iter()
            .map(|w| registry.get(w).unwrap().state.restorable())
            .collect();

        let hidden = registry.hide_transients(owner);
        assert_eq!(hidden.len(), 3);
        assert!(hidden.iter().all(|&(_, command)| command == ShowCommand::Minimize));

        let shown = registry.show_transients(owner);
        assert!(shown.contains(&(0x30, ShowCommand::Maximize)));
        assert!(shown.contains(&(0x40, ShowCommand::Restore)));
        assert!(!shown.iter().any(|&(hwnd, _)| hwnd == 0x50));

        let after: Vec<WindowState> = vec![dialog, nested, minimized]
            .into_iter()
            .map(|w| registry.get(w).unwrap().state.restorable())
            .collect();

        assert_eq!(before, after);
        assert!(registry.get(dialog).unwrap().state.contains(WindowState::FOCUSED));
    }

    #[test]
    fn blocked_iff_mapped_modal_above() {
        let mut registry = registry();
        let main = toplevel(&mut registry, 0x20);
        let first = toplevel(&mut registry, 0x30);
        let second = toplevel(&mut registry, 0x40);

        registry.push_modal(first);
        registry.push_modal(second);

        assert!(!registry.is_blocked(main));

        registry.get_mut(first).unwrap().mapped = true;
        assert!(registry.is_blocked(main));
        assert!(!registry.is_blocked(first));
        assert!(!registry.is_blocked(second));
        assert_eq!(registry.current_modal(), Some(first));

        registry.get_mut(second).unwrap().mapped = true;
        assert!(registry.is_blocked(first));
        assert_eq!(registry.current_modal(), Some(second));

        assert!(registry.remove_modal(second));
        assert!(!registry.remove_modal(second));
        assert!(!registry.is_blocked(first));
    }
}
