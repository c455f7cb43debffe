use crate::atoms::Atom;
use crate::atoms::AtomTable;
use crate::atoms::KnownAtom;
use crate::event::DragContextId;
use crate::geometry::Pos;
use crate::indicator::ease_out_cubic;
use crate::input::DeviceId;
use crate::input::Key;
use crate::input::ModifierType;
use crate::selection::SelFormat;
use crate::win32::message::MK_ALT;
use crate::win32::message::MK_CONTROL;
use crate::win32::message::MK_SHIFT;
use crate::window::Window;

use std::collections::HashMap;

use bitflags::bitflags;

pub const DROPEFFECT_NONE: u32 = 0;
pub const DROPEFFECT_COPY: u32 = 1;
pub const DROPEFFECT_MOVE: u32 = 2;
pub const DROPEFFECT_LINK: u32 = 4;

/// Keyboard navigation steps, in logical pixels.
pub const BIG_STEP: i32 = 20;
pub const SMALL_STEP: i32 = 1;

pub const ANIMATION_DURATION: u32 = 500;
pub const ANIMATION_TICK: u32 = 17;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DragProtocol {
    None,
    Local,
    Dropfiles,
    Ole2,
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct DragAction: u8 {
        const DEFAULT = 1 << 0;
        const COPY    = 1 << 1;
        const MOVE    = 1 << 2;
        const LINK    = 1 << 3;
        const PRIVATE = 1 << 4;
        const ASK     = 1 << 5;
    }
}

impl Default for DragAction {
    fn default() -> Self {
        DragAction::empty()
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DragStatus {
    Drag,
    MotionWait,
    ActionWait,
    Drop,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DragCancelReason {
    NoTarget,
    UserCancelled,
    Error,
}

/// The shared state word the platform drag loop polls.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DndState {
    None,
    Pending,
    Dragging,
    Dropped,
    Failed,
}

bitflags! {
    /// Targets a source offers that need special handling on the way out.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct SourceCapabilities: u16 {
        const IMAGE_FORMAT  = 1 << 0;
        const CF_PNG        = 1 << 1;
        const CF_DIB        = 1 << 2;
        const GIF           = 1 << 3;
        const JFIF          = 1 << 4;
        const TEXT_URI_LIST = 1 << 5;
        const SHELL_ID_LIST = 1 << 6;
        const UNICODETEXT   = 1 << 7;
    }
}

impl Default for SourceCapabilities {
    fn default() -> Self {
        SourceCapabilities::empty()
    }
}

impl SourceCapabilities {
    pub fn for_targets(
        atoms: &AtomTable,
        targets: &[Atom],
        image_targets: &[Atom],
    ) -> Self {
        let mut capabilities = SourceCapabilities::empty();

        for &target in targets {
            let known = [
                (KnownAtom::TextUriList, SourceCapabilities::TEXT_URI_LIST),
                (KnownAtom::CfShellIdList, SourceCapabilities::SHELL_ID_LIST),
                (KnownAtom::Png, SourceCapabilities::CF_PNG),
                (KnownAtom::CfDib, SourceCapabilities::CF_DIB),
                (KnownAtom::Gif, SourceCapabilities::GIF),
                (KnownAtom::Jfif, SourceCapabilities::JFIF),
                (KnownAtom::CfUnicodeText, SourceCapabilities::UNICODETEXT),
            ];

            if let Some(&(_, flag)) = known.iter().find(|&&(atom, _)| atoms.is(target, atom)) {
                capabilities |= flag;
            }

            if image_targets.contains(&target) {
                capabilities |= SourceCapabilities::IMAGE_FORMAT;
            }
        }

        capabilities
    }
}

/// The slide-back of the drag icon after a failed drop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DragAnimation {
    pub start_time: u32,
    pub from: Pos,
    pub to: Pos,
    pub hot: Pos,
}

impl DragAnimation {
    /// Position of the icon window and its opacity at `now`, or `None`
    /// once the animation is over.
    pub fn frame(
        &self,
        now: u32,
    ) -> Option<(Pos, f64)> {
        let elapsed = now.wrapping_sub(self.start_time);
        let f = elapsed as f64 / ANIMATION_DURATION as f64;

        if f >= 1f64 {
            return None;
        }

        let t = ease_out_cubic(f);
        let x = self.from.x as f64 + (self.to.x - self.from.x) as f64 * t - self.hot.x as f64;
        let y = self.from.y as f64 + (self.to.y - self.from.y) as f64 * t - self.hot.y as f64;

        Some((Pos::new(x as i32, y as i32), 1f64 - f))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragContext {
    pub id: DragContextId,
    pub protocol: DragProtocol,
    pub is_source: bool,
    pub source_window: Option<Window>,
    pub dest_window: Option<Window>,
    pub suggested_action: DragAction,
    pub action: DragAction,
    pub actions: DragAction,
    pub targets: Vec<Atom>,
    pub device: DeviceId,
    pub status: DragStatus,
    pub drop_failed: bool,
    pub cancel_reason: Option<DragCancelReason>,
    pub scale: i32,

    pub start: Pos,
    pub last: Pos,
    pub last_key_state: usize,
    pub hot: Pos,
    pub drag_window: Option<Window>,
    pub ipc_window: Option<Window>,
    pub grabbed: bool,
    pub current_action: DragAction,

    pub formats: Vec<SelFormat>,
    pub capabilities: SourceCapabilities,
    pub animation: Option<DragAnimation>,
}

impl DragContext {
    pub fn new(
        id: DragContextId,
        protocol: DragProtocol,
        is_source: bool,
        device: DeviceId,
        scale: i32,
    ) -> Self {
        Self {
            id,
            protocol,
            is_source,
            source_window: None,
            dest_window: None,
            suggested_action: DragAction::empty(),
            action: DragAction::empty(),
            actions: DragAction::empty(),
            targets: Vec::new(),
            device,
            status: DragStatus::Drag,
            drop_failed: false,
            cancel_reason: None,
            scale: std::cmp::max(scale, 1),

            start: Pos::default(),
            last: Pos::default(),
            last_key_state: 0,
            hot: Pos::default(),
            drag_window: None,
            ipc_window: None,
            grabbed: false,
            current_action: DragAction::empty(),

            formats: Vec::new(),
            capabilities: SourceCapabilities::empty(),
            animation: None,
        }
    }

    /// The selection data for this drag travels through.
    pub fn selection(
        &self,
        atoms: &AtomTable,
    ) -> Option<Atom> {
        match self.protocol {
            DragProtocol::Local => Some(atoms.known(KnownAtom::LocalDndSelection)),
            DragProtocol::Dropfiles => Some(atoms.known(KnownAtom::DropfilesDnd)),
            DragProtocol::Ole2 => Some(atoms.known(KnownAtom::Ole2Dnd)),
            DragProtocol::None => None,
        }
    }

    pub fn involves(
        &self,
        window: Window,
    ) -> bool {
        self.source_window == Some(window)
            || self.dest_window == Some(window)
            || self.drag_window == Some(window)
            || self.ipc_window == Some(window)
    }
}

/// Every drag context alive in the process, source and destination side.
#[derive(Debug)]
pub struct DndManager {
    contexts: HashMap<DragContextId, DragContext>,
    next_id: DragContextId,

    /// The source context driving the current drag, if any.
    pub source: Option<DragContextId>,
    /// The destination context of the current local or OLE2 drag.
    pub dest: Option<DragContextId>,
    pub source_state: DndState,
    pub target_state: DndState,
}

impl DndManager {
    pub fn new() -> Self {
        Self {
            contexts: HashMap::new(),
            next_id: 1,
            source: None,
            dest: None,
            source_state: DndState::None,
            target_state: DndState::None,
        }
    }

    pub fn create(
        &mut self,
        protocol: DragProtocol,
        is_source: bool,
        device: DeviceId,
        scale: i32,
    ) -> DragContextId {
        let id = self.next_id;
        self.next_id += 1;

        self.contexts
            .insert(id, DragContext::new(id, protocol, is_source, device, scale));

        id
    }

    pub fn get(
        &self,
        id: DragContextId,
    ) -> Option<&DragContext> {
        self.contexts.get(&id)
    }

    pub fn get_mut(
        &mut self,
        id: DragContextId,
    ) -> Option<&mut DragContext> {
        self.contexts.get_mut(&id)
    }

    pub fn remove(
        &mut self,
        id: DragContextId,
    ) -> Option<DragContext> {
        if self.source == Some(id) {
            self.source = None;
        }

        if self.dest == Some(id) {
            self.dest = None;
        }

        self.contexts.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// The context on the given side matching both endpoints, when given.
    pub fn find(
        &self,
        is_source: bool,
        source_window: Option<Window>,
        dest_window: Option<Window>,
    ) -> Option<DragContextId> {
        let mut ids: Vec<&DragContextId> = self.contexts.keys().collect();
        ids.sort();

        ids.into_iter()
            .filter_map(|id| self.contexts.get(id))
            .find(|context| {
                context.is_source == is_source
                    && source_window.map_or(true, |window| context.source_window == Some(window))
                    && dest_window.map_or(true, |window| context.dest_window == Some(window))
            })
            .map(|context| context.id)
    }

    /// Source contexts whose drag icon is sliding back.
    pub fn animating(&self) -> Vec<DragContextId> {
        let mut ids: Vec<DragContextId> = self
            .contexts
            .values()
            .filter(|context| context.animation.is_some())
            .map(|context| context.id)
            .collect();

        ids.sort();
        ids
    }

    /// Destination contexts fed by `source_window`.
    pub fn destinations_of(
        &self,
        source_window: Option<Window>,
    ) -> Vec<DragContextId> {
        let mut ids: Vec<DragContextId> = self
            .contexts
            .values()
            .filter(|context| !context.is_source && context.source_window == source_window)
            .map(|context| context.id)
            .collect();

        ids.sort();
        ids
    }

    /// Drops contexts referring to a destroyed window.
    pub fn forget_window(
        &mut self,
        window: Window,
    ) -> Vec<DragContextId> {
        let mut gone: Vec<DragContextId> = self
            .contexts
            .values()
            .filter(|context| context.involves(window))
            .map(|context| context.id)
            .collect();

        gone.sort();
        gone.iter().for_each(|&id| {
            self.remove(id);
        });

        gone
    }
}

/// The action a drop target proposes for the modifier keys in
/// `key_state`. Drags from this process default to moving.
pub fn suggested_action(
    key_state: usize,
    internal: bool,
) -> DragAction {
    if key_state & MK_CONTROL != 0 && key_state & MK_SHIFT != 0 {
        DragAction::LINK
    } else if key_state & MK_CONTROL != 0 {
        DragAction::COPY
    } else if key_state & MK_ALT != 0 {
        DragAction::MOVE
    } else if internal {
        DragAction::MOVE
    } else {
        DragAction::COPY
    }
}

pub fn cursor_for_action(action: DragAction) -> &'static str {
    if action.contains(DragAction::DEFAULT) {
        "default"
    } else if action.contains(DragAction::ASK) {
        "dnd-ask"
    } else if action.contains(DragAction::COPY) {
        "dnd-copy"
    } else if action.contains(DragAction::MOVE) {
        "dnd-move"
    } else if action.contains(DragAction::LINK) {
        "dnd-link"
    } else {
        "dnd-none"
    }
}

pub fn drop_effect_for_action(action: DragAction) -> u32 {
    if action == DragAction::MOVE {
        DROPEFFECT_MOVE
    } else if action == DragAction::LINK {
        DROPEFFECT_LINK
    } else if action == DragAction::COPY {
        DROPEFFECT_COPY
    } else {
        DROPEFFECT_NONE
    }
}

pub fn action_for_drop_effect(effect: u32) -> DragAction {
    match effect {
        DROPEFFECT_MOVE => DragAction::MOVE,
        DROPEFFECT_LINK => DragAction::LINK,
        DROPEFFECT_COPY => DragAction::COPY,
        _ => DragAction::empty(),
    }
}

/// The (suggested, possible) actions of a source drag given the held
/// modifiers and the button that started it.
pub fn current_actions(
    state: ModifierType,
    button: u32,
    actions: DragAction,
) -> (DragAction, DragAction) {
    let none = DragAction::empty();

    if (button == 2 || button == 3) && actions.contains(DragAction::ASK) {
        return (DragAction::ASK, actions);
    }

    let shift = state.contains(ModifierType::SHIFT);
    let control = state.contains(ModifierType::CONTROL);

    if shift || control {
        let only = if shift && control {
            DragAction::LINK
        } else if control {
            DragAction::COPY
        } else {
            DragAction::MOVE
        };

        return if actions.contains(only) {
            (only, only)
        } else {
            (none, none)
        };
    }

    let suggested = if state.contains(ModifierType::MOD1) && actions.contains(DragAction::ASK) {
        DragAction::ASK
    } else if actions.contains(DragAction::COPY) {
        DragAction::COPY
    } else if actions.contains(DragAction::MOVE) {
        DragAction::MOVE
    } else if actions.contains(DragAction::LINK) {
        DragAction::LINK
    } else {
        none
    };

    (suggested, actions)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyNavigation {
    Cancel,
    Drop,
    Step(i32, i32),
    Refresh,
}

/// What a key press does to a source drag holding the keyboard.
pub fn key_navigation(
    key: Option<Key>,
    state: ModifierType,
) -> KeyNavigation {
    let step = if state.contains(ModifierType::MOD1) {
        BIG_STEP
    } else {
        SMALL_STEP
    };

    match key {
        Some(Key::Escape) => KeyNavigation::Cancel,
        Some(Key::Space) | Some(Key::Return) | Some(Key::KpEnter) => KeyNavigation::Drop,
        Some(Key::Up) | Some(Key::NumPad(8)) => KeyNavigation::Step(0, -step),
        Some(Key::Down) | Some(Key::NumPad(2)) => KeyNavigation::Step(0, step),
        Some(Key::Left) | Some(Key::NumPad(4)) => KeyNavigation::Step(-step, 0),
        Some(Key::Right) | Some(Key::NumPad(6)) => KeyNavigation::Step(step, 0),
        _ => KeyNavigation::Refresh,
    }
}

/// Whether a broken grab ends the drag. The implicit button grab and
/// grabs moving to the drag's own windows do not.
pub fn grab_break_cancels(
    context: &DragContext,
    implicit: bool,
    grab_window: Option<Window>,
    device: Option<DeviceId>,
) -> bool {
    if implicit {
        return false;
    }

    if grab_window.is_some()
        && (grab_window == context.drag_window || grab_window == context.ipc_window)
    {
        return false;
    }

    device.map_or(true, |device| device == context.device)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::win32::message::MK_LBUTTON;

    #[test]
    fn modifier_keys_pick_the_target_action() {
        assert_eq!(suggested_action(MK_CONTROL | MK_SHIFT, false), DragAction::LINK);
        assert_eq!(suggested_action(MK_CONTROL | MK_LBUTTON, true), DragAction::COPY);
        assert_eq!(suggested_action(MK_ALT, false), DragAction::MOVE);
        assert_eq!(suggested_action(MK_LBUTTON, true), DragAction::MOVE);
        assert_eq!(suggested_action(MK_LBUTTON, false), DragAction::COPY);
    }

    #[test]
    fn drop_effects_map_only_single_actions() {
        for action in vec![DragAction::COPY, DragAction::MOVE, DragAction::LINK] {
            assert_eq!(action_for_drop_effect(drop_effect_for_action(action)), action);
        }

        assert_eq!(drop_effect_for_action(DragAction::COPY | DragAction::MOVE), DROPEFFECT_NONE);
        assert_eq!(drop_effect_for_action(DragAction::ASK), DROPEFFECT_NONE);
        assert_eq!(action_for_drop_effect(8), DragAction::empty());
    }

    #[test]
    fn cursors_name_the_chosen_action() {
        assert_eq!(cursor_for_action(DragAction::MOVE), "dnd-move");
        assert_eq!(cursor_for_action(DragAction::COPY | DragAction::LINK), "dnd-copy");
        assert_eq!(cursor_for_action(DragAction::empty()), "dnd-none");
    }

    #[test]
    fn held_modifiers_restrict_the_possible_actions() {
        let all = DragAction::COPY | DragAction::MOVE | DragAction::LINK;

        assert_eq!(
            current_actions(ModifierType::SHIFT | ModifierType::CONTROL, 1, all),
            (DragAction::LINK, DragAction::LINK)
        );
        assert_eq!(
            current_actions(ModifierType::SHIFT, 1, DragAction::COPY),
            (DragAction::empty(), DragAction::empty())
        );
        assert_eq!(current_actions(ModifierType::empty(), 1, all), (DragAction::COPY, all));
        assert_eq!(
            current_actions(ModifierType::empty(), 3, all | DragAction::ASK),
            (DragAction::ASK, all | DragAction::ASK)
        );
    }

    #[test]
    fn arrows_step_further_with_alt() {
        assert_eq!(key_navigation(Some(Key::Left), ModifierType::empty()), KeyNavigation::Step(-1, 0));
        assert_eq!(key_navigation(Some(Key::Down), ModifierType::MOD1), KeyNavigation::Step(0, 20));
        assert_eq!(key_navigation(Some(Key::Escape), ModifierType::empty()), KeyNavigation::Cancel);
        assert_eq!(key_navigation(Some(Key::KpEnter), ModifierType::empty()), KeyNavigation::Drop);
        assert_eq!(key_navigation(Some(Key::ShiftL), ModifierType::empty()), KeyNavigation::Refresh);
    }

    #[test]
    fn only_foreign_explicit_grabs_cancel() {
        let mut context = DragContext::new(1, DragProtocol::Local, true, 1, 1);
        context.drag_window = Some(5);
        context.ipc_window = Some(6);

        assert!(!grab_break_cancels(&context, true, Some(9), Some(1)));
        assert!(!grab_break_cancels(&context, false, Some(6), Some(1)));
        assert!(!grab_break_cancels(&context, false, Some(9), Some(2)));
        assert!(grab_break_cancels(&context, false, Some(9), Some(1)));
        assert!(grab_break_cancels(&context, false, None, Some(1)));
    }

    #[test]
    fn slide_back_fades_out_toward_the_start() {
        let animation = DragAnimation {
            start_time: 100,
            from: Pos::new(200, 200),
            to: Pos::new(0, 0),
            hot: Pos::new(0, 0),
        };

        let (pos, opacity) = animation.frame(100).unwrap();
        assert_eq!(pos, Pos::new(200, 200));
        assert_eq!(opacity, 1f64);

        let (pos, opacity) = animation.frame(350).unwrap();
        assert!(pos.x < 100 && pos.x > 0);
        assert!((opacity - 0.5).abs() < 1e-9);

        assert!(animation.frame(600).is_none());
    }

    #[test]
    fn contexts_are_found_by_their_endpoints() {
        let mut manager = DndManager::new();
        let source = manager.create(DragProtocol::Local, true, 1, 1);
        let dest = manager.create(DragProtocol::Local, false, 1, 1);

        if let Some(context) = manager.get_mut(source) {
            context.source_window = Some(3);
            context.dest_window = Some(4);
        }

        if let Some(context) = manager.get_mut(dest) {
            context.source_window = Some(3);
            context.dest_window = Some(4);
        }

        assert_eq!(manager.find(true, Some(3), Some(4)), Some(source));
        assert_eq!(manager.find(false, Some(3), None), Some(dest));
        assert_eq!(manager.find(false, Some(7), None), None);

        assert_eq!(manager.forget_window(4), vec![source, dest]);
        assert_eq!(manager.len(), 0);
    }
}
