pub use crate::Result;

use crate::atoms::Atom;
use crate::geometry::Region;
use crate::input::ClickCount;
use crate::input::DeviceId;
use crate::input::Key;
use crate::input::ModifierType;
use crate::input::SeatId;
use crate::window::Window;
use crate::window::WindowState;

use bitflags::bitflags;

pub type Serial = u64;
pub type DragContextId = u32;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct EventMask: u32 {
        const EXPOSURE            = 1 << 1;
        const POINTER_MOTION      = 1 << 2;
        const POINTER_MOTION_HINT = 1 << 3;
        const BUTTON_MOTION       = 1 << 4;
        const BUTTON1_MOTION      = 1 << 5;
        const BUTTON2_MOTION      = 1 << 6;
        const BUTTON3_MOTION      = 1 << 7;
        const BUTTON_PRESS        = 1 << 8;
        const BUTTON_RELEASE      = 1 << 9;
        const KEY_PRESS           = 1 << 10;
        const KEY_RELEASE         = 1 << 11;
        const ENTER_NOTIFY        = 1 << 12;
        const LEAVE_NOTIFY        = 1 << 13;
        const FOCUS_CHANGE        = 1 << 14;
        const STRUCTURE           = 1 << 15;
        const PROPERTY_CHANGE     = 1 << 16;
        const VISIBILITY_NOTIFY   = 1 << 17;
        const SUBSTRUCTURE        = 1 << 20;
        const SCROLL              = 1 << 21;
        const TOUCH               = 1 << 22;
        const SMOOTH_SCROLL       = 1 << 23;
    }
}

impl Default for EventMask {
    fn default() -> Self {
        EventMask::empty()
    }
}

impl EventMask {
    pub fn all_events() -> Self {
        EventMask::all()
    }

    /// The motion bits a press of any of `buttons` makes relevant.
    pub fn for_motion(state: ModifierType) -> Self {
        let mut mask = EventMask::POINTER_MOTION;

        if state.intersects(ModifierType::buttons()) {
            mask |= EventMask::BUTTON_MOTION;
        }

        if state.contains(ModifierType::BUTTON1) {
            mask |= EventMask::BUTTON1_MOTION;
        }

        if state.contains(ModifierType::BUTTON2) {
            mask |= EventMask::BUTTON2_MOTION;
        }

        if state.contains(ModifierType::BUTTON3) {
            mask |= EventMask::BUTTON3_MOTION;
        }

        mask
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct EventFlags: u8 {
        const PENDING          = 1 << 0;
        const POINTER_EMULATED = 1 << 1;
        const FLUSHED          = 1 << 2;
    }
}

impl Default for EventFlags {
    fn default() -> Self {
        EventFlags::empty()
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub enum CrossingMode {
    Normal,
    Grab,
    Ungrab,
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub enum NotifyDetail {
    Ancestor,
    Virtual,
    Inferior,
    Nonlinear,
    NonlinearVirtual,
    Unknown,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CrossingData {
    pub x: f64,
    pub y: f64,
    pub x_root: f64,
    pub y_root: f64,
    pub mode: CrossingMode,
    pub detail: NotifyDetail,
    pub subwindow: Option<Window>,
    pub state: ModifierType,
    pub focus: bool,
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
    Smooth,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyData {
    pub keyval: Option<Key>,
    pub virtual_key: u32,
    pub scan_code: u16,
    pub state: ModifierType,
    pub string: String,
    pub is_modifier: bool,
    pub group: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DndData {
    pub context: DragContextId,
    pub x_root: i32,
    pub y_root: i32,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum OwnerChangeReason {
    NewOwner,
    Destroy,
    Close,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum SettingAction {
    New,
    Changed,
    Deleted,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum PropertyState {
    NewValue,
    Delete,
}

/// Results of a grab request, in the order the abstract layer reports them.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum GrabStatus {
    Success,
    AlreadyGrabbed,
    InvalidTime,
    NotViewable,
    Frozen,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Nothing,
    Delete,
    Destroy,
    Expose {
        area: Region,
        count: u32,
    },
    Motion {
        x: f64,
        y: f64,
        x_root: f64,
        y_root: f64,
        state: ModifierType,
        is_hint: bool,
    },
    ButtonPress {
        button: u32,
        x: f64,
        y: f64,
        x_root: f64,
        y_root: f64,
        state: ModifierType,
        click: ClickCount,
    },
    ButtonRelease {
        button: u32,
        x: f64,
        y: f64,
        x_root: f64,
        y_root: f64,
        state: ModifierType,
    },
    KeyPress(KeyData),
    KeyRelease(KeyData),
    Enter(CrossingData),
    Leave(CrossingData),
    FocusChange {
        focus_in: bool,
    },
    Configure {
        region: Region,
    },
    Map,
    Unmap,
    PropertyNotify {
        atom: Atom,
        state: PropertyState,
    },
    SelectionClear {
        selection: Atom,
    },
    SelectionRequest {
        selection: Atom,
        target: Atom,
        property: Atom,
        requestor: Option<Window>,
    },
    SelectionNotify {
        selection: Atom,
        target: Atom,
        property: Option<Atom>,
    },
    OwnerChange {
        owner: Option<Window>,
        reason: OwnerChangeReason,
        selection: Atom,
    },
    DragEnter(DndData),
    DragLeave(DndData),
    DragMotion(DndData),
    DragStatus(DndData),
    DropStart(DndData),
    DropFinished {
        context: DragContextId,
        success: bool,
    },
    Scroll {
        x: f64,
        y: f64,
        x_root: f64,
        y_root: f64,
        state: ModifierType,
        direction: ScrollDirection,
        delta_x: f64,
        delta_y: f64,
    },
    WindowState {
        changed: WindowState,
        new: WindowState,
    },
    Setting {
        action: SettingAction,
        name: String,
    },
    GrabBroken {
        keyboard: bool,
        implicit: bool,
        grab_window: Option<Window>,
    },
}

impl EventKind {
    /// The event mask bit a window must select to receive this kind.
    pub fn mask(&self) -> EventMask {
        match self {
            EventKind::Expose {
                ..
            } => EventMask::EXPOSURE,
            EventKind::Motion {
                state, ..
            } => EventMask::for_motion(*state),
            EventKind::ButtonPress {
                ..
            } => EventMask::BUTTON_PRESS,
            EventKind::ButtonRelease {
                ..
            } => EventMask::BUTTON_RELEASE,
            EventKind::KeyPress(_) => EventMask::KEY_PRESS,
            EventKind::KeyRelease(_) => EventMask::KEY_RELEASE,
            EventKind::Enter(_) => EventMask::ENTER_NOTIFY,
            EventKind::Leave(_) => EventMask::LEAVE_NOTIFY,
            EventKind::FocusChange {
                ..
            } => EventMask::FOCUS_CHANGE,
            EventKind::Configure {
                ..
            }
            | EventKind::Map
            | EventKind::Unmap
            | EventKind::WindowState {
                ..
            } => EventMask::STRUCTURE,
            EventKind::PropertyNotify {
                ..
            } => EventMask::PROPERTY_CHANGE,
            EventKind::Scroll {
                direction: ScrollDirection::Smooth,
                ..
            } => EventMask::SMOOTH_SCROLL,
            EventKind::Scroll {
                ..
            } => EventMask::SCROLL,
            _ => EventMask::empty(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Nothing => "nothing",
            EventKind::Delete => "delete",
            EventKind::Destroy => "destroy",
            EventKind::Expose {
                ..
            } => "expose",
            EventKind::Motion {
                ..
            } => "motion",
            EventKind::ButtonPress {
                click: ClickCount::Single,
                ..
            } => "button-press",
            EventKind::ButtonPress {
                click: ClickCount::Double,
                ..
            } => "2button-press",
            EventKind::ButtonPress {
                ..
            } => "3button-press",
            EventKind::ButtonRelease {
                ..
            } => "button-release",
            EventKind::KeyPress(_) => "key-press",
            EventKind::KeyRelease(_) => "key-release",
            EventKind::Enter(_) => "enter",
            EventKind::Leave(_) => "leave",
            EventKind::FocusChange {
                ..
            } => "focus-change",
            EventKind::Configure {
                ..
            } => "configure",
            EventKind::Map => "map",
            EventKind::Unmap => "unmap",
            EventKind::PropertyNotify {
                ..
            } => "property-notify",
            EventKind::SelectionClear {
                ..
            } => "selection-clear",
            EventKind::SelectionRequest {
                ..
            } => "selection-request",
            EventKind::SelectionNotify {
                ..
            } => "selection-notify",
            EventKind::OwnerChange {
                ..
            } => "owner-change",
            EventKind::DragEnter(_) => "drag-enter",
            EventKind::DragLeave(_) => "drag-leave",
            EventKind::DragMotion(_) => "drag-motion",
            EventKind::DragStatus(_) => "drag-status",
            EventKind::DropStart(_) => "drop-start",
            EventKind::DropFinished {
                ..
            } => "drop-finished",
            EventKind::Scroll {
                ..
            } => "scroll",
            EventKind::WindowState {
                ..
            } => "window-state",
            EventKind::Setting {
                ..
            } => "setting",
            EventKind::GrabBroken {
                ..
            } => "grab-broken",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub window: Option<Window>,
    pub send_event: bool,
    pub time: u32,
    pub device: Option<DeviceId>,
    pub source_device: Option<DeviceId>,
    pub seat: Option<SeatId>,
    pub flags: EventFlags,
}

impl Event {
    pub fn new(
        kind: EventKind,
        window: Option<Window>,
    ) -> Self {
        Self {
            kind,
            window,
            send_event: false,
            time: 0,
            device: None,
            source_device: None,
            seat: None,
            flags: EventFlags::empty(),
        }
    }

    pub fn with_time(
        mut self,
        time: u32,
    ) -> Self {
        self.time = time;
        self
    }

    pub fn with_device(
        mut self,
        device: DeviceId,
        source_device: DeviceId,
    ) -> Self {
        self.device = Some(device);
        self.source_device = Some(source_device);
        self
    }

    pub fn with_seat(
        mut self,
        seat: SeatId,
    ) -> Self {
        self.seat = Some(seat);
        self
    }

    pub fn with_flags(
        mut self,
        flags: EventFlags,
    ) -> Self {
        self.flags |= flags;
        self
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_pending(&self) -> bool {
        self.flags.contains(EventFlags::PENDING)
    }

    pub fn is_pointer_emulated(&self) -> bool {
        self.flags.contains(EventFlags::POINTER_EMULATED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_motion_masks_follow_held_buttons() {
        let mask = EventMask::for_motion(ModifierType::BUTTON1 | ModifierType::SHIFT);

        assert!(mask.contains(EventMask::POINTER_MOTION | EventMask::BUTTON_MOTION));
        assert!(mask.contains(EventMask::BUTTON1_MOTION));
        assert!(!mask.contains(EventMask::BUTTON2_MOTION));
    }

    #[test]
    fn multi_press_events_are_named_by_count() {
        let press = |click| EventKind::ButtonPress {
            button: 1,
            x: 0f64,
            y: 0f64,
            x_root: 0f64,
            y_root: 0f64,
            state: ModifierType::empty(),
            click,
        };

        assert_eq!(press(ClickCount::Single).name(), "button-press");
        assert_eq!(press(ClickCount::Double).name(), "2button-press");
        assert_eq!(press(ClickCount::Triple).name(), "3button-press");
    }

    #[test]
    fn discrete_and_smooth_scrolls_select_different_masks() {
        let scroll = |direction| EventKind::Scroll {
            x: 0f64,
            y: 0f64,
            x_root: 0f64,
            y_root: 0f64,
            state: ModifierType::empty(),
            direction,
            delta_x: 0f64,
            delta_y: 0f64,
        };

        assert_eq!(scroll(ScrollDirection::Smooth).mask(), EventMask::SMOOTH_SCROLL);
        assert_eq!(scroll(ScrollDirection::Up).mask(), EventMask::SCROLL);
    }
}
