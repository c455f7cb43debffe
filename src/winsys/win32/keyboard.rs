use crate::aerosnap::SnapCombo;
use crate::input::Key;
use crate::input::ModifierType;
use crate::platform::DisplayPlatform;
use crate::win32::message::*;

use strum::IntoEnumIterator;

/// Scan code of the right shift key on the layouts we know of.
pub const RSHIFT_SCAN_CODE: u16 = 0x36;

/// The modifier and button state as the platform reports it right now.
pub fn modifier_state(platform: &dyn DisplayPlatform) -> ModifierType {
    let mut state = ModifierType::empty();

    let held = [
        (VK_SHIFT, ModifierType::SHIFT),
        (VK_CONTROL, ModifierType::CONTROL),
        (VK_MENU, ModifierType::MOD1),
        (VK_LWIN, ModifierType::SUPER),
        (VK_RWIN, ModifierType::SUPER),
        (VK_LBUTTON, ModifierType::BUTTON1),
        (VK_MBUTTON, ModifierType::BUTTON2),
        (VK_RBUTTON, ModifierType::BUTTON3),
        (VK_XBUTTON1, ModifierType::BUTTON4),
        (VK_XBUTTON2, ModifierType::BUTTON5),
    ];

    for &(virtual_key, mask) in held.iter() {
        if platform.key_down(virtual_key) {
            state |= mask;
        }
    }

    if platform.key_toggled(VK_CAPITAL) {
        state |= ModifierType::LOCK;
    }

    state
}

/// The state carried by a mouse message, whose `wparam` holds the
/// button and shift/control bits.
pub fn pointer_state(
    platform: &dyn DisplayPlatform,
    wparam: usize,
) -> ModifierType {
    let mut state = ModifierType::empty();

    let carried = [
        (MK_CONTROL, ModifierType::CONTROL),
        (MK_SHIFT, ModifierType::SHIFT),
        (MK_LBUTTON, ModifierType::BUTTON1),
        (MK_MBUTTON, ModifierType::BUTTON2),
        (MK_RBUTTON, ModifierType::BUTTON3),
        (MK_XBUTTON1, ModifierType::BUTTON4),
        (MK_XBUTTON2, ModifierType::BUTTON5),
    ];

    for &(bit, mask) in carried.iter() {
        if wparam & bit != 0 {
            state |= mask;
        }
    }

    if platform.key_down(VK_MENU) {
        state |= ModifierType::MOD1;
    }

    if platform.key_toggled(VK_CAPITAL) {
        state |= ModifierType::LOCK;
    }

    state
}

/// The `MK_*` key state a drag loop polls, with Alt folded in.
pub fn drag_key_state(platform: &dyn DisplayPlatform) -> usize {
    let mut key_state = 0;

    let held = [
        (VK_MENU, MK_ALT),
        (VK_CONTROL, MK_CONTROL),
        (VK_SHIFT, MK_SHIFT),
        (VK_LBUTTON, MK_LBUTTON),
        (VK_MBUTTON, MK_MBUTTON),
        (VK_RBUTTON, MK_RBUTTON),
    ];

    for &(virtual_key, bit) in held.iter() {
        if platform.key_down(virtual_key) {
            key_state |= bit;
        }
    }

    key_state
}

pub fn key_for_virtual_key(
    virtual_key: u32,
    scan_code: u16,
    extended: bool,
) -> Option<Key> {
    let key = match virtual_key {
        VK_BACK => Key::Backspace,
        VK_TAB => Key::Tab,
        VK_CLEAR => Key::Clear,
        VK_RETURN if extended => Key::KpEnter,
        VK_RETURN => Key::Return,
        VK_SHIFT if scan_code == RSHIFT_SCAN_CODE => Key::ShiftR,
        VK_SHIFT | VK_LSHIFT => Key::ShiftL,
        VK_RSHIFT => Key::ShiftR,
        VK_CONTROL if extended => Key::ControlR,
        VK_CONTROL | VK_LCONTROL => Key::ControlL,
        VK_RCONTROL => Key::ControlR,
        VK_MENU if extended => Key::AltR,
        VK_MENU | VK_LMENU => Key::AltL,
        VK_RMENU => Key::AltR,
        VK_LWIN => Key::SuperL,
        VK_RWIN => Key::SuperR,
        VK_APPS => Key::Menu,
        VK_PAUSE => Key::Pause,
        VK_CAPITAL => Key::CapsLock,
        VK_ESCAPE => Key::Escape,
        VK_SPACE => Key::Space,
        VK_PRIOR => Key::PageUp,
        VK_NEXT => Key::PageDown,
        VK_END => Key::End,
        VK_HOME => Key::Home,
        VK_LEFT => Key::Left,
        VK_UP => Key::Up,
        VK_RIGHT => Key::Right,
        VK_DOWN => Key::Down,
        VK_SELECT => Key::Select,
        VK_PRINT | VK_SNAPSHOT => Key::Print,
        VK_EXECUTE => Key::Execute,
        VK_INSERT => Key::Insert,
        VK_DELETE => Key::Delete,
        VK_HELP => Key::Help,
        0x30..=0x39 => Key::Digit((virtual_key - 0x30) as u8),
        0x41..=0x5a => Key::Letter(((virtual_key - 0x41) as u8 + b'a') as char),
        VK_NUMPAD0..=VK_NUMPAD9 => Key::NumPad((virtual_key - VK_NUMPAD0) as u8),
        VK_MULTIPLY => Key::Multiply,
        VK_ADD => Key::Add,
        VK_SEPARATOR => Key::Separator,
        VK_SUBTRACT => Key::Subtract,
        VK_DECIMAL => Key::Decimal,
        VK_DIVIDE => Key::Divide,
        VK_F1..=VK_F24 => Key::F((virtual_key - VK_F1 + 1) as u8),
        VK_NUMLOCK => Key::NumLock,
        VK_SCROLL => Key::ScrollLock,
        _ => return None,
    };

    Some(key)
}

pub fn is_modifier_key(virtual_key: u32) -> bool {
    virtual_key == VK_SHIFT || virtual_key == VK_CONTROL || virtual_key == VK_MENU
}

/// Per-display keyboard bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyboardState {
    pub layout: u32,
    /// Low 24 bits of `lparam` of each shift key currently held.
    shift_presses: [isize; 2],
}

impl KeyboardState {
    pub fn new(layout: u32) -> Self {
        Self {
            layout,
            shift_presses: [0, 0],
        }
    }

    /// Only one release arrives when both shift keys are let go together.
    /// Returns the release to synthesize for the other shift key.
    pub fn track_shift(
        &mut self,
        msg: &NativeMessage,
    ) -> Option<NativeMessage> {
        if msg.wparam != VK_SHIFT as usize {
            return None;
        }

        let pressed = msg.lparam & 0x00ff_ffff;

        match msg.message {
            WM_KEYDOWN => {
                if self.shift_presses[0] == 0 {
                    self.shift_presses[0] = pressed;
                } else if self.shift_presses[0] != pressed {
                    self.shift_presses[1] = pressed;
                }

                None
            },
            WM_KEYUP => {
                let presses = self.shift_presses;
                self.shift_presses = [0, 0];

                if presses[0] == 0 || presses[1] == 0 {
                    return None;
                }

                let mut release = msg.clone();
                release.lparam = if presses[0] == pressed {
                    presses[1]
                } else {
                    presses[0]
                };

                Some(release)
            },
            _ => None,
        }
    }
}

/// What the low-level keyboard hook decided about a key stroke.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HookVerdict {
    Pass,
    Snap(SnapCombo),
}

/// Recognises Super+arrow gestures before the window manager sees them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SnapKeyHook {
    last_keydown: Option<u32>,
}

impl SnapKeyHook {
    pub fn new() -> Self {
        Default::default()
    }

    /// `csd` is whether the focused toplevel draws its own decorations,
    /// and `maximized` whether it is maximized.
    ///
    /// The cached key is cleared by any stroke other than a key press of
    /// the same key, not only by its release.
    pub fn stroke(
        &mut self,
        platform: &dyn DisplayPlatform,
        message: u32,
        virtual_key: u32,
        csd: bool,
        maximized: bool,
    ) -> HookVerdict {
        let mut verdict = HookVerdict::Pass;

        let super_down = platform.key_down(VK_LWIN) || platform.key_down(VK_RWIN);

        if message == WM_KEYDOWN && csd && self.last_keydown != Some(virtual_key) && super_down {
            let lshift = platform.key_down(VK_LSHIFT);
            let rshift = platform.key_down(VK_RSHIFT);
            let one_shift = lshift != rshift;

            let combo = match (virtual_key, one_shift) {
                (VK_UP, false) => SnapCombo::Up,
                (VK_DOWN, false) => SnapCombo::Down,
                (VK_LEFT, false) => SnapCombo::Left,
                (VK_RIGHT, false) => SnapCombo::Right,
                (VK_UP, true) => SnapCombo::ShiftUp,
                (VK_DOWN, true) => SnapCombo::ShiftDown,
                _ => SnapCombo::Nothing,
            };

            let wm_handles = combo == SnapCombo::Down
                && maximized
                && platform.wm_handles_maximized_super_down();

            if combo != SnapCombo::Nothing && !wm_handles {
                verdict = HookVerdict::Snap(combo);
            }
        }

        if message == WM_KEYDOWN {
            self.last_keydown = Some(virtual_key);
        } else if self.last_keydown == Some(virtual_key) {
            self.last_keydown = None;
        }

        verdict
    }
}

pub fn combo_to_wparam(combo: SnapCombo) -> usize {
    SnapCombo::iter().position(|other| other == combo).unwrap_or(0)
}

pub fn combo_from_wparam(wparam: usize) -> SnapCombo {
    SnapCombo::iter().nth(wparam).unwrap_or(SnapCombo::Nothing)
}
