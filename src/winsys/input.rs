pub use crate::Result;

use std::collections::HashMap;
use std::convert::TryFrom;

use anyhow::anyhow;
use bitflags::bitflags;
use strum::EnumIter;
use strum::IntoEnumIterator;

pub type DeviceId = u32;
pub type SeatId = u32;

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ModifierType: u32 {
        const SHIFT   = 1 << 0;
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
        const MOD2    = 1 << 4;
        const SUPER   = 1 << 5;
        const BUTTON1 = 1 << 8;
        const BUTTON2 = 1 << 9;
        const BUTTON3 = 1 << 10;
        const BUTTON4 = 1 << 11;
        const BUTTON5 = 1 << 12;
    }
}

impl Default for ModifierType {
    fn default() -> Self {
        ModifierType::empty()
    }
}

impl ModifierType {
    pub fn buttons() -> Self {
        ModifierType::BUTTON1
            | ModifierType::BUTTON2
            | ModifierType::BUTTON3
            | ModifierType::BUTTON4
            | ModifierType::BUTTON5
    }

    pub fn for_button(button: u32) -> Self {
        match button {
            1 => ModifierType::BUTTON1,
            2 => ModifierType::BUTTON2,
            3 => ModifierType::BUTTON3,
            4 => ModifierType::BUTTON4,
            5 => ModifierType::BUTTON5,
            _ => ModifierType::empty(),
        }
    }
}

#[repr(u8)]
#[derive(Debug, PartialEq, EnumIter, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum Modifier {
    Ctrl = 1 << 0,
    Shift = 1 << 1,
    Alt = 1 << 2,
    AltGr = 1 << 3,
    Super = 1 << 4,
    CapsLock = 1 << 5,
}

impl Modifier {
    pub fn mask(&self) -> ModifierType {
        match self {
            Modifier::Ctrl => ModifierType::CONTROL,
            Modifier::Shift => ModifierType::SHIFT,
            Modifier::Alt => ModifierType::MOD1,
            Modifier::AltGr => ModifierType::MOD2,
            Modifier::Super => ModifierType::SUPER,
            Modifier::CapsLock => ModifierType::LOCK,
        }
    }

    pub fn mask_of(modifiers: &[Modifier]) -> ModifierType {
        modifiers
            .iter()
            .fold(ModifierType::empty(), |acc, m| acc | m.mask())
    }

    pub fn from_mask(mask: ModifierType) -> Vec<Modifier> {
        Modifier::iter().filter(|m| mask.contains(m.mask())).collect()
    }
}

impl TryFrom<&str> for Modifier {
    type Error = anyhow::Error;

    fn try_from(val: &str) -> Result<Self> {
        match val {
            "C" => Ok(Self::Ctrl),
            "A" => Ok(Self::Alt),
            "S" => Ok(Self::Shift),
            "M" => Ok(Self::Super),
            "AltGr" => Ok(Self::AltGr),
            "Caps" => Ok(Self::CapsLock),
            _ => Err(anyhow!("unable to resolve \"{}\" to modifier", val)),
        }
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum InputSource {
    Mouse,
    Pen,
    Eraser,
    Cursor,
    Keyboard,
    Touchscreen,
    Touchpad,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum DeviceKind {
    Master,
    Slave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub source: InputSource,
    pub kind: DeviceKind,
    pub associated: Option<DeviceId>,
    pub seat: SeatId,
}

impl Device {
    pub fn is_keyboard(&self) -> bool {
        self.source == InputSource::Keyboard
    }
}

/// The four devices of the single seat the platform exposes.
#[derive(Debug, Clone)]
pub struct DeviceManager {
    devices: HashMap<DeviceId, Device>,
    pub core_pointer: DeviceId,
    pub core_keyboard: DeviceId,
    pub system_pointer: DeviceId,
    pub system_keyboard: DeviceId,
    pub seat: SeatId,
}

impl DeviceManager {
    pub fn new() -> Self {
        let seat = 1;
        let mut devices = HashMap::new();

        let mut add = |id, name: &str, source, kind, associated| {
            devices.insert(id, Device {
                id,
                name: name.to_owned(),
                source,
                kind,
                associated,
                seat,
            });
        };

        add(1, "Virtual Core Pointer", InputSource::Mouse, DeviceKind::Master, Some(2));
        add(2, "Virtual Core Keyboard", InputSource::Keyboard, DeviceKind::Master, Some(1));
        add(3, "System Aggregated Pointer", InputSource::Mouse, DeviceKind::Slave, Some(1));
        add(4, "System Aggregated Keyboard", InputSource::Keyboard, DeviceKind::Slave, Some(2));

        Self {
            devices,
            core_pointer: 1,
            core_keyboard: 2,
            system_pointer: 3,
            system_keyboard: 4,
            seat,
        }
    }

    pub fn get(
        &self,
        id: DeviceId,
    ) -> Option<&Device> {
        self.devices.get(&id)
    }

    pub fn is_keyboard(
        &self,
        id: DeviceId,
    ) -> bool {
        self.devices.get(&id).map_or(false, Device::is_keyboard)
    }

    /// Masters of the same class as `id` (pointer or keyboard), excluding `id`.
    pub fn peers(
        &self,
        id: DeviceId,
    ) -> Vec<DeviceId> {
        let keyboard = self.is_keyboard(id);
        let mut peers: Vec<DeviceId> = self
            .devices
            .values()
            .filter(|device| {
                device.id != id
                    && device.kind == DeviceKind::Master
                    && device.is_keyboard() == keyboard
            })
            .map(|device| device.id)
            .collect();

        peers.sort();
        peers
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClickCount {
    Single,
    Double,
    Triple,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Click {
    window: u32,
    button: u32,
    time: u32,
    x: i32,
    y: i32,
}

/// The last two presses per device, for multi-click classification.
#[derive(Debug, Default)]
pub struct ClickTracker {
    clicks: HashMap<DeviceId, [Option<Click>; 2]>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Default::default()
    }

    /// Classifies a press. A triple click resets the history, so a fourth
    /// press starts over as a single click.
    pub fn press(
        &mut self,
        device: DeviceId,
        window: u32,
        button: u32,
        time: u32,
        pos: (i32, i32),
        double_click_time: u32,
        double_click_distance: i32,
    ) -> ClickCount {
        let click = Click {
            window,
            button,
            time,
            x: pos.0,
            y: pos.1,
        };

        let matches = |previous: &Option<Click>, within: u32| {
            previous.map_or(false, |previous| {
                previous.window == window
                    && previous.button == button
                    && time.wrapping_sub(previous.time) < within
                    && (previous.x - click.x).abs() <= double_click_distance
                    && (previous.y - click.y).abs() <= double_click_distance
            })
        };

        let history = self.clicks.entry(device).or_insert([None, None]);

        if matches(&history[1], double_click_time.saturating_mul(2))
            && matches(&history[0], double_click_time)
        {
            *history = [None, None];
            return ClickCount::Triple;
        }

        let count = if matches(&history[0], double_click_time) {
            ClickCount::Double
        } else {
            ClickCount::Single
        };

        if count == ClickCount::Single {
            *history = [Some(click), None];
        } else {
            history[1] = history[0];
            history[0] = Some(click);
        }

        count
    }

    pub fn forget_window(
        &mut self,
        window: u32,
    ) {
        for history in self.clicks.values_mut() {
            for click in history.iter_mut() {
                if click.map_or(false, |click| click.window == window) {
                    *click = None;
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Key {
    VoidSymbol,
    Backspace,
    Tab,
    Clear,
    Return,
    KpEnter,
    ShiftL,
    ShiftR,
    ControlL,
    ControlR,
    AltL,
    AltR,
    SuperL,
    SuperR,
    Menu,
    Pause,
    CapsLock,
    Escape,
    Space,
    PageUp,
    PageDown,
    End,
    Home,
    Left,
    Up,
    Right,
    Down,
    Select,
    Print,
    Execute,
    Insert,
    Delete,
    Help,
    Digit(u8),
    Letter(char),
    NumPad(u8),
    Multiply,
    Add,
    Separator,
    Subtract,
    Decimal,
    Divide,
    F(u8),
    NumLock,
    ScrollLock,
    Unicode(char),
}

impl Key {
    pub fn is_modifier(&self) -> bool {
        match self {
            Key::ShiftL
            | Key::ShiftR
            | Key::ControlL
            | Key::ControlR
            | Key::AltL
            | Key::AltR
            | Key::SuperL
            | Key::SuperR
            | Key::CapsLock
            | Key::NumLock => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_round_trip_through_masks() {
        let modifiers = vec![Modifier::Ctrl, Modifier::Shift];
        let mask = Modifier::mask_of(&modifiers);

        assert_eq!(mask, ModifierType::CONTROL | ModifierType::SHIFT);
        assert_eq!(Modifier::from_mask(mask), modifiers);
    }

    #[test]
    fn unknown_modifier_names_are_rejected() {
        assert_eq!(Modifier::try_from("S").ok(), Some(Modifier::Shift));
        assert!(Modifier::try_from("Hyper").is_err());
    }

    #[test]
    fn clicks_escalate_within_time_and_distance() {
        let mut clicks = ClickTracker::new();

        assert_eq!(clicks.press(1, 5, 1, 1000, (10, 10), 400, 5), ClickCount::Single);
        assert_eq!(clicks.press(1, 5, 1, 1200, (13, 12), 400, 5), ClickCount::Double);
        assert_eq!(clicks.press(1, 5, 1, 1350, (13, 12), 400, 5), ClickCount::Triple);
        assert_eq!(clicks.press(1, 5, 1, 1400, (13, 12), 400, 5), ClickCount::Single);

        assert_eq!(clicks.press(1, 5, 1, 3000, (10, 10), 400, 5), ClickCount::Single);
        assert_eq!(clicks.press(1, 5, 1, 3100, (20, 10), 400, 5), ClickCount::Single);
        assert_eq!(clicks.press(1, 6, 1, 3150, (20, 10), 400, 5), ClickCount::Single);
        assert_eq!(clicks.press(1, 6, 3, 3200, (20, 10), 400, 5), ClickCount::Single);
    }

    #[test]
    fn pointer_peers_exclude_keyboards() {
        let devices = DeviceManager::new();

        assert!(devices.peers(devices.core_pointer).is_empty());
        assert!(devices.is_keyboard(devices.core_keyboard));
        assert!(!devices.is_keyboard(devices.system_pointer));
    }
}
