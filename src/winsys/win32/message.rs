use crate::geometry::Dim;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::window::Hwnd;

pub const WM_NULL: u32 = 0x0000;
pub const WM_CREATE: u32 = 0x0001;
pub const WM_DESTROY: u32 = 0x0002;
pub const WM_MOVE: u32 = 0x0003;
pub const WM_SIZE: u32 = 0x0005;
pub const WM_ACTIVATE: u32 = 0x0006;
pub const WM_SETFOCUS: u32 = 0x0007;
pub const WM_KILLFOCUS: u32 = 0x0008;
pub const WM_PAINT: u32 = 0x000f;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_ERASEBKGND: u32 = 0x0014;
pub const WM_SHOWWINDOW: u32 = 0x0018;
pub const WM_SETTINGCHANGE: u32 = 0x001a;
pub const WM_ACTIVATEAPP: u32 = 0x001c;
pub const WM_SETCURSOR: u32 = 0x0020;
pub const WM_MOUSEACTIVATE: u32 = 0x0021;
pub const WM_GETMINMAXINFO: u32 = 0x0024;
pub const WM_WINDOWPOSCHANGING: u32 = 0x0046;
pub const WM_WINDOWPOSCHANGED: u32 = 0x0047;
pub const WM_INPUTLANGCHANGE: u32 = 0x0051;
pub const WM_DISPLAYCHANGE: u32 = 0x007e;
pub const WM_NCCREATE: u32 = 0x0081;
pub const WM_NCDESTROY: u32 = 0x0082;
pub const WM_NCHITTEST: u32 = 0x0084;
pub const WM_KEYDOWN: u32 = 0x0100;
pub const WM_KEYUP: u32 = 0x0101;
pub const WM_CHAR: u32 = 0x0102;
pub const WM_DEADCHAR: u32 = 0x0103;
pub const WM_SYSKEYDOWN: u32 = 0x0104;
pub const WM_SYSKEYUP: u32 = 0x0105;
pub const WM_SYSCHAR: u32 = 0x0106;
pub const WM_SYSDEADCHAR: u32 = 0x0107;
pub const WM_IME_STARTCOMPOSITION: u32 = 0x010d;
pub const WM_IME_ENDCOMPOSITION: u32 = 0x010e;
pub const WM_SYSCOMMAND: u32 = 0x0112;
pub const WM_TIMER: u32 = 0x0113;
pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_LBUTTONDBLCLK: u32 = 0x0203;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_RBUTTONDBLCLK: u32 = 0x0206;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MBUTTONDBLCLK: u32 = 0x0209;
pub const WM_MOUSEWHEEL: u32 = 0x020a;
pub const WM_XBUTTONDOWN: u32 = 0x020b;
pub const WM_XBUTTONUP: u32 = 0x020c;
pub const WM_XBUTTONDBLCLK: u32 = 0x020d;
pub const WM_MOUSEHWHEEL: u32 = 0x020e;
pub const WM_SIZING: u32 = 0x0214;
pub const WM_CAPTURECHANGED: u32 = 0x0215;
pub const WM_DROPFILES: u32 = 0x0233;
pub const WM_MOUSELEAVE: u32 = 0x02a3;
pub const WM_DPICHANGED: u32 = 0x02e0;
pub const WM_RENDERFORMAT: u32 = 0x0305;
pub const WM_RENDERALLFORMATS: u32 = 0x0306;
pub const WM_DESTROYCLIPBOARD: u32 = 0x0307;
pub const WM_CLIPBOARDUPDATE: u32 = 0x031d;
pub const WM_USER: u32 = 0x0400;
pub const WM_APP: u32 = 0x8000;

/// Posted by the low-level keyboard hook to the focused toplevel.
pub const WM_AEROSNAP: u32 = WM_APP + 0x0100;

pub const VK_LBUTTON: u32 = 0x01;
pub const VK_RBUTTON: u32 = 0x02;
pub const VK_MBUTTON: u32 = 0x04;
pub const VK_XBUTTON1: u32 = 0x05;
pub const VK_XBUTTON2: u32 = 0x06;
pub const VK_BACK: u32 = 0x08;
pub const VK_TAB: u32 = 0x09;
pub const VK_CLEAR: u32 = 0x0c;
pub const VK_RETURN: u32 = 0x0d;
pub const VK_SHIFT: u32 = 0x10;
pub const VK_CONTROL: u32 = 0x11;
pub const VK_MENU: u32 = 0x12;
pub const VK_PAUSE: u32 = 0x13;
pub const VK_CAPITAL: u32 = 0x14;
pub const VK_ESCAPE: u32 = 0x1b;
pub const VK_SPACE: u32 = 0x20;
pub const VK_PRIOR: u32 = 0x21;
pub const VK_NEXT: u32 = 0x22;
pub const VK_END: u32 = 0x23;
pub const VK_HOME: u32 = 0x24;
pub const VK_LEFT: u32 = 0x25;
pub const VK_UP: u32 = 0x26;
pub const VK_RIGHT: u32 = 0x27;
pub const VK_DOWN: u32 = 0x28;
pub const VK_SELECT: u32 = 0x29;
pub const VK_PRINT: u32 = 0x2a;
pub const VK_EXECUTE: u32 = 0x2b;
pub const VK_SNAPSHOT: u32 = 0x2c;
pub const VK_INSERT: u32 = 0x2d;
pub const VK_DELETE: u32 = 0x2e;
pub const VK_HELP: u32 = 0x2f;
pub const VK_LWIN: u32 = 0x5b;
pub const VK_RWIN: u32 = 0x5c;
pub const VK_APPS: u32 = 0x5d;
pub const VK_NUMPAD0: u32 = 0x60;
pub const VK_NUMPAD9: u32 = 0x69;
pub const VK_MULTIPLY: u32 = 0x6a;
pub const VK_ADD: u32 = 0x6b;
pub const VK_SEPARATOR: u32 = 0x6c;
pub const VK_SUBTRACT: u32 = 0x6d;
pub const VK_DECIMAL: u32 = 0x6e;
pub const VK_DIVIDE: u32 = 0x6f;
pub const VK_F1: u32 = 0x70;
pub const VK_F4: u32 = 0x73;
pub const VK_F10: u32 = 0x79;
pub const VK_F24: u32 = 0x87;
pub const VK_NUMLOCK: u32 = 0x90;
pub const VK_SCROLL: u32 = 0x91;
pub const VK_LSHIFT: u32 = 0xa0;
pub const VK_RSHIFT: u32 = 0xa1;
pub const VK_LCONTROL: u32 = 0xa2;
pub const VK_RCONTROL: u32 = 0xa3;
pub const VK_LMENU: u32 = 0xa4;
pub const VK_RMENU: u32 = 0xa5;
pub const VK_PROCESSKEY: u32 = 0xe5;

pub const MK_LBUTTON: usize = 0x0001;
pub const MK_RBUTTON: usize = 0x0002;
pub const MK_SHIFT: usize = 0x0004;
pub const MK_CONTROL: usize = 0x0008;
pub const MK_MBUTTON: usize = 0x0010;
pub const MK_XBUTTON1: usize = 0x0020;
pub const MK_XBUTTON2: usize = 0x0040;
/// Only meaningful in drag-and-drop key states.
pub const MK_ALT: usize = 0x0020;

pub const KF_EXTENDED: u32 = 0x0100;
pub const KF_ALTDOWN: u32 = 0x2000;
pub const KF_REPEAT: u32 = 0x4000;
pub const KF_UP: u32 = 0x8000;

pub const WHEEL_DELTA: i32 = 120;

pub const XBUTTON1: u16 = 0x0001;
pub const XBUTTON2: u16 = 0x0002;

pub const SIZE_RESTORED: usize = 0;
pub const SIZE_MINIMIZED: usize = 1;
pub const SIZE_MAXIMIZED: usize = 2;

pub const WA_INACTIVE: usize = 0;
pub const WA_ACTIVE: usize = 1;
pub const WA_CLICKACTIVE: usize = 2;

pub const MA_ACTIVATE: isize = 1;
pub const MA_ACTIVATEANDEAT: isize = 2;
pub const MA_NOACTIVATE: isize = 3;
pub const MA_NOACTIVATEANDEAT: isize = 4;

pub const HTNOWHERE: isize = 0;
pub const HTCLIENT: isize = 1;

pub const WMSZ_LEFT: usize = 1;
pub const WMSZ_RIGHT: usize = 2;
pub const WMSZ_TOP: usize = 3;
pub const WMSZ_TOPLEFT: usize = 4;
pub const WMSZ_TOPRIGHT: usize = 5;
pub const WMSZ_BOTTOM: usize = 6;
pub const WMSZ_BOTTOMLEFT: usize = 7;
pub const WMSZ_BOTTOMRIGHT: usize = 8;

pub const SC_MINIMIZE: usize = 0xf020;
pub const SC_MAXIMIZE: usize = 0xf030;
pub const SC_RESTORE: usize = 0xf120;

pub struct Hex32(pub u32);

impl std::fmt::Debug for Hex32 {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{:#06x}", &self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MinMaxInfo {
    pub max_size: Dim,
    pub max_position: Pos,
    pub min_track_size: Dim,
    pub max_track_size: Dim,
}

impl Default for MinMaxInfo {
    fn default() -> Self {
        Self {
            max_size: Dim::default(),
            max_position: Pos::default(),
            min_track_size: Dim::new(1, 1),
            max_track_size: Dim::new(i32::MAX / 2, i32::MAX / 2),
        }
    }
}

/// Data a native message points at through its parameters; handlers may
/// write their answer back into it.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    MinMaxInfo(MinMaxInfo),
    Rect(Region),
    Files {
        paths: Vec<String>,
        point: Pos,
    },
}

impl Default for Payload {
    fn default() -> Self {
        Payload::None
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeMessage {
    pub hwnd: Hwnd,
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
    pub time: u32,
    pub pt: Pos,
    pub payload: Payload,
}

impl NativeMessage {
    pub fn new(
        hwnd: Hwnd,
        message: u32,
        wparam: usize,
        lparam: isize,
    ) -> Self {
        Self {
            hwnd,
            message,
            wparam,
            lparam,
            time: 0,
            pt: Pos::default(),
            payload: Payload::None,
        }
    }

    pub fn at(
        mut self,
        time: u32,
        pt: Pos,
    ) -> Self {
        self.time = time;
        self.pt = pt;
        self
    }

    pub fn with_payload(
        mut self,
        payload: Payload,
    ) -> Self {
        self.payload = payload;
        self
    }

    /// Client-relative point packed in the low and high words of `lparam`.
    pub fn lparam_point(&self) -> Pos {
        Pos {
            x: (self.lparam & 0xffff) as u16 as i16 as i32,
            y: ((self.lparam >> 16) & 0xffff) as u16 as i16 as i32,
        }
    }

    pub fn wparam_low(&self) -> u16 {
        (self.wparam & 0xffff) as u16
    }

    pub fn wparam_high(&self) -> u16 {
        ((self.wparam >> 16) & 0xffff) as u16
    }

    pub fn lparam_low(&self) -> u16 {
        (self.lparam & 0xffff) as u16
    }

    pub fn lparam_high(&self) -> u16 {
        ((self.lparam >> 16) & 0xffff) as u16
    }

    pub fn key_flags(&self) -> u32 {
        self.lparam_high() as u32
    }

    pub fn scan_code(&self) -> u16 {
        self.lparam_high() & 0xff
    }

    pub fn is_extended_key(&self) -> bool {
        self.key_flags() & KF_EXTENDED != 0
    }

    pub fn is_key_repeat(&self) -> bool {
        self.key_flags() & KF_REPEAT != 0
    }

    pub fn wheel_delta(&self) -> i32 {
        self.wparam_high() as i16 as i32
    }
}

pub fn make_lparam(
    low: i32,
    high: i32,
) -> isize {
    (((high as u32 & 0xffff) << 16) | (low as u32 & 0xffff)) as i32 as isize
}

pub fn make_wparam(
    low: u32,
    high: u32,
) -> usize {
    (((high & 0xffff) << 16) | (low & 0xffff)) as usize
}

pub fn message_name(message: u32) -> &'static str {
    match message {
        WM_NULL => "WM_NULL",
        WM_CREATE => "WM_CREATE",
        WM_DESTROY => "WM_DESTROY",
        WM_MOVE => "WM_MOVE",
        WM_SIZE => "WM_SIZE",
        WM_ACTIVATE => "WM_ACTIVATE",
        WM_SETFOCUS => "WM_SETFOCUS",
        WM_KILLFOCUS => "WM_KILLFOCUS",
        WM_PAINT => "WM_PAINT",
        WM_CLOSE => "WM_CLOSE",
        WM_SHOWWINDOW => "WM_SHOWWINDOW",
        WM_SETTINGCHANGE => "WM_SETTINGCHANGE",
        WM_ACTIVATEAPP => "WM_ACTIVATEAPP",
        WM_SETCURSOR => "WM_SETCURSOR",
        WM_MOUSEACTIVATE => "WM_MOUSEACTIVATE",
        WM_GETMINMAXINFO => "WM_GETMINMAXINFO",
        WM_WINDOWPOSCHANGED => "WM_WINDOWPOSCHANGED",
        WM_INPUTLANGCHANGE => "WM_INPUTLANGCHANGE",
        WM_DISPLAYCHANGE => "WM_DISPLAYCHANGE",
        WM_NCHITTEST => "WM_NCHITTEST",
        WM_KEYDOWN => "WM_KEYDOWN",
        WM_KEYUP => "WM_KEYUP",
        WM_CHAR => "WM_CHAR",
        WM_SYSKEYDOWN => "WM_SYSKEYDOWN",
        WM_SYSKEYUP => "WM_SYSKEYUP",
        WM_IME_STARTCOMPOSITION => "WM_IME_STARTCOMPOSITION",
        WM_IME_ENDCOMPOSITION => "WM_IME_ENDCOMPOSITION",
        WM_SYSCOMMAND => "WM_SYSCOMMAND",
        WM_TIMER => "WM_TIMER",
        WM_MOUSEMOVE => "WM_MOUSEMOVE",
        WM_LBUTTONDOWN => "WM_LBUTTONDOWN",
        WM_LBUTTONUP => "WM_LBUTTONUP",
        WM_RBUTTONDOWN => "WM_RBUTTONDOWN",
        WM_RBUTTONUP => "WM_RBUTTONUP",
        WM_MBUTTONDOWN => "WM_MBUTTONDOWN",
        WM_MBUTTONUP => "WM_MBUTTONUP",
        WM_MOUSEWHEEL => "WM_MOUSEWHEEL",
        WM_XBUTTONDOWN => "WM_XBUTTONDOWN",
        WM_XBUTTONUP => "WM_XBUTTONUP",
        WM_MOUSEHWHEEL => "WM_MOUSEHWHEEL",
        WM_SIZING => "WM_SIZING",
        WM_CAPTURECHANGED => "WM_CAPTURECHANGED",
        WM_DROPFILES => "WM_DROPFILES",
        WM_MOUSELEAVE => "WM_MOUSELEAVE",
        WM_DPICHANGED => "WM_DPICHANGED",
        WM_RENDERFORMAT => "WM_RENDERFORMAT",
        WM_RENDERALLFORMATS => "WM_RENDERALLFORMATS",
        WM_DESTROYCLIPBOARD => "WM_DESTROYCLIPBOARD",
        WM_CLIPBOARDUPDATE => "WM_CLIPBOARDUPDATE",
        WM_AEROSNAP => "WM_AEROSNAP",
        _ => "WM_UNKNOWN",
    }
}

/// Resolves a message name as written in traces, or a numeric id.
pub fn parse_message(name: &str) -> Option<u32> {
    if let Some(hex) = name.strip_prefix("0x") {
        return u32::from_str_radix(hex, 16).ok();
    }

    if let Ok(id) = name.parse::<u32>() {
        return Some(id);
    }

    (WM_NULL..=WM_AEROSNAP)
        .find(|&id| message_name(id) == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_points_are_sign_extended() {
        let msg = NativeMessage::new(1, WM_MOUSEMOVE, 0, make_lparam(-5, 300));

        assert_eq!(msg.lparam_point(), Pos::new(-5, 300));
    }

    #[test]
    fn wheel_delta_is_signed() {
        let msg = NativeMessage::new(1, WM_MOUSEWHEEL, make_wparam(0, (-120i32) as u32), 0);

        assert_eq!(msg.wheel_delta(), -WHEEL_DELTA);
    }

    #[test]
    fn message_names_parse_back() {
        assert_eq!(parse_message("WM_LBUTTONDOWN"), Some(WM_LBUTTONDOWN));
        assert_eq!(parse_message("0x0200"), Some(WM_MOUSEMOVE));
        assert_eq!(parse_message("WM_BOGUS"), None);
    }
}
