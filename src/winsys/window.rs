use crate::Result;

use std::convert::TryFrom;

use anyhow::anyhow;
use bitflags::bitflags;
use strum::EnumIter;

pub type Window = u32;
pub type Hwnd = usize;

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub enum WindowType {
    Root,
    Toplevel,
    Child,
    Temp,
    Foreign,
    Offscreen,
}

impl WindowType {
    pub fn is_toplevel(&self) -> bool {
        match self {
            WindowType::Toplevel | WindowType::Temp | WindowType::Foreign => true,
            _ => false,
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct WindowState: u32 {
        const WITHDRAWN  = 1 << 0;
        const ICONIFIED  = 1 << 1;
        const MAXIMIZED  = 1 << 2;
        const STICKY     = 1 << 3;
        const FULLSCREEN = 1 << 4;
        const ABOVE      = 1 << 5;
        const BELOW      = 1 << 6;
        const FOCUSED    = 1 << 7;
        const TILED      = 1 << 8;
    }
}

impl Default for WindowState {
    fn default() -> Self {
        WindowState::WITHDRAWN
    }
}

impl WindowState {
    /// The bits carried across a transient hide/show cycle.
    pub fn restorable(self) -> Self {
        self & (WindowState::ICONIFIED
            | WindowState::MAXIMIZED
            | WindowState::WITHDRAWN
            | WindowState::ABOVE)
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq, EnumIter)]
pub enum TypeHint {
    Normal,
    Dialog,
    Menu,
    Toolbar,
    Splashscreen,
    Utility,
    Dock,
    Desktop,
    DropdownMenu,
    PopupMenu,
    Tooltip,
    Notification,
    Combo,
    Dnd,
}

impl TryFrom<&str> for TypeHint {
    type Error = anyhow::Error;

    fn try_from(val: &str) -> Result<Self> {
        match val {
            "normal" => Ok(Self::Normal),
            "dialog" => Ok(Self::Dialog),
            "menu" => Ok(Self::Menu),
            "toolbar" => Ok(Self::Toolbar),
            "splashscreen" => Ok(Self::Splashscreen),
            "utility" => Ok(Self::Utility),
            "dock" => Ok(Self::Dock),
            "desktop" => Ok(Self::Desktop),
            "dropdown-menu" => Ok(Self::DropdownMenu),
            "popup-menu" => Ok(Self::PopupMenu),
            "tooltip" => Ok(Self::Tooltip),
            "notification" => Ok(Self::Notification),
            "combo" => Ok(Self::Combo),
            "dnd" => Ok(Self::Dnd),
            _ => Err(anyhow!("unable to resolve \"{}\" to type hint", val)),
        }
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Decorations: u8 {
        const ALL      = 1 << 0;
        const BORDER   = 1 << 1;
        const RESIZEH  = 1 << 2;
        const TITLE    = 1 << 3;
        const MENU     = 1 << 4;
        const MINIMIZE = 1 << 5;
        const MAXIMIZE = 1 << 6;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Functions: u8 {
        const ALL      = 1 << 0;
        const RESIZE   = 1 << 1;
        const MOVE     = 1 << 2;
        const MINIMIZE = 1 << 3;
        const MAXIMIZE = 1 << 4;
        const CLOSE    = 1 << 5;
    }
}

/// The edge or corner grabbed by an interactive resize.
#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq, EnumIter)]
pub enum WindowEdge {
    NorthWest,
    North,
    NorthEast,
    West,
    East,
    SouthWest,
    South,
    SouthEast,
}

impl WindowEdge {
    pub fn moves_left(&self) -> bool {
        match self {
            WindowEdge::NorthWest | WindowEdge::West | WindowEdge::SouthWest => true,
            _ => false,
        }
    }

    pub fn moves_right(&self) -> bool {
        match self {
            WindowEdge::NorthEast | WindowEdge::East | WindowEdge::SouthEast => true,
            _ => false,
        }
    }

    pub fn moves_top(&self) -> bool {
        match self {
            WindowEdge::NorthWest | WindowEdge::North | WindowEdge::NorthEast => true,
            _ => false,
        }
    }

    pub fn moves_bottom(&self) -> bool {
        match self {
            WindowEdge::SouthWest | WindowEdge::South | WindowEdge::SouthEast => true,
            _ => false,
        }
    }

    /// Purely vertical grips, the only ones that can snap full-up.
    pub fn is_vertical(&self) -> bool {
        *self == WindowEdge::North || *self == WindowEdge::South
    }

    pub fn cursor_name(&self) -> &'static str {
        match self {
            WindowEdge::NorthWest => "nw-resize",
            WindowEdge::North => "n-resize",
            WindowEdge::NorthEast => "ne-resize",
            WindowEdge::West => "w-resize",
            WindowEdge::East => "e-resize",
            WindowEdge::SouthWest => "sw-resize",
            WindowEdge::South => "s-resize",
            WindowEdge::SouthEast => "se-resize",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strum::IntoEnumIterator;

    #[test]
    fn every_edge_moves_at_least_one_side() {
        for edge in WindowEdge::iter() {
            assert!(
                edge.moves_left() || edge.moves_right() || edge.moves_top() || edge.moves_bottom()
            );
            assert!(!(edge.moves_left() && edge.moves_right()));
            assert!(!(edge.moves_top() && edge.moves_bottom()));
        }
    }

    #[test]
    fn type_hints_parse_by_name() {
        assert_eq!(TypeHint::try_from("dialog").ok(), Some(TypeHint::Dialog));
        assert!(TypeHint::try_from("sidebar").is_err());
    }

    #[test]
    fn restorable_state_drops_focus() {
        let state = WindowState::MAXIMIZED | WindowState::FOCUSED | WindowState::ABOVE;

        assert_eq!(state.restorable(), WindowState::MAXIMIZED | WindowState::ABOVE);
    }
}
