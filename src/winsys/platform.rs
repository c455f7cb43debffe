pub use crate::Result;

use crate::atoms::Format;
use crate::geometry::Pos;
use crate::geometry::Region;
use crate::indicator::Surface;
use crate::monitor::Monitor;
use crate::win32::message::NativeMessage;
use crate::window::Hwnd;
use crate::window::WindowType;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ShowCommand {
    Hide,
    Show,
    ShowNoActivate,
    Minimize,
    Maximize,
    Restore,
}

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum StackMode {
    Raise,
    Lower,
    Topmost,
    NoTopmost,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NativeWindowAttributes {
    pub parent: Option<Hwnd>,
    pub region: Region,
    pub kind: WindowType,
    pub layered: bool,
    pub topmost: bool,
}

/// The services the core needs from a windowing backend. All geometry
/// crossing this boundary is in device pixels and screen coordinates.
pub trait DisplayPlatform {
    fn name(&self) -> &str;

    /// Milliseconds since an arbitrary epoch, wrapping at 32 bits.
    fn tick_count(&mut self) -> u32;

    /// The handle standing in for the root window.
    fn desktop_window(&self) -> Hwnd;

    fn create_native_window(
        &mut self,
        attributes: NativeWindowAttributes,
    ) -> Result<Hwnd>;
    fn destroy_native_window(
        &mut self,
        hwnd: Hwnd,
    );
    fn show_window(
        &mut self,
        hwnd: Hwnd,
        command: ShowCommand,
    );
    fn set_window_pos(
        &mut self,
        hwnd: Hwnd,
        region: Region,
    ) -> Result<()>;
    fn restack_window(
        &mut self,
        hwnd: Hwnd,
        mode: StackMode,
    );
    fn set_parent(
        &mut self,
        hwnd: Hwnd,
        parent: Option<Hwnd>,
    );
    fn window_rect(
        &self,
        hwnd: Hwnd,
    ) -> Option<Region>;
    fn window_from_point(
        &self,
        pos: Pos,
    ) -> Option<Hwnd>;
    fn is_iconic(
        &self,
        hwnd: Hwnd,
    ) -> bool;
    fn is_zoomed(
        &self,
        hwnd: Hwnd,
    ) -> bool;
    fn is_topmost(
        &self,
        hwnd: Hwnd,
    ) -> bool;
    fn is_visible(
        &self,
        hwnd: Hwnd,
    ) -> bool;
    fn normal_placement(
        &self,
        hwnd: Hwnd,
    ) -> Option<Region>;
    fn set_normal_placement(
        &mut self,
        hwnd: Hwnd,
        region: Region,
    );
    fn take_update_region(
        &mut self,
        hwnd: Hwnd,
    ) -> Option<Region>;

    fn set_capture(
        &mut self,
        hwnd: Hwnd,
    );
    fn release_capture(&mut self);
    fn capture(&self) -> Option<Hwnd>;
    fn warp_pointer(
        &mut self,
        pos: Pos,
    );
    fn pointer_position(&self) -> Pos;
    fn set_cursor(
        &mut self,
        name: Option<&str>,
    );
    fn track_mouse_leave(
        &mut self,
        hwnd: Hwnd,
    );

    fn foreground_window(&self) -> Option<Hwnd>;
    fn set_foreground_window(
        &mut self,
        hwnd: Hwnd,
    ) -> bool;
    fn set_focus(
        &mut self,
        hwnd: Hwnd,
    );

    fn key_down(
        &self,
        virtual_key: u32,
    ) -> bool;
    fn key_toggled(
        &self,
        virtual_key: u32,
    ) -> bool;
    /// Removes the next character message queued for `hwnd`, if any.
    fn take_char_message(
        &mut self,
        hwnd: Hwnd,
    ) -> Option<NativeMessage>;
    fn keyboard_layout(&self) -> u32;
    fn double_click_metrics(&self) -> (u32, i32);

    fn post_message(
        &mut self,
        message: NativeMessage,
    );
    fn next_message(&mut self) -> Option<NativeMessage>;
    fn set_timer(
        &mut self,
        hwnd: Hwnd,
        id: usize,
        interval: u32,
    );
    fn kill_timer(
        &mut self,
        hwnd: Hwnd,
        id: usize,
    );

    /// Monitors in device pixels, with their scale factor.
    fn monitors(&self) -> Vec<Monitor>;
    fn virtual_screen(&self) -> Region;
    /// Newer window managers restore a maximized window on Super+Down themselves.
    fn wm_handles_maximized_super_down(&self) -> bool;
    fn update_layered_window(
        &mut self,
        hwnd: Hwnd,
        region: Region,
        surface: &Surface,
        opacity: f64,
    ) -> Result<()>;

    fn open_clipboard(
        &mut self,
        owner: Option<Hwnd>,
    ) -> bool;
    fn close_clipboard(&mut self);
    fn empty_clipboard(&mut self) -> bool;
    fn clipboard_formats(&self) -> Vec<Format>;
    fn is_clipboard_format_available(
        &self,
        format: Format,
    ) -> bool;
    fn clipboard_data(
        &self,
        format: Format,
    ) -> Option<Vec<u8>>;
    /// `None` announces the format for delayed rendering.
    fn set_clipboard_data(
        &mut self,
        format: Format,
        data: Option<Vec<u8>>,
    ) -> bool;
    fn clipboard_owner(&self) -> Option<Hwnd>;
    fn register_clipboard_format(
        &mut self,
        name: &str,
    ) -> Format;
    fn clipboard_format_name(
        &self,
        format: Format,
    ) -> Option<String>;

    /// Follows a shell link to its target path.
    fn resolve_link(
        &self,
        path: &str,
    ) -> Option<String>;
    fn shell_id_list_paths(
        &self,
        data: &[u8],
    ) -> Vec<String>;

    fn register_drop_target(
        &mut self,
        hwnd: Hwnd,
    ) -> bool;
    fn revoke_drop_target(
        &mut self,
        hwnd: Hwnd,
    );
    fn accept_files(
        &mut self,
        hwnd: Hwnd,
        accept: bool,
    );
}
