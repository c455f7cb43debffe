pub mod clipboard;
pub mod drag;
pub mod dropfiles;
pub mod keyboard;
pub mod message;
pub mod ole2;
pub mod translate;
