#![deny(clippy::all)]

#[macro_use]
extern crate log;

use simplelog::LevelFilter;
use simplelog::SimpleLogger;

use winsys::config::Config;
use winsys::display::DisplayCore;
use winsys::event::Event;
use winsys::event::EventMask;
use winsys::headless::HeadlessPlatform;
use winsys::registry::WindowAttributes;
use winsys::win32::message::message_name;
use winsys::win32::message::NativeMessage;
use winsys::window::Hwnd;
pub use winsys::Result;

use std::collections::HashMap;
use std::env;
use std::fs;

use anyhow::anyhow;

mod script;

use script::Line;

/// Replays a message trace against a headless display and logs every
/// event the core dispatches.
struct Replay {
    core: DisplayCore,
    platform: HeadlessPlatform,
    handles: HashMap<Hwnd, Hwnd>,
}

impl Replay {
    fn new() -> Self {
        let platform = HeadlessPlatform::new();
        let mut core = DisplayCore::new(Box::new(platform.clone()), Config::from_env());

        core.set_event_handler(|_: &mut DisplayCore, event: Event| {
            info!(
                "{:>10} {:<20} window {:?}: {:?}",
                event.time,
                event.name(),
                event.window,
                event.kind
            );
        });

        Self {
            core,
            platform,
            handles: HashMap::new(),
        }
    }

    fn resolve(
        &self,
        hwnd: Hwnd,
    ) -> Hwnd {
        self.handles.get(&hwnd).copied().unwrap_or(hwnd)
    }

    fn apply(
        &mut self,
        line: Line,
    ) -> Result<()> {
        match line {
            Line::Window {
                hwnd,
                parent,
                region,
            } => {
                let (parent, attributes) = match parent {
                    Some(parent) => {
                        let native = self.resolve(parent);
                        let parent = self
                            .core
                            .registry()
                            .lookup(native)
                            .ok_or_else(|| anyhow!("unable to find parent {:#x}", parent))?;

                        (Some(parent), WindowAttributes::child(region))
                    },
                    None => (None, WindowAttributes::toplevel(region)),
                };

                let window = self.core.create_window(
                    parent,
                    &attributes.with_event_mask(EventMask::all_events()),
                )?;

                self.core.show(window);

                if let Some(native) = self.core.registry().hwnd(window) {
                    debug!("trace window {:#x} is {} ({:#x})", hwnd, window, native);
                    self.handles.insert(hwnd, native);
                }
            },
            Line::Foreign {
                hwnd,
                region,
            } => {
                self.platform.state().insert_window(hwnd, region);

                let window = self
                    .core
                    .adopt_native_window(hwnd)
                    .ok_or_else(|| anyhow!("unable to adopt foreign window {:#x}", hwnd))?;

                debug!("trace window {:#x} is foreign window {}", hwnd, window);
            },
            Line::Message {
                time,
                message,
                hwnd,
                wparam,
                lparam,
                pt,
            } => {
                trace!("feeding {} to {:#x}", message_name(message), hwnd);

                let msg = NativeMessage::new(self.resolve(hwnd), message, wparam, lparam)
                    .at(time, pt);

                if let Some(result) = self.core.handle_message(msg) {
                    debug!("{} returned {}", message_name(message), result);
                }
            },
        }

        Ok(())
    }
}

pub fn main() -> Result<()> {
    let mut verbose = false;
    let mut path = None;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-v" | "--verbose" => verbose = true,
            _ => path = Some(arg),
        }
    }

    let level = if verbose {
        LevelFilter::Trace
    } else if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    SimpleLogger::init(level, simplelog::Config::default())?;

    let path = path.ok_or_else(|| anyhow!("usage: wdktrace [--verbose] <trace>"))?;
    let contents = fs::read_to_string(&path)?;
    let mut replay = Replay::new();

    for (number, line) in contents.lines().enumerate() {
        let line = script::parse_line(line)
            .map_err(|err| anyhow!("unable to parse line {}: {}", number + 1, err))?;

        if let Some(line) = line {
            replay.apply(line)?;
        }
    }

    replay.core.process_pending();
    info!("replayed {}", path);

    Ok(())
}
