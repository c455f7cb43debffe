use crate::event::EventMask;
use crate::event::Serial;
use crate::input::DeviceId;
use crate::input::DeviceManager;
use crate::window::Window;

use std::collections::HashMap;

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub enum GrabOwnership {
    None,
    Window,
    Application,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrabInfo {
    pub window: Window,
    pub native_window: Window,
    pub device: DeviceId,
    pub serial_start: Serial,
    /// Exclusive; `None` while the grab has not been ended.
    pub serial_end: Option<Serial>,
    pub event_mask: EventMask,
    pub time: u32,
    pub ownership: GrabOwnership,
    pub activated: bool,
    pub implicit_ungrab: bool,
    pub owner_events: bool,
    pub implicit: bool,
}

impl GrabInfo {
    pub fn covers(
        &self,
        serial: Serial,
    ) -> bool {
        serial >= self.serial_start && self.serial_end.map_or(true, |end| serial < end)
    }

    pub fn is_active_at(
        &self,
        serial: Serial,
    ) -> bool {
        self.activated && self.covers(serial)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchGrab {
    pub device: DeviceId,
    pub sequence: u32,
    pub window: Window,
    pub native_window: Window,
    pub serial: Serial,
    pub event_mask: EventMask,
    pub time: u32,
}

/// What the owner of the registry has to do after the active grab of a
/// device moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrabTransition {
    Activated {
        grab: GrabInfo,
    },
    Broken {
        window: Window,
        implicit: bool,
        grab_window: Option<Window>,
    },
    BreakTouch {
        new_window: Window,
    },
    Switched {
        grab: Option<GrabInfo>,
        last: GrabInfo,
    },
}

pub struct GrabRegistry {
    grabs: HashMap<DeviceId, Vec<GrabInfo>>,
    touch_grabs: Vec<TouchGrab>,
}

impl GrabRegistry {
    pub fn new() -> Self {
        Self {
            grabs: HashMap::new(),
            touch_grabs: Vec::new(),
        }
    }

    /// Inserts after grabs starting at the same serial; neighbours are
    /// trimmed so their intervals do not overlap the new one.
    pub fn add(
        &mut self,
        grab: GrabInfo,
    ) -> &GrabInfo {
        let grabs = self.grabs.entry(grab.device).or_insert_with(Vec::new);
        let serial_start = grab.serial_start;

        let index = grabs
            .iter()
            .position(|other| serial_start < other.serial_start)
            .unwrap_or_else(|| grabs.len());

        grabs.insert(index, grab);

        if let Some(next_start) = grabs.get(index + 1).map(|next| next.serial_start) {
            grabs[index].serial_end = Some(next_start);
        } else {
            grabs[index].serial_end = None;
        }

        if index > 0 {
            grabs[index - 1].serial_end = Some(serial_start);
        }

        &grabs[index]
    }

    pub fn last(
        &self,
        device: DeviceId,
    ) -> Option<&GrabInfo> {
        self.grabs.get(&device).and_then(|grabs| grabs.last())
    }

    fn find_index(
        &self,
        device: DeviceId,
        serial: Serial,
    ) -> Option<usize> {
        self.grabs
            .get(&device)
            .and_then(|grabs| grabs.iter().position(|grab| grab.covers(serial)))
    }

    /// The grab whose serial interval contains `serial`.
    pub fn active_at(
        &self,
        device: DeviceId,
        serial: Serial,
    ) -> Option<&GrabInfo> {
        self.find_index(device, serial)
            .and_then(|index| self.grabs.get(&device).map(|grabs| &grabs[index]))
    }

    pub fn grabs(
        &self,
        device: DeviceId,
    ) -> &[GrabInfo] {
        self.grabs.get(&device).map_or(&[], Vec::as_slice)
    }

    pub fn devices(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = self.grabs.keys().copied().collect();
        devices.sort();
        devices
    }

    /// Ends the grab covering `serial`, provided `if_child` (when given) is
    /// the grab window or one of its ancestors. Returns whether the grab
    /// that ended was the last one queued for the device.
    pub fn end<F>(
        &mut self,
        device: DeviceId,
        serial: Serial,
        if_child: Option<Window>,
        implicit: bool,
        is_ancestor_or_self: F,
    ) -> bool
    where
        F: Fn(Window, Window) -> bool,
    {
        let index = match self.find_index(device, serial) {
            Some(index) => index,
            None => return false,
        };

        if let Some(grabs) = self.grabs.get_mut(&device) {
            let grab = &mut grabs[index];

            if if_child.map_or(true, |ancestor| is_ancestor_or_self(ancestor, grab.window)) {
                grab.serial_end = Some(serial);
                grab.implicit_ungrab = implicit;

                return index + 1 == grabs.len();
            }
        }

        false
    }

    /// Retires expired grabs and activates the one now in effect.
    pub fn update(
        &mut self,
        device: DeviceId,
        current_serial: Serial,
    ) -> Vec<GrabTransition> {
        let mut transitions = Vec::new();

        let grabs = match self.grabs.get_mut(&device) {
            Some(grabs) => grabs,
            None => return transitions,
        };

        while !grabs.is_empty() {
            let current = &mut grabs[0];

            if current.serial_start > current_serial {
                break;
            }

            if current.serial_end.map_or(true, |end| end > current_serial) {
                if !current.activated {
                    current.activated = true;
                    transitions.push(GrabTransition::Activated {
                        grab: current.clone(),
                    });
                }

                break;
            }

            let mut next = grabs
                .get(1)
                .filter(|next| next.serial_start <= current_serial)
                .cloned();

            let current = grabs.remove(0);

            if let Some(next) = next.as_ref() {
                transitions.push(GrabTransition::BreakTouch {
                    new_window: next.window,
                });
            }

            let broken = match next.as_ref() {
                None => current.implicit_ungrab,
                Some(next) => current.window != next.window,
            };

            if broken {
                transitions.push(GrabTransition::Broken {
                    window: current.window,
                    implicit: current.implicit,
                    grab_window: next.as_ref().map(|next| next.window),
                });
            }

            if let Some(next) = next.as_mut() {
                next.activated = true;
                grabs[0].activated = true;
            }

            transitions.push(GrabTransition::Switched {
                grab: next,
                last: current,
            });
        }

        if grabs.is_empty() {
            self.grabs.remove(&device);
        }

        transitions
    }

    /// False when a device of the same class holds a grab of strictly
    /// higher ownership at `serial`.
    pub fn check_ownership(
        &self,
        devices: &DeviceManager,
        device: DeviceId,
        serial: Serial,
    ) -> bool {
        let keyboard = devices.is_keyboard(device);
        let mut higher = GrabOwnership::None;
        let mut own = GrabOwnership::None;

        for (&other, grabs) in self.grabs.iter() {
            if devices.is_keyboard(other) != keyboard {
                continue;
            }

            if let Some(grab) = grabs.iter().find(|grab| grab.covers(serial)) {
                if other == device {
                    own = grab.ownership;
                } else if grab.ownership > higher {
                    higher = grab.ownership;
                }
            }
        }

        higher <= own
    }

    /// Whether a new grab of `ownership` on `device` is refused because
    /// another device of the same class holds a stronger one.
    pub fn blocks_grab(
        &self,
        devices: &DeviceManager,
        device: DeviceId,
        ownership: GrabOwnership,
        serial: Serial,
    ) -> bool {
        if ownership == GrabOwnership::None {
            return false;
        }

        let keyboard = devices.is_keyboard(device);

        self.grabs.iter().any(|(&other, grabs)| {
            other != device
                && devices.is_keyboard(other) == keyboard
                && grabs
                    .iter()
                    .any(|grab| grab.covers(serial) && grab.ownership > ownership)
        })
    }

    pub fn add_touch_grab(
        &mut self,
        grab: TouchGrab,
    ) {
        self.touch_grabs.push(grab);
    }

    pub fn remove_touch_grab(
        &mut self,
        device: DeviceId,
        sequence: u32,
    ) -> bool {
        match self
            .touch_grabs
            .iter()
            .position(|grab| grab.device == device && grab.sequence == sequence)
        {
            Some(index) => {
                self.touch_grabs.swap_remove(index);
                true
            },
            None => false,
        }
    }

    pub fn find_touch_grab(
        &self,
        device: DeviceId,
        sequence: u32,
    ) -> Option<&TouchGrab> {
        self.touch_grabs
            .iter()
            .find(|grab| grab.device == device && grab.sequence == sequence)
    }

    pub fn has_touch_grab(
        &self,
        device: DeviceId,
        sequence: u32,
        serial: Serial,
    ) -> Option<&TouchGrab> {
        self.find_touch_grab(device, sequence)
            .filter(|grab| serial >= grab.serial)
    }

    /// Touch grabs of `device` that a new grab on `new_window` breaks.
    pub fn touch_grabs_broken_by(
        &self,
        device: DeviceId,
        new_window: Window,
    ) -> Vec<(u32, Window)> {
        self.touch_grabs
            .iter()
            .filter(|grab| grab.device == device && grab.window != new_window)
            .map(|grab| (grab.sequence, grab.window))
            .collect()
    }

    /// Drops every grab on a window that is going away.
    pub fn forget_window(
        &mut self,
        window: Window,
    ) {
        self.touch_grabs
            .retain(|grab| grab.window != window && grab.native_window != window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grab(
        window: Window,
        serial_start: Serial,
        implicit: bool,
    ) -> GrabInfo {
        GrabInfo {
            window,
            native_window: window,
            device: 1,
            serial_start,
            serial_end: None,
            event_mask: EventMask::all_events(),
            time: 0,
            ownership: GrabOwnership::None,
            activated: false,
            implicit_ungrab: false,
            owner_events: false,
            implicit,
        }
    }

    fn same(
        ancestor: Window,
        window: Window,
    ) -> bool {
        ancestor == window
    }

    #[test]
    fn later_grab_closes_the_previous_interval() {
        let mut registry = GrabRegistry::new();

        registry.add(grab(10, 5, true));
        registry.add(grab(20, 8, false));

        assert_eq!(registry.grabs(1)[0].serial_end, Some(8));
        assert_eq!(registry.grabs(1)[1].serial_end, None);
    }

    #[test]
    fn out_of_order_grab_ends_before_its_successor() {
        let mut registry = GrabRegistry::new();

        registry.add(grab(10, 10, false));
        registry.add(grab(20, 4, false));

        assert_eq!(registry.grabs(1)[0].window, 20);
        assert_eq!(registry.grabs(1)[0].serial_end, Some(10));
    }

    #[test]
    fn at_most_one_grab_is_active_at_any_serial() {
        let mut registry = GrabRegistry::new();

        registry.add(grab(10, 1, true));
        registry.add(grab(20, 3, false));
        registry.add(grab(30, 3, false));
        registry.add(grab(40, 7, false));
        registry.grabs.get_mut(&1).unwrap().iter_mut().for_each(|g| g.activated = true);

        for serial in 0..12 {
            let active = registry
                .grabs(1)
                .iter()
                .filter(|g| g.is_active_at(serial))
                .count();

            assert!(active <= 1, "serial {} has {} active grabs", serial, active);
        }
    }

    #[test]
    fn end_respects_if_child() {
        let mut registry = GrabRegistry::new();
        registry.add(grab(10, 1, true));

        assert!(!registry.end(1, 2, Some(99), false, same));
        assert_eq!(registry.grabs(1)[0].serial_end, None);

        assert!(registry.end(1, 2, Some(10), true, same));
        assert_eq!(registry.grabs(1)[0].serial_end, Some(2));
        assert!(registry.grabs(1)[0].implicit_ungrab);
    }

    #[test]
    fn ending_without_a_grab_is_a_no_op() {
        let mut registry = GrabRegistry::new();

        assert!(!registry.end(1, 2, None, false, same));
        assert!(registry.update(1, 2).is_empty());
    }

    #[test]
    fn expired_implicit_ungrab_reports_broken_grab() {
        let mut registry = GrabRegistry::new();
        registry.add(grab(10, 1, true));

        assert_eq!(registry.update(1, 1).len(), 1);
        registry.end(1, 3, None, true, same);

        let transitions = registry.update(1, 3);

        assert_eq!(
            transitions[0],
            GrabTransition::Broken {
                window: 10,
                implicit: true,
                grab_window: None,
            }
        );
        assert!(registry.last(1).is_none());
    }

    #[test]
    fn stealing_a_grab_breaks_it_for_the_old_window() {
        let mut registry = GrabRegistry::new();
        registry.add(grab(10, 1, false));
        registry.update(1, 1);
        registry.add(grab(20, 4, false));

        let transitions = registry.update(1, 4);

        assert!(transitions.contains(&GrabTransition::Broken {
            window: 10,
            implicit: false,
            grab_window: Some(20),
        }));
        assert!(registry.active_at(1, 4).map_or(false, |g| g.activated));
    }

    #[test]
    fn ownership_blocks_lower_grabs_of_the_same_class() {
        let devices = DeviceManager::new();
        let mut registry = GrabRegistry::new();

        let mut keyboard_grab = grab(10, 1, false);
        keyboard_grab.device = devices.core_keyboard;
        keyboard_grab.ownership = GrabOwnership::Application;
        registry.add(keyboard_grab);

        let mut pointer_grab = grab(10, 1, false);
        pointer_grab.device = devices.system_pointer;
        pointer_grab.ownership = GrabOwnership::Window;
        registry.add(pointer_grab);

        assert!(registry.check_ownership(&devices, devices.core_keyboard, 2));
        assert!(!registry.check_ownership(&devices, devices.core_pointer, 2));
        assert!(registry.check_ownership(&devices, devices.system_pointer, 2));

        assert!(!registry.blocks_grab(&devices, devices.core_pointer, GrabOwnership::None, 2));
        assert!(!registry.blocks_grab(&devices, devices.core_pointer, GrabOwnership::Application, 2));
        assert!(!registry.blocks_grab(&devices, devices.core_keyboard, GrabOwnership::Window, 2));

        let mut app_grab = grab(11, 1, false);
        app_grab.device = devices.system_keyboard;
        app_grab.ownership = GrabOwnership::Application;
        registry.add(app_grab);

        assert!(registry.blocks_grab(&devices, devices.core_keyboard, GrabOwnership::Window, 2));
    }

    #[test]
    fn touch_grabs_are_active_from_their_serial() {
        let mut registry = GrabRegistry::new();
        registry.add_touch_grab(TouchGrab {
            device: 5,
            sequence: 1,
            window: 10,
            native_window: 10,
            serial: 4,
            event_mask: EventMask::TOUCH,
            time: 0,
        });

        assert!(registry.has_touch_grab(5, 1, 3).is_none());
        assert!(registry.has_touch_grab(5, 1, 4).is_some());
        assert_eq!(registry.touch_grabs_broken_by(5, 20), vec![(1, 10)]);
        assert!(registry.remove_touch_grab(5, 1));
        assert!(!registry.remove_touch_grab(5, 1));
    }
}
