use crate::event::Serial;
use crate::input::DeviceId;
use crate::input::DeviceManager;
use crate::input::ModifierType;
use crate::window::Window;

use std::collections::HashMap;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerWindowInfo {
    pub toplevel_under_pointer: Option<Window>,
    pub window_under_pointer: Option<Window>,
    pub toplevel_x: f64,
    pub toplevel_y: f64,
    pub state: ModifierType,
    pub button: u32,
    pub last_slave: Option<DeviceId>,
    pub need_touch_press_enter: bool,
}

impl Default for PointerWindowInfo {
    fn default() -> Self {
        Self {
            toplevel_under_pointer: None,
            window_under_pointer: None,
            toplevel_x: 0f64,
            toplevel_y: 0f64,
            state: ModifierType::empty(),
            button: 0,
            last_slave: None,
            need_touch_press_enter: false,
        }
    }
}

const MOTION_HINT_DISARMED: Serial = Serial::MAX;

pub struct PointerTracker {
    infos: HashMap<DeviceId, PointerWindowInfo>,
    motion_hints: HashMap<DeviceId, Serial>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self {
            infos: HashMap::new(),
            motion_hints: HashMap::new(),
        }
    }

    /// Keyboards share the record of their associated pointer.
    fn resolve(
        devices: &DeviceManager,
        device: DeviceId,
    ) -> DeviceId {
        match devices.get(device) {
            Some(info) if info.is_keyboard() => info.associated.unwrap_or(device),
            _ => device,
        }
    }

    pub fn info(
        &self,
        devices: &DeviceManager,
        device: DeviceId,
    ) -> PointerWindowInfo {
        self.infos
            .get(&Self::resolve(devices, device))
            .copied()
            .unwrap_or_default()
    }

    pub fn info_mut(
        &mut self,
        devices: &DeviceManager,
        device: DeviceId,
    ) -> &mut PointerWindowInfo {
        self.infos
            .entry(Self::resolve(devices, device))
            .or_insert_with(Default::default)
    }

    pub fn window_under_pointer(
        &self,
        devices: &DeviceManager,
        device: DeviceId,
    ) -> Option<Window> {
        self.info(devices, device).window_under_pointer
    }

    /// Arms the next motion event of `device` to be delivered as a hint.
    pub fn enable_motion_hints(
        &mut self,
        device: DeviceId,
        next_serial: Serial,
    ) {
        let armed = self
            .motion_hints
            .entry(device)
            .or_insert(MOTION_HINT_DISARMED);

        if *armed != 0 {
            let serial = next_serial.saturating_sub(1);

            if serial < *armed {
                *armed = serial;
            }
        }
    }

    /// Whether a motion event at `serial` may reach a hint-selecting
    /// window. Delivering it disarms the hint again.
    pub fn consume_motion_hint(
        &mut self,
        device: DeviceId,
        serial: Serial,
    ) -> bool {
        match self.motion_hints.get_mut(&device) {
            Some(armed) if *armed == 0 || serial >= *armed => {
                *armed = MOTION_HINT_DISARMED;
                true
            },
            _ => false,
        }
    }

    /// A copy of every record, so callers can mutate the tracker while
    /// walking it.
    pub fn snapshot(&self) -> Vec<(DeviceId, PointerWindowInfo)> {
        let mut infos: Vec<(DeviceId, PointerWindowInfo)> =
            self.infos.iter().map(|(&device, &info)| (device, info)).collect();

        infos.sort_by_key(|&(device, _)| device);
        infos
    }

    pub fn for_each<F>(
        &mut self,
        mut func: F,
    ) where
        F: FnMut(&mut Self, DeviceId, PointerWindowInfo),
    {
        for (device, info) in self.snapshot() {
            func(self, device, info);
        }
    }

    /// Clears every reference to `window`, returning the devices that had
    /// it under the pointer.
    pub fn forget_window(
        &mut self,
        window: Window,
    ) -> Vec<DeviceId> {
        let mut devices = Vec::new();

        for (&device, info) in self.infos.iter_mut() {
            if info.window_under_pointer == Some(window) {
                info.window_under_pointer = None;
                devices.push(device);
            }

            if info.toplevel_under_pointer == Some(window) {
                info.toplevel_under_pointer = None;
            }
        }

        devices.sort();
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboards_share_their_pointer_record() {
        let devices = DeviceManager::new();
        let mut tracker = PointerTracker::new();

        tracker.info_mut(&devices, devices.core_pointer).window_under_pointer = Some(7);

        assert_eq!(
            tracker.window_under_pointer(&devices, devices.core_keyboard),
            Some(7)
        );
    }

    #[test]
    fn motion_hints_fire_once_per_arming() {
        let mut tracker = PointerTracker::new();

        assert!(!tracker.consume_motion_hint(1, 10));

        tracker.enable_motion_hints(1, 11);
        assert!(tracker.consume_motion_hint(1, 10));
        assert!(!tracker.consume_motion_hint(1, 12));
    }

    #[test]
    fn walking_a_snapshot_allows_mutation() {
        let devices = DeviceManager::new();
        let mut tracker = PointerTracker::new();

        tracker.info_mut(&devices, 1).window_under_pointer = Some(3);
        tracker.info_mut(&devices, 3).window_under_pointer = Some(3);

        tracker.for_each(|tracker, device, info| {
            if info.window_under_pointer == Some(3) {
                tracker.info_mut(&devices, device).window_under_pointer = None;
            }
        });

        assert!(tracker.snapshot().iter().all(|(_, info)| info.window_under_pointer.is_none()));
    }

    #[test]
    fn forgetting_a_window_reports_affected_devices() {
        let devices = DeviceManager::new();
        let mut tracker = PointerTracker::new();

        tracker.info_mut(&devices, 1).window_under_pointer = Some(3);
        tracker.info_mut(&devices, 3).toplevel_under_pointer = Some(3);

        assert_eq!(tracker.forget_window(3), vec![1]);
        assert!(tracker.info(&devices, 3).toplevel_under_pointer.is_none());
    }
}
