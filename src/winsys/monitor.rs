use crate::geometry::Dim;
use crate::geometry::Pos;
use crate::geometry::Region;

#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum SubpixelLayout {
    Unknown,
    None,
    HorizontalRgb,
    HorizontalBgr,
    VerticalRgb,
    VerticalBgr,
}

/// A physical output, with geometry and workarea in logical pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub connector: Option<String>,
    pub geometry: Region,
    pub workarea: Region,
    pub physical_size: Dim,
    pub scale: i32,
    pub refresh_rate: i32,
    pub subpixel_layout: SubpixelLayout,
}

impl Monitor {
    pub fn new(
        geometry: Region,
        workarea: Region,
    ) -> Self {
        Self {
            manufacturer: None,
            model: None,
            connector: None,
            geometry,
            workarea,
            physical_size: Dim::default(),
            scale: 1,
            refresh_rate: 60000,
            subpixel_layout: SubpixelLayout::Unknown,
        }
    }

    pub fn contains(
        &self,
        pos: Pos,
    ) -> bool {
        self.geometry.contains_point(pos)
    }
}

/// Index of the monitor containing `pos`, falling back to the nearest one.
pub fn monitor_at(
    monitors: &[Monitor],
    pos: Pos,
) -> Option<usize> {
    if let Some(index) = monitors.iter().position(|monitor| monitor.contains(pos)) {
        return Some(index);
    }

    monitors
        .iter()
        .enumerate()
        .min_by_key(|(_, monitor)| {
            let center = monitor.geometry.center();
            let (dx, dy) = center.dist(pos).values();

            (dx as i64).pow(2) + (dy as i64).pow(2)
        })
        .map(|(index, _)| index)
}

/// Index of the monitor with the largest overlap with `region`.
pub fn monitor_for_region(
    monitors: &[Monitor],
    region: Region,
) -> Option<usize> {
    monitors
        .iter()
        .enumerate()
        .filter_map(|(index, monitor)| {
            monitor
                .geometry
                .intersection(region)
                .map(|overlap| (index, overlap.dim.w as i64 * overlap.dim.h as i64))
        })
        .max_by_key(|&(index, area)| (area, -(index as i64)))
        .map(|(index, _)| index)
        .or_else(|| monitor_at(monitors, region.center()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual_head() -> Vec<Monitor> {
        vec![
            Monitor::new(Region::new(0, 0, 1920, 1080), Region::new(0, 0, 1920, 1040)),
            Monitor::new(
                Region::new(-1280, 0, 1280, 1024),
                Region::new(-1280, 0, 1280, 1024),
            ),
        ]
    }

    #[test]
    fn points_outside_every_monitor_pick_the_nearest() {
        let monitors = dual_head();

        assert_eq!(monitor_at(&monitors, Pos::new(-10, 10)), Some(1));
        assert_eq!(monitor_at(&monitors, Pos::new(3000, 500)), Some(0));
    }

    #[test]
    fn regions_belong_to_their_largest_overlap() {
        let monitors = dual_head();

        assert_eq!(monitor_for_region(&monitors, Region::new(-300, 10, 400, 400)), Some(1));
        assert_eq!(monitor_for_region(&monitors, Region::new(-100, 10, 400, 400)), Some(0));
    }
}
