use crate::geometry::Dim;

/// Size constraints a toplevel places on interactive and programmatic resizes.
#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub struct GeometryHints {
    pub min_width: Option<i32>,
    pub min_height: Option<i32>,
    pub max_width: Option<i32>,
    pub max_height: Option<i32>,
    pub base_width: Option<i32>,
    pub base_height: Option<i32>,
    pub inc_width: Option<i32>,
    pub inc_height: Option<i32>,
    pub min_aspect: Option<f64>,
    pub max_aspect: Option<f64>,
}

impl Default for GeometryHints {
    fn default() -> Self {
        Self {
            min_width: None,
            min_height: None,
            max_width: None,
            max_height: None,
            base_width: None,
            base_height: None,
            inc_width: None,
            inc_height: None,
            min_aspect: None,
            max_aspect: None,
        }
    }
}

fn floor_to(
    value: i32,
    inc: i32,
) -> i32 {
    (value / inc) * inc
}

/// Rounds `value` to the nearest multiple of `inc`, halves rounding up.
pub fn nearest_multiple(
    value: i32,
    inc: i32,
) -> i32 {
    if inc <= 1 {
        return value;
    }

    if value >= 0 {
        ((value + inc / 2) / inc) * inc
    } else {
        -(((-value) + inc / 2 - 1) / inc) * inc
    }
}

impl GeometryHints {
    pub fn with_min(
        mut self,
        dim: Dim,
    ) -> Self {
        self.min_width = Some(dim.w);
        self.min_height = Some(dim.h);
        self
    }

    pub fn with_max(
        mut self,
        dim: Dim,
    ) -> Self {
        self.max_width = Some(dim.w);
        self.max_height = Some(dim.h);
        self
    }

    pub fn with_base(
        mut self,
        dim: Dim,
    ) -> Self {
        self.base_width = Some(dim.w);
        self.base_height = Some(dim.h);
        self
    }

    pub fn with_inc(
        mut self,
        dim: Dim,
    ) -> Self {
        self.inc_width = Some(dim.w);
        self.inc_height = Some(dim.h);
        self
    }

    pub fn with_aspect(
        mut self,
        min: f64,
        max: f64,
    ) -> Self {
        self.min_aspect = Some(min);
        self.max_aspect = Some(max);
        self
    }

    /// Base size falls back to the minimum size, and vice versa.
    pub fn base(&self) -> Dim {
        Dim {
            w: self.base_width.or(self.min_width).unwrap_or(0),
            h: self.base_height.or(self.min_height).unwrap_or(0),
        }
    }

    pub fn min(&self) -> Dim {
        Dim {
            w: self.min_width.or(self.base_width).unwrap_or(1).max(1),
            h: self.min_height.or(self.base_height).unwrap_or(1).max(1),
        }
    }

    pub fn max(&self) -> Dim {
        Dim {
            w: self.max_width.unwrap_or(i32::MAX / 2),
            h: self.max_height.unwrap_or(i32::MAX / 2),
        }
    }

    pub fn inc(&self) -> Dim {
        Dim {
            w: self.inc_width.filter(|&inc| inc > 0).unwrap_or(1),
            h: self.inc_height.filter(|&inc| inc > 0).unwrap_or(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Clamps `dim` to the hints: nearest size increment relative to the
    /// base size, then min/max, then the aspect range.
    pub fn constrain(
        &self,
        dim: Dim,
    ) -> Dim {
        let base = self.base();
        let min = self.min();
        let max = self.max();
        let inc = self.inc();

        let mut width = dim.w.max(min.w).min(max.w);
        let mut height = dim.h.max(min.h).min(max.h);

        width = base.w + nearest_multiple(width - base.w, inc.w);
        height = base.h + nearest_multiple(height - base.h, inc.h);

        while width > max.w && width - inc.w >= min.w {
            width -= inc.w;
        }

        while width < min.w && width + inc.w <= max.w {
            width += inc.w;
        }

        while height > max.h && height - inc.h >= min.h {
            height -= inc.h;
        }

        while height < min.h && height + inc.h <= max.h {
            height += inc.h;
        }

        if let (Some(min_aspect), Some(max_aspect)) = (self.min_aspect, self.max_aspect) {
            if min_aspect > 0f64 && max_aspect > 0f64 {
                if min_aspect * height as f64 > width as f64 {
                    let delta = floor_to(height - (width as f64 / min_aspect) as i32, inc.h);

                    if height - delta >= min.h {
                        height -= delta;
                    } else {
                        let delta = floor_to((height as f64 * min_aspect) as i32 - width, inc.w);

                        if width + delta <= max.w {
                            width += delta;
                        }
                    }
                }

                if max_aspect * (height as f64) < width as f64 {
                    let delta = floor_to(width - (height as f64 * max_aspect) as i32, inc.w);

                    if width - delta >= min.w {
                        width -= delta;
                    } else {
                        let delta = floor_to((width as f64 / max_aspect) as i32 - height, inc.h);

                        if height + delta <= max.h {
                            height += delta;
                        }
                    }
                }
            }
        }

        Dim {
            w: width.max(1),
            h: height.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_snaps_to_nearest_increment_within_limits() {
        let hints = GeometryHints::default()
            .with_min(Dim::new(100, 100))
            .with_max(Dim::new(400, 300))
            .with_inc(Dim::new(50, 50));

        assert_eq!(hints.constrain(Dim::new(247, 273)), Dim::new(250, 250));
    }

    #[test]
    fn increment_rounding_never_exceeds_maximum() {
        let hints = GeometryHints::default()
            .with_min(Dim::new(100, 100))
            .with_max(Dim::new(400, 300))
            .with_inc(Dim::new(50, 50));

        assert_eq!(hints.constrain(Dim::new(1000, 290)), Dim::new(400, 300));
        assert_eq!(hints.constrain(Dim::new(10, 10)), Dim::new(100, 100));
    }

    #[test]
    fn base_size_anchors_increments() {
        let hints = GeometryHints::default()
            .with_base(Dim::new(10, 20))
            .with_inc(Dim::new(8, 16));

        assert_eq!(hints.constrain(Dim::new(90, 90)), Dim::new(90, 84));
    }

    #[test]
    fn aspect_range_trims_the_long_side() {
        let hints = GeometryHints::default()
            .with_min(Dim::new(10, 10))
            .with_aspect(1.0, 1.0);

        assert_eq!(hints.constrain(Dim::new(200, 100)), Dim::new(100, 100));
        assert_eq!(hints.constrain(Dim::new(100, 300)), Dim::new(100, 100));
    }

    #[test]
    fn nearest_multiple_rounds_halves_up() {
        assert_eq!(nearest_multiple(24, 50), 0);
        assert_eq!(nearest_multiple(25, 50), 50);
        assert_eq!(nearest_multiple(147, 50), 150);
        assert_eq!(nearest_multiple(-26, 50), -50);
        assert_eq!(nearest_multiple(7, 1), 7);
    }
}
