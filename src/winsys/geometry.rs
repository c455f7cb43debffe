use std::ops::Add;
use std::ops::AddAssign;
use std::ops::Sub;
use std::ops::SubAssign;

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct Pos {
    pub x: i32,
    pub y: i32,
}

impl Default for Pos {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
        }
    }
}

impl Pos {
    pub fn new(
        x: i32,
        y: i32,
    ) -> Self {
        Self {
            x,
            y,
        }
    }

    pub fn values(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn dist(
        &self,
        pos: Self,
    ) -> Distance {
        Distance {
            dx: (pos.x - self.x),
            dy: (pos.y - self.y),
        }
    }

    pub fn relative_to(
        &self,
        pos: Self,
    ) -> Self {
        Pos {
            x: self.x - pos.x,
            y: self.y - pos.y,
        }
    }

    /// Device to logical, truncating.
    pub fn unscaled(
        &self,
        scale: i32,
    ) -> Self {
        let scale = std::cmp::max(scale, 1);

        Self {
            x: self.x / scale,
            y: self.y / scale,
        }
    }

    pub fn scaled(
        &self,
        scale: i32,
    ) -> Self {
        Self {
            x: self.x * scale,
            y: self.y * scale,
        }
    }
}

impl Add<Pos> for Pos {
    type Output = Self;

    fn add(
        self,
        other: Pos,
    ) -> Self::Output {
        Self::Output {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Pos {
    type Output = Distance;

    fn sub(
        self,
        other: Self,
    ) -> Self::Output {
        Self::Output {
            dx: self.x - other.x,
            dy: self.y - other.y,
        }
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct Dim {
    pub w: i32,
    pub h: i32,
}

impl Default for Dim {
    fn default() -> Self {
        Self {
            w: 0,
            h: 0,
        }
    }
}

impl Dim {
    pub fn new(
        w: i32,
        h: i32,
    ) -> Self {
        Self {
            w,
            h,
        }
    }

    pub fn values(&self) -> (i32, i32) {
        (self.w, self.h)
    }

    /// Device to logical, rounding up so nothing is clipped.
    pub fn unscaled(
        &self,
        scale: i32,
    ) -> Self {
        let scale = std::cmp::max(scale, 1);

        Self {
            w: (self.w + scale - 1) / scale,
            h: (self.h + scale - 1) / scale,
        }
    }

    pub fn scaled(
        &self,
        scale: i32,
    ) -> Self {
        Self {
            w: self.w * scale,
            h: self.h * scale,
        }
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct Region {
    pub pos: Pos,
    pub dim: Dim,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            pos: Default::default(),
            dim: Default::default(),
        }
    }
}

impl Region {
    pub fn new(
        x: i32,
        y: i32,
        w: i32,
        h: i32,
    ) -> Self {
        Self {
            pos: Pos {
                x,
                y,
            },
            dim: Dim {
                w,
                h,
            },
        }
    }

    pub fn values(&self) -> (Pos, Dim) {
        (self.pos, self.dim)
    }

    pub fn is_empty(&self) -> bool {
        self.dim.w <= 0 || self.dim.h <= 0
    }

    pub fn right(&self) -> i32 {
        self.pos.x + self.dim.w
    }

    pub fn bottom(&self) -> i32 {
        self.pos.y + self.dim.h
    }

    pub fn center(&self) -> Pos {
        Pos {
            x: self.pos.x + self.dim.w / 2,
            y: self.pos.y + self.dim.h / 2,
        }
    }

    /// Edges included on all four sides.
    pub fn encompasses(
        &self,
        pos: Pos,
    ) -> bool {
        pos.x >= self.pos.x
            && pos.y >= self.pos.y
            && pos.x <= self.right()
            && pos.y <= self.bottom()
    }

    /// Half-open hit test, as used for pointer picking.
    pub fn contains_point(
        &self,
        pos: Pos,
    ) -> bool {
        pos.x >= self.pos.x && pos.y >= self.pos.y && pos.x < self.right() && pos.y < self.bottom()
    }

    pub fn union(
        &self,
        other: Region,
    ) -> Self {
        let x = std::cmp::min(self.pos.x, other.pos.x);
        let y = std::cmp::min(self.pos.y, other.pos.y);
        let right = std::cmp::max(self.right(), other.right());
        let bottom = std::cmp::max(self.bottom(), other.bottom());

        Self::new(x, y, right - x, bottom - y)
    }

    pub fn intersection(
        &self,
        other: Region,
    ) -> Option<Self> {
        let x = std::cmp::max(self.pos.x, other.pos.x);
        let y = std::cmp::max(self.pos.y, other.pos.y);
        let right = std::cmp::min(self.right(), other.right());
        let bottom = std::cmp::min(self.bottom(), other.bottom());

        if right > x && bottom > y {
            Some(Self::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Shrinks (positive) or grows (negative) the region by `gap` on every side.
    pub fn inset(
        self,
        gap: i32,
    ) -> Self {
        Self::new(
            self.pos.x + gap,
            self.pos.y + gap,
            self.dim.w - 2 * gap,
            self.dim.h - 2 * gap,
        )
    }

    pub fn unscaled(
        &self,
        scale: i32,
    ) -> Self {
        Self {
            pos: self.pos.unscaled(scale),
            dim: self.dim.unscaled(scale),
        }
    }

    pub fn scaled(
        &self,
        scale: i32,
    ) -> Self {
        Self {
            pos: self.pos.scaled(scale),
            dim: self.dim.scaled(scale),
        }
    }

    pub fn translated(
        self,
        dx: i32,
        dy: i32,
    ) -> Self {
        Self {
            pos: Pos {
                x: self.pos.x + dx,
                y: self.pos.y + dy,
            },
            dim: self.dim,
        }
    }
}

/// Per-edge extents, used for CSD shadow margins.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Padding {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            left: 0,
            right: 0,
            top: 0,
            bottom: 0,
        }
    }
}

impl Padding {
    pub fn with_each_edge(size: i32) -> Self {
        Self {
            left: size,
            right: size,
            top: size,
            bottom: size,
        }
    }

    pub fn horizontal(&self) -> i32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> i32 {
        self.top + self.bottom
    }
}

impl Add<Padding> for Region {
    type Output = Self;

    fn add(
        self,
        padding: Padding,
    ) -> Self::Output {
        Self::Output {
            pos: Pos {
                x: self.pos.x - padding.left,
                y: self.pos.y - padding.top,
            },
            dim: Dim {
                w: self.dim.w + padding.horizontal(),
                h: self.dim.h + padding.vertical(),
            },
        }
    }
}

impl Sub<Padding> for Region {
    type Output = Self;

    fn sub(
        self,
        padding: Padding,
    ) -> Self::Output {
        Self::Output {
            pos: Pos {
                x: self.pos.x + padding.left,
                y: self.pos.y + padding.top,
            },
            dim: Dim {
                w: self.dim.w - padding.horizontal(),
                h: self.dim.h - padding.vertical(),
            },
        }
    }
}

impl AddAssign<Padding> for Region {
    fn add_assign(
        &mut self,
        padding: Padding,
    ) {
        *self = *self + padding;
    }
}

impl SubAssign<Padding> for Region {
    fn sub_assign(
        &mut self,
        padding: Padding,
    ) {
        *self = *self - padding;
    }
}

#[derive(Debug, Copy, Clone, Hash, PartialOrd, Ord, PartialEq, Eq)]
pub struct Distance {
    pub dx: i32,
    pub dy: i32,
}

impl Distance {
    pub fn values(&self) -> (i32, i32) {
        (self.dx, self.dy)
    }

    pub fn within(
        &self,
        distance: i32,
    ) -> bool {
        self.dx.abs() <= distance && self.dy.abs() <= distance
    }
}

impl Add<Distance> for Pos {
    type Output = Self;

    fn add(
        self,
        dist: Distance,
    ) -> Self::Output {
        Self::Output {
            x: self.x + dist.dx,
            y: self.y + dist.dy,
        }
    }
}

impl AddAssign<Distance> for Pos {
    fn add_assign(
        &mut self,
        dist: Distance,
    ) {
        *self = *self + dist;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both_regions() {
        let a = Region::new(10, 10, 20, 20);
        let b = Region::new(0, 25, 5, 40);

        assert_eq!(a.union(b), Region::new(0, 10, 30, 55));
        assert_eq!(b.union(a), a.union(b));
    }

    #[test]
    fn unscaling_truncates_position_and_rounds_size_up() {
        let region = Region::new(7, -3, 101, 99);

        assert_eq!(region.unscaled(2), Region::new(3, -1, 51, 50));
        assert_eq!(region.unscaled(1), region);
    }

    #[test]
    fn encompasses_is_inclusive_but_hit_test_is_not() {
        let region = Region::new(0, 0, 10, 10);

        assert!(region.encompasses(Pos::new(10, 10)));
        assert!(!region.contains_point(Pos::new(10, 10)));
        assert!(region.contains_point(Pos::new(9, 0)));
    }

    #[test]
    fn padding_round_trips() {
        let region = Region::new(100, 100, 300, 200);
        let margins = Padding {
            left: 10,
            right: 12,
            top: 8,
            bottom: 16,
        };

        assert_eq!((region + margins) - margins, region);
        assert_eq!((region + margins).dim, Dim::new(322, 224));
    }
}
