use crate::geometry::Region;
use crate::window::Hwnd;
use crate::window::WindowEdge;

pub const ANIMATION_DURATION: u32 = 500;
pub const ANIMATION_TICK: u32 = 16;
pub const EDGE_GAP: i32 = 10;
pub const LINE_WIDTH: f64 = 3f64;
pub const CORNER_RADIUS: f64 = 3f64;
pub const OPACITY: f64 = 0.5;

/// Refuse surfaces beyond this many pixels rather than exhaust memory.
const MAX_SURFACE_PIXELS: u64 = 64 * 1024 * 1024;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Rgba {
    pub const fn new(
        red: f64,
        green: f64,
        blue: f64,
        alpha: f64,
    ) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

pub const FILL: Rgba = Rgba::new(0f64, 0f64, 1f64, 0.8);
pub const OUTLINE: Rgba = Rgba::new(0f64, 0f64, 1f64, 1f64);

/// A premultiplied BGRA pixel buffer, row-major with no padding.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Surface {
    pub fn new(
        width: u32,
        height: u32,
    ) -> Option<Self> {
        let pixels = width as u64 * height as u64;

        if pixels == 0 || pixels > MAX_SURFACE_PIXELS {
            return None;
        }

        Some(Self {
            width,
            height,
            data: vec![0u8; pixels as usize * 4],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(
        &self,
        x: u32,
        y: u32,
    ) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let offset = ((y * self.width + x) * 4) as usize;
        let mut pixel = [0u8; 4];
        pixel.copy_from_slice(&self.data[offset..offset + 4]);
        Some(pixel)
    }

    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(|byte| *byte = 0);
    }

    fn blend(
        &mut self,
        x: u32,
        y: u32,
        color: Rgba,
        coverage: f64,
    ) {
        let alpha = (color.alpha * coverage).max(0f64).min(1f64);

        if alpha <= 0f64 {
            return;
        }

        let offset = ((y * self.width + x) * 4) as usize;
        let source = [color.blue * alpha, color.green * alpha, color.red * alpha, alpha];

        for (channel, &value) in source.iter().enumerate() {
            let dest = self.data[offset + channel] as f64 / 255f64;
            let out = value + dest * (1f64 - alpha);
            self.data[offset + channel] = (out * 255f64).round().max(0f64).min(255f64) as u8;
        }
    }

    /// Fills and strokes a rounded rectangle given in surface pixels.
    pub fn rounded_rectangle(
        &mut self,
        region: Region,
        radius: f64,
        line_width: f64,
        fill: Option<Rgba>,
        outline: Option<Rgba>,
    ) {
        if fill.is_none() && outline.is_none() {
            return;
        }

        let (pos, dim) = region.values();
        let half_w = dim.w as f64 / 2f64;
        let half_h = dim.h as f64 / 2f64;
        let radius = radius.min(half_w).min(half_h).max(0f64);
        let center_x = pos.x as f64 + half_w;
        let center_y = pos.y as f64 + half_h;
        let half_line = line_width / 2f64;

        let reach = half_line.ceil() as i32 + 1;
        let x_start = std::cmp::max(pos.x - reach, 0) as u32;
        let y_start = std::cmp::max(pos.y - reach, 0) as u32;
        let x_end = std::cmp::min(pos.x + dim.w + reach, self.width as i32);
        let y_end = std::cmp::min(pos.y + dim.h + reach, self.height as i32);

        for y in y_start..std::cmp::max(y_end, 0) as u32 {
            for x in x_start..std::cmp::max(x_end, 0) as u32 {
                let qx = (x as f64 + 0.5 - center_x).abs() - (half_w - radius);
                let qy = (y as f64 + 0.5 - center_y).abs() - (half_h - radius);
                let outside = (qx.max(0f64).powi(2) + qy.max(0f64).powi(2)).sqrt();
                let distance = outside + qx.max(qy).min(0f64) - radius;

                if let Some(fill) = fill {
                    let coverage = (0.5 - distance).max(0f64).min(1f64);
                    self.blend(x, y, fill, coverage);
                }

                if let Some(outline) = outline {
                    let coverage = (half_line + 0.5 - distance.abs()).max(0f64).min(1f64);
                    self.blend(x, y, outline, coverage);
                }
            }
        }
    }
}

pub fn ease_out_cubic(progress: f64) -> f64 {
    let progress = progress.max(0f64).min(1f64);
    1f64 - (1f64 - progress).powi(3)
}

fn lerp(
    from: i32,
    to: i32,
    progress: f64,
) -> i32 {
    from + ((to - from) as f64 * progress) as i32
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Logical screen rectangle the indicator window covers.
    pub window_rect: Region,
    pub last: bool,
}

/// The animated snap preview. Its helper window is created lazily by the
/// core; once that or the surface fails, the indicator stays dark.
#[derive(Debug, Clone)]
pub struct Indicator {
    pub hwnd: Option<Hwnd>,
    pub disabled: bool,
    surface: Option<Surface>,
    start: Region,
    target: Region,
    window_rect: Region,
    start_time: u32,
    scale: i32,
    anchor: Option<WindowEdge>,
    animating: bool,
}

impl Indicator {
    pub fn new(
        scale: i32,
        anchor: Option<WindowEdge>,
    ) -> Self {
        Self {
            hwnd: None,
            disabled: false,
            surface: None,
            start: Region::default(),
            target: Region::default(),
            window_rect: Region::default(),
            start_time: 0,
            scale: std::cmp::max(scale, 1),
            anchor,
            animating: false,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn target(&self) -> Region {
        self.target
    }

    pub fn window_rect(&self) -> Region {
        self.window_rect
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    fn ensure_surface(
        &mut self,
        dim: (i32, i32),
    ) -> bool {
        let width = std::cmp::max(dim.0 * self.scale, 0) as u32;
        let height = std::cmp::max(dim.1 * self.scale, 0) as u32;

        let too_small = self
            .surface
            .as_ref()
            .map_or(true, |surface| surface.width() < width || surface.height() < height);

        if too_small {
            self.surface = Surface::new(width, height);
        }

        if self.surface.is_none() {
            warn!("unable to allocate a {}x{} snap indicator surface", width, height);
            self.disabled = true;
        }

        !self.disabled
    }

    /// Starts animating from `from` to `to`, both in logical screen
    /// coordinates. Returns false when the indicator is unusable.
    pub fn start(
        &mut self,
        from: Region,
        to: Region,
        now: u32,
    ) -> bool {
        if self.disabled {
            return false;
        }

        let window_rect = from.union(to);

        if !self.ensure_surface(window_rect.dim.values()) {
            return false;
        }

        self.start = from.inset(EDGE_GAP);
        self.target = to.inset(EDGE_GAP);
        self.window_rect = window_rect;
        self.start_time = now;
        self.animating = true;

        true
    }

    /// Moves the target of a running animation, or restarts from the last
    /// target once it has finished.
    pub fn retarget(
        &mut self,
        to: Region,
        now: u32,
    ) -> bool {
        if !self.animating {
            let from = self.target.inset(-EDGE_GAP);
            return self.start(from, to, now);
        }

        let window_rect = self.target.union(to);
        self.target = to.inset(EDGE_GAP);
        self.window_rect = window_rect;

        self.ensure_surface(window_rect.dim.values())
    }

    pub fn stop(&mut self) {
        self.animating = false;
    }

    /// Renders the frame for `now` into the surface.
    pub fn frame(
        &mut self,
        now: u32,
    ) -> Option<Frame> {
        if self.disabled || !self.animating {
            return None;
        }

        if !self.ensure_surface(self.window_rect.dim.values()) {
            return None;
        }

        let elapsed = now.wrapping_sub(self.start_time);
        let last = elapsed >= ANIMATION_DURATION;
        let progress = ease_out_cubic(elapsed as f64 / ANIMATION_DURATION as f64);

        let (start, target) = (self.start, self.target);
        let mut current = Region::new(
            lerp(start.pos.x, target.pos.x, progress),
            lerp(start.pos.y, target.pos.y, progress),
            lerp(start.dim.w, target.dim.w, progress),
            lerp(start.dim.h, target.dim.h, progress),
        );

        if let (true, Some(edge)) = (last, self.anchor) {
            current.pos.x = if edge.moves_left() {
                target.pos.x + (target.dim.w - current.dim.w)
            } else if edge.moves_right() {
                target.pos.x
            } else {
                current.pos.x
            };

            current.pos.y = if edge.moves_top() {
                target.pos.y + (target.dim.h - current.dim.h)
            } else if edge.moves_bottom() {
                target.pos.y
            } else {
                current.pos.y
            };
        }

        let scale = self.scale;
        let local = Region::new(
            (current.pos.x - self.window_rect.pos.x) * scale,
            (current.pos.y - self.window_rect.pos.y) * scale,
            current.dim.w * scale,
            current.dim.h * scale,
        );

        if let Some(surface) = self.surface.as_mut() {
            surface.clear();
            surface.rounded_rectangle(
                local,
                CORNER_RADIUS,
                LINE_WIDTH * scale as f64,
                Some(FILL),
                Some(OUTLINE),
            );
        }

        if last {
            self.animating = false;
        }

        Some(Frame {
            window_rect: self.window_rect,
            last,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_starts_fast_and_settles() {
        assert_eq!(ease_out_cubic(0f64), 0f64);
        assert_eq!(ease_out_cubic(1f64), 1f64);
        assert_eq!(ease_out_cubic(2f64), 1f64);
        assert!(ease_out_cubic(0.5) > 0.8);
    }

    #[test]
    fn rounded_rectangle_is_filled_premultiplied_blue() {
        let mut surface = Surface::new(40, 40).unwrap();
        surface.rounded_rectangle(Region::new(5, 5, 30, 30), CORNER_RADIUS, LINE_WIDTH, Some(FILL), Some(OUTLINE));

        let inner = surface.pixel(20, 20).unwrap();
        assert_eq!(inner, [204, 0, 0, 204]);

        let edge = surface.pixel(5, 20).unwrap();
        assert_eq!(edge, [255, 0, 0, 255]);

        assert_eq!(surface.pixel(0, 0).unwrap(), [0, 0, 0, 0]);
        assert!(surface.pixel(40, 0).is_none());
    }

    #[test]
    fn surface_covers_the_union_of_start_and_target() {
        let mut indicator = Indicator::new(2, None);

        assert!(indicator.start(Region::new(100, 100, 200, 200), Region::new(0, 0, 960, 1040), 1000));
        assert_eq!(indicator.window_rect(), Region::new(0, 0, 960, 1040));
        assert_eq!(indicator.target(), Region::new(10, 10, 940, 1020));

        let surface = indicator.surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (1920, 2080));
    }

    #[test]
    fn animation_ends_after_its_duration() {
        let mut indicator = Indicator::new(1, None);
        indicator.start(Region::new(0, 0, 100, 100), Region::new(0, 0, 200, 200), 0);

        assert_eq!(indicator.frame(ANIMATION_TICK).map(|frame| frame.last), Some(false));
        assert_eq!(indicator.frame(ANIMATION_DURATION).map(|frame| frame.last), Some(true));
        assert!(!indicator.is_animating());
        assert!(indicator.frame(ANIMATION_DURATION + ANIMATION_TICK).is_none());
    }

    #[test]
    fn oversized_surfaces_disable_the_indicator() {
        let mut indicator = Indicator::new(1, None);

        assert!(!indicator.start(Region::new(0, 0, 100, 100), Region::new(0, 0, 100_000, 100_000), 0));
        assert!(indicator.disabled);
        assert!(indicator.frame(10).is_none());
    }
}
