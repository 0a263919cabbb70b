use serde::{Deserialize, Serialize};

use crate::foundation::math::unit_to_u8;

pub use kurbo::{Affine, BezPath, Point, Rect, Size, Vec2};

slotmap::new_key_type! {
    /// Generation-checked handle to an entity in a [`crate::Scene`].
    pub struct EntityKey;
}

/// Inclusive range of integer frames.
///
/// `i64::MIN` / `i64::MAX` act as open ends, so [`FrameRange::UNBOUNDED`] covers every frame.
/// Identical-value ranges, invalidation ranges and visibility ranges all use this type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRange {
    /// First frame in the range.
    pub min: i64,
    /// Last frame in the range (inclusive).
    pub max: i64,
}

impl FrameRange {
    /// Range covering all frames.
    pub const UNBOUNDED: Self = Self {
        min: i64::MIN,
        max: i64::MAX,
    };

    /// Build a range; `min > max` yields an empty range.
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Range containing exactly one frame.
    pub fn single(frame: i64) -> Self {
        Self {
            min: frame,
            max: frame,
        }
    }

    /// Everything from `min` onwards.
    pub fn from_min(min: i64) -> Self {
        Self { min, max: i64::MAX }
    }

    /// Everything up to and including `max`.
    pub fn to_max(max: i64) -> Self {
        Self { min: i64::MIN, max }
    }

    pub fn is_empty(self) -> bool {
        self.min > self.max
    }

    pub fn is_unbounded(self) -> bool {
        self.min == i64::MIN || self.max == i64::MAX
    }

    pub fn contains(self, frame: i64) -> bool {
        frame >= self.min && frame <= self.max
    }

    /// Whether `frame` (possibly fractional) lies inside the closed interval.
    pub fn contains_f64(self, frame: f64) -> bool {
        frame >= self.min as f64 && frame <= self.max as f64
    }

    /// Number of frames, saturating for open ranges.
    pub fn len_frames(self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        (self.max as i128 - self.min as i128 + 1).min(u64::MAX as i128) as u64
    }

    pub fn intersect(self, other: Self) -> Self {
        Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// Smallest range covering both; empty inputs are ignored.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn overlaps(self, other: Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Shift both ends by `delta`, keeping open ends open.
    pub fn shift(self, delta: i64) -> Self {
        let shift_end = |v: i64| {
            if v == i64::MIN || v == i64::MAX {
                v
            } else {
                v.saturating_add(delta)
            }
        };
        Self {
            min: shift_end(self.min),
            max: shift_end(self.max),
        }
    }

    /// Iterate over the frames of a bounded range.
    pub fn frames(self) -> impl Iterator<Item = i64> {
        let (start, end) = if self.is_empty() { (1, 0) } else { (self.min, self.max) };
        start..=end
    }
}

/// Integer pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x0: i32,
    /// Top edge.
    pub y0: i32,
    /// Right edge (exclusive).
    pub x1: i32,
    /// Bottom edge (exclusive).
    pub y1: i32,
}

impl PixelRect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width as i32, height as i32)
    }

    /// Round outward so the result covers every pixel touched by `r`.
    pub fn covering(r: Rect) -> Self {
        if !(r.x0.is_finite() && r.y0.is_finite() && r.x1.is_finite() && r.y1.is_finite()) {
            return Self::default();
        }
        let clamp = |v: f64| v.clamp(i32::MIN as f64 / 2.0, i32::MAX as f64 / 2.0) as i32;
        Self {
            x0: clamp(r.x0.floor()),
            y0: clamp(r.y0.floor()),
            x1: clamp(r.x1.ceil()),
            y1: clamp(r.y1.ceil()),
        }
    }

    pub fn width(self) -> u32 {
        (self.x1 - self.x0).max(0) as u32
    }

    pub fn height(self) -> u32 {
        (self.y1 - self.y0).max(0) as u32
    }

    pub fn is_empty(self) -> bool {
        self.x1 <= self.x0 || self.y1 <= self.y0
    }

    pub fn inflate(self, margin: i32) -> Self {
        Self {
            x0: self.x0 - margin,
            y0: self.y0 - margin,
            x1: self.x1 + margin,
            y1: self.y1 + margin,
        }
    }

    pub fn translate(self, dx: i32, dy: i32) -> Self {
        Self {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    /// Union; empty rectangles do not contribute.
    pub fn union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn intersect(self, other: Self) -> Self {
        let r = Self {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        if r.is_empty() { Self::default() } else { r }
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x0),
            f64::from(self.y0),
            f64::from(self.x1),
            f64::from(self.y1),
        )
    }
}

/// Straight-alpha color with `f64` channels in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    /// Red.
    pub r: f64,
    /// Green.
    pub g: f64,
    /// Blue.
    pub b: f64,
    /// Alpha.
    pub a: f64,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
            f64::from(a) / 255.0,
        )
    }

    /// Clamp every channel into `0.0..=1.0`.
    pub fn clamped(self) -> Self {
        Self::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }

    /// Straight 8-bit channels.
    pub fn to_rgba8(self) -> [u8; 4] {
        [
            unit_to_u8(self.r),
            unit_to_u8(self.g),
            unit_to_u8(self.b),
            unit_to_u8(self.a),
        ]
    }

    /// Premultiplied 8-bit channels, with `opacity` folded into alpha.
    pub fn to_premul8(self, opacity: f64) -> [u8; 4] {
        let c = self.clamped();
        let a = c.a * opacity.clamp(0.0, 1.0);
        let q = |v: f64| (v * a * 255.0).round() as u8;
        [q(c.r), q(c.g), q(c.b), (a * 255.0).round() as u8]
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Whether `v` is zero to four decimal places.
pub fn is_zero_4dec(v: f64) -> bool {
    v.abs() < 1e-4
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
