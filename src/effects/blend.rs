use serde::{Deserialize, Serialize};

use crate::foundation::core::PixelRect;
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::foundation::math::{add_sat_u8, mul_div255_u8};
use crate::render::image::RasterImage;

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// How a child layer combines with what is already on its parent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Plain over-compositing.
    #[default]
    SrcOver,
    /// Multiply.
    Multiply,
    /// Screen.
    Screen,
    /// Darken.
    Darken,
    /// Lighten.
    Lighten,
    /// Additive.
    Plus,
    /// Keep the parent only where the child is opaque.
    DstIn,
    /// Keep the parent only where the child is transparent.
    DstOut,
}

impl BlendMode {
    /// Whether pixels outside the child's rect are affected.
    pub fn affects_outside_source(self) -> bool {
        self == Self::DstIn
    }
}

/// Premultiplied source-over with an extra opacity factor.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255_u8(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Blend one premultiplied pixel onto another.
pub fn blend(dst: PremulRgba8, src: PremulRgba8, opacity: f32, mode: BlendMode) -> PremulRgba8 {
    let op = f64::from(opacity.clamp(0.0, 1.0));
    let s: [f64; 4] = std::array::from_fn(|i| f64::from(src[i]) / 255.0 * op);
    let d: [f64; 4] = std::array::from_fn(|i| f64::from(dst[i]) / 255.0);
    let (sa, da) = (s[3], d[3]);

    let out: [f64; 4] = match mode {
        BlendMode::SrcOver => return over(dst, src, opacity),
        BlendMode::Plus => std::array::from_fn(|i| (s[i] + d[i]).min(1.0)),
        BlendMode::DstIn => std::array::from_fn(|i| d[i] * sa),
        BlendMode::DstOut => std::array::from_fn(|i| d[i] * (1.0 - sa)),
        BlendMode::Multiply
        | BlendMode::Screen
        | BlendMode::Darken
        | BlendMode::Lighten => {
            let mut o = [0.0; 4];
            for i in 0..3 {
                let mixed = match mode {
                    BlendMode::Multiply => s[i] * d[i],
                    BlendMode::Screen => s[i] * da + d[i] * sa - s[i] * d[i],
                    BlendMode::Darken => (s[i] * da).min(d[i] * sa),
                    _ => (s[i] * da).max(d[i] * sa),
                };
                o[i] = s[i] * (1.0 - da) + d[i] * (1.0 - sa) + mixed;
            }
            o[3] = sa + da - sa * da;
            o
        }
    };
    std::array::from_fn(|i| (out[i].clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Composite `src` (covering `src_rect`) onto `dst` (covering `dst_rect`), both in the same
/// pixel space.
///
/// For [`BlendMode::DstIn`] the destination outside `src_rect` is cleared.
pub fn composite_at(
    dst: &mut RasterImage,
    dst_rect: PixelRect,
    src: &RasterImage,
    src_rect: PixelRect,
    opacity: f32,
    mode: BlendMode,
) -> FrameloomResult<()> {
    if dst.width != dst_rect.width() || dst.height != dst_rect.height() {
        return Err(FrameloomError::render("composite target does not match its rect"));
    }
    if src.width != src_rect.width() || src.height != src_rect.height() {
        return Err(FrameloomError::render("composite source does not match its rect"));
    }
    let overlap = dst_rect.intersect(src_rect);

    if mode.affects_outside_source() {
        clear_outside(dst, dst_rect, overlap);
    }
    if overlap.is_empty() || opacity <= 0.0 {
        return Ok(());
    }

    let dw = dst.width as usize;
    let sw = src.width as usize;
    for y in overlap.y0..overlap.y1 {
        let dy = (y - dst_rect.y0) as usize;
        let sy = (y - src_rect.y0) as usize;
        for x in overlap.x0..overlap.x1 {
            let di = (dy * dw + (x - dst_rect.x0) as usize) * 4;
            let si = (sy * sw + (x - src_rect.x0) as usize) * 4;
            let d = [dst.data[di], dst.data[di + 1], dst.data[di + 2], dst.data[di + 3]];
            let s = [src.data[si], src.data[si + 1], src.data[si + 2], src.data[si + 3]];
            dst.data[di..di + 4].copy_from_slice(&blend(d, s, opacity, mode));
        }
    }
    Ok(())
}

/// Source-over of two equally sized buffers.
pub fn over_in_place(dst: &mut [u8], src: &[u8], opacity: f32) -> FrameloomResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(FrameloomError::render(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn clear_outside(dst: &mut RasterImage, dst_rect: PixelRect, keep: PixelRect) {
    let w = dst.width as usize;
    if w == 0 {
        return;
    }
    for (row, line) in dst.data.chunks_exact_mut(w * 4).enumerate() {
        let y = dst_rect.y0 + row as i32;
        for (col, px) in line.chunks_exact_mut(4).enumerate() {
            let x = dst_rect.x0 + col as i32;
            let inside = x >= keep.x0 && x < keep.x1 && y >= keep.y0 && y < keep.y1;
            if !inside {
                px.copy_from_slice(&[0, 0, 0, 0]);
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blend.rs"]
mod tests;
