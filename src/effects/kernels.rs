use rayon::prelude::*;

use crate::foundation::core::Rgba;
use crate::foundation::error::{FrameloomError, FrameloomResult};
use crate::foundation::math::mul_div255_u8;
use crate::render::image::RasterImage;
use crate::task::cancel::CancelToken;

/// Separable gaussian blur of a premultiplied buffer, edge pixels clamped.
pub fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    radius: u32,
    sigma: f32,
    cancel: &CancelToken,
) -> FrameloomResult<Vec<u8>> {
    let expected_len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| FrameloomError::render("blur buffer size overflow"))?;
    if src.len() != expected_len {
        return Err(FrameloomError::render(
            "blur_rgba8_premul expects src matching width*height*4",
        ));
    }
    if radius == 0 || expected_len == 0 {
        return Ok(src.to_vec());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; expected_len];
    let mut out = vec![0u8; expected_len];

    horizontal_pass(src, &mut tmp, width, &kernel);
    cancel.checkpoint()?;
    vertical_pass(&tmp, &mut out, width, height, &kernel);
    Ok(out)
}

/// Sigma used for a blur of the given pixel radius.
pub fn sigma_for_radius(radius: f64) -> f32 {
    (radius / 3.0).max(0.5) as f32
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> FrameloomResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(FrameloomError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let mut weights_f = Vec::<f64>::with_capacity((2 * r + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = sigma as f64;
    let denom = 2.0 * sigma * sigma;
    for i in -r..=r {
        let x = i as f64;
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

fn horizontal_pass(src: &[u8], dst: &mut [u8], width: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let w = width as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_mut(row_len)
        .zip(src.par_chunks(row_len))
        .for_each(|(out, row)| {
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let sx = (x + ki as i32 - radius).clamp(0, w - 1) as usize;
                    for c in 0..4 {
                        acc[c] += u64::from(row[sx * 4 + c]) * u64::from(kw);
                    }
                }
                let o = x as usize * 4;
                for c in 0..4 {
                    out[o + c] = ((acc[c] + 32768) >> 16).min(255) as u8;
                }
            }
        });
}

fn vertical_pass(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32]) {
    let radius = (k.len() / 2) as i32;
    let h = height as i32;
    let row_len = width as usize * 4;
    dst.par_chunks_mut(row_len).enumerate().for_each(|(y, out)| {
        for x in 0..width as usize {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let sy = (y as i32 + ki as i32 - radius).clamp(0, h - 1) as usize;
                let i = sy * row_len + x * 4;
                for c in 0..4 {
                    acc[c] += u64::from(src[i + c]) * u64::from(kw);
                }
            }
            for c in 0..4 {
                out[x * 4 + c] = ((acc[c] + 32768) >> 16).min(255) as u8;
            }
        }
    });
}

/// Add `amount` (in `-1..=1`) of white/black, scaled by each pixel's alpha.
pub fn brightness_in_place(img: &mut RasterImage, amount: f64) {
    let delta = (amount.clamp(-1.0, 1.0) * 255.0).round() as i32;
    img.data.par_chunks_mut(4).for_each(|px| {
        let a = i32::from(px[3]);
        let d = delta * a / 255;
        for c in &mut px[..3] {
            *c = (i32::from(*c) + d).clamp(0, a) as u8;
        }
    });
}

/// Scale color distance from mid-gray by `1 + amount`.
pub fn contrast_in_place(img: &mut RasterImage, amount: f64) {
    let factor = (1.0 + amount).max(0.0);
    img.data.par_chunks_mut(4).for_each(|px| {
        let a = f64::from(px[3]);
        if a <= 0.0 {
            return;
        }
        for c in &mut px[..3] {
            let straight = f64::from(*c) / a;
            let adjusted = ((straight - 0.5) * factor + 0.5).clamp(0.0, 1.0);
            *c = (adjusted * a).round() as u8;
        }
    });
}

/// Mix each pixel's color towards `color` by `amount`, keeping alpha.
pub fn tint_in_place(img: &mut RasterImage, color: Rgba, amount: f64) {
    let t = (amount.clamp(0.0, 1.0) * 255.0).round() as u16;
    let inv = 255 - t;
    let target = color.clamped().to_rgba8();
    img.data.par_chunks_mut(4).for_each(|px| {
        let a = u16::from(px[3]);
        for c in 0..3 {
            let tinted = mul_div255_u8(u16::from(target[c]), a);
            px[c] = mul_div255_u8(u16::from(px[c]), inv)
                .saturating_add(mul_div255_u8(u16::from(tinted), t));
        }
    });
}

/// Drop shadow: blurred, colored, offset copy of the alpha composited beneath the image.
pub fn shadow_in_place(
    img: &mut RasterImage,
    blur_radius: u32,
    offset: (i32, i32),
    color: Rgba,
    opacity: f64,
    cancel: &CancelToken,
) -> FrameloomResult<()> {
    let (w, h) = (img.width as i32, img.height as i32);
    let shadow_px = color.to_premul8(opacity);
    let mut shadow = vec![0u8; img.data.len()];
    for y in 0..h {
        let sy = y - offset.1;
        if sy < 0 || sy >= h {
            continue;
        }
        for x in 0..w {
            let sx = x - offset.0;
            if sx < 0 || sx >= w {
                continue;
            }
            let a = u16::from(img.data[((sy * w + sx) as usize) * 4 + 3]);
            let o = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                shadow[o + c] = mul_div255_u8(u16::from(shadow_px[c]), a);
            }
        }
    }
    cancel.checkpoint()?;
    let mut shadow = blur_rgba8_premul(
        &shadow,
        img.width,
        img.height,
        blur_radius,
        sigma_for_radius(f64::from(blur_radius)),
        cancel,
    )?;
    crate::effects::blend::over_in_place(&mut shadow, &img.data, 1.0)?;
    img.data = shadow;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/kernels.rs"]
mod tests;
