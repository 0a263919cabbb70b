use crate::effects::kernels;
use crate::foundation::core::{PixelRect, Rgba, Vec2, is_zero_4dec};
use crate::foundation::error::FrameloomResult;
use crate::foundation::math::StableHasher;
use crate::gpu::context::ShaderProgram;
use crate::render::image::RasterImage;
use crate::task::cancel::CancelToken;
use crate::task::hardware::HardwareSupport;

/// One evaluated raster effect with pixel parameters already scaled to the render resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RasterEffect {
    /// Gaussian blur.
    Blur {
        /// Radius in pixels.
        radius: f64,
    },
    /// Drop shadow under the content.
    Shadow {
        /// Shadow blur radius in pixels.
        blur: f64,
        /// Shadow offset in pixels.
        offset: Vec2,
        /// Shadow color.
        color: Rgba,
        /// Shadow opacity in `0..=1`.
        opacity: f64,
    },
    /// Brightness shift in `-1..=1`.
    Brightness {
        /// Signed amount.
        amount: f64,
    },
    /// Contrast change, `0` keeps the image.
    Contrast {
        /// Signed amount.
        amount: f64,
    },
    /// Color tint.
    Tint {
        /// Tint color.
        color: Rgba,
        /// Mix factor in `0..=1`.
        amount: f64,
    },
}

impl RasterEffect {
    pub fn hardware_support(&self) -> HardwareSupport {
        match self {
            Self::Blur { .. } | Self::Shadow { .. } => HardwareSupport::CpuOnly,
            Self::Brightness { .. } => HardwareSupport::GpuPreferred,
            Self::Contrast { .. } => HardwareSupport::CpuPreferred,
            Self::Tint { .. } => HardwareSupport::GpuOnly,
        }
    }

    /// Same effect with pixel-sized parameters multiplied by `resolution`.
    pub fn scaled(self, resolution: f64) -> Self {
        match self {
            Self::Blur { radius } => Self::Blur {
                radius: radius * resolution,
            },
            Self::Shadow {
                blur,
                offset,
                color,
                opacity,
            } => Self::Shadow {
                blur: blur * resolution,
                offset: offset * resolution,
                color,
                opacity,
            },
            other => other,
        }
    }

    /// Whether applying the effect cannot change any pixel.
    pub fn is_noop(&self) -> bool {
        match *self {
            Self::Blur { radius } => radius < 0.5,
            Self::Shadow { opacity, color, .. } => opacity <= 0.0 || color.a <= 0.0,
            Self::Brightness { amount } | Self::Contrast { amount } => is_zero_4dec(amount),
            Self::Tint { amount, .. } => amount <= 0.0,
        }
    }

    /// Rect the effect output covers given the rect of its input.
    pub fn dst_rect(&self, src: PixelRect) -> PixelRect {
        match *self {
            Self::Blur { radius } => src.inflate(blur_margin(radius)),
            Self::Shadow { blur, offset, .. } => {
                let (dx, dy) = pixel_offset(offset);
                src.union(src.translate(dx, dy).inflate(blur_margin(blur)))
            }
            _ => src,
        }
    }

    /// Apply on the CPU, in place. The image already covers the expanded rect.
    pub fn apply_cpu(&self, image: &mut RasterImage, cancel: &CancelToken) -> FrameloomResult<()> {
        match *self {
            Self::Blur { radius } => {
                let r = blur_margin(radius) as u32;
                image.data = kernels::blur_rgba8_premul(
                    &image.data,
                    image.width,
                    image.height,
                    r,
                    kernels::sigma_for_radius(radius),
                    cancel,
                )?;
            }
            Self::Shadow {
                blur,
                offset,
                color,
                opacity,
            } => {
                kernels::shadow_in_place(
                    image,
                    blur_margin(blur) as u32,
                    pixel_offset(offset),
                    color,
                    opacity,
                    cancel,
                )?;
            }
            Self::Brightness { amount } => kernels::brightness_in_place(image, amount),
            Self::Contrast { amount } => kernels::contrast_in_place(image, amount),
            Self::Tint { color, amount } => kernels::tint_in_place(image, color, amount),
        }
        Ok(())
    }

    /// Shader program for the GPU path, `None` for CPU-only effects.
    pub fn gpu_program(&self) -> Option<ShaderProgram> {
        match *self {
            Self::Blur { .. } | Self::Shadow { .. } => None,
            Self::Brightness { amount } => Some(ShaderProgram::Brightness { amount }),
            Self::Contrast { amount } => Some(ShaderProgram::Contrast { amount }),
            Self::Tint { color, amount } => Some(ShaderProgram::Tint { color, amount }),
        }
    }

    pub(crate) fn hash_into(&self, h: &mut StableHasher) {
        let hash_color = |h: &mut StableHasher, c: Rgba| {
            for v in [c.r, c.g, c.b, c.a] {
                h.write_f64(v);
            }
        };
        match *self {
            Self::Blur { radius } => {
                h.write_u8(0);
                h.write_f64(radius);
            }
            Self::Shadow {
                blur,
                offset,
                color,
                opacity,
            } => {
                h.write_u8(1);
                h.write_f64(blur);
                h.write_f64(offset.x);
                h.write_f64(offset.y);
                hash_color(h, color);
                h.write_f64(opacity);
            }
            Self::Brightness { amount } => {
                h.write_u8(2);
                h.write_f64(amount);
            }
            Self::Contrast { amount } => {
                h.write_u8(3);
                h.write_f64(amount);
            }
            Self::Tint { color, amount } => {
                h.write_u8(4);
                hash_color(h, color);
                h.write_f64(amount);
            }
        }
    }
}

fn blur_margin(radius: f64) -> i32 {
    radius.max(0.0).ceil() as i32
}

fn pixel_offset(offset: Vec2) -> (i32, i32) {
    (offset.x.round() as i32, offset.y.round() as i32)
}

#[cfg(test)]
#[path = "../../tests/unit/effects/effect.rs"]
mod tests;
