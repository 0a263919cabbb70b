use serde::{Deserialize, Serialize};

use crate::animation::composite::{ChannelGroup, ColorAnimator, Vec2Animator};
use crate::animation::scalar::ScalarAnimator;
use crate::effects::effect::RasterEffect;
use crate::foundation::core::{Rgba, Vec2};

/// Effect whose parameters are animators, evaluated into a [`RasterEffect`] per frame.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EffectAnimator {
    Blur {
        radius: ScalarAnimator,
    },
    Shadow {
        blur: ScalarAnimator,
        offset: Vec2Animator,
        color: ColorAnimator,
        opacity: ScalarAnimator,
    },
    Brightness {
        amount: ScalarAnimator,
    },
    Contrast {
        amount: ScalarAnimator,
    },
    Tint {
        color: ColorAnimator,
        amount: ScalarAnimator,
    },
}

impl EffectAnimator {
    pub fn blur(radius: f64) -> Self {
        Self::Blur {
            radius: ScalarAnimator::new("blur.radius", radius).with_range(0.0, 999.0),
        }
    }

    pub fn shadow(blur: f64, offset: Vec2, color: Rgba, opacity: f64) -> Self {
        Self::Shadow {
            blur: ScalarAnimator::new("shadow.blur", blur).with_range(0.0, 999.0),
            offset: Vec2Animator::new("shadow.offset", offset),
            color: ColorAnimator::new("shadow.color", color),
            opacity: ScalarAnimator::new("shadow.opacity", opacity).with_range(0.0, 1.0),
        }
    }

    pub fn brightness(amount: f64) -> Self {
        Self::Brightness {
            amount: ScalarAnimator::new("brightness.amount", amount).with_range(-1.0, 1.0),
        }
    }

    pub fn contrast(amount: f64) -> Self {
        Self::Contrast {
            amount: ScalarAnimator::new("contrast.amount", amount).with_range(-1.0, 1.0),
        }
    }

    pub fn tint(color: Rgba, amount: f64) -> Self {
        Self::Tint {
            color: ColorAnimator::new("tint.color", color),
            amount: ScalarAnimator::new("tint.amount", amount).with_range(0.0, 1.0),
        }
    }

    /// Evaluate at `frame`, scaling pixel parameters by `resolution`.
    pub fn evaluate(&self, frame: f64, resolution: f64) -> RasterEffect {
        let fx = match self {
            Self::Blur { radius } => RasterEffect::Blur {
                radius: radius.effective_value(frame),
            },
            Self::Shadow {
                blur,
                offset,
                color,
                opacity,
            } => RasterEffect::Shadow {
                blur: blur.effective_value(frame),
                offset: offset.effective_value(frame),
                color: color.effective_value(frame),
                opacity: opacity.effective_value(frame),
            },
            Self::Brightness { amount } => RasterEffect::Brightness {
                amount: amount.effective_value(frame),
            },
            Self::Contrast { amount } => RasterEffect::Contrast {
                amount: amount.effective_value(frame),
            },
            Self::Tint { color, amount } => RasterEffect::Tint {
                color: color.effective_value(frame),
                amount: amount.effective_value(frame),
            },
        };
        fx.scaled(resolution)
    }
}

impl ChannelGroup for EffectAnimator {
    fn channels(&self) -> Vec<&ScalarAnimator> {
        match self {
            Self::Blur { radius } => vec![radius],
            Self::Shadow {
                blur,
                offset,
                color,
                opacity,
            } => {
                let mut out = vec![blur];
                out.extend(offset.channels());
                out.extend(color.channels());
                out.push(opacity);
                out
            }
            Self::Brightness { amount } | Self::Contrast { amount } => vec![amount],
            Self::Tint { color, amount } => {
                let mut out = color.channels();
                out.push(amount);
                out
            }
        }
    }

    fn channels_mut(&mut self) -> Vec<&mut ScalarAnimator> {
        match self {
            Self::Blur { radius } => vec![radius],
            Self::Shadow {
                blur,
                offset,
                color,
                opacity,
            } => {
                let mut out = vec![blur];
                out.extend(offset.channels_mut());
                out.extend(color.channels_mut());
                out.push(opacity);
                out
            }
            Self::Brightness { amount } | Self::Contrast { amount } => vec![amount],
            Self::Tint { color, amount } => {
                let mut out = color.channels_mut();
                out.push(amount);
                out
            }
        }
    }
}

/// Effect entry on a box; hidden effects are skipped during setup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EffectSlot {
    pub effect: EffectAnimator,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl EffectSlot {
    pub fn new(effect: EffectAnimator) -> Self {
        Self {
            effect,
            visible: true,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/animated.rs"]
mod tests;
