use serde::{Deserialize, Serialize};

/// Easing presets usable as a keyframe interpolation mode.
///
/// Every preset maps `0.0 -> 0.0` and `1.0 -> 1.0`; `Back` overshoots and `Bounce` is not
/// monotonic in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Ease {
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InBack,
    OutBack,
    InOutBack,
    InBounce,
    OutBounce,
    InOutBounce,
}

#[derive(Clone, Copy)]
enum Dir {
    In,
    Out,
    InOut,
}

impl Ease {
    /// Every preset, in declaration order.
    pub const ALL: [Ease; 28] = [
        Self::Linear,
        Self::InQuad,
        Self::OutQuad,
        Self::InOutQuad,
        Self::InCubic,
        Self::OutCubic,
        Self::InOutCubic,
        Self::InQuart,
        Self::OutQuart,
        Self::InOutQuart,
        Self::InQuint,
        Self::OutQuint,
        Self::InOutQuint,
        Self::InSine,
        Self::OutSine,
        Self::InOutSine,
        Self::InExpo,
        Self::OutExpo,
        Self::InOutExpo,
        Self::InCirc,
        Self::OutCirc,
        Self::InOutCirc,
        Self::InBack,
        Self::OutBack,
        Self::InOutBack,
        Self::InBounce,
        Self::OutBounce,
        Self::InOutBounce,
    ];

    /// Map normalized segment time `t` (clamped to `0..=1`) to eased progress.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        if t <= 0.0 {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }
        let (curve, dir) = self.parts();
        match dir {
            Dir::In => curve(t),
            Dir::Out => 1.0 - curve(1.0 - t),
            Dir::InOut => {
                if t < 0.5 {
                    curve(2.0 * t) / 2.0
                } else {
                    1.0 - curve(2.0 - 2.0 * t) / 2.0
                }
            }
        }
    }

    /// Whether `apply` never decreases.
    pub fn is_monotonic(self) -> bool {
        !matches!(
            self,
            Self::InBack
                | Self::OutBack
                | Self::InOutBack
                | Self::InBounce
                | Self::OutBounce
                | Self::InOutBounce
        )
    }

    fn parts(self) -> (fn(f64) -> f64, Dir) {
        match self {
            Self::Linear => (linear, Dir::In),
            Self::InQuad => (quad, Dir::In),
            Self::OutQuad => (quad, Dir::Out),
            Self::InOutQuad => (quad, Dir::InOut),
            Self::InCubic => (cubic, Dir::In),
            Self::OutCubic => (cubic, Dir::Out),
            Self::InOutCubic => (cubic, Dir::InOut),
            Self::InQuart => (quart, Dir::In),
            Self::OutQuart => (quart, Dir::Out),
            Self::InOutQuart => (quart, Dir::InOut),
            Self::InQuint => (quint, Dir::In),
            Self::OutQuint => (quint, Dir::Out),
            Self::InOutQuint => (quint, Dir::InOut),
            Self::InSine => (sine, Dir::In),
            Self::OutSine => (sine, Dir::Out),
            Self::InOutSine => (sine, Dir::InOut),
            Self::InExpo => (expo, Dir::In),
            Self::OutExpo => (expo, Dir::Out),
            Self::InOutExpo => (expo, Dir::InOut),
            Self::InCirc => (circ, Dir::In),
            Self::OutCirc => (circ, Dir::Out),
            Self::InOutCirc => (circ, Dir::InOut),
            Self::InBack => (back, Dir::In),
            Self::OutBack => (back, Dir::Out),
            Self::InOutBack => (back, Dir::InOut),
            Self::InBounce => (bounce_in, Dir::In),
            Self::OutBounce => (bounce_in, Dir::Out),
            Self::InOutBounce => (bounce_in, Dir::InOut),
        }
    }
}

fn linear(t: f64) -> f64 {
    t
}

fn quad(t: f64) -> f64 {
    t * t
}

fn cubic(t: f64) -> f64 {
    t * t * t
}

fn quart(t: f64) -> f64 {
    t.powi(4)
}

fn quint(t: f64) -> f64 {
    t.powi(5)
}

fn sine(t: f64) -> f64 {
    1.0 - (t * std::f64::consts::FRAC_PI_2).cos()
}

fn expo(t: f64) -> f64 {
    if t <= 0.0 { 0.0 } else { 2f64.powf(10.0 * t - 10.0) }
}

fn circ(t: f64) -> f64 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

fn back(t: f64) -> f64 {
    const C1: f64 = 1.70158;
    const C3: f64 = C1 + 1.0;
    C3 * t * t * t - C1 * t * t
}

fn bounce_out(t: f64) -> f64 {
    const N1: f64 = 7.5625;
    const D1: f64 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

fn bounce_in(t: f64) -> f64 {
    1.0 - bounce_out(1.0 - t)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
