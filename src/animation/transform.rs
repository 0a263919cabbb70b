use serde::{Deserialize, Serialize};

use crate::animation::composite::{ChannelGroup, Vec2Animator};
use crate::animation::scalar::ScalarAnimator;
use crate::foundation::core::{Affine, Vec2};

/// Animated box transform plus opacity.
///
/// The relative transform is `T(position + pivot) * R(rotation) * Shear * S(scale) * T(-pivot)`,
/// so rotation and scale happen around the pivot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransformAnimator {
    /// Translation.
    pub position: Vec2Animator,
    /// Scale factors, `(1, 1)` by default.
    pub scale: Vec2Animator,
    /// Rotation in degrees, clockwise in y-down space.
    pub rotation: ScalarAnimator,
    /// Pivot for rotation, shear and scale, in local coordinates.
    pub pivot: Vec2Animator,
    /// Horizontal and vertical shear factors.
    pub shear: Vec2Animator,
    /// Opacity in `0..=1`.
    pub opacity: ScalarAnimator,
}

impl Default for TransformAnimator {
    fn default() -> Self {
        Self {
            position: Vec2Animator::new("position", Vec2::ZERO),
            scale: Vec2Animator::new("scale", Vec2::new(1.0, 1.0)),
            rotation: ScalarAnimator::new("rotation", 0.0),
            pivot: Vec2Animator::new("pivot", Vec2::ZERO),
            shear: Vec2Animator::new("shear", Vec2::ZERO),
            opacity: ScalarAnimator::new("opacity", 1.0).with_range(0.0, 1.0),
        }
    }
}

impl TransformAnimator {
    pub fn relative_transform(&self, frame: f64) -> Affine {
        let pos = self.position.effective_value(frame);
        let pivot = self.pivot.effective_value(frame);
        let scale = self.scale.effective_value(frame);
        let shear = self.shear.effective_value(frame);
        let rot = self.rotation.effective_value(frame).to_radians();
        Affine::translate(pos + pivot)
            * Affine::rotate(rot)
            * Affine::new([1.0, shear.y, shear.x, 1.0, 0.0, 0.0])
            * Affine::scale_non_uniform(scale.x, scale.y)
            * Affine::translate(-pivot)
    }

    pub fn opacity(&self, frame: f64) -> f64 {
        self.opacity.effective_value(frame)
    }
}

impl ChannelGroup for TransformAnimator {
    fn channels(&self) -> Vec<&ScalarAnimator> {
        let mut out = Vec::with_capacity(10);
        out.extend(self.position.channels());
        out.extend(self.scale.channels());
        out.push(&self.rotation);
        out.extend(self.pivot.channels());
        out.extend(self.shear.channels());
        out.push(&self.opacity);
        out
    }

    fn channels_mut(&mut self) -> Vec<&mut ScalarAnimator> {
        let mut out = Vec::with_capacity(10);
        out.extend(self.position.channels_mut());
        out.extend(self.scale.channels_mut());
        out.push(&mut self.rotation);
        out.extend(self.pivot.channels_mut());
        out.extend(self.shear.channels_mut());
        out.push(&mut self.opacity);
        out
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/transform.rs"]
mod tests;
