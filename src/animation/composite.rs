use serde::{Deserialize, Serialize};

use crate::animation::key::Keyframe;
use crate::animation::notify::ChangeNotifier;
use crate::animation::scalar::{AnimatorState, ScalarAnimator};
use crate::foundation::core::{Affine, FrameRange, Point, Rgba, Vec2};

/// Saved state of every channel of a group, in channel order.
pub type GroupState = Vec<AnimatorState>;

/// Before/after states of one batched multi-channel edit.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupEdit {
    /// Channel states before the edit.
    pub before: GroupState,
    /// Channel states after the edit.
    pub after: GroupState,
}

impl GroupEdit {
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }
}

/// A fixed set of scalar channels edited and queried together.
pub trait ChannelGroup {
    fn channels(&self) -> Vec<&ScalarAnimator>;

    fn channels_mut(&mut self) -> Vec<&mut ScalarAnimator>;

    fn has_keys(&self) -> bool {
        self.channels().iter().any(|c| c.has_keys())
    }

    /// Intersection of every channel's identical range.
    fn identical_rel_range(&self, frame: i64) -> FrameRange {
        self.channels()
            .iter()
            .fold(FrameRange::UNBOUNDED, |acc, c| {
                acc.intersect(c.identical_rel_range(frame))
            })
    }

    /// Sorted union of key frames across channels.
    fn key_frames(&self) -> Vec<i64> {
        let mut frames: Vec<i64> = self
            .channels()
            .iter()
            .flat_map(|c| c.key_frames().collect::<Vec<_>>())
            .collect();
        frames.sort_unstable();
        frames.dedup();
        frames
    }

    /// Give every channel a key wherever any channel has one, without changing any curve.
    ///
    /// See [`ScalarAnimator::split_key`]: a frame inside an eased segment stays unkeyed on
    /// that channel.
    fn coordinate_keys(&mut self) {
        let frames = self.key_frames();
        if frames.is_empty() {
            return;
        }
        for channel in self.channels_mut() {
            for &f in &frames {
                channel.split_key(f);
            }
        }
    }

    fn state(&self) -> GroupState {
        self.channels().iter().map(|c| c.state()).collect()
    }

    fn restore(&mut self, state: &GroupState) {
        for (channel, s) in self.channels_mut().into_iter().zip(state) {
            channel.restore(s);
        }
    }

    fn attach_notifier(&mut self, notifier: &ChangeNotifier) {
        for channel in self.channels_mut() {
            channel.attach_notifier(notifier.clone());
        }
    }
}

impl ChannelGroup for ScalarAnimator {
    fn channels(&self) -> Vec<&ScalarAnimator> {
        vec![self]
    }

    fn channels_mut(&mut self) -> Vec<&mut ScalarAnimator> {
        vec![self]
    }
}

/// Run `edit` against `group` and capture the before/after states as one unit.
pub fn record_edit<G: ChannelGroup + ?Sized>(group: &mut G, edit: impl FnOnce(&mut G)) -> GroupEdit {
    let before = group.state();
    edit(group);
    GroupEdit {
        before,
        after: group.state(),
    }
}

/// Rewrite the value at every coordinated key (or the base values) through `map`.
fn map_coordinated<const N: usize>(
    channels: [&mut ScalarAnimator; N],
    map: impl Fn([f64; N]) -> [f64; N],
) {
    let mut channels = channels;
    if channels.iter().all(|c| !c.has_keys()) {
        let mapped = map(std::array::from_fn(|i| channels[i].base_value()));
        for (c, v) in channels.iter_mut().zip(mapped) {
            c.set_base_value(v);
        }
        return;
    }
    let mut frames: Vec<i64> = channels
        .iter()
        .flat_map(|c| c.key_frames().collect::<Vec<_>>())
        .collect();
    frames.sort_unstable();
    frames.dedup();
    // Sample everything before writing so unkeyed channels read the untouched curve.
    let samples: Vec<(i64, [f64; N])> = frames
        .into_iter()
        .map(|f| {
            let current = std::array::from_fn(|i| {
                channels[i]
                    .key_at(f)
                    .map_or_else(|| channels[i].effective_value(f as f64), |k| k.value)
            });
            (f, map(current))
        })
        .collect();
    for (f, mapped) in samples {
        for (c, v) in channels.iter_mut().zip(mapped) {
            if let Some(key) = c.key_at(f).copied() {
                c.set_key(Keyframe { value: v, ..key });
            }
        }
    }
}

/// Two-channel point animator (position, scale, pivot, shear, size).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vec2Animator {
    /// Horizontal channel.
    pub x: ScalarAnimator,
    /// Vertical channel.
    pub y: ScalarAnimator,
}

impl Vec2Animator {
    pub fn new(name: &str, base: Vec2) -> Self {
        Self {
            x: ScalarAnimator::new(format!("{name}.x"), base.x),
            y: ScalarAnimator::new(format!("{name}.y"), base.y),
        }
    }

    pub fn effective_value(&self, frame: f64) -> Vec2 {
        Vec2::new(self.x.effective_value(frame), self.y.effective_value(frame))
    }

    pub fn set_base_value(&mut self, v: Vec2) {
        self.x.set_base_value(v.x);
        self.y.set_base_value(v.y);
    }

    /// Key both channels at `frame`.
    pub fn set_key(&mut self, frame: i64, v: Vec2) {
        self.x.set_key(Keyframe::new(frame, v.x));
        self.y.set_key(Keyframe::new(frame, v.y));
    }

    /// Map the value through `affine` at every key, as one batched edit.
    ///
    /// Keys are first coordinated so both channels share key frames; without keys the base
    /// value is transformed instead.
    pub fn apply_transform(&mut self, affine: Affine) -> GroupEdit {
        record_edit(self, |g| {
            g.coordinate_keys();
            map_coordinated([&mut g.x, &mut g.y], |[x, y]| {
                let p = affine * Point::new(x, y);
                [p.x, p.y]
            });
        })
    }
}

impl ChannelGroup for Vec2Animator {
    fn channels(&self) -> Vec<&ScalarAnimator> {
        vec![&self.x, &self.y]
    }

    fn channels_mut(&mut self) -> Vec<&mut ScalarAnimator> {
        vec![&mut self.x, &mut self.y]
    }
}

/// Row-major 3x3 matrix applied to [`Vec3Animator`] values.
pub type Mat3 = [[f64; 3]; 3];

/// Three-channel vector animator.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Vec3Animator {
    /// First channel.
    pub x: ScalarAnimator,
    /// Second channel.
    pub y: ScalarAnimator,
    /// Third channel.
    pub z: ScalarAnimator,
}

impl Vec3Animator {
    pub fn new(name: &str, base: [f64; 3]) -> Self {
        Self {
            x: ScalarAnimator::new(format!("{name}.x"), base[0]),
            y: ScalarAnimator::new(format!("{name}.y"), base[1]),
            z: ScalarAnimator::new(format!("{name}.z"), base[2]),
        }
    }

    pub fn effective_value(&self, frame: f64) -> [f64; 3] {
        [
            self.x.effective_value(frame),
            self.y.effective_value(frame),
            self.z.effective_value(frame),
        ]
    }

    pub fn set_base_value(&mut self, v: [f64; 3]) {
        self.x.set_base_value(v[0]);
        self.y.set_base_value(v[1]);
        self.z.set_base_value(v[2]);
    }

    pub fn set_key(&mut self, frame: i64, v: [f64; 3]) {
        self.x.set_key(Keyframe::new(frame, v[0]));
        self.y.set_key(Keyframe::new(frame, v[1]));
        self.z.set_key(Keyframe::new(frame, v[2]));
    }

    /// Multiply the value by `m` at every coordinated key, as one batched edit.
    pub fn apply_transform(&mut self, m: Mat3) -> GroupEdit {
        record_edit(self, |g| {
            g.coordinate_keys();
            map_coordinated([&mut g.x, &mut g.y, &mut g.z], |v| {
                std::array::from_fn(|r| m[r][0] * v[0] + m[r][1] * v[1] + m[r][2] * v[2])
            });
        })
    }
}

impl ChannelGroup for Vec3Animator {
    fn channels(&self) -> Vec<&ScalarAnimator> {
        vec![&self.x, &self.y, &self.z]
    }

    fn channels_mut(&mut self) -> Vec<&mut ScalarAnimator> {
        vec![&mut self.x, &mut self.y, &mut self.z]
    }
}

/// Straight-alpha color animator with channels clamped to `0..=1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColorAnimator {
    /// Red.
    pub r: ScalarAnimator,
    /// Green.
    pub g: ScalarAnimator,
    /// Blue.
    pub b: ScalarAnimator,
    /// Alpha.
    pub a: ScalarAnimator,
}

impl ColorAnimator {
    pub fn new(name: &str, base: Rgba) -> Self {
        let ch = |suffix: &str, v: f64| {
            ScalarAnimator::new(format!("{name}.{suffix}"), v).with_range(0.0, 1.0)
        };
        Self {
            r: ch("r", base.r),
            g: ch("g", base.g),
            b: ch("b", base.b),
            a: ch("a", base.a),
        }
    }

    pub fn effective_value(&self, frame: f64) -> Rgba {
        Rgba::new(
            self.r.effective_value(frame),
            self.g.effective_value(frame),
            self.b.effective_value(frame),
            self.a.effective_value(frame),
        )
    }

    pub fn set_base_value(&mut self, c: Rgba) {
        self.r.set_base_value(c.r);
        self.g.set_base_value(c.g);
        self.b.set_base_value(c.b);
        self.a.set_base_value(c.a);
    }

    pub fn set_key(&mut self, frame: i64, c: Rgba) {
        self.r.set_key(Keyframe::new(frame, c.r));
        self.g.set_key(Keyframe::new(frame, c.g));
        self.b.set_key(Keyframe::new(frame, c.b));
        self.a.set_key(Keyframe::new(frame, c.a));
    }
}

impl ChannelGroup for ColorAnimator {
    fn channels(&self) -> Vec<&ScalarAnimator> {
        vec![&self.r, &self.g, &self.b, &self.a]
    }

    fn channels_mut(&mut self) -> Vec<&mut ScalarAnimator> {
        vec![&mut self.r, &mut self.g, &mut self.b, &mut self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/composite.rs"]
mod tests;
