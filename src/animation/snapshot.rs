use std::sync::Arc;

use crate::animation::key::{self, Keyframe};
use crate::foundation::core::FrameRange;

/// Immutable copy of a scalar channel, safe to share across threads.
///
/// Frame and value multipliers let a caller resample the curve on a retimed or rescaled
/// axis without touching the live animator.
#[derive(Clone, Debug)]
pub struct ScalarSnapshot {
    base_value: f64,
    keys: Arc<[Keyframe]>,
    clamp: Option<(f64, f64)>,
    frame_multiplier: f64,
    value_multiplier: f64,
}

/// One sample produced by [`ScalarSnapshot::samples`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Frame on the snapshot's (multiplied) time axis.
    pub frame: f64,
    /// Value after the value multiplier.
    pub value: f64,
    /// `true` when this sample repeats the previous one within a provably constant range.
    pub static_run: bool,
}

impl ScalarSnapshot {
    pub(crate) fn new(base_value: f64, keys: Vec<Keyframe>, clamp: Option<(f64, f64)>) -> Self {
        Self {
            base_value,
            keys: keys.into(),
            clamp,
            frame_multiplier: 1.0,
            value_multiplier: 1.0,
        }
    }

    /// Stretch time: frame `f` of the result reads frame `f / multiplier` of the source.
    pub fn with_frame_multiplier(mut self, multiplier: f64) -> Self {
        if multiplier.is_finite() && multiplier > 0.0 {
            self.frame_multiplier = multiplier;
        }
        self
    }

    pub fn with_value_multiplier(mut self, multiplier: f64) -> Self {
        self.value_multiplier = multiplier;
        self
    }

    pub fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn value_at(&self, frame: f64) -> f64 {
        let raw = key::value_at(&self.keys, self.base_value, frame / self.frame_multiplier);
        let v = match self.clamp {
            Some((min, max)) => raw.clamp(min, max),
            None => raw,
        };
        v * self.value_multiplier
    }

    /// Whether every frame of `range` (on the source axis) has the same value.
    pub fn is_constant_over(&self, range: FrameRange) -> bool {
        if range.is_empty() {
            return true;
        }
        let r = key::identical_range(&self.keys, range.min);
        r.contains(range.max)
    }

    /// Iterate samples from `start` to `end` (inclusive) every `step` frames.
    pub fn samples(&self, start: f64, end: f64, step: f64) -> Samples<'_> {
        Samples {
            snapshot: self,
            next: start,
            end,
            step: if step.is_finite() && step > 0.0 { step } else { 1.0 },
            constant_until: None,
        }
    }
}

/// Iterator returned by [`ScalarSnapshot::samples`].
pub struct Samples<'a> {
    snapshot: &'a ScalarSnapshot,
    next: f64,
    end: f64,
    step: f64,
    constant_until: Option<(f64, f64)>,
}

impl Iterator for Samples<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.end + 1e-9 {
            return None;
        }
        let frame = self.next;
        self.next += self.step;

        if let Some((until, value)) = self.constant_until
            && frame <= until
        {
            return Some(Sample {
                frame,
                value,
                static_run: true,
            });
        }

        let value = self.snapshot.value_at(frame);
        let source = frame / self.snapshot.frame_multiplier;
        self.constant_until = if source.fract() == 0.0 {
            let r = key::identical_range(&self.snapshot.keys, source as i64);
            if r.max == i64::MAX {
                Some((f64::INFINITY, value))
            } else {
                Some((r.max as f64 * self.snapshot.frame_multiplier, value))
            }
        } else {
            None
        };
        Some(Sample {
            frame,
            value,
            static_run: false,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/snapshot.rs"]
mod tests;
