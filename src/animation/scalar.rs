use std::cell::Cell;

use serde::{Deserialize, Serialize};

use crate::animation::key::{self, Interpolation, KeyCtrl, Keyframe};
use crate::animation::notify::ChangeNotifier;
use crate::animation::snapshot::ScalarSnapshot;
use crate::foundation::core::FrameRange;
use crate::foundation::error::{FrameloomError, FrameloomResult};

/// Saved keys and base value of one channel; the unit of undo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimatorState {
    /// Value used when there are no keys.
    pub base_value: f64,
    /// Sorted keys.
    pub keys: Vec<Keyframe>,
}

/// Keyframed `f64` channel; the leaf of the animator graph.
///
/// Lives on the controlling thread. Background work reads [`ScalarSnapshot`]s or values
/// copied into render data, never the animator itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScalarAnimator {
    name: String,
    base_value: f64,
    #[serde(default)]
    keys: Vec<Keyframe>,
    #[serde(default)]
    clamp: Option<(f64, f64)>,
    #[serde(skip)]
    range_cache: Cell<Option<FrameRange>>,
    #[serde(skip)]
    notifier: Option<ChangeNotifier>,
}

impl ScalarAnimator {
    pub fn new(name: impl Into<String>, base_value: f64) -> Self {
        Self {
            name: name.into(),
            base_value,
            keys: Vec::new(),
            clamp: None,
            range_cache: Cell::new(None),
            notifier: None,
        }
    }

    /// Clamp every effective value into `min..=max`.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.clamp = Some((min.min(max), max.max(min)));
        self.base_value = self.clamp_value(self.base_value);
        self
    }

    /// Builder form of [`ScalarAnimator::set_key`], for scene construction.
    pub fn with_key(mut self, key: Keyframe) -> Self {
        self.set_key(key);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.clamp
    }

    pub fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn has_keys(&self) -> bool {
        !self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Keyframe] {
        &self.keys
    }

    pub fn key_at(&self, frame: i64) -> Option<&Keyframe> {
        self.index_of(frame).map(|i| &self.keys[i])
    }

    pub fn key_frames(&self) -> impl Iterator<Item = i64> + '_ {
        self.keys.iter().map(|k| k.frame)
    }

    /// Check key ordering, uniqueness and finiteness (used after deserialization).
    pub fn validate(&self) -> FrameloomResult<()> {
        if !self.keys.windows(2).all(|w| w[0].frame < w[1].frame) {
            return Err(FrameloomError::animation(format!(
                "animator '{}': keys must be sorted with unique frames",
                self.name
            )));
        }
        if !self.base_value.is_finite() || self.keys.iter().any(|k| !k.value.is_finite()) {
            return Err(FrameloomError::animation(format!(
                "animator '{}': values must be finite",
                self.name
            )));
        }
        Ok(())
    }

    /// Attach the listener that receives change ranges for this channel.
    pub fn attach_notifier(&mut self, notifier: ChangeNotifier) {
        self.notifier = Some(notifier);
    }

    pub fn detach_notifier(&mut self) {
        self.notifier = None;
    }

    /// Value at a (possibly fractional) relative frame.
    pub fn effective_value(&self, frame: f64) -> f64 {
        self.clamp_value(key::value_at(&self.keys, self.base_value, frame))
    }

    /// Largest frame range around `frame` with provably the same value.
    pub fn identical_rel_range(&self, frame: i64) -> FrameRange {
        if let Some(cached) = self.range_cache.get()
            && cached.contains(frame)
        {
            return cached;
        }
        let range = key::identical_range(&self.keys, frame);
        self.range_cache.set(Some(range));
        range
    }

    /// Set the value used when there are no keys.
    pub fn set_base_value(&mut self, value: f64) {
        let value = self.clamp_value(value);
        if value == self.base_value {
            return;
        }
        self.base_value = value;
        if self.keys.is_empty() {
            self.changed(FrameRange::UNBOUNDED);
        }
    }

    /// Insert a key; fails if a key already exists at that frame.
    pub fn add_key(&mut self, key: Keyframe) -> FrameloomResult<()> {
        if !key.value.is_finite() {
            return Err(FrameloomError::animation("key value must be finite"));
        }
        match self.keys.binary_search_by_key(&key.frame, |k| k.frame) {
            Ok(_) => Err(FrameloomError::animation(format!(
                "animator '{}' already has a key at frame {}",
                self.name, key.frame
            ))),
            Err(idx) => {
                self.keys.insert(idx, key);
                self.changed(self.influence(idx));
                Ok(())
            }
        }
    }

    /// Insert a key or replace the one at the same frame.
    pub fn set_key(&mut self, key: Keyframe) {
        match self.keys.binary_search_by_key(&key.frame, |k| k.frame) {
            Ok(idx) => {
                if self.keys[idx] == key {
                    return;
                }
                self.keys[idx] = key;
                self.changed(self.influence(idx));
            }
            Err(idx) => {
                self.keys.insert(idx, key);
                self.changed(self.influence(idx));
            }
        }
    }

    /// Add a key at `frame` that leaves every effective value unchanged.
    ///
    /// Returns whether a key exists at `frame` afterwards; an eased segment has no exact split
    /// and gets none.
    pub fn split_key(&mut self, frame: i64) -> bool {
        if self.index_of(frame).is_some() {
            return true;
        }
        if self.keys.is_empty() {
            self.keys.push(Keyframe::new(frame, self.base_value));
        } else if !key::split_at(&mut self.keys, frame) {
            return false;
        }
        // Values are unchanged, only the cached structure is stale.
        self.range_cache.set(None);
        true
    }

    pub fn remove_key(&mut self, frame: i64) -> Option<Keyframe> {
        let idx = self.index_of(frame)?;
        let range = self.influence(idx);
        let key = self.keys.remove(idx);
        self.changed(range);
        Some(key)
    }

    /// Move the key at `from` to `to`; the target frame must be free.
    pub fn move_key(&mut self, from: i64, to: i64) -> FrameloomResult<()> {
        if from == to {
            return Ok(());
        }
        let Some(idx) = self.index_of(from) else {
            return Err(FrameloomError::animation(format!(
                "animator '{}' has no key at frame {from}",
                self.name
            )));
        };
        if self.index_of(to).is_some() {
            return Err(FrameloomError::animation(format!(
                "animator '{}' already has a key at frame {to}",
                self.name
            )));
        }
        let before = self.influence(idx);
        let mut key = self.keys.remove(idx);
        key.frame = to;
        let new_idx = self.keys.partition_point(|k| k.frame < to);
        self.keys.insert(new_idx, key);
        let after = self.influence(new_idx);
        self.changed(before.union(after));
        Ok(())
    }

    pub fn set_key_value(&mut self, frame: i64, value: f64) -> FrameloomResult<()> {
        let idx = self.require_key(frame)?;
        if self.keys[idx].value != value {
            self.keys[idx].value = value;
            self.changed(self.influence(idx));
        }
        Ok(())
    }

    pub fn set_key_interpolation(
        &mut self,
        frame: i64,
        interpolation: Interpolation,
    ) -> FrameloomResult<()> {
        let idx = self.require_key(frame)?;
        if self.keys[idx].interpolation != interpolation {
            self.keys[idx].interpolation = interpolation;
            self.changed(self.influence(idx));
        }
        Ok(())
    }

    /// Move the out-handle of the key at `frame`, coupling the in-handle per its mode.
    pub fn set_key_out_ctrl(&mut self, frame: i64, ctrl: KeyCtrl) -> FrameloomResult<()> {
        let idx = self.require_key(frame)?;
        self.keys[idx].set_c1(ctrl);
        self.changed(self.influence(idx));
        Ok(())
    }

    /// Move the in-handle of the key at `frame`, coupling the out-handle per its mode.
    pub fn set_key_in_ctrl(&mut self, frame: i64, ctrl: KeyCtrl) -> FrameloomResult<()> {
        let idx = self.require_key(frame)?;
        self.keys[idx].set_c0(ctrl);
        self.changed(self.influence(idx));
        Ok(())
    }

    /// Replace every key value with the moving average over `window` neighbours on each side.
    pub fn smooth_keys(&mut self, window: usize) {
        if window == 0 || self.keys.len() < 3 {
            return;
        }
        let values: Vec<f64> = self.keys.iter().map(|k| k.value).collect();
        let n = values.len();
        for (i, key) in self.keys.iter_mut().enumerate() {
            let lo = i.saturating_sub(window);
            let hi = (i + window).min(n - 1);
            let sum: f64 = values[lo..=hi].iter().sum();
            key.value = sum / (hi - lo + 1) as f64;
        }
        self.changed(FrameRange::UNBOUNDED);
    }

    pub fn state(&self) -> AnimatorState {
        AnimatorState {
            base_value: self.base_value,
            keys: self.keys.clone(),
        }
    }

    /// Replace keys and base value wholesale (undo/redo).
    pub fn restore(&mut self, state: &AnimatorState) {
        if self.base_value == state.base_value && self.keys == state.keys {
            return;
        }
        self.base_value = state.base_value;
        self.keys = state.keys.clone();
        self.changed(FrameRange::UNBOUNDED);
    }

    /// Immutable copy for sampling off the controlling thread.
    pub fn snapshot(&self) -> ScalarSnapshot {
        ScalarSnapshot::new(self.base_value, self.keys.clone(), self.clamp)
    }

    fn index_of(&self, frame: i64) -> Option<usize> {
        self.keys.binary_search_by_key(&frame, |k| k.frame).ok()
    }

    fn require_key(&self, frame: i64) -> FrameloomResult<usize> {
        self.index_of(frame).ok_or_else(|| {
            FrameloomError::animation(format!(
                "animator '{}' has no key at frame {frame}",
                self.name
            ))
        })
    }

    /// Frames whose value depends on the key at `idx`.
    ///
    /// Smooth tangents read one neighbour further out, so the range reaches two keys away.
    fn influence(&self, idx: usize) -> FrameRange {
        let min = if idx >= 2 {
            self.keys[idx - 2].frame
        } else {
            i64::MIN
        };
        let max = self.keys.get(idx + 2).map_or(i64::MAX, |k| k.frame);
        FrameRange::new(min, max)
    }

    fn changed(&self, range: FrameRange) {
        self.range_cache.set(None);
        if let Some(n) = &self.notifier {
            n.notify(range);
        }
    }

    fn clamp_value(&self, v: f64) -> f64 {
        match self.clamp {
            Some((min, max)) => v.clamp(min, max),
            None => v,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/scalar.rs"]
mod tests;
