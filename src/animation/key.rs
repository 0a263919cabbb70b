use serde::{Deserialize, Serialize};

use crate::animation::ease::Ease;
use crate::foundation::core::FrameRange;

/// How the segment that starts at a key is interpolated towards the next key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Hold this key's value until the next key.
    Constant,
    /// Straight line to the next key.
    #[default]
    Linear,
    /// Cubic Hermite with automatic tangents, C1 at interior keys.
    Smooth,
    /// Cubic bezier through this key's out-handle and the next key's in-handle.
    Custom,
    /// Eased progress from one value to the next.
    Eased(Ease),
}

/// Coupling between the in- and out-handle of a custom-tangent key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CtrlsMode {
    /// Handles stay collinear; each keeps its own length.
    #[default]
    Smooth,
    /// Handles mirror each other.
    Symmetric,
    /// Handles move independently.
    Corner,
}

/// Bezier handle offset relative to its key, in (frames, value units).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyCtrl {
    /// Frame offset.
    pub frame: f64,
    /// Value offset.
    pub value: f64,
}

impl KeyCtrl {
    pub fn new(frame: f64, value: f64) -> Self {
        Self { frame, value }
    }

    fn len(self) -> f64 {
        self.frame.hypot(self.value)
    }
}

/// A keyframe on a scalar channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Integer frame, unique within one animator.
    pub frame: i64,
    /// Value at `frame`.
    pub value: f64,
    /// Interpolation of the segment starting at this key.
    #[serde(default)]
    pub interpolation: Interpolation,
    /// In-handle (towards the previous key), used by `Custom` segments ending here.
    #[serde(default)]
    pub c0: KeyCtrl,
    /// Out-handle (towards the next key), used by a `Custom` segment starting here.
    #[serde(default)]
    pub c1: KeyCtrl,
    /// Handle coupling applied by [`Keyframe::set_c0`] / [`Keyframe::set_c1`].
    #[serde(default)]
    pub ctrls_mode: CtrlsMode,
}

impl Keyframe {
    /// Linear key with zero-length handles.
    pub fn new(frame: i64, value: f64) -> Self {
        Self {
            frame,
            value,
            interpolation: Interpolation::Linear,
            c0: KeyCtrl::default(),
            c1: KeyCtrl::default(),
            ctrls_mode: CtrlsMode::Smooth,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Custom-tangent key with explicit handles and corner coupling.
    pub fn custom(frame: i64, value: f64, c0: KeyCtrl, c1: KeyCtrl) -> Self {
        Self {
            frame,
            value,
            interpolation: Interpolation::Custom,
            c0,
            c1,
            ctrls_mode: CtrlsMode::Corner,
        }
    }

    /// Move the in-handle, updating the out-handle per [`CtrlsMode`].
    pub fn set_c0(&mut self, c0: KeyCtrl) {
        self.c0 = c0;
        self.c1 = coupled(c0, self.c1, self.ctrls_mode);
    }

    /// Move the out-handle, updating the in-handle per [`CtrlsMode`].
    pub fn set_c1(&mut self, c1: KeyCtrl) {
        self.c1 = c1;
        self.c0 = coupled(c1, self.c0, self.ctrls_mode);
    }

    /// Change the coupling and immediately re-couple the in-handle to the out-handle.
    pub fn set_ctrls_mode(&mut self, mode: CtrlsMode) {
        self.ctrls_mode = mode;
        self.c0 = coupled(self.c1, self.c0, mode);
    }
}

fn coupled(moved: KeyCtrl, other: KeyCtrl, mode: CtrlsMode) -> KeyCtrl {
    match mode {
        CtrlsMode::Corner => other,
        CtrlsMode::Symmetric => KeyCtrl::new(-moved.frame, -moved.value),
        CtrlsMode::Smooth => {
            let moved_len = moved.len();
            if moved_len <= f64::EPSILON {
                return other;
            }
            let k = other.len() / moved_len;
            KeyCtrl::new(-moved.frame * k, -moved.value * k)
        }
    }
}

/// Effective value of a key sequence at a fractional frame.
///
/// `keys` must be sorted with unique frames. Zero keys yield `base`, one key its value
/// everywhere; outside the key span the nearest end key is held.
pub(crate) fn value_at(keys: &[Keyframe], base: f64, frame: f64) -> f64 {
    match keys {
        [] => base,
        [only] => only.value,
        _ => {
            let idx = keys.partition_point(|k| (k.frame as f64) <= frame);
            if idx == 0 {
                keys[0].value
            } else if idx >= keys.len() {
                keys[keys.len() - 1].value
            } else {
                segment_value(keys, idx - 1, frame)
            }
        }
    }
}

fn segment_value(keys: &[Keyframe], i: usize, frame: f64) -> f64 {
    let a = &keys[i];
    let b = &keys[i + 1];
    let dt = (b.frame - a.frame) as f64;
    let local = frame - a.frame as f64;
    let t = (local / dt).clamp(0.0, 1.0);
    match a.interpolation {
        Interpolation::Constant => a.value,
        Interpolation::Linear => a.value + (b.value - a.value) * t,
        Interpolation::Eased(ease) => a.value + (b.value - a.value) * ease.apply(t),
        Interpolation::Smooth => {
            let ma = auto_tangent(keys, i);
            let mb = auto_tangent(keys, i + 1);
            let t2 = t * t;
            let t3 = t2 * t;
            let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
            let h10 = t3 - 2.0 * t2 + t;
            let h01 = -2.0 * t3 + 3.0 * t2;
            let h11 = t3 - t2;
            h00 * a.value + h10 * dt * ma + h01 * b.value + h11 * dt * mb
        }
        Interpolation::Custom => {
            let x1 = a.c1.frame.clamp(0.0, dt);
            let x2 = (dt + b.c0.frame).clamp(0.0, dt);
            let y1 = a.value + a.c1.value;
            let y2 = b.value + b.c0.value;
            let s = solve_bezier_t(0.0, x1, x2, dt, local.clamp(0.0, dt));
            cubic_bezier(a.value, y1, y2, b.value, s)
        }
    }
}

/// Catmull-Rom slope (value per frame) at key `i`; end keys are flat.
pub(crate) fn auto_tangent(keys: &[Keyframe], i: usize) -> f64 {
    if i == 0 || i + 1 >= keys.len() {
        return 0.0;
    }
    let prev = &keys[i - 1];
    let next = &keys[i + 1];
    (next.value - prev.value) / (next.frame - prev.frame) as f64
}

fn cubic_bezier(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let mt = 1.0 - t;
    mt * mt * mt * p0 + 3.0 * mt * mt * t * p1 + 3.0 * mt * t * t * p2 + t * t * t * p3
}

/// Parameter `t` where the (monotonic) bezier x-curve reaches `x`.
fn solve_bezier_t(x0: f64, x1: f64, x2: f64, x3: f64, x: f64) -> f64 {
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    for _ in 0..52 {
        let mid = 0.5 * (lo + hi);
        if cubic_bezier(x0, x1, x2, x3, mid) < x {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// Insert a key at `frame` without changing the value anywhere.
///
/// `keys` must be non-empty. Smooth segments whose tangents would shift are first frozen into
/// the equivalent bezier; custom segments are cut with de Casteljau. Eased segments have no
/// exact split and are left alone, in which case `false` is returned.
pub(crate) fn split_at(keys: &mut Vec<Keyframe>, frame: i64) -> bool {
    debug_assert!(!keys.is_empty());
    let p = match keys.binary_search_by_key(&frame, |k| k.frame) {
        Ok(_) => return true,
        Err(p) => p,
    };
    if p == 0 {
        freeze_smooth(keys, 0);
        let held = keys[0].value;
        keys.insert(0, Keyframe::new(frame, held));
        return true;
    }
    if p == keys.len() {
        let last = p - 1;
        if last > 0 {
            freeze_smooth(keys, last - 1);
        }
        keys[last].interpolation = Interpolation::Linear;
        let held = keys[last].value;
        keys.push(Keyframe::new(frame, held));
        return true;
    }

    let i = p - 1;
    if matches!(keys[i].interpolation, Interpolation::Eased(_)) {
        return false;
    }
    // Tangents at keys `i` and `i + 1` see the new neighbour.
    for j in [i.checked_sub(1), Some(i), Some(i + 1)].into_iter().flatten() {
        freeze_smooth(keys, j);
    }
    let key = match keys[i].interpolation {
        Interpolation::Constant => {
            Keyframe::new(frame, keys[i].value).with_interpolation(Interpolation::Constant)
        }
        Interpolation::Linear => Keyframe::new(frame, segment_value(keys, i, frame as f64)),
        Interpolation::Custom => split_custom(keys, i, frame),
        Interpolation::Smooth | Interpolation::Eased(_) => return false,
    };
    keys.insert(p, key);
    true
}

/// Rewrite the smooth segment starting at key `j` as the custom bezier tracing the same curve.
fn freeze_smooth(keys: &mut [Keyframe], j: usize) {
    if j + 1 >= keys.len() || keys[j].interpolation != Interpolation::Smooth {
        return;
    }
    let dt = (keys[j + 1].frame - keys[j].frame) as f64;
    let ma = auto_tangent(keys, j);
    let mb = auto_tangent(keys, j + 1);
    keys[j].interpolation = Interpolation::Custom;
    keys[j].c1 = KeyCtrl::new(dt / 3.0, ma * dt / 3.0);
    keys[j + 1].c0 = KeyCtrl::new(-dt / 3.0, -mb * dt / 3.0);
}

/// Cut the custom segment starting at key `i` at `frame`, returning the middle key.
fn split_custom(keys: &mut [Keyframe], i: usize, frame: i64) -> Keyframe {
    let (a, b) = (keys[i], keys[i + 1]);
    let dt = (b.frame - a.frame) as f64;
    let local = (frame - a.frame) as f64;
    let p0 = (0.0, a.value);
    let p1 = (a.c1.frame.clamp(0.0, dt), a.value + a.c1.value);
    let p2 = ((dt + b.c0.frame).clamp(0.0, dt), b.value + b.c0.value);
    let p3 = (dt, b.value);
    let s = solve_bezier_t(p0.0, p1.0, p2.0, p3.0, local);
    let lerp = |u: (f64, f64), v: (f64, f64)| (u.0 + (v.0 - u.0) * s, u.1 + (v.1 - u.1) * s);

    let q0 = lerp(p0, p1);
    let q1 = lerp(p1, p2);
    let q2 = lerp(p2, p3);
    let r0 = lerp(q0, q1);
    let r1 = lerp(q1, q2);
    let m = lerp(r0, r1);

    keys[i].c1 = KeyCtrl::new(q0.0, q0.1 - a.value);
    keys[i + 1].c0 = KeyCtrl::new(q2.0 - dt, q2.1 - b.value);
    Keyframe::custom(
        frame,
        m.1,
        KeyCtrl::new(r0.0 - m.0, r0.1 - m.1),
        KeyCtrl::new(r1.0 - m.0, r1.1 - m.1),
    )
}

/// Whether the segment starting at key `i` holds a single value throughout.
fn segment_is_flat(keys: &[Keyframe], i: usize) -> bool {
    let a = &keys[i];
    let b = &keys[i + 1];
    if a.value != b.value {
        return false;
    }
    match a.interpolation {
        Interpolation::Constant | Interpolation::Linear | Interpolation::Eased(_) => true,
        Interpolation::Smooth => auto_tangent(keys, i) == 0.0 && auto_tangent(keys, i + 1) == 0.0,
        Interpolation::Custom => a.c1.value == 0.0 && b.c0.value == 0.0,
    }
}

/// Maximal provably constant frame range around `frame`.
///
/// Conservative: value clamping or coincidental equality inside curved segments is ignored.
pub(crate) fn identical_range(keys: &[Keyframe], frame: i64) -> FrameRange {
    if keys.len() < 2 {
        return FrameRange::UNBOUNDED;
    }
    let last = keys.len() - 1;
    if frame < keys[0].frame {
        return FrameRange::new(i64::MIN, extend_right(keys, 0));
    }
    if frame > keys[last].frame {
        return FrameRange::new(extend_left(keys, last), i64::MAX);
    }
    let i = keys.partition_point(|k| k.frame <= frame) - 1;
    let on_key = keys[i].frame == frame;
    let held = segment_is_flat(keys, i) || keys[i].interpolation == Interpolation::Constant;
    if on_key || i == last || held {
        FrameRange::new(extend_left(keys, i), extend_right(keys, i))
    } else {
        FrameRange::single(frame)
    }
}

fn extend_left(keys: &[Keyframe], i: usize) -> i64 {
    let mut j = i;
    while j > 0 && segment_is_flat(keys, j - 1) {
        j -= 1;
    }
    if j == 0 { i64::MIN } else { keys[j].frame }
}

fn extend_right(keys: &[Keyframe], i: usize) -> i64 {
    let last = keys.len() - 1;
    let mut j = i;
    while j < last && segment_is_flat(keys, j) {
        j += 1;
    }
    if j == last {
        i64::MAX
    } else if keys[j].interpolation == Interpolation::Constant {
        keys[j + 1].frame - 1
    } else {
        keys[j].frame
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/key.rs"]
mod tests;
