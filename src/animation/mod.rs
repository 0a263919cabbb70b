//! Animator graph: keyframed channels, composites, snapshots and undo history.

/// Batched multi-channel animators.
pub mod composite;
/// Easing presets.
pub mod ease;
/// Undo/redo stack for batched edits.
pub mod history;
/// Keyframes and curve evaluation.
pub mod key;
/// Change notifications.
pub mod notify;
/// Scalar leaf animator.
pub mod scalar;
/// Immutable channel snapshots.
pub mod snapshot;
/// Box transform animator.
pub mod transform;
