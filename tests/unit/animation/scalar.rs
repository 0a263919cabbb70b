use super::*;
use crate::animation::notify::{ChangeNotifier, change_channel};
use crate::foundation::core::EntityKey;
use slotmap::SlotMap;

fn entity() -> EntityKey {
    let mut sm: SlotMap<EntityKey, ()> = SlotMap::with_key();
    sm.insert(())
}

#[test]
fn scenario_linear_midpoint() {
    let a = ScalarAnimator::new("x", 0.0)
        .with_key(Keyframe::new(0, 0.0))
        .with_key(Keyframe::new(10, 100.0));
    assert!(a.has_keys());
    assert_eq!(a.effective_value(5.0), 50.0);
}

#[test]
fn base_value_is_used_without_keys() {
    let mut a = ScalarAnimator::new("x", 2.0);
    assert!(!a.has_keys());
    assert_eq!(a.effective_value(123.4), 2.0);
    a.set_base_value(3.0);
    assert_eq!(a.effective_value(-7.0), 3.0);
}

#[test]
fn clamp_range_applies_to_values() {
    let a = ScalarAnimator::new("opacity", 5.0)
        .with_range(0.0, 1.0)
        .with_key(Keyframe::new(0, -1.0))
        .with_key(Keyframe::new(10, 3.0));
    assert_eq!(a.base_value(), 1.0);
    assert_eq!(a.effective_value(0.0), 0.0);
    assert_eq!(a.effective_value(10.0), 1.0);
}

#[test]
fn add_key_rejects_duplicate_frames() {
    let mut a = ScalarAnimator::new("x", 0.0);
    a.add_key(Keyframe::new(4, 1.0)).unwrap();
    assert!(a.add_key(Keyframe::new(4, 2.0)).is_err());
    a.set_key(Keyframe::new(4, 2.0));
    assert_eq!(a.keys().len(), 1);
    assert_eq!(a.key_at(4).map(|k| k.value), Some(2.0));
}

#[test]
fn move_key_keeps_order() {
    let mut a = ScalarAnimator::new("x", 0.0)
        .with_key(Keyframe::new(0, 0.0))
        .with_key(Keyframe::new(10, 10.0))
        .with_key(Keyframe::new(20, 20.0));
    a.move_key(0, 15).unwrap();
    assert_eq!(a.key_frames().collect::<Vec<_>>(), vec![10, 15, 20]);
    assert!(a.move_key(15, 20).is_err());
    assert!(a.move_key(99, 1).is_err());
    a.validate().unwrap();
}

#[test]
fn mutations_invalidate_identical_range_cache() {
    let mut a = ScalarAnimator::new("x", 0.0)
        .with_key(Keyframe::new(0, 1.0))
        .with_key(Keyframe::new(10, 1.0));
    assert_eq!(a.identical_rel_range(5), FrameRange::UNBOUNDED);
    a.set_key_value(10, 2.0).unwrap();
    assert_eq!(a.identical_rel_range(5), FrameRange::single(5));
    a.remove_key(10);
    assert_eq!(a.identical_rel_range(5), FrameRange::UNBOUNDED);
}

#[test]
fn mutations_notify_affected_ranges() {
    let (tx, rx) = change_channel();
    let e = entity();
    let mut a = ScalarAnimator::new("x", 0.0);
    a.attach_notifier(ChangeNotifier::new(e, tx));

    a.set_base_value(1.0);
    let ev = rx.try_recv().unwrap();
    assert_eq!(ev.entity, e);
    assert_eq!(ev.range, FrameRange::UNBOUNDED);

    for f in [0, 10, 20, 30, 40] {
        a.add_key(Keyframe::new(f, f as f64)).unwrap();
    }
    while rx.try_recv().is_ok() {}

    a.set_key_value(20, 0.0).unwrap();
    assert_eq!(rx.try_recv().unwrap().range, FrameRange::new(0, 40));

    a.set_key_value(20, 0.0).unwrap();
    assert!(rx.try_recv().is_err());

    a.set_base_value(9.0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn state_round_trip_restores_keys() {
    let mut a = ScalarAnimator::new("x", 0.0).with_key(Keyframe::new(0, 1.0));
    let saved = a.state();
    a.set_key(Keyframe::new(5, 4.0));
    a.set_base_value(2.0);
    a.restore(&saved);
    assert_eq!(a.state(), saved);
    assert_eq!(a.effective_value(5.0), 1.0);
}

#[test]
fn smooth_keys_averages_neighbours() {
    let mut a = ScalarAnimator::new("x", 0.0)
        .with_key(Keyframe::new(0, 0.0))
        .with_key(Keyframe::new(1, 3.0))
        .with_key(Keyframe::new(2, 0.0));
    a.smooth_keys(1);
    let v: Vec<f64> = a.keys().iter().map(|k| k.value).collect();
    assert_eq!(v, vec![1.5, 1.0, 1.5]);
}

#[test]
fn split_key_keeps_value_and_stays_silent() {
    let (tx, rx) = change_channel();
    let mut a = ScalarAnimator::new("x", 4.0);
    a.attach_notifier(ChangeNotifier::new(entity(), tx));
    assert!(a.split_key(3));
    assert_eq!(a.key_at(3).map(|k| k.value), Some(4.0));
    assert_eq!(a.effective_value(-50.0), 4.0);

    a.set_key(Keyframe::new(13, 24.0));
    while rx.try_recv().is_ok() {}
    assert!(a.split_key(8));
    assert_eq!(a.key_at(8).map(|k| k.value), Some(14.0));
    assert!(rx.try_recv().is_err());
}
