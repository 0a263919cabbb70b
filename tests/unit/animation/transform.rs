use super::*;
use crate::foundation::core::FrameRange;
use crate::animation::key::Keyframe;
use crate::foundation::core::Point;

fn close(a: Point, b: Point) -> bool {
    (a - b).hypot() < 1e-9
}

#[test]
fn default_is_identity() {
    let t = TransformAnimator::default();
    assert_eq!(t.relative_transform(0.0), Affine::IDENTITY);
    assert_eq!(t.opacity(0.0), 1.0);
    assert_eq!(t.identical_rel_range(42), FrameRange::UNBOUNDED);
}

#[test]
fn rotation_happens_around_pivot() {
    let mut t = TransformAnimator::default();
    t.pivot.set_base_value(Vec2::new(10.0, 10.0));
    t.rotation.set_base_value(90.0);
    let a = t.relative_transform(0.0);
    assert!(close(a * Point::new(10.0, 10.0), Point::new(10.0, 10.0)));
    assert!(close(a * Point::new(20.0, 10.0), Point::new(10.0, 20.0)));
}

#[test]
fn position_and_scale_compose() {
    let mut t = TransformAnimator::default();
    t.position.set_base_value(Vec2::new(5.0, 0.0));
    t.scale.set_base_value(Vec2::new(2.0, 3.0));
    let a = t.relative_transform(0.0);
    assert!(close(a * Point::new(1.0, 1.0), Point::new(7.0, 3.0)));
}

#[test]
fn animated_channel_narrows_identical_range() {
    let mut t = TransformAnimator::default();
    t.position.x.set_key(Keyframe::new(0, 0.0));
    t.position.x.set_key(Keyframe::new(10, 10.0));
    assert_eq!(t.identical_rel_range(5), FrameRange::single(5));
    assert_eq!(t.identical_rel_range(15), FrameRange::new(10, i64::MAX));
    assert_eq!(t.channels().len(), 10);
}
