use super::*;

#[test]
fn frame_range_is_inclusive() {
    let r = FrameRange::new(2, 5);
    assert!(!r.contains(1));
    assert!(r.contains(2));
    assert!(r.contains(5));
    assert!(!r.contains(6));
    assert_eq!(r.len_frames(), 4);
    assert_eq!(r.frames().collect::<Vec<_>>(), vec![2, 3, 4, 5]);
}

#[test]
fn frame_range_intersect_and_union() {
    let a = FrameRange::new(0, 10);
    let b = FrameRange::new(5, 20);
    assert_eq!(a.intersect(b), FrameRange::new(5, 10));
    assert_eq!(a.union(b), FrameRange::new(0, 20));
    assert!(FrameRange::new(0, 3).intersect(FrameRange::new(4, 9)).is_empty());
    assert_eq!(FrameRange::new(3, 1).union(a), a);
}

#[test]
fn frame_range_shift_keeps_open_ends() {
    let r = FrameRange::from_min(4).shift(3);
    assert_eq!(r, FrameRange::new(7, i64::MAX));
    assert_eq!(FrameRange::UNBOUNDED.shift(-10), FrameRange::UNBOUNDED);
    assert!(FrameRange::UNBOUNDED.contains(i64::MIN));
}

#[test]
fn pixel_rect_covering_rounds_outward() {
    let r = PixelRect::covering(Rect::new(0.5, -1.2, 3.1, 2.0));
    assert_eq!(r, PixelRect::new(0, -2, 4, 2));
    assert_eq!(r.width(), 4);
    assert_eq!(r.height(), 4);
}

#[test]
fn pixel_rect_union_ignores_empty() {
    let a = PixelRect::new(0, 0, 4, 4);
    assert_eq!(a.union(PixelRect::default()), a);
    assert_eq!(
        a.union(PixelRect::new(2, 2, 8, 6)),
        PixelRect::new(0, 0, 8, 6)
    );
    assert!(a.intersect(PixelRect::new(10, 10, 12, 12)).is_empty());
}

#[test]
fn rgba_premul_folds_opacity() {
    let c = Rgba::new(1.0, 0.5, 0.0, 1.0);
    assert_eq!(c.to_premul8(1.0), [255, 128, 0, 255]);
    assert_eq!(c.to_premul8(0.0), [0, 0, 0, 0]);
    assert_eq!(Rgba::from_rgba8(255, 0, 0, 255).to_rgba8(), [255, 0, 0, 255]);
}
