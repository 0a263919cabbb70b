use super::*;

#[test]
fn endpoints_are_stable() {
    for ease in Ease::ALL {
        assert_eq!(ease.apply(0.0), 0.0, "{ease:?}");
        assert_eq!(ease.apply(1.0), 1.0, "{ease:?}");
    }
}

#[test]
fn monotonic_spot_check() {
    for ease in Ease::ALL.into_iter().filter(|e| e.is_monotonic()) {
        let a = ease.apply(0.25);
        let b = ease.apply(0.5);
        let c = ease.apply(0.75);
        assert!(a < b, "{ease:?}");
        assert!(b < c, "{ease:?}");
    }
}

#[test]
fn in_out_is_symmetric_around_midpoint() {
    for ease in [Ease::InOutQuad, Ease::InOutCubic, Ease::InOutSine, Ease::InOutCirc] {
        assert!((ease.apply(0.5) - 0.5).abs() < 1e-12, "{ease:?}");
        let lo = ease.apply(0.2);
        let hi = ease.apply(0.8);
        assert!((lo + hi - 1.0).abs() < 1e-9, "{ease:?}");
    }
}

#[test]
fn back_overshoots_below_zero() {
    assert!(Ease::InBack.apply(0.2) < 0.0);
    assert!(Ease::OutBack.apply(0.8) > 1.0);
}

#[test]
fn out_of_range_input_is_clamped() {
    assert_eq!(Ease::InQuad.apply(-3.0), 0.0);
    assert_eq!(Ease::OutBounce.apply(7.0), 1.0);
}
