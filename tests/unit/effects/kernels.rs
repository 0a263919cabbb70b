use super::*;

#[test]
fn blur_radius_0_is_identity() {
    let src = vec![1u8, 2, 3, 4, 5, 6, 7, 8];
    let out = blur_rgba8_premul(&src, 1, 2, 0, 1.0, &CancelToken::new()).unwrap();
    assert_eq!(out, src);
}

#[test]
fn blur_constant_image_is_identity() {
    let (w, h) = (4u32, 3u32);
    let px = [10u8, 20u8, 30u8, 40u8];
    let src = px.repeat((w * h) as usize);
    let out = blur_rgba8_premul(&src, w, h, 3, 2.0, &CancelToken::new()).unwrap();
    assert_eq!(out, src);
}

#[test]
fn blur_spreads_energy_from_single_pixel() {
    let (w, h) = (5u32, 5u32);
    let mut src = vec![0u8; (w * h * 4) as usize];
    let center = ((2 * w + 2) * 4) as usize;
    src[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);

    let out = blur_rgba8_premul(&src, w, h, 2, 1.2, &CancelToken::new()).unwrap();

    let nonzero = out.chunks_exact(4).filter(|px| px[3] != 0).count();
    assert!(nonzero > 1);

    let sum_a: u32 = out.chunks_exact(4).map(|px| u32::from(px[3])).sum();
    assert!((sum_a as i32 - 255).abs() <= 8);
}

#[test]
fn blur_stops_at_checkpoint_when_canceled() {
    let token = CancelToken::new();
    token.cancel();
    let src = vec![0u8; 4 * 4 * 4];
    let err = blur_rgba8_premul(&src, 4, 4, 2, 1.0, &token).unwrap_err();
    assert!(err.is_canceled());
}

#[test]
fn brightness_respects_alpha() {
    let mut img = RasterImage::from_premul(2, 1, vec![100, 100, 100, 255, 0, 0, 0, 0]).unwrap();
    brightness_in_place(&mut img, 0.5);
    assert_eq!(img.pixel(0, 0), Some([228, 228, 228, 255]));
    assert_eq!(img.pixel(1, 0), Some([0, 0, 0, 0]));
}

#[test]
fn contrast_zero_is_identity_for_opaque() {
    let mut img = RasterImage::filled(1, 1, [40, 128, 200, 255]);
    contrast_in_place(&mut img, 0.0);
    assert_eq!(img.pixel(0, 0), Some([40, 128, 200, 255]));
}

#[test]
fn full_tint_replaces_color() {
    let mut img = RasterImage::filled(1, 1, [10, 20, 30, 255]);
    tint_in_place(&mut img, Rgba::new(1.0, 0.0, 0.0, 1.0), 1.0);
    assert_eq!(img.pixel(0, 0), Some([255, 0, 0, 255]));
}

#[test]
fn shadow_appears_at_offset() {
    let mut img = RasterImage::new(4, 4);
    img.data[0..4].copy_from_slice(&[255, 255, 255, 255]);
    shadow_in_place(&mut img, 0, (2, 2), Rgba::BLACK, 1.0, &CancelToken::new()).unwrap();
    assert_eq!(img.pixel(0, 0), Some([255, 255, 255, 255]));
    assert_eq!(img.pixel(2, 2), Some([0, 0, 0, 255]));
    assert_eq!(img.pixel(1, 1), Some([0, 0, 0, 0]));
}
