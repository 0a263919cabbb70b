use std::io::Cursor;

use super::*;

#[test]
fn decode_png_dimensions_and_premul() {
    let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
    let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let decoded = RasterImage::decode(&buf).unwrap();
    assert_eq!((decoded.width, decoded.height), (1, 1));
    assert_eq!(decoded.pixel(0, 0), Some([50, 25, 100, 128]));
}

#[test]
fn from_premul_checks_length() {
    assert!(RasterImage::from_premul(2, 2, vec![0; 16]).is_ok());
    assert!(RasterImage::from_premul(2, 2, vec![0; 15]).is_err());
}

#[test]
fn straight_conversion_undoes_premultiply() {
    let img = RasterImage::from_premul(1, 1, vec![64, 0, 128, 128]).unwrap();
    assert_eq!(img.to_straight_rgba8(), vec![128, 0, 255, 128]);
    let clear = RasterImage::new(1, 1);
    assert_eq!(clear.to_straight_rgba8(), vec![0, 0, 0, 0]);
}

#[test]
fn load_missing_file_is_resource_error() {
    let err = RasterImage::load(Path::new("/definitely/not/here.png")).unwrap_err();
    assert!(matches!(err, FrameloomError::Resource(_)));
}
