//! Transcoding of downloaded photos to the canonical PNG format.

use std::io::Cursor;

use image::{ImageError, ImageFormat};

/// Decode `raw` in whatever format it arrived and re-encode it as PNG.
pub fn to_png(raw: &[u8]) -> Result<Vec<u8>, ImageError> {
    let decoded = image::load_from_memory(raw)?;
    let mut output = Cursor::new(Vec::new());
    decoded.write_to(&mut output, ImageFormat::Png)?;
    Ok(output.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    fn bmp_fixture() -> Vec<u8> {
        let image = RgbImage::from_pixel(3, 2, Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Bmp).expect("encode bmp");
        out.into_inner()
    }

    #[test]
    fn bmp_is_transcoded_to_png() {
        let png = to_png(&bmp_fixture()).expect("transcode");
        assert_eq!(&png[..8], &PNG_SIGNATURE);

        let back = image::load_from_memory(&png).expect("decode png");
        assert_eq!((back.width(), back.height()), (3, 2));
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(to_png(b"definitely not an image").is_err());
    }
}
