//! Image utility functions
//!
//! Turn encoded images into the RGBA frames the classifier consumes.

use std::path::Path;

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;

use crate::engine::Resolution;

/// Decode image from bytes (JPEG, PNG, etc.)
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(data)?;
    Ok(img)
}

/// Resize to exactly `size` and flatten to interleaved RGBA bytes
pub fn to_rgba_frame(image: &DynamicImage, size: Resolution) -> Vec<u8> {
    let (width, height) = (size.width as u32, size.height as u32);
    let resized = if image.width() == width && image.height() == height {
        image.to_rgba8()
    } else {
        image
            .resize_exact(width, height, FilterType::Lanczos3)
            .to_rgba8()
    };
    resized.into_raw()
}

pub fn frame_from_bytes(data: &[u8], size: Resolution) -> Result<Vec<u8>> {
    let image = decode_image(data)?;
    Ok(to_rgba_frame(&image, size))
}

pub fn frame_from_file(path: &Path, size: Resolution) -> Result<Vec<u8>> {
    let image = image::open(path).with_context(|| format!("failed to open image {}", path.display()))?;
    Ok(to_rgba_frame(&image, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(color));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_frame_is_rgba_at_requested_size() {
        let frame = frame_from_bytes(&png(10, 6, [255, 0, 0]), Resolution::new(4, 3)).unwrap();
        assert_eq!(frame.len(), 4 * 3 * 4);
        for px in frame.chunks_exact(4) {
            assert_eq!(px, &[255, 0, 0, 255]);
        }
    }

    #[test]
    fn test_same_size_keeps_pixels() {
        let data = png(3, 2, [12, 34, 56]);
        let frame = frame_from_bytes(&data, Resolution::new(3, 2)).unwrap();
        assert_eq!(&frame[..4], &[12, 34, 56, 255]);
    }

    #[test]
    fn test_invalid_bytes() {
        assert!(decode_image(b"not an image").is_err());
        assert!(frame_from_file(Path::new("does/not/exist.png"), Resolution::new(2, 2)).is_err());
    }
}
