//! Frame preprocessing
//!
//! Host frames arrive as interleaved RGBA bytes at exactly the negotiated
//! input resolution. They are written into the model's input tensor as
//! planar RGB floats in `[0, 1]`:
//!
//! `planar[c * width * height + p] = rgb[p * 3 + c] / 255.0`

use image::buffer::ConvertBuffer;
use image::{ImageBuffer, RgbImage, Rgba};
use ndarray::ArrayViewMut4;

use crate::error::{ClassifierError, RuntimeError};

/// Channels in a host frame (RGBA)
pub const SOURCE_CHANNELS: usize = 4;

/// Channels the model consumes (RGB)
pub const MODEL_CHANNELS: usize = 3;

/// Byte length of a host frame at the given resolution
pub fn frame_len(width: usize, height: usize) -> usize {
    width * height * SOURCE_CHANNELS
}

/// Drop the alpha channel of an interleaved RGBA frame
pub fn drop_alpha(pixels: &[u8], width: usize, height: usize) -> Result<RgbImage, ClassifierError> {
    let expected = frame_len(width, height);
    if pixels.len() != expected {
        return Err(ClassifierError::InputSize {
            expected,
            actual: pixels.len(),
        });
    }

    let rgba = ImageBuffer::<Rgba<u8>, &[u8]>::from_raw(width as u32, height as u32, pixels)
        .ok_or(ClassifierError::InputSize {
            expected,
            actual: pixels.len(),
        })?;
    Ok(rgba.convert())
}

/// Convert an RGBA frame into the planar NCHW layout, writing into `planar`
pub fn rgba_to_planar(
    pixels: &[u8],
    width: usize,
    height: usize,
    planar: &mut [f32],
) -> Result<(), ClassifierError> {
    let rgb = drop_alpha(pixels, width, height)?;

    if planar.len() != MODEL_CHANNELS * width * height {
        return Err(RuntimeError::Shape(vec![planar.len()]).into());
    }
    let mut tensor = ArrayViewMut4::from_shape((1, MODEL_CHANNELS, height, width), planar)
        .map_err(|_| RuntimeError::Shape(vec![1, MODEL_CHANNELS, height, width]))?;

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        for c in 0..MODEL_CHANNELS {
            tensor[[0, c, y, x]] = pixel[c] as f32 / 255.0;
        }
    }

    Ok(())
}
