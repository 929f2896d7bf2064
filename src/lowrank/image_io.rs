use std::path::Path;

use image::{GrayImage, Luma, RgbImage};
use log::{debug, info};
use ndarray::{Array2, ArrayView2};

use super::error::ImageIoError;

/// Default channel index taken from RGB input (blue).
pub const DEFAULT_CHANNEL: usize = 2;

/// Decodes an image file and returns one RGB channel as raw `0..=255` intensities.
///
/// Grayscale and RGBA inputs are converted to RGB first, so every index in
/// `0..=2` is valid.
pub fn load_channel(path: impl AsRef<Path>, channel: usize) -> Result<Array2<f64>, ImageIoError> {
    let path = path.as_ref();
    let rgb = image::open(path)?.to_rgb8();
    info!(
        "loaded {} ({}x{}), using channel {}",
        path.display(),
        rgb.width(),
        rgb.height(),
        channel
    );
    channel_matrix(&rgb, channel)
}

pub fn channel_matrix(image: &RgbImage, channel: usize) -> Result<Array2<f64>, ImageIoError> {
    if channel > 2 {
        return Err(ImageIoError::InvalidChannel { channel });
    }
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageIoError::EmptyImage { width, height });
    }
    Ok(Array2::from_shape_fn(
        (height as usize, width as usize),
        |(y, x)| f64::from(image.get_pixel(x as u32, y as u32)[channel]),
    ))
}

/// Renders a matrix as 8-bit grayscale, scaling its min..max range onto 0..=255.
///
/// A constant matrix renders black.
pub fn to_gray_image(matrix: &ArrayView2<f64>) -> GrayImage {
    let (rows, cols) = matrix.dim();
    let (lo, hi) = matrix
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let span = hi - lo;

    GrayImage::from_fn(cols as u32, rows as u32, |x, y| {
        let v = matrix[[y as usize, x as usize]];
        let level = if span > 0.0 {
            ((v - lo) / span * 255.0).round().clamp(0.0, 255.0) as u8
        } else {
            0
        };
        Luma([level])
    })
}

pub fn save_gray(matrix: &ArrayView2<f64>, path: impl AsRef<Path>) -> Result<(), ImageIoError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    to_gray_image(matrix).save(path)?;
    debug!("wrote {}", path.display());
    Ok(())
}
