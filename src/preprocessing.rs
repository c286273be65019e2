// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for pose inference.
//!
//! Images are letterboxed: resized to fit the model input while keeping their
//! aspect ratio, centred, and padded with gray. The resulting transform is kept
//! so detections can be mapped back to original pixels.

#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GenericImageView};
use ndarray::Array4;

use crate::error::{MeasureError, Result};

/// Default letterbox padding color (gray).
pub const LETTERBOX_COLOR: [u8; 3] = [114, 114, 114];

/// Normalized letterbox padding color (114/255 ≈ 0.447).
const LETTERBOX_NORM: f32 = LETTERBOX_COLOR[0] as f32 / 255.0;

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Result of preprocessing an image, containing the tensor and transform info.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Preprocessed image tensor in NCHW format, normalized to [0, 1].
    pub tensor: Array4<f32>,
    /// Original image dimensions (height, width).
    pub orig_shape: (u32, u32),
    /// Scale factors applied (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Padding applied (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

/// Letterbox an image into a normalized NCHW tensor.
///
/// # Arguments
///
/// * `image` - Input image.
/// * `target_size` - Model input size as (height, width).
///
/// # Errors
///
/// Returns [`MeasureError::InvalidImage`] for zero-sized images and
/// [`MeasureError::Internal`] if the resize fails.
pub fn preprocess_image(image: &DynamicImage, target_size: (usize, usize)) -> Result<PreprocessResult> {
    let (orig_width, orig_height) = image.dimensions();
    if orig_width == 0 || orig_height == 0 {
        return Err(MeasureError::InvalidImage("image has zero width or height".to_string()));
    }

    let (new_width, new_height, pad_left, pad_top, scale) =
        calculate_letterbox_params(orig_width, orig_height, target_size);

    let resized = resize_rgb(image, new_width, new_height)?;
    let tensor = letterbox_tensor(&resized, new_width, new_height, target_size, pad_left, pad_top);

    Ok(PreprocessResult {
        tensor,
        orig_shape: (orig_height, orig_width),
        scale,
        padding: (pad_top as f32, pad_left as f32),
    })
}

/// Calculate letterbox parameters for resizing.
///
/// Returns `(new_width, new_height, pad_left, pad_top, (scale_y, scale_x))`.
fn calculate_letterbox_params(
    orig_width: u32,
    orig_height: u32,
    target_size: (usize, usize),
) -> (u32, u32, u32, u32, (f32, f32)) {
    let (target_h, target_w) = (target_size.0 as f32, target_size.1 as f32);
    let (orig_h, orig_w) = (orig_height as f32, orig_width as f32);

    let scale = (target_h / orig_h).min(target_w / orig_w);

    // At least one pixel survives extreme aspect ratios
    let new_w = ((orig_w * scale).round() as u32).max(1);
    let new_h = ((orig_h * scale).round() as u32).max(1);

    let pad_w = (target_size.1 as u32).saturating_sub(new_w);
    let pad_h = (target_size.0 as u32).saturating_sub(new_h);

    let pad_left = pad_w / 2;
    let pad_top = pad_h / 2;

    let scale_x = new_w as f32 / orig_w;
    let scale_y = new_h as f32 / orig_h;

    (new_w, new_h, pad_left, pad_top, (scale_y, scale_x))
}

/// Resize to `width` x `height` RGB8 with bilinear convolution.
fn resize_rgb(image: &DynamicImage, width: u32, height: u32) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let (src_w, src_h) = rgb.dimensions();
    if (src_w, src_h) == (width, height) {
        return Ok(rgb.into_raw());
    }

    let src_image = Image::from_vec_u8(src_w, src_h, rgb.into_raw(), PixelType::U8x3)
        .map_err(|e| MeasureError::Internal(format!("Failed to wrap image for resize: {e}")))?;
    let mut dst_image = Image::new(width, height, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| MeasureError::Internal(format!("Failed to resize image: {e}")))?;

    Ok(dst_image.buffer().to_vec())
}

/// Place resized RGB pixels into a gray NCHW canvas of `target_size`.
fn letterbox_tensor(
    pixels: &[u8],
    width: u32,
    height: u32,
    target_size: (usize, usize),
    pad_left: u32,
    pad_top: u32,
) -> Array4<f32> {
    let (th, tw) = target_size;
    let mut tensor = Array4::from_elem((1, 3, th, tw), LETTERBOX_NORM);

    let (w, h) = (width as usize, height as usize);
    let (left, top) = (pad_left as usize, pad_top as usize);

    for (i, chunk) in pixels.chunks_exact(3).enumerate() {
        let (y, x) = (i / w, i % w);
        if y >= h || y + top >= th || x + left >= tw {
            continue;
        }
        for (c, &v) in chunk.iter().enumerate() {
            tensor[[0, c, y + top, x + left]] = f32::from(v) * INV_255;
        }
    }

    tensor
}

/// Map a point from letterboxed model space back to original image space.
#[must_use]
pub fn scale_point(x: f32, y: f32, scale: (f32, f32), padding: (f32, f32)) -> (f32, f32) {
    let (scale_y, scale_x) = scale;
    let (pad_top, pad_left) = padding;
    ((x - pad_left) / scale_x, (y - pad_top) / scale_y)
}

/// Map a `[x1, y1, x2, y2]` box from model space back to original image space.
#[must_use]
pub fn scale_coords(coords: &[f32; 4], scale: (f32, f32), padding: (f32, f32)) -> [f32; 4] {
    let (x1, y1) = scale_point(coords[0], coords[1], scale, padding);
    let (x2, y2) = scale_point(coords[2], coords[3], scale, padding);
    [x1, y1, x2, y2]
}

/// Clip box coordinates to image bounds given as (height, width).
#[must_use]
pub fn clip_coords(coords: &[f32; 4], shape: (u32, u32)) -> [f32; 4] {
    let (h, w) = (shape.0 as f32, shape.1 as f32);
    [
        coords[0].clamp(0.0, w),
        coords[1].clamp(0.0, h),
        coords[2].clamp(0.0, w),
        coords[3].clamp(0.0, h),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_letterbox_params_square() {
        let (new_w, new_h, pad_left, pad_top, _scale) =
            calculate_letterbox_params(640, 640, (640, 640));

        assert_eq!((new_w, new_h), (640, 640));
        assert_eq!((pad_left, pad_top), (0, 0));
    }

    #[test]
    fn test_letterbox_params_portrait() {
        // A 720x1280 portrait photo fits to 360x640 and is padded left/right
        let (new_w, new_h, pad_left, pad_top, (scale_y, scale_x)) =
            calculate_letterbox_params(720, 1280, (640, 640));

        assert_eq!((new_w, new_h), (360, 640));
        assert_eq!((pad_left, pad_top), (140, 0));
        assert!((scale_x - 0.5).abs() < 1e-6);
        assert!((scale_y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_pads_with_gray() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 40, Rgb([255, 0, 0])));
        let result = preprocess_image(&img, (64, 64)).unwrap();

        assert_eq!(result.tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(result.orig_shape, (40, 20));
        assert!((result.padding.1 - 16.0).abs() < 1e-6);

        // Left padding column is gray, centre is red
        assert!((result.tensor[[0, 0, 32, 0]] - LETTERBOX_NORM).abs() < 1e-6);
        assert!(result.tensor[[0, 0, 32, 32]] > 0.98);
        assert!(result.tensor[[0, 1, 32, 32]] < 0.02);
    }

    #[test]
    fn test_preprocess_rejects_empty_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(matches!(
            preprocess_image(&img, (64, 64)),
            Err(MeasureError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_scale_coords() {
        let scaled = scale_coords(&[100.0, 100.0, 200.0, 200.0], (1.0, 1.0), (10.0, 10.0));

        assert!((scaled[0] - 90.0).abs() < 1e-6);
        assert!((scaled[1] - 90.0).abs() < 1e-6);
        assert!((scaled[2] - 190.0).abs() < 1e-6);
        assert!((scaled[3] - 190.0).abs() < 1e-6);
    }

    #[test]
    fn test_clip_coords() {
        let clipped = clip_coords(&[-10.0, -20.0, 700.0, 500.0], (480, 640));

        assert!(clipped[0].abs() < 1e-6);
        assert!(clipped[1].abs() < 1e-6);
        assert!((clipped[2] - 640.0).abs() < 1e-6);
        assert!((clipped[3] - 480.0).abs() < 1e-6);
    }
}
