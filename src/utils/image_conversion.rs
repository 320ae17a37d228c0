//! Conversions between `OpenCV` frames and model input tensors.

use super::safe_cast::i32_to_usize;
use crate::{Error, Result};
use ndarray::Array4;
use opencv::core::{Mat, Size, Vec3f, CV_32F, CV_8UC1, CV_8UC3, CV_8UC4};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;

/// Resize a BGR frame and pack it as a `[1, height, width, 3]` RGB tensor
///
/// `normalize` is applied to every channel value in `[0, 255]`.
///
/// # Errors
///
/// Returns an error if:
/// - The frame is empty or not 3-channel
/// - Resizing or color conversion fails
pub fn frame_to_nhwc<F>(frame: &Mat, width: i32, height: i32, normalize: F) -> Result<Array4<f32>>
where
    F: Fn(f32) -> f32,
{
    if frame.empty() {
        return Err(Error::InvalidInput("Cannot convert an empty frame".to_string()));
    }
    if frame.typ() != CV_8UC3 {
        return Err(Error::InvalidInput(format!(
            "Expected an 8-bit BGR frame, got type {}",
            frame.typ()
        )));
    }

    let mut resized = Mat::default();
    imgproc::resize(
        frame,
        &mut resized,
        Size::new(width, height),
        0.0,
        0.0,
        InterpolationFlags::INTER_LINEAR as i32,
    )?;

    let mut rgb = Mat::default();
    imgproc::cvt_color(&resized, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

    let mut float_image = Mat::default();
    rgb.convert_to(&mut float_image, CV_32F, 1.0, 0.0)?;

    let rows = i32_to_usize(height)?;
    let cols = i32_to_usize(width)?;
    let mut data = Vec::with_capacity(rows * cols * 3);
    for row in 0..height {
        for col in 0..width {
            let pixel = float_image.at_2d::<Vec3f>(row, col)?;
            data.extend(pixel.iter().map(|&v| normalize(v)));
        }
    }

    Array4::from_shape_vec((1, rows, cols, 3), data)
        .map_err(|e| Error::ModelDataFormatError(format!("Failed to create input tensor: {e}")))
}

/// Convert an image of any common channel layout to 8-bit BGRA
///
/// # Errors
///
/// Returns an error if the image type is unsupported
pub fn to_bgra(image: &Mat) -> Result<Mat> {
    let code = match image.typ() {
        t if t == CV_8UC4 => return Ok(image.try_clone()?),
        t if t == CV_8UC3 => imgproc::COLOR_BGR2BGRA,
        t if t == CV_8UC1 => imgproc::COLOR_GRAY2BGRA,
        other => {
            return Err(Error::AssetError(format!("Unsupported image type {other}")));
        }
    };
    let mut bgra = Mat::default();
    imgproc::cvt_color(image, &mut bgra, code, 0)?;
    Ok(bgra)
}
