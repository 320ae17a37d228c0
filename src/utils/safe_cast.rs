//! Checked conversions between model floats and `OpenCV` pixel integers

use crate::{Error, Result};

/// Convert a tensor dimension to an `OpenCV` size value
///
/// # Errors
///
/// Returns an error if the value exceeds `i32::MAX`
pub fn usize_to_i32(value: usize) -> Result<i32> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Value {value} too large to fit in i32")))
}

/// Convert an `OpenCV` size value to a tensor dimension
///
/// # Errors
///
/// Returns an error if the value is negative
pub fn i32_to_usize(value: i32) -> Result<usize> {
    value
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("Negative dimension {value}")))
}

/// Round a float pixel coordinate to the nearest integer pixel
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
pub fn round_to_pixel(value: f32) -> Result<i32> {
    let rounded = value.round();
    if rounded.is_finite() && rounded >= i32::MIN as f32 && rounded <= i32::MAX as f32 {
        Ok(rounded as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be used as a pixel coordinate"
        )))
    }
}

/// Clamp and convert f32 to i32 for pixel coordinates; non-finite values map to `min`
#[must_use]
#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
pub fn f32_to_i32_clamp(value: f32, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    (value.clamp(min as f32, max as f32) as i32).clamp(min, max)
}
