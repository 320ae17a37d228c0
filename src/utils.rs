//! Utility functions for pixel geometry and image/tensor conversion.

pub mod image_conversion;
pub mod safe_cast;

use opencv::core::Rect;

/// Intersect a rectangle with the `[0, max_width) x [0, max_height)` canvas
///
/// Returns `None` when nothing of the rectangle is visible.
#[must_use]
pub fn clip_to_canvas(rect: Rect, max_width: i32, max_height: i32) -> Option<Rect> {
    let x0 = rect.x.max(0);
    let y0 = rect.y.max(0);
    let x1 = rect.x.saturating_add(rect.width).min(max_width);
    let y1 = rect.y.saturating_add(rect.height).min(max_height);

    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
}

/// Axis-aligned bounding box of a set of float points, grown to whole pixels
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn bounding_rect(points: &[(f32, f32)]) -> Option<Rect> {
    let first = points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.0, first.1, first.0, first.1);
    for &(x, y) in &points[1..] {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return None;
    }
    let x0 = safe_cast::f32_to_i32_clamp(min_x.floor(), i32::MIN / 2, i32::MAX / 2);
    let y0 = safe_cast::f32_to_i32_clamp(min_y.floor(), i32::MIN / 2, i32::MAX / 2);
    let x1 = safe_cast::f32_to_i32_clamp(max_x.ceil(), i32::MIN / 2, i32::MAX / 2);
    let y1 = safe_cast::f32_to_i32_clamp(max_y.ceil(), i32::MIN / 2, i32::MAX / 2);
    Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_inside() {
        let clipped = clip_to_canvas(Rect::new(10, 10, 50, 40), 640, 480).unwrap();
        assert_eq!(clipped, Rect::new(10, 10, 50, 40));
    }

    #[test]
    fn test_clip_partially_outside() {
        let clipped = clip_to_canvas(Rect::new(-20, 450, 100, 100), 640, 480).unwrap();
        assert_eq!(clipped, Rect::new(0, 450, 80, 30));
    }

    #[test]
    fn test_clip_fully_outside() {
        assert!(clip_to_canvas(Rect::new(700, 10, 50, 50), 640, 480).is_none());
        assert!(clip_to_canvas(Rect::new(10, 10, 0, 50), 640, 480).is_none());
        assert!(clip_to_canvas(Rect::new(10, 10, 50, -5), 640, 480).is_none());
    }

    #[test]
    fn test_bounding_rect() {
        let rect = bounding_rect(&[(10.2, 20.7), (30.5, 5.1), (12.0, 12.0)]).unwrap();
        assert_eq!(rect, Rect::new(10, 5, 21, 16));
        assert!(bounding_rect(&[]).is_none());
        assert!(bounding_rect(&[(f32::NAN, 1.0)]).is_none());
    }
}
