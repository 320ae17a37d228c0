//! Renderers compositing overlays onto a frame.

use crate::{
    asset::AssetStore,
    body_segmentation::to_colored_part_mask,
    overlay::{Overlay, OverlayRect, Transform3d},
    scene::{Scene, SceneCamera},
    utils::{bounding_rect, clip_to_canvas, safe_cast::round_to_pixel},
    Error, Result,
};
use opencv::{
    core::{self, Mat, Point, Point2f, Rect, Scalar, Size, Vec3b, Vec4b, Vector, CV_8UC3},
    imgproc,
    prelude::*,
};

/// Draws one frame's overlays onto the canvas
pub trait Renderer {
    /// Composite `overlays` in order onto `canvas`
    ///
    /// # Errors
    ///
    /// Returns an error if drawing fails; the canvas may be partially drawn
    fn render(&mut self, canvas: &mut Mat, overlays: &[Overlay], assets: &AssetStore) -> Result<()>;

    fn name(&self) -> &str;
}

/// Which renderer a view uses
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RendererKind {
    /// 2D compositing only
    Canvas,
    /// 2D compositing plus 3D objects seen from a camera on the z axis
    Scene { camera_z: f32 },
}

impl RendererKind {
    #[must_use]
    pub fn build(self) -> Box<dyn Renderer> {
        match self {
            Self::Canvas => Box::new(CanvasRenderer::new()),
            Self::Scene { camera_z } => Box::new(SceneRenderer::new(SceneCamera::at_z(camera_z))),
        }
    }
}

/// Blend a BGRA image onto a BGR canvas with its top-left corner at `origin`
///
/// Each pixel is mixed as `canvas * (1 - a) + color * a` with
/// `a = opacity * alpha / 255`. Parts outside the canvas are dropped.
///
/// # Errors
///
/// Returns an error if the canvas is not 8-bit BGR or the image is not BGRA
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blend_bgra(canvas: &mut Mat, image: &Mat, origin: Point, opacity: f32) -> Result<()> {
    if canvas.typ() != CV_8UC3 {
        return Err(Error::RenderError(format!("Canvas must be 8-bit BGR, got type {}", canvas.typ())));
    }
    if image.channels() != 4 {
        return Err(Error::RenderError(format!(
            "Overlay image must be BGRA, got {} channels",
            image.channels()
        )));
    }

    let target = Rect::new(origin.x, origin.y, image.cols(), image.rows());
    let Some(visible) = clip_to_canvas(target, canvas.cols(), canvas.rows()) else {
        return Ok(());
    };

    let opacity = opacity.clamp(0.0, 1.0);
    for y in visible.y..visible.y + visible.height {
        for x in visible.x..visible.x + visible.width {
            let src = *image.at_2d::<Vec4b>(y - origin.y, x - origin.x)?;
            let a = opacity * f32::from(src.0[3]) / 255.0;
            if a <= 0.0 {
                continue;
            }
            let dst = canvas.at_2d_mut::<Vec3b>(y, x)?;
            for c in 0..3 {
                let mixed = f32::from(dst.0[c]) * (1.0 - a) + f32::from(src.0[c]) * a;
                dst.0[c] = mixed.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
    Ok(())
}

/// 2D compositing renderer
#[derive(Debug, Default)]
pub struct CanvasRenderer {
    drawn: usize,
}

impl CanvasRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of overlays drawn by the last render
    #[must_use]
    pub fn last_drawn(&self) -> usize {
        self.drawn
    }

    /// Draw one 2D overlay; returns whether anything was drawn
    ///
    /// # Errors
    ///
    /// Returns an error if an `OpenCV` drawing call fails
    pub fn draw(&self, canvas: &mut Mat, overlay: &Overlay, assets: &AssetStore) -> Result<bool> {
        match overlay {
            Overlay::Marker { x, y, radius, color } => {
                let center = Point::new(round_to_pixel(*x)?, round_to_pixel(*y)?);
                imgproc::circle(canvas, center, *radius, *color, imgproc::FILLED, imgproc::LINE_8, 0)?;
                Ok(true)
            }
            Overlay::Image { asset, rect } => {
                let Some(image) = assets.image(asset) else {
                    log::warn!("Image asset '{asset}' not loaded");
                    return Ok(false);
                };
                draw_image(canvas, &image.pixels, rect)
            }
            Overlay::PartMask { segmentation, opacity } => {
                let mask = to_colored_part_mask(segmentation)?;
                let mask = if mask.size()? == canvas.size()? {
                    mask
                } else {
                    let mut resized = Mat::default();
                    imgproc::resize(
                        &mask,
                        &mut resized,
                        canvas.size()?,
                        0.0,
                        0.0,
                        imgproc::INTER_NEAREST,
                    )?;
                    resized
                };
                blend_bgra(canvas, &mask, Point::new(0, 0), *opacity)?;
                Ok(true)
            }
            Overlay::Object { asset, .. } => {
                log::debug!("Canvas renderer ignores 3D object '{asset}'");
                Ok(false)
            }
        }
    }
}

fn draw_image(canvas: &mut Mat, pixels: &Mat, rect: &OverlayRect) -> Result<bool> {
    if rect.is_degenerate() {
        log::warn!(
            "Skipping degenerate overlay rectangle {:.1}x{:.1} at ({:.1}, {:.1})",
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );
        return Ok(false);
    }
    let target = rect.to_pixel_rect()?;
    if target.width <= 0 || target.height <= 0 {
        return Ok(false);
    }
    if clip_to_canvas(target, canvas.cols(), canvas.rows()).is_none() {
        return Ok(false);
    }

    let mut resized = Mat::default();
    imgproc::resize(
        pixels,
        &mut resized,
        Size::new(target.width, target.height),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;
    blend_bgra(canvas, &resized, target.tl(), 1.0)?;
    Ok(true)
}

impl Renderer for CanvasRenderer {
    fn render(&mut self, canvas: &mut Mat, overlays: &[Overlay], assets: &AssetStore) -> Result<()> {
        self.drawn = 0;
        for overlay in overlays {
            if self.draw(canvas, overlay, assets)? {
                self.drawn += 1;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "canvas"
    }
}

/// Renderer projecting textured billboards through a perspective camera
///
/// 2D overlays are delegated to a [`CanvasRenderer`] in draw order.
#[derive(Debug)]
pub struct SceneRenderer {
    camera: SceneCamera,
    canvas: CanvasRenderer,
    drawn: usize,
}

impl SceneRenderer {
    #[must_use]
    pub fn new(camera: SceneCamera) -> Self {
        Self {
            camera,
            canvas: CanvasRenderer::new(),
            drawn: 0,
        }
    }

    #[must_use]
    pub fn camera(&self) -> &SceneCamera {
        &self.camera
    }

    #[must_use]
    pub fn last_drawn(&self) -> usize {
        self.drawn
    }

    fn draw_object(&self, canvas: &mut Mat, asset: &str, transform: &Transform3d, assets: &AssetStore) -> Result<bool> {
        let Some(model) = assets.model(asset) else {
            log::warn!("Model asset '{asset}' not loaded");
            return Ok(false);
        };

        #[allow(clippy::cast_precision_loss)]
        let scene = Scene::new(self.camera, (canvas.cols() as f32, canvas.rows() as f32));
        let Some(corners) = scene.quad_corners(transform) else {
            log::debug!("Object '{asset}' is behind the camera");
            return Ok(false);
        };
        let Some(bounds) = bounding_rect(&corners) else {
            return Ok(false);
        };
        let Some(visible) = clip_to_canvas(bounds, canvas.cols(), canvas.rows()) else {
            return Ok(false);
        };

        #[allow(clippy::cast_precision_loss)]
        let (tw, th) = (model.texture.width as f32, model.texture.height as f32);
        let src: Vector<Point2f> = Vector::from_iter([
            Point2f::new(0.0, 0.0),
            Point2f::new(tw, 0.0),
            Point2f::new(tw, th),
            Point2f::new(0.0, th),
        ]);
        #[allow(clippy::cast_precision_loss)]
        let (ox, oy) = (visible.x as f32, visible.y as f32);
        let dst: Vector<Point2f> = corners.iter().map(|&(x, y)| Point2f::new(x - ox, y - oy)).collect();

        let homography = imgproc::get_perspective_transform(&src, &dst, core::DECOMP_LU)?;
        let mut warped = Mat::default();
        imgproc::warp_perspective(
            &model.texture.pixels,
            &mut warped,
            &homography,
            visible.size(),
            imgproc::INTER_LINEAR,
            core::BORDER_CONSTANT,
            Scalar::all(0.0),
        )?;

        blend_bgra(canvas, &warped, visible.tl(), 1.0)?;
        Ok(true)
    }
}

impl Renderer for SceneRenderer {
    fn render(&mut self, canvas: &mut Mat, overlays: &[Overlay], assets: &AssetStore) -> Result<()> {
        self.drawn = 0;
        for overlay in overlays {
            let drawn = match overlay {
                Overlay::Object { asset, transform } => self.draw_object(canvas, asset, transform, assets)?,
                other => self.canvas.draw(canvas, other, assets)?,
            };
            if drawn {
                self.drawn += 1;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scene"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        asset::{ImageAsset, ModelAsset, OverlayAsset},
        body_segmentation::{PartSegmentation, BACKGROUND},
        overlay::marker_color,
    };
    use nalgebra::{UnitQuaternion, Vector3};
    use opencv::core::{CV_8UC4, CV_8UC1};

    fn black(width: i32, height: i32) -> Mat {
        Mat::new_rows_cols_with_default(height, width, CV_8UC3, Scalar::all(0.0)).unwrap()
    }

    fn white_asset(width: i32, height: i32) -> ImageAsset {
        let mat = Mat::new_rows_cols_with_default(height, width, CV_8UC4, Scalar::all(255.0)).unwrap();
        ImageAsset::from_mat(&mat).unwrap()
    }

    #[test]
    fn test_marker_is_drawn_red() {
        let mut canvas = black(64, 64);
        let mut renderer = CanvasRenderer::new();
        let marker = Overlay::Marker {
            x: 32.0,
            y: 32.0,
            radius: 5,
            color: marker_color(),
        };
        renderer.render(&mut canvas, &[marker], &AssetStore::default()).unwrap();
        assert_eq!(renderer.last_drawn(), 1);
        assert_eq!(canvas.at_2d::<Vec3b>(32, 32).unwrap().0, [0, 0, 255]);
        assert_eq!(canvas.at_2d::<Vec3b>(0, 0).unwrap().0, [0, 0, 0]);
    }

    #[test]
    fn test_image_is_blended_into_rect() {
        let mut assets = AssetStore::new();
        assets.insert("eyewear", OverlayAsset::Image(white_asset(20, 10)));
        let mut canvas = black(100, 100);
        let overlay = Overlay::Image {
            asset: "eyewear".to_string(),
            rect: OverlayRect::new(10.0, 20.0, 40.0, 20.0),
        };

        let mut renderer = CanvasRenderer::new();
        renderer.render(&mut canvas, &[overlay], &assets).unwrap();
        assert_eq!(renderer.last_drawn(), 1);
        assert_eq!(canvas.at_2d::<Vec3b>(30, 30).unwrap().0, [255, 255, 255]);
        assert_eq!(canvas.at_2d::<Vec3b>(5, 5).unwrap().0, [0, 0, 0]);
        assert_eq!(canvas.at_2d::<Vec3b>(45, 30).unwrap().0, [0, 0, 0]);
    }

    #[test]
    fn test_degenerate_rect_is_not_drawn() {
        let mut assets = AssetStore::new();
        assets.insert("garment", OverlayAsset::Image(white_asset(20, 10)));
        let mut canvas = black(100, 100);
        let overlay = Overlay::Image {
            asset: "garment".to_string(),
            rect: OverlayRect::new(10.0, 60.0, 40.0, -30.0),
        };

        let mut renderer = CanvasRenderer::new();
        renderer.render(&mut canvas, &[overlay], &assets).unwrap();
        assert_eq!(renderer.last_drawn(), 0);
        assert_eq!(core::count_non_zero(&gray(&canvas)).unwrap(), 0);
    }

    #[test]
    fn test_image_partially_off_canvas() {
        let mut assets = AssetStore::new();
        assets.insert("eyewear", OverlayAsset::Image(white_asset(10, 10)));
        let mut canvas = black(50, 50);
        let overlay = Overlay::Image {
            asset: "eyewear".to_string(),
            rect: OverlayRect::new(-10.0, -10.0, 20.0, 20.0),
        };
        CanvasRenderer::new().render(&mut canvas, &[overlay], &assets).unwrap();
        assert_eq!(canvas.at_2d::<Vec3b>(5, 5).unwrap().0, [255, 255, 255]);
        assert_eq!(canvas.at_2d::<Vec3b>(15, 15).unwrap().0, [0, 0, 0]);
    }

    #[test]
    fn test_part_mask_opacity() {
        let mut data = vec![BACKGROUND; 4 * 4];
        data[0] = 0;
        let segmentation = PartSegmentation {
            width: 4,
            height: 4,
            data,
        };
        let mut canvas = black(8, 8);
        let overlay = Overlay::PartMask {
            segmentation,
            opacity: 0.5,
        };
        CanvasRenderer::new()
            .render(&mut canvas, &[overlay], &AssetStore::default())
            .unwrap();

        // Part 0 covers the top-left 2x2 pixels after upsampling
        let [r, g, b] = crate::body_segmentation::RAINBOW_PART_COLORS[0];
        let px = canvas.at_2d::<Vec3b>(1, 1).unwrap().0;
        let expected = [b, g, r].map(|c| (f32::from(c) * 0.5).round() as u8);
        assert_eq!(px, expected);
        assert_eq!(canvas.at_2d::<Vec3b>(5, 5).unwrap().0, [0, 0, 0]);
    }

    #[test]
    fn test_blend_rejects_non_bgr_canvas() {
        let mut canvas = Mat::new_rows_cols_with_default(4, 4, CV_8UC1, Scalar::all(0.0)).unwrap();
        let image = white_asset(2, 2).pixels;
        assert!(matches!(
            blend_bgra(&mut canvas, &image, Point::new(0, 0), 1.0),
            Err(Error::RenderError(_))
        ));
    }

    #[test]
    fn test_scene_renders_object_at_center() {
        let mut assets = AssetStore::new();
        let model = ModelAsset::new(white_asset(16, 16), Vector3::new(1.0, 1.0, 1.0)).unwrap();
        assets.insert("garment_model", OverlayAsset::Model(model));

        let mut canvas = black(200, 200);
        let overlay = Overlay::Object {
            asset: "garment_model".to_string(),
            transform: Transform3d::fixed(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0), UnitQuaternion::identity()),
        };

        let mut renderer = SceneRenderer::new(SceneCamera::at_z(5.0));
        renderer.render(&mut canvas, &[overlay], &assets).unwrap();
        assert_eq!(renderer.last_drawn(), 1);
        assert_eq!(canvas.at_2d::<Vec3b>(100, 100).unwrap().0, [255, 255, 255]);
        assert_eq!(canvas.at_2d::<Vec3b>(2, 2).unwrap().0, [0, 0, 0]);
    }

    #[test]
    fn test_canvas_renderer_ignores_objects() {
        let mut canvas = black(20, 20);
        let overlay = Overlay::Object {
            asset: "eyewear_model".to_string(),
            transform: Transform3d::fixed(Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0), UnitQuaternion::identity()),
        };
        let mut renderer = CanvasRenderer::new();
        renderer.render(&mut canvas, &[overlay], &AssetStore::default()).unwrap();
        assert_eq!(renderer.last_drawn(), 0);
    }

    fn gray(canvas: &Mat) -> Mat {
        let mut out = Mat::default();
        imgproc::cvt_color(canvas, &mut out, imgproc::COLOR_BGR2GRAY, 0).unwrap();
        out
    }
}
