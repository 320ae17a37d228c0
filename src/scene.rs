//! Perspective scene used to place 3D overlays on the frame.

use crate::{
    constants::{DEFAULT_CAMERA_Z, DEFAULT_FAR_PLANE, DEFAULT_FOV_DEGREES, DEFAULT_NEAR_PLANE, EPSILON},
    overlay::{Orientation, Transform3d},
};
use nalgebra::{Isometry3, Perspective3, Point3, UnitQuaternion, Vector3};

/// Perspective camera looking down the negative z axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneCamera {
    pub position: Point3<f32>,
    /// Vertical field of view in degrees
    pub fov_y_deg: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for SceneCamera {
    fn default() -> Self {
        Self::at_z(DEFAULT_CAMERA_Z)
    }
}

impl SceneCamera {
    /// Camera on the z axis with the default lens
    #[must_use]
    pub fn at_z(z: f32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, z),
            fov_y_deg: DEFAULT_FOV_DEGREES,
            near: DEFAULT_NEAR_PLANE,
            far: DEFAULT_FAR_PLANE,
        }
    }

    fn view(&self) -> Isometry3<f32> {
        let target = self.position - Vector3::z();
        Isometry3::look_at_rh(&self.position, &target, &Vector3::y())
    }
}

/// A camera and the pixel viewport it renders into
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scene {
    pub camera: SceneCamera,
    pub viewport: (f32, f32),
}

impl Scene {
    #[must_use]
    pub fn new(camera: SceneCamera, viewport: (f32, f32)) -> Self {
        Self { camera, viewport }
    }

    fn aspect(&self) -> f32 {
        self.viewport.0 / self.viewport.1.max(EPSILON)
    }

    fn projection(&self) -> Perspective3<f32> {
        Perspective3::new(
            self.aspect(),
            self.camera.fov_y_deg.to_radians(),
            self.camera.near,
            self.camera.far,
        )
    }

    /// Project a world point to viewport pixels
    ///
    /// Returns `None` for points at or behind the near plane.
    #[must_use]
    pub fn project(&self, point: &Point3<f32>) -> Option<(f32, f32)> {
        let in_view = self.camera.view().transform_point(point);
        if in_view.z > -self.camera.near {
            return None;
        }
        let ndc = self.projection().project_point(&in_view);
        let (width, height) = self.viewport;
        Some(((ndc.x + 1.0) / 2.0 * width, (1.0 - ndc.y) / 2.0 * height))
    }

    /// Rotation applied to an object this render
    ///
    /// Billboards are turned so their front (+z) faces the camera.
    #[must_use]
    pub fn rotation_for(&self, transform: &Transform3d) -> UnitQuaternion<f32> {
        match transform.orientation {
            Orientation::Fixed(rotation) => rotation,
            Orientation::FaceCamera => {
                let to_camera = self.camera.position - Point3::from(transform.position);
                if to_camera.norm() <= EPSILON {
                    UnitQuaternion::identity()
                } else {
                    UnitQuaternion::face_towards(&to_camera, &Vector3::y())
                }
            }
        }
    }

    /// Pixel corners of a unit quad placed by `transform`
    ///
    /// The quad spans `[-0.5, 0.5]` in x and y before scaling. Corners are
    /// ordered top-left, top-right, bottom-right, bottom-left. Returns `None`
    /// if any corner falls behind the camera.
    #[must_use]
    pub fn quad_corners(&self, transform: &Transform3d) -> Option<[(f32, f32); 4]> {
        let rotation = self.rotation_for(transform);
        let local = [(-0.5, 0.5), (0.5, 0.5), (0.5, -0.5), (-0.5, -0.5)];

        let mut corners = [(0.0, 0.0); 4];
        for (corner, (lx, ly)) in corners.iter_mut().zip(local) {
            let scaled = Vector3::new(lx * transform.scale.x, ly * transform.scale.y, 0.0);
            let world = Point3::from(transform.position + rotation * scaled);
            *corner = self.project(&world)?;
        }
        Some(corners)
    }

    /// Width of the visible world plane at `distance` from the camera
    #[must_use]
    pub fn viewport_width_at(&self, distance: f32) -> f32 {
        2.0 * distance * (self.camera.fov_y_deg.to_radians() / 2.0).tan() * self.aspect()
    }
}
