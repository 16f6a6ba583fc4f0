use nalgebra::{Point3, Vector3};
use pagescan_core::Pose;
use serde::{Deserialize, Serialize};

/// Pinhole camera used for screen-space projection.
///
/// Screen pixels have their origin at the bottom-left; `+y` is up.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub pose: Pose,
    /// Vertical field of view in degrees.
    pub vertical_fov_deg: f32,
    pub screen_width: u32,
    pub screen_height: u32,
}

impl Camera {
    pub fn new(pose: Pose, vertical_fov_deg: f32, screen_width: u32, screen_height: u32) -> Self {
        Self {
            pose,
            vertical_fov_deg,
            screen_width,
            screen_height,
        }
    }

    #[inline]
    pub fn forward(&self) -> Vector3<f32> {
        self.pose.forward()
    }

    /// `(width, height)` in pixels as floats.
    #[inline]
    pub fn screen_size(&self) -> [f32; 2] {
        [self.screen_width as f32, self.screen_height as f32]
    }

    /// Project a world point to `(x, y)` screen pixels and view depth `z`.
    ///
    /// Points behind the camera come back with `z <= 0` and are not clipped;
    /// callers must check depth before trusting `x` and `y`.
    pub fn world_to_screen(&self, world: &Point3<f32>) -> Point3<f32> {
        let local = self.pose.inverse_transform_point(world);
        let depth = local.z;
        let [w, h] = self.screen_size();
        let tan_half = (self.vertical_fov_deg.to_radians() * 0.5).tan();
        let aspect = if h > 0.0 { w / h } else { 1.0 };

        let ndc_x = local.x / (depth * tan_half * aspect);
        let ndc_y = local.y / (depth * tan_half);
        Point3::new((ndc_x + 1.0) * 0.5 * w, (ndc_y + 1.0) * 0.5 * h, depth)
    }
}
