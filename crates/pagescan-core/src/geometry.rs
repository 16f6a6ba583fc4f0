use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Rigid transform of a tracked object or camera in world space.
///
/// Axis convention: local `+X` is right, `+Y` is up and `+Z` is forward.
/// Tracked pages lie in their local XZ plane, so `up()` is the page normal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    pub fn new(position: Point3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    #[inline]
    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }

    #[inline]
    pub fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }

    #[inline]
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * Vector3::z()
    }

    /// Map a point from this pose's local frame to world space.
    #[inline]
    pub fn transform_point(&self, local: &Point3<f32>) -> Point3<f32> {
        self.position + self.rotation * local.coords
    }

    /// Map a world-space point into this pose's local frame.
    #[inline]
    pub fn inverse_transform_point(&self, world: &Point3<f32>) -> Point3<f32> {
        Point3::from(self.rotation.inverse() * (world - self.position))
    }

    /// Four corners of a planar rectangle of `size` (meters) centered on this pose.
    ///
    /// Order: `(-x,-z)`, `(+x,-z)`, `(+x,+z)`, `(-x,+z)`, i.e. the rectangle's
    /// UV corners `(0,0)`, `(1,0)`, `(1,1)`, `(0,1)`.
    pub fn plane_corners(&self, size: [f32; 2]) -> [Point3<f32>; 4] {
        let half_x = self.right() * (size[0] * 0.5);
        let half_z = self.forward() * (size[1] * 0.5);
        let p = self.position;
        [
            p - half_x - half_z,
            p + half_x - half_z,
            p + half_x + half_z,
            p - half_x + half_z,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_axes_are_canonical() {
        let pose = Pose::identity();
        assert_relative_eq!(pose.right(), Vector3::x());
        assert_relative_eq!(pose.up(), Vector3::y());
        assert_relative_eq!(pose.forward(), Vector3::z());
    }

    #[test]
    fn transform_round_trips() {
        let pose = Pose::new(
            Point3::new(1.0, -2.0, 0.5),
            UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1),
        );
        let local = Point3::new(0.25, 0.1, -0.4);
        let world = pose.transform_point(&local);
        let back = pose.inverse_transform_point(&world);
        assert_relative_eq!(back, local, epsilon = 1e-5);
    }

    #[test]
    fn plane_corners_follow_right_and_forward_axes() {
        // Rotate 90 degrees about Y: right -> -Z, forward -> +X.
        let pose = Pose::new(
            Point3::new(0.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), FRAC_PI_2),
        );
        let c = pose.plane_corners([0.2, 0.4]);
        assert_relative_eq!(c[0], Point3::new(-0.2, 0.0, 0.1), epsilon = 1e-6);
        assert_relative_eq!(c[2], Point3::new(0.2, 0.0, -0.1), epsilon = 1e-6);
    }
}
