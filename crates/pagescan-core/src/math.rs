//! Scoring and solving functions consumed by the scan coordinator.
//!
//! The coordinator talks to these through [`MathProvider`] so the numeric
//! kernels can be swapped (for example for a SIMD or native build) without
//! touching scan logic. [`ReferenceMath`] is the portable implementation.
//!
//! Implementations are called once per tick from a single thread and receive
//! borrowed views of the coordinator's scratch buffers; they must not retain
//! them past the call.

use crate::geometry::Pose;
use crate::homography::{solve_page_homography, UnwarpMatrix};
use nalgebra::{Point2, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Frame deltas at or below this are treated as missing.
pub const DT_MIN: f32 = 1e-5;
/// Delta substituted for a missing frame delta (one 60 Hz frame).
pub const DT_FALLBACK: f32 = 1.0 / 60.0;

/// Slack on the rotation cosine so identical orientations always pass.
const ROTATION_COS_SLACK: f64 = 1e-12;

/// Device motion bounds for the stability gate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionLimits {
    /// Maximum camera translation speed in meters per second.
    pub max_move_speed: f32,
    /// Maximum camera rotation speed in degrees per second.
    pub max_rotate_speed: f32,
}

impl Default for MotionLimits {
    fn default() -> Self {
        Self {
            max_move_speed: 0.05,
            max_rotate_speed: 5.0,
        }
    }
}

/// Weights and distance band of the framing-quality score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityParams {
    pub angle_weight: f32,
    pub center_weight: f32,
    /// Closest camera-to-target distance (meters) without penalty.
    pub min_scan_distance: f32,
    /// Farthest camera-to-target distance (meters) without penalty.
    pub max_scan_distance: f32,
    /// Multiplier applied to the center term outside the distance band.
    pub distance_penalty: f32,
}

impl Default for QualityParams {
    fn default() -> Self {
        Self {
            angle_weight: 0.6,
            center_weight: 0.4,
            min_scan_distance: 0.2,
            max_scan_distance: 1.0,
            distance_penalty: 0.5,
        }
    }
}

/// Geometry sampled for one target on one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QualityInput {
    pub camera_position: Point3<f32>,
    pub camera_forward: Vector3<f32>,
    pub target_position: Point3<f32>,
    /// Page normal.
    pub target_up: Vector3<f32>,
    /// Target center in screen pixels; `z` is the view depth.
    pub target_screen: Point3<f32>,
    /// Screen resolution in pixels (width, height).
    pub screen: [f32; 2],
}

pub trait MathProvider {
    /// `true` if the camera moved and rotated slowly enough since `last`.
    fn is_stable(&self, current: &Pose, last: &Pose, dt: f32, limits: &MotionLimits) -> bool;

    /// Framing quality in `[0, 1]`; always 0 when the target is behind the camera.
    fn quality(&self, input: &QualityInput, params: &QualityParams) -> f32;

    /// Unwarp matrix for a page, or [`UnwarpMatrix::rejected`].
    fn homography(
        &self,
        physical: [f32; 2],
        screen: [f32; 2],
        corners: &[Point2<f32>; 4],
    ) -> UnwarpMatrix;
}

#[inline]
fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Portable implementation of the scan math.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReferenceMath;

impl MathProvider for ReferenceMath {
    fn is_stable(&self, current: &Pose, last: &Pose, dt: f32, limits: &MotionLimits) -> bool {
        let dt = if dt.is_finite() && dt > DT_MIN {
            dt
        } else {
            DT_FALLBACK
        };

        // Compare squared distances; no sqrt on the hot path.
        let dist_sq = (current.position - last.position).norm_squared();
        let max_dist = limits.max_move_speed * dt;
        if dist_sq > max_dist * max_dist {
            return false;
        }

        // |q1 . q2| = cos(theta / 2); compare against a precomputed cosine
        // instead of taking acos. Done in f64 since the per-frame bound sits
        // close to f32 resolution near 1.
        let a = current.rotation.coords.cast::<f64>();
        let b = last.rotation.coords.cast::<f64>();
        let norm = a.norm() * b.norm();
        if norm <= 0.0 {
            return false;
        }
        let abs_dot = (a.dot(&b) / norm).abs();
        let max_angle = (limits.max_rotate_speed as f64 * dt as f64).to_radians();
        // Bounds of 180 degrees or more accept any rotation.
        let half = (max_angle * 0.5).min(std::f64::consts::FRAC_PI_2);
        let min_cos = half.cos();
        abs_dot + ROTATION_COS_SLACK >= min_cos
    }

    fn quality(&self, input: &QualityInput, params: &QualityParams) -> f32 {
        // Also rejects NaN depth.
        if !(input.target_screen.z > 0.0) {
            return 0.0;
        }

        let angle_score = clamp01(input.target_up.dot(&-input.camera_forward));

        let [screen_w, screen_h] = input.screen;
        let half_h = screen_h * 0.5;
        let center_score = if half_h > 0.0 {
            let dx = input.target_screen.x - screen_w * 0.5;
            let dy = input.target_screen.y - half_h;
            clamp01(1.0 - (dx * dx + dy * dy) / (half_h * half_h))
        } else {
            0.0
        };

        let dist_sq = (input.camera_position - input.target_position).norm_squared();
        let min_sq = params.min_scan_distance * params.min_scan_distance;
        let max_sq = params.max_scan_distance * params.max_scan_distance;
        let distance_factor = if dist_sq < min_sq || dist_sq > max_sq {
            params.distance_penalty
        } else {
            1.0
        };

        clamp01(
            angle_score * params.angle_weight
                + center_score * params.center_weight * distance_factor,
        )
    }

    fn homography(
        &self,
        physical: [f32; 2],
        screen: [f32; 2],
        corners: &[Point2<f32>; 4],
    ) -> UnwarpMatrix {
        solve_page_homography(physical, screen, corners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn facing_input() -> QualityInput {
        QualityInput {
            camera_position: Point3::new(0.0, 0.5, 0.0),
            camera_forward: -Vector3::y(),
            target_position: Point3::origin(),
            target_up: Vector3::y(),
            target_screen: Point3::new(540.0, 960.0, 0.5),
            screen: [1080.0, 1920.0],
        }
    }

    #[test]
    fn identical_samples_are_always_stable() {
        let pose = Pose::new(
            Point3::new(0.3, 1.2, -0.7),
            UnitQuaternion::from_euler_angles(0.4, 1.3, -2.2),
        );
        for dt in [1e-6_f32, 0.001, 1.0 / 60.0, 0.5] {
            for limits in [
                MotionLimits::default(),
                MotionLimits {
                    max_move_speed: 0.0,
                    max_rotate_speed: 0.0,
                },
            ] {
                assert!(ReferenceMath.is_stable(&pose, &pose, dt, &limits));
            }
        }
    }

    #[test]
    fn translation_over_bound_is_unstable() {
        let last = Pose::identity();
        let mut cur = last;
        // 0.05 m/s * 0.1 s = 5 mm allowed.
        cur.position.x = 0.004;
        assert!(ReferenceMath.is_stable(&cur, &last, 0.1, &MotionLimits::default()));
        cur.position.x = 0.006;
        assert!(!ReferenceMath.is_stable(&cur, &last, 0.1, &MotionLimits::default()));
    }

    #[test]
    fn rotation_over_bound_is_unstable() {
        let last = Pose::identity();
        let mut cur = last;
        // 5 deg/s * 1 s = 5 deg allowed.
        cur.rotation = UnitQuaternion::from_euler_angles(0.0, 4.0_f32.to_radians(), 0.0);
        assert!(ReferenceMath.is_stable(&cur, &last, 1.0, &MotionLimits::default()));
        cur.rotation = UnitQuaternion::from_euler_angles(0.0, 6.0_f32.to_radians(), 0.0);
        assert!(!ReferenceMath.is_stable(&cur, &last, 1.0, &MotionLimits::default()));
    }

    #[test]
    fn looser_rotation_limit_never_rejects() {
        let last = Pose::identity();
        let mut cur = last;
        cur.rotation = UnitQuaternion::from_euler_angles(0.0, 20.0_f32.to_radians(), 0.0);
        let mut was_stable = false;
        for deg_per_s in [10.0_f32, 30.0, 179.0, 180.0, 360.0, 700.0, 1000.0, 1.0e6] {
            let limits = MotionLimits {
                max_move_speed: 0.05,
                max_rotate_speed: deg_per_s,
            };
            let stable = ReferenceMath.is_stable(&cur, &last, 1.0, &limits);
            assert!(stable || !was_stable, "{deg_per_s} deg/s rejected a 20 deg turn");
            was_stable |= stable;
        }
        assert!(was_stable);

        // A half turn passes once the bound reaches 180 degrees.
        cur.rotation = UnitQuaternion::from_euler_angles(0.0, 179.0_f32.to_radians(), 0.0);
        let limits = MotionLimits {
            max_move_speed: 0.05,
            max_rotate_speed: 720.0,
        };
        assert!(ReferenceMath.is_stable(&cur, &last, 1.0, &limits));
    }

    #[test]
    fn quaternion_sign_does_not_matter() {
        let q = UnitQuaternion::from_euler_angles(0.2, 0.1, 0.0);
        let flipped = UnitQuaternion::new_unchecked(-q.into_inner());
        let a = Pose::new(Point3::origin(), q);
        let b = Pose::new(Point3::origin(), flipped);
        assert!(ReferenceMath.is_stable(&a, &b, 1.0 / 60.0, &MotionLimits::default()));
    }

    #[test]
    fn tiny_dt_uses_fallback() {
        let last = Pose::identity();
        let mut cur = last;
        // Inside the 1/60 s fallback bound of 0.83 mm.
        cur.position.z = 0.0005;
        assert!(ReferenceMath.is_stable(&cur, &last, 0.0, &MotionLimits::default()));
    }

    #[test]
    fn centered_facing_target_scores_full_weights() {
        let params = QualityParams::default();
        let q = ReferenceMath.quality(&facing_input(), &params);
        assert_relative_eq!(q, params.angle_weight + params.center_weight, epsilon = 1e-5);
    }

    #[test]
    fn behind_camera_scores_zero() {
        let mut input = facing_input();
        for depth in [0.0_f32, -0.1, -10.0, f32::NAN] {
            input.target_screen.z = depth;
            assert_eq!(ReferenceMath.quality(&input, &QualityParams::default()), 0.0);
        }
    }

    #[test]
    fn out_of_band_distance_penalizes_center_term() {
        let params = QualityParams::default();
        let mut input = facing_input();
        input.camera_position = Point3::new(0.0, 2.0, 0.0);
        let q = ReferenceMath.quality(&input, &params);
        let expected =
            params.angle_weight + params.center_weight * params.distance_penalty;
        assert_relative_eq!(q, expected, epsilon = 1e-5);
    }

    #[test]
    fn oblique_and_offcenter_targets_score_lower() {
        let params = QualityParams::default();
        let mut input = facing_input();
        input.target_up = Vector3::new(0.0, 1.0, 1.0).normalize();
        input.target_screen.x = 1000.0;
        let q = ReferenceMath.quality(&input, &params);
        assert!(q > 0.0 && q < params.angle_weight + params.center_weight - 0.1);
    }
}
