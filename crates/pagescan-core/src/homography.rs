use nalgebra::{Matrix3, Matrix4, Point2, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// Planar projective transform: `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        Point2::new((v[0] / w) as f32, (v[1] / w) as f32)
    }
}

/// Similarity moving `pts` to their centroid with mean distance `sqrt(2)`.
fn conditioning(pts: &[Point2<f32>; 4]) -> Matrix3<f64> {
    let (sx, sy) = pts
        .iter()
        .fold((0.0, 0.0), |(x, y), p| (x + p.x as f64, y + p.y as f64));
    let (cx, cy) = (sx / 4.0, sy / 4.0);
    let spread = pts
        .iter()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / 4.0;
    let s = if spread > 1e-12 {
        std::f64::consts::SQRT_2 / spread
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

#[inline]
fn conditioned(t: &Matrix3<f64>, p: &Point2<f32>) -> (f64, f64) {
    let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
    (v.x, v.y)
}

/// `H` with `dst ~ H * src` from four correspondences, `h33` fixed to 1.
///
/// Points are conditioned before the 8x8 solve. Returns `None` when the
/// system is singular, e.g. three collinear corners.
pub fn homography_from_4pt(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Homography> {
    let t_src = conditioning(src);
    let t_dst = conditioning(dst);

    let mut a = SMatrix::<f64, 8, 8>::zeros();
    let mut b = SVector::<f64, 8>::zeros();
    for (k, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y) = conditioned(&t_src, s);
        let (u, v) = conditioned(&t_dst, d);
        let rows = [
            ([x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y], u),
            ([0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y], v),
        ];
        for (r, (coeffs, rhs)) in rows.into_iter().enumerate() {
            let row = 2 * k + r;
            for (c, value) in coeffs.into_iter().enumerate() {
                a[(row, c)] = value;
            }
            b[row] = rhs;
        }
    }

    let h = a.lu().solve(&b)?;
    let conditioned_h = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
    let full = t_dst.try_inverse()? * conditioned_h * t_src;
    let scale = full[(2, 2)];
    if scale.abs() < 1e-12 {
        return None;
    }
    let full = full / scale;
    if full.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(Homography::new(full))
}

/// 4x4 unwarp matrix handed to the rectification shader.
///
/// Column-major, the upper-left 3x3 block holds the homography mapping the
/// rectified output's UV space into the camera frame's normalized UV space,
/// and `m[(3, 3)]` is 1. A rejected solve is encoded as [`UnwarpMatrix::rejected`],
/// whose `m[(3, 3)]` is 0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnwarpMatrix {
    pub m: Matrix4<f32>,
}

impl UnwarpMatrix {
    /// The rejection sentinel: an all-zero matrix.
    pub fn rejected() -> Self {
        Self {
            m: Matrix4::zeros(),
        }
    }

    pub fn from_homography(h: &Homography) -> Self {
        let h = h.h;
        let mut m = Matrix4::<f32>::zeros();
        for r in 0..3 {
            for c in 0..3 {
                m[(r, c)] = h[(r, c)] as f32;
            }
        }
        m[(3, 3)] = 1.0;
        Self { m }
    }

    #[inline]
    pub fn is_rejected(&self) -> bool {
        self.m[(3, 3)] == 0.0
    }

    /// The embedded homography, or `None` for the rejection sentinel.
    pub fn homography(&self) -> Option<Homography> {
        if self.is_rejected() {
            return None;
        }
        let mut h = Matrix3::<f64>::zeros();
        for r in 0..3 {
            for c in 0..3 {
                h[(r, c)] = self.m[(r, c)] as f64;
            }
        }
        Some(Homography::new(h))
    }

    /// Column-major element array, the layout shader uniforms expect.
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0_f32; 16];
        out.copy_from_slice(self.m.as_slice());
        out
    }
}

/// UV rectangle of a page of physical size `width x height` inside the
/// square unit output.
///
/// The page keeps its aspect ratio: the long axis extends past `[0, 1]`
/// symmetrically so the square output shows the centered crop at uniform scale.
/// Corners are returned in `(min,min)`, `(max,min)`, `(max,max)`, `(min,max)` order.
pub fn page_uv_rect(width: f32, height: f32) -> Option<[Point2<f32>; 4]> {
    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return None;
    }
    let ratio = width / height;
    let (u_min, u_max, v_min, v_max) = if ratio < 1.0 {
        let s = 1.0 / ratio;
        let v_min = (1.0 - s) * 0.5;
        (0.0, 1.0, v_min, v_min + s)
    } else {
        let s = ratio;
        let u_min = (1.0 - s) * 0.5;
        (u_min, u_min + s, 0.0, 1.0)
    };
    Some([
        Point2::new(u_min, v_min),
        Point2::new(u_max, v_min),
        Point2::new(u_max, v_max),
        Point2::new(u_min, v_max),
    ])
}

const COLLINEAR_EPS: f32 = 1e-6;

#[inline]
fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

/// A proper quad has no three collinear corners and turns consistently.
fn is_proper_quad(q: &[Point2<f32>; 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (1, 2, 3), (2, 3, 0), (3, 0, 1)];
    let mut sign = 0.0_f32;
    for (a, b, c) in TRIPLES {
        let z = cross(q[a], q[b], q[c]);
        if z.abs() <= COLLINEAR_EPS {
            return false;
        }
        if sign == 0.0 {
            sign = z.signum();
        } else if z.signum() != sign {
            return false;
        }
    }
    true
}

fn on_screen(p: &Point2<f32>, screen_w: f32, screen_h: f32) -> bool {
    p.x >= 0.0 && p.y >= 0.0 && p.x <= screen_w && p.y <= screen_h
}

/// Solve the page unwarp from four projected screen corners.
///
/// - `physical`: page size in meters (width, height)
/// - `screen`: screen resolution in pixels (width, height)
/// - `corners`: raw pixel coordinates in page-corner order (see [`page_uv_rect`])
///
/// Returns [`UnwarpMatrix::rejected`] for non-positive sizes, non-finite or
/// degenerate corners, or when every corner lies off-screen.
pub fn solve_page_homography(
    physical: [f32; 2],
    screen: [f32; 2],
    corners: &[Point2<f32>; 4],
) -> UnwarpMatrix {
    let [screen_w, screen_h] = screen;
    if !(screen_w.is_finite() && screen_h.is_finite()) || screen_w <= 0.0 || screen_h <= 0.0 {
        return UnwarpMatrix::rejected();
    }
    let Some(src) = page_uv_rect(physical[0], physical[1]) else {
        return UnwarpMatrix::rejected();
    };
    if corners.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
        return UnwarpMatrix::rejected();
    }
    if !corners.iter().any(|p| on_screen(p, screen_w, screen_h)) {
        return UnwarpMatrix::rejected();
    }

    let inv_w = 1.0 / screen_w;
    let inv_h = 1.0 / screen_h;
    let dst = corners.map(|p| Point2::new(p.x * inv_w, p.y * inv_h));
    if !is_proper_quad(&dst) {
        return UnwarpMatrix::rejected();
    }

    match homography_from_4pt(&src, &dst) {
        Some(h) => UnwarpMatrix::from_homography(&h),
        None => UnwarpMatrix::rejected(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    #[test]
    fn four_point_specialization_recovers_h() {
        let ground_truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));

        let rect = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(180.0_f32, 0.0),
            Point2::new(180.0_f32, 130.0),
            Point2::new(0.0_f32, 130.0),
        ];
        let dst = rect.map(|p| ground_truth.apply(p));

        let recovered = homography_from_4pt(&rect, &dst).expect("recoverable");

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(60.0, 40.0),
            Point2::new(150.0, 120.0),
        ] {
            assert_close(recovered.apply(p), ground_truth.apply(p), 1e-3);
        }
    }

    #[test]
    fn page_rect_preserves_aspect() {
        let portrait = page_uv_rect(0.2, 0.3).expect("valid");
        assert_close(portrait[0], Point2::new(0.0, -0.25), 1e-6);
        assert_close(portrait[2], Point2::new(1.0, 1.25), 1e-6);

        let landscape = page_uv_rect(0.4, 0.2).expect("valid");
        assert_close(landscape[0], Point2::new(-0.5, 0.0), 1e-6);
        assert_close(landscape[2], Point2::new(1.5, 1.0), 1e-6);

        assert!(page_uv_rect(0.0, 0.3).is_none());
    }

    #[test]
    fn page_solve_maps_uv_corners_to_normalized_screen() {
        let corners = [
            Point2::new(300.0_f32, 200.0),
            Point2::new(780.0, 230.0),
            Point2::new(760.0, 900.0),
            Point2::new(320.0, 880.0),
        ];
        let screen = [1080.0_f32, 1920.0];
        let m = solve_page_homography([0.2, 0.3], screen, &corners);
        assert!(!m.is_rejected());

        let h = m.homography().expect("accepted");
        let uv = page_uv_rect(0.2, 0.3).expect("valid");
        for (src, px) in uv.iter().zip(corners.iter()) {
            let expected = Point2::new(px.x / screen[0], px.y / screen[1]);
            assert_close(h.apply(*src), expected, 1e-4);
        }
    }

    #[test]
    fn collinear_corners_are_rejected() {
        let corners = [
            Point2::new(100.0_f32, 100.0),
            Point2::new(200.0, 200.0),
            Point2::new(300.0, 300.0),
            Point2::new(400.0, 400.0),
        ];
        let m = solve_page_homography([0.2, 0.3], [1080.0, 1920.0], &corners);
        assert!(m.is_rejected());
        assert!(m.homography().is_none());
    }

    #[test]
    fn offscreen_and_bowtie_quads_are_rejected() {
        let offscreen = [
            Point2::new(-500.0_f32, -500.0),
            Point2::new(-100.0, -500.0),
            Point2::new(-100.0, -100.0),
            Point2::new(-500.0, -100.0),
        ];
        assert!(solve_page_homography([0.2, 0.2], [1080.0, 1920.0], &offscreen).is_rejected());

        let bowtie = [
            Point2::new(100.0_f32, 100.0),
            Point2::new(400.0, 400.0),
            Point2::new(400.0, 100.0),
            Point2::new(100.0, 400.0),
        ];
        assert!(solve_page_homography([0.2, 0.2], [1080.0, 1920.0], &bowtie).is_rejected());
    }

    #[test]
    fn unwarp_layout_is_column_major_with_unit_corner() {
        let h = Homography::from_array([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 1.0]]);
        let m = UnwarpMatrix::from_homography(&h);
        let cols = m.to_cols_array();
        assert_eq!(&cols[0..4], &[1.0, 4.0, 7.0, 0.0]);
        assert_eq!(&cols[8..12], &[3.0, 6.0, 1.0, 0.0]);
        assert_eq!(cols[15], 1.0);
        assert!(UnwarpMatrix::rejected().is_rejected());
    }
}
