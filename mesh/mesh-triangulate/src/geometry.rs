//! Tangent-plane projection and 2D visibility predicates.
//!
//! Each processed point is flattened into the plane orthogonal to its
//! normal. Candidate connections are then ordered by their polar angle in
//! that plane and filtered with [`is_visible_from`], which checks that a
//! connecting segment does not cross an existing front edge.

use nalgebra::{Point2, Point3, Vector3};

/// Denominator below which two segments count as parallel.
const PARALLEL_EPSILON: f64 = 1e-12;

/// A unit vector orthogonal to `n`.
///
/// Picks the vector in the xy plane when `n` is not (nearly) aligned with
/// the z axis, and the vector in the yz plane otherwise.
///
/// # Example
///
/// ```
/// use mesh_triangulate::geometry::unit_orthogonal;
/// use nalgebra::Vector3;
///
/// let n = Vector3::new(0.0, 0.0, 1.0);
/// let o = unit_orthogonal(&n);
/// assert!(o.dot(&n).abs() < 1e-12);
/// assert!((o.norm() - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn unit_orthogonal(n: &Vector3<f64>) -> Vector3<f64> {
    let (x, y, z) = (n.x, n.y, n.z);
    let eps = 1e-12;
    if x.abs() > eps * z.abs() || y.abs() > eps * z.abs() {
        let inv = 1.0 / (x * x + y * y).sqrt();
        Vector3::new(-y * inv, x * inv, 0.0)
    } else {
        let inv = 1.0 / (z * z + y * y).sqrt();
        Vector3::new(0.0, z * inv, -y * inv)
    }
}

/// A local 2D coordinate system in the tangent plane of a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    origin: Point3<f64>,
    normal: Vector3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
}

impl TangentFrame {
    /// Builds the frame at `point` with unit normal `normal`.
    ///
    /// `point` itself projects to the 2D origin.
    #[must_use]
    pub fn new(point: &Point3<f64>, normal: &Vector3<f64>) -> Self {
        let v = unit_orthogonal(normal);
        let u = normal.cross(&v);
        let origin = point - normal * normal.dot(&point.coords);
        Self {
            origin,
            normal: *normal,
            u,
            v,
        }
    }

    /// Projects `p` into the frame.
    #[must_use]
    pub fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        let t = p - self.origin;
        Point2::new(t.dot(&self.u), t.dot(&self.v))
    }

    /// The frame normal.
    #[must_use]
    pub const fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    /// First in-plane axis.
    #[must_use]
    pub const fn u(&self) -> &Vector3<f64> {
        &self.u
    }

    /// Second in-plane axis.
    #[must_use]
    pub const fn v(&self) -> &Vector3<f64> {
        &self.v
    }
}

/// Polar angle of `p` about the origin, in `[-π, π]`.
#[must_use]
pub fn polar_angle(p: &Point2<f64>) -> f64 {
    p.y.atan2(p.x)
}

/// Polar angle of `p` about `center`.
#[must_use]
pub fn polar_angle_from(center: &Point2<f64>, p: &Point2<f64>) -> f64 {
    (p.y - center.y).atan2(p.x - center.x)
}

/// Angle between two normals in radians.
///
/// When the normals are not consistently oriented, an angle above π/2 is
/// measured against the flipped normal instead.
#[must_use]
pub fn surface_angle(a: &Vector3<f64>, b: &Vector3<f64>, consistent: bool) -> f64 {
    let angle = a.dot(b).clamp(-1.0, 1.0).acos();
    if !consistent && angle > std::f64::consts::FRAC_PI_2 {
        std::f64::consts::PI - angle
    } else {
        angle
    }
}

/// Is the segment from the origin to `x` unobstructed by segment `s1`-`s2`?
///
/// Shorthand for [`is_visible_from`] with the origin as reference.
#[must_use]
pub fn is_visible(x: &Point2<f64>, s1: &Point2<f64>, s2: &Point2<f64>) -> bool {
    is_visible_from(x, s1, s2, &Point2::origin())
}

/// Is the segment from `r` to `x` unobstructed by segment `s1`-`s2`?
///
/// Intersects the two supporting lines. The segment is visible when the
/// intersection falls outside the `r`-`x` span or outside the `s1`-`s2`
/// span (endpoints count as outside). Parallel lines are visible.
///
/// # Example
///
/// ```
/// use mesh_triangulate::geometry::is_visible;
/// use nalgebra::Point2;
///
/// let s1 = Point2::new(1.0, -1.0);
/// let s2 = Point2::new(1.0, 1.0);
///
/// // Crosses the segment.
/// assert!(!is_visible(&Point2::new(2.0, 0.0), &s1, &s2));
/// // Passes above it.
/// assert!(is_visible(&Point2::new(2.0, 3.0), &s1, &s2));
/// ```
#[must_use]
#[allow(clippy::float_cmp)] // exact origin test selects the simpler line form
pub fn is_visible_from(
    x: &Point2<f64>,
    s1: &Point2<f64>,
    s2: &Point2<f64>,
    r: &Point2<f64>,
) -> bool {
    let a0 = s1.y - s2.y;
    let b0 = s2.x - s1.x;
    let c0 = s1.x * s2.y - s2.x * s1.y;

    let mut a1 = -x.y;
    let mut b1 = x.x;
    let mut c1 = 0.0;
    if r.x != 0.0 || r.y != 0.0 {
        a1 += r.y;
        b1 -= r.x;
        c1 = r.x * x.y - x.x * r.y;
    }

    let div = a0 * b1 - b0 * a1;
    if div.abs() < PARALLEL_EPSILON {
        return true;
    }
    let ix = (b0 * c1 - b1 * c0) / div;
    let iy = (a1 * c0 - a0 * c1) / div;

    let outside_ray = if x.x > r.x {
        ix <= r.x || ix >= x.x
    } else if x.x < r.x {
        ix >= r.x || ix <= x.x
    } else if x.y > r.y {
        iy <= r.y || iy >= x.y
    } else if x.y < r.y {
        iy >= r.y || iy <= x.y
    } else {
        true
    };
    if outside_ray {
        return true;
    }

    if s1.x > s2.x {
        ix <= s2.x || ix >= s1.x
    } else if s1.x < s2.x {
        ix >= s2.x || ix <= s1.x
    } else if s1.y > s2.y {
        iy <= s2.y || iy >= s1.y
    } else if s1.y < s2.y {
        iy >= s2.y || iy <= s1.y
    } else {
        false
    }
}
