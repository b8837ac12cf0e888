//! Filtered orientation predicates for explicit and implicit points.
//!
//! Three predicates drive every containment decision:
//!
//! - [`orient_3d`] for four explicit points;
//! - [`LinePlaneIntersection`] for the point where a line meets a plane;
//! - [`TriplePlaneIntersection`] for the point shared by three planes.
//!
//! Implicit points are never rounded to coordinates. They are kept as a
//! homogeneous numerator and denominator whose components carry a
//! certified error bound ([`Filtered`]), and an orientation query against
//! such a point multiplies the sign of the numerator expression by the
//! sign of the denominator.
//!
//! Every predicate returns a [`Sign`]. A non-zero sign is always the sign of
//! the exact expression on the exact inputs; anything the filter cannot
//! certify, including exact zeros and overflow, is [`Sign::INDETERMINATE`].

#![forbid(unsafe_code)]

use std::fmt;
use std::ops::{Mul, Neg};

use serde::{Deserialize, Serialize};

use crate::geometry::filtered::{Filtered, relative};
use crate::geometry::matrix::{Vec3, cross, det3x3, dot, scale};
use crate::geometry::point::{Point, Triangle};

/// Certified sign of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    /// The exact value is negative.
    NEGATIVE,
    /// The exact value is zero or could not be certified.
    INDETERMINATE,
    /// The exact value is positive.
    POSITIVE,
}

impl Sign {
    /// `-1`, `0` or `1`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        match self {
            Self::NEGATIVE => -1,
            Self::INDETERMINATE => 0,
            Self::POSITIVE => 1,
        }
    }

    /// Returns `true` for [`Sign::NEGATIVE`] and [`Sign::POSITIVE`].
    #[must_use]
    pub const fn is_certain(self) -> bool {
        !matches!(self, Self::INDETERMINATE)
    }
}

impl Neg for Sign {
    type Output = Self;

    fn neg(self) -> Self {
        match self {
            Self::NEGATIVE => Self::POSITIVE,
            Self::INDETERMINATE => Self::INDETERMINATE,
            Self::POSITIVE => Self::NEGATIVE,
        }
    }
}

/// Sign of a product. Any indeterminate factor makes the product
/// indeterminate.
impl Mul for Sign {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        match (self, rhs) {
            (Self::INDETERMINATE, _) | (_, Self::INDETERMINATE) => Self::INDETERMINATE,
            (a, b) if a == b => Self::POSITIVE,
            _ => Self::NEGATIVE,
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::INDETERMINATE => write!(f, "INDETERMINATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

/// A point, explicit or implicit, that can be oriented against a plane
/// given by three explicit points.
pub trait ImplicitPoint {
    /// Sign of the volume of the tetrahedron `(a, b, c, self)`, with the
    /// same convention as [`orient_3d`].
    fn orient_against(&self, a: &Point, b: &Point, c: &Point) -> Sign;
}

/// Orientation of `d` relative to the plane through `a`, `b`, `c`.
///
/// Returns the sign of `((b - a) × (c - a)) · (d - a)`: [`Sign::POSITIVE`]
/// when `d` lies on the side the right-handed normal of `(a, b, c)` points
/// to.
///
/// # Examples
///
/// ```
/// use tolerance_envelope::geometry::point::Point;
/// use tolerance_envelope::geometry::predicates::{Sign, orient_3d};
///
/// let a = Point::new([0.0, 0.0, 0.0]);
/// let b = Point::new([1.0, 0.0, 0.0]);
/// let c = Point::new([0.0, 1.0, 0.0]);
/// assert_eq!(orient_3d(&a, &b, &c, &Point::new([0.2, 0.2, 1.0])), Sign::POSITIVE);
/// assert_eq!(orient_3d(&a, &b, &c, &Point::new([0.2, 0.2, -1.0])), Sign::NEGATIVE);
/// assert_eq!(orient_3d(&a, &b, &c, &Point::new([5.0, 7.0, 0.0])), Sign::INDETERMINATE);
/// ```
#[must_use]
pub fn orient_3d(a: &Point, b: &Point, c: &Point, d: &Point) -> Sign {
    det3x3([relative(b, a), relative(c, a), relative(d, a)]).sign()
}

impl ImplicitPoint for Point {
    fn orient_against(&self, a: &Point, b: &Point, c: &Point) -> Sign {
        orient_3d(a, b, c, self)
    }
}

/// Normal of the plane through `t` scaled by twice the triangle's area.
fn triangle_normal(t: &Triangle) -> Vec3<Filtered> {
    cross(relative(&t[1], &t[0]), relative(&t[2], &t[0]))
}

// =============================================================================
// LINE / PLANE INTERSECTION
// =============================================================================

/// The intersection of the line through `p`, `q` with the plane through
/// `r`, `s`, `t`, kept in homogeneous form.
///
/// With `N = (s - r) × (t - r)`, the point is `p + (n / d)(q - p)` where
/// `d = N · (q - p)` and `n = N · (r - p)`. Construction fails when the sign
/// of `d` cannot be certified, which covers a line parallel to the plane
/// and a degenerate plane.
///
/// # Examples
///
/// ```
/// use tolerance_envelope::geometry::point::Point;
/// use tolerance_envelope::geometry::predicates::{LinePlaneIntersection, Sign};
///
/// // The z axis meets the plane z = 1 at (0, 0, 1).
/// let lpi = LinePlaneIntersection::new(
///     &Point::new([0.0, 0.0, 0.0]),
///     &Point::new([0.0, 0.0, 4.0]),
///     &Point::new([0.0, 0.0, 1.0]),
///     &Point::new([1.0, 0.0, 1.0]),
///     &Point::new([0.0, 1.0, 1.0]),
/// )
/// .unwrap();
/// assert_eq!(lpi.within_segment(), Sign::POSITIVE);
///
/// // It lies above the plane z = 0.
/// let up = lpi.orient(
///     &Point::new([0.0, 0.0, 0.0]),
///     &Point::new([1.0, 0.0, 0.0]),
///     &Point::new([0.0, 1.0, 0.0]),
/// );
/// assert_eq!(up, Sign::POSITIVE);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct LinePlaneIntersection {
    p: Point,
    direction: Vec3<Filtered>,
    numerator: Filtered,
    denominator: Filtered,
    denominator_sign: Sign,
}

impl LinePlaneIntersection {
    /// Build the implicit point, or `None` if the line does not cross the
    /// plane at a certified single point.
    #[must_use]
    pub fn new(p: &Point, q: &Point, r: &Point, s: &Point, t: &Point) -> Option<Self> {
        let normal = triangle_normal(&[*r, *s, *t]);
        let direction = relative(q, p);
        let denominator = dot(normal, direction);
        let denominator_sign = denominator.sign();
        if !denominator_sign.is_certain() {
            return None;
        }
        Some(Self {
            p: *p,
            direction,
            numerator: dot(normal, relative(r, p)),
            denominator,
            denominator_sign,
        })
    }

    /// Orientation of the intersection point relative to the plane through
    /// `a`, `b`, `c`, with the convention of [`orient_3d`].
    #[must_use]
    pub fn orient(&self, a: &Point, b: &Point, c: &Point) -> Sign {
        let m = cross(relative(b, a), relative(c, a));
        let pa = relative(&self.p, a);
        let j = [
            pa[0] * self.denominator + self.numerator * self.direction[0],
            pa[1] * self.denominator + self.numerator * self.direction[1],
            pa[2] * self.denominator + self.numerator * self.direction[2],
        ];
        dot(m, j).sign() * self.denominator_sign
    }

    /// Whether the point lies strictly between `p` and `q`.
    ///
    /// [`Sign::POSITIVE`] when it is strictly inside the open segment,
    /// [`Sign::NEGATIVE`] when it is strictly outside the closed segment,
    /// [`Sign::INDETERMINATE`] otherwise.
    #[must_use]
    pub fn within_segment(&self) -> Sign {
        let after_p = self.numerator.sign() * self.denominator_sign;
        let before_q = (self.denominator - self.numerator).sign() * self.denominator_sign;
        match (after_p, before_q) {
            (Sign::NEGATIVE, _) | (_, Sign::NEGATIVE) => Sign::NEGATIVE,
            (Sign::POSITIVE, Sign::POSITIVE) => Sign::POSITIVE,
            _ => Sign::INDETERMINATE,
        }
    }

    /// A rounded approximation of the point, for diagnostics only.
    #[must_use]
    pub fn approximate(&self) -> Point {
        let t = self.numerator.value() / self.denominator.value();
        self.p.translated([
            t * self.direction[0].value(),
            t * self.direction[1].value(),
            t * self.direction[2].value(),
        ])
    }
}

impl ImplicitPoint for LinePlaneIntersection {
    fn orient_against(&self, a: &Point, b: &Point, c: &Point) -> Sign {
        self.orient(a, b, c)
    }
}

// =============================================================================
// TRIPLE PLANE INTERSECTION
// =============================================================================

/// The common point of the planes of three triangles, kept in homogeneous
/// form.
///
/// Coordinates are taken relative to the first vertex of `v`. With the
/// plane normals as the rows of `A`, Cramer's rule gives the point as
/// `origin + m / d` with `d = det(A)`. All of this is computed once at
/// construction and reused by every orientation query.
///
/// # Examples
///
/// ```
/// use tolerance_envelope::geometry::point::Point;
/// use tolerance_envelope::geometry::predicates::{Sign, TriplePlaneIntersection};
///
/// let p = |x, y, z| Point::new([x, y, z]);
/// // Planes z = 0, x = 0.25 and y = 0.25 meet at (0.25, 0.25, 0).
/// let tpi = TriplePlaneIntersection::new(
///     &[p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
///     &[p(0.25, 0.0, 0.0), p(0.25, 1.0, 0.0), p(0.25, 0.0, 1.0)],
///     &[p(0.0, 0.25, 0.0), p(0.0, 0.25, 1.0), p(1.0, 0.25, 0.0)],
/// )
/// .unwrap();
/// assert_eq!(tpi.within_triangle(), Sign::POSITIVE);
/// let side = tpi.orient(&p(0.5, 0.0, 0.0), &p(0.5, 1.0, 0.0), &p(0.5, 0.0, 1.0));
/// assert_eq!(side, Sign::NEGATIVE);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TriplePlaneIntersection {
    triangle: Triangle,
    normal: Vec3<Filtered>,
    numerator: Vec3<Filtered>,
    denominator: Filtered,
    denominator_sign: Sign,
}

impl TriplePlaneIntersection {
    /// Build the implicit point, or `None` if the three planes do not meet
    /// at a certified single point.
    #[must_use]
    pub fn new(v: &Triangle, w: &Triangle, u: &Triangle) -> Option<Self> {
        let origin = v[0];
        let nv = triangle_normal(v);
        let nw = triangle_normal(w);
        let nu = triangle_normal(u);

        let denominator = det3x3([nv, nw, nu]);
        let denominator_sign = denominator.sign();
        if !denominator_sign.is_certain() {
            return None;
        }

        // Right-hand side of A·x = b; the plane of v passes through the origin.
        let bv = Filtered::ZERO;
        let bw = dot(nw, relative(&w[0], &origin));
        let bu = dot(nu, relative(&u[0], &origin));

        let numerator = [
            det3x3([[bv, nv[1], nv[2]], [bw, nw[1], nw[2]], [bu, nu[1], nu[2]]]),
            det3x3([[nv[0], bv, nv[2]], [nw[0], bw, nw[2]], [nu[0], bu, nu[2]]]),
            det3x3([[nv[0], nv[1], bv], [nw[0], nw[1], bw], [nu[0], nu[1], bu]]),
        ];

        Some(Self {
            triangle: *v,
            normal: nv,
            numerator,
            denominator,
            denominator_sign,
        })
    }

    /// `d · (point - a)`, the homogeneous offset of the point from `a`.
    fn scaled_offset_from(&self, a: &Point) -> Vec3<Filtered> {
        let shift = scale(relative(&self.triangle[0], a), self.denominator);
        [
            self.numerator[0] + shift[0],
            self.numerator[1] + shift[1],
            self.numerator[2] + shift[2],
        ]
    }

    /// Orientation of the intersection point relative to the plane through
    /// `q1`, `q2`, `q3`, with the convention of [`orient_3d`].
    #[must_use]
    pub fn orient(&self, q1: &Point, q2: &Point, q3: &Point) -> Sign {
        let normal = cross(relative(q2, q1), relative(q3, q1));
        dot(normal, self.scaled_offset_from(q1)).sign() * self.denominator_sign
    }

    /// Whether the point lies strictly inside the first triangle passed to
    /// [`TriplePlaneIntersection::new`].
    ///
    /// The point is on that triangle's plane by construction, so it is
    /// tested against the three planes through the triangle's edges that
    /// are perpendicular to it. [`Sign::POSITIVE`] means strictly inside,
    /// [`Sign::NEGATIVE`] strictly outside the closed triangle.
    #[must_use]
    pub fn within_triangle(&self) -> Sign {
        let mut all_inside = true;
        for k in 0..3 {
            let a = &self.triangle[k];
            let b = &self.triangle[(k + 1) % 3];
            let outward = cross(relative(b, a), self.normal);
            let side = dot(outward, self.scaled_offset_from(a)).sign() * self.denominator_sign;
            match side {
                Sign::POSITIVE => return Sign::NEGATIVE,
                Sign::INDETERMINATE => all_inside = false,
                Sign::NEGATIVE => {}
            }
        }
        if all_inside {
            Sign::POSITIVE
        } else {
            Sign::INDETERMINATE
        }
    }

    /// A rounded approximation of the point, for diagnostics only.
    #[must_use]
    pub fn approximate(&self) -> Point {
        let d = self.denominator.value();
        self.triangle[0].translated([
            self.numerator[0].value() / d,
            self.numerator[1].value() / d,
            self.numerator[2].value() / d,
        ])
    }
}

impl ImplicitPoint for TriplePlaneIntersection {
    fn orient_against(&self, a: &Point, b: &Point, c: &Point) -> Sign {
        self.orient(a, b, c)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point {
        Point::new([x, y, z])
    }

    #[test]
    fn sign_algebra() {
        assert_eq!(Sign::POSITIVE * Sign::NEGATIVE, Sign::NEGATIVE);
        assert_eq!(Sign::NEGATIVE * Sign::NEGATIVE, Sign::POSITIVE);
        assert_eq!(Sign::INDETERMINATE * Sign::POSITIVE, Sign::INDETERMINATE);
        assert_eq!(-Sign::POSITIVE, Sign::NEGATIVE);
        assert_eq!(-Sign::INDETERMINATE, Sign::INDETERMINATE);
        assert_eq!(Sign::NEGATIVE.as_i32(), -1);
        assert_eq!(Sign::INDETERMINATE.to_string(), "INDETERMINATE");
        assert!(!Sign::INDETERMINATE.is_certain());
    }

    #[test]
    fn orient_3d_swaps_sign_with_plane_orientation() {
        let (a, b, c) = (p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0));
        let d = p(0.3, 0.3, 0.5);
        assert_eq!(orient_3d(&a, &b, &c, &d), Sign::POSITIVE);
        assert_eq!(orient_3d(&a, &c, &b, &d), Sign::NEGATIVE);
        assert_eq!(d.orient_against(&b, &c, &a), Sign::POSITIVE);
    }

    #[test]
    fn orient_3d_large_coordinates_near_plane() {
        // Plane x + y + z = 3e8 and a point 1e-7 off it.
        let a = p(1e8, 1e8, 1e8);
        let b = p(3e8, 0.0, 0.0);
        let c = p(0.0, 3e8, 0.0);
        let above = p(1e8, 1e8, 1e8 + 1e-7);
        let sign = orient_3d(&a, &b, &c, &above);
        assert_ne!(sign, Sign::NEGATIVE);
    }

    #[test]
    fn orient_3d_non_finite_is_indeterminate() {
        let a = p(0.0, 0.0, 0.0);
        let b = p(1.0, 0.0, 0.0);
        let c = p(0.0, 1.0, 0.0);
        assert_eq!(orient_3d(&a, &b, &c, &p(0.0, 0.0, f64::NAN)), Sign::INDETERMINATE);
        assert_eq!(orient_3d(&a, &b, &c, &p(f64::INFINITY, 0.0, 1.0)), Sign::INDETERMINATE);
        assert_eq!(orient_3d(&a, &b, &c, &p(0.0, 0.0, 1e300)), Sign::POSITIVE);
    }

    #[test]
    fn lpi_parallel_line_is_rejected() {
        let lpi = LinePlaneIntersection::new(
            &p(0.0, 0.0, 1.0),
            &p(1.0, 0.0, 1.0),
            &p(0.0, 0.0, 0.0),
            &p(1.0, 0.0, 0.0),
            &p(0.0, 1.0, 0.0),
        );
        assert!(lpi.is_none());
    }

    #[test]
    fn lpi_within_segment_classifies_parameter() {
        let plane = [p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(0.0, 1.0, 1.0)];
        let make = |z0: f64, z1: f64| {
            LinePlaneIntersection::new(&p(0.0, 0.0, z0), &p(0.0, 0.0, z1), &plane[0], &plane[1], &plane[2])
                .unwrap()
        };
        assert_eq!(make(0.0, 2.0).within_segment(), Sign::POSITIVE);
        assert_eq!(make(2.0, 0.0).within_segment(), Sign::POSITIVE);
        assert_eq!(make(2.0, 3.0).within_segment(), Sign::NEGATIVE);
        assert_eq!(make(-1.0, 0.0).within_segment(), Sign::NEGATIVE);
        // Endpoint exactly on the plane.
        assert_eq!(make(1.0, 3.0).within_segment(), Sign::INDETERMINATE);
        assert_eq!(make(0.0, 1.0).within_segment(), Sign::INDETERMINATE);
    }

    #[test]
    fn lpi_orientation_matches_explicit_point() {
        // Segment from (0.2, 0.1, -1) to (0.2, 0.1, 3) meets z = 0.5.
        let lpi = LinePlaneIntersection::new(
            &p(0.2, 0.1, -1.0),
            &p(0.2, 0.1, 3.0),
            &p(0.0, 0.0, 0.5),
            &p(1.0, 0.0, 0.5),
            &p(0.0, 1.0, 0.5),
        )
        .unwrap();
        let explicit = p(0.2, 0.1, 0.5);
        let approx = lpi.approximate();
        assert_relative_eq!(approx.z(), 0.5, epsilon = 1e-12);

        let planes = [
            [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
            [p(0.2, 0.0, 0.0), p(0.2, 1.0, 0.0), p(0.2, 0.0, 1.0)],
            [p(0.0, 0.0, 0.0), p(0.0, 0.0, 1.0), p(1.0, 1.0, 0.0)],
            [p(3.0, 0.0, 0.0), p(0.0, 3.0, 0.0), p(0.0, 0.0, 3.0)],
        ];
        for [a, b, c] in planes {
            assert_eq!(lpi.orient(&a, &b, &c), orient_3d(&a, &b, &c, &explicit));
        }
    }

    #[test]
    fn lpi_point_on_queried_plane_is_indeterminate() {
        let (r, s, t) = (p(0.0, 0.0, 0.5), p(1.0, 0.0, 0.5), p(0.0, 1.0, 0.5));
        let lpi = LinePlaneIntersection::new(&p(0.3, 0.3, 0.0), &p(0.1, 0.2, 1.0), &r, &s, &t).unwrap();
        assert_eq!(lpi.orient(&r, &s, &t), Sign::INDETERMINATE);
    }

    #[test]
    fn tpi_degenerate_planes_are_rejected() {
        let xy = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        let xy_shifted = [p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(0.0, 1.0, 1.0)];
        let xz = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 0.0, 1.0)];
        assert!(TriplePlaneIntersection::new(&xy, &xy_shifted, &xz).is_none());
        let collinear = [p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0), p(2.0, 2.0, 2.0)];
        assert!(TriplePlaneIntersection::new(&collinear, &xy, &xz).is_none());
    }

    #[test]
    fn tpi_matches_explicit_point() {
        // Planes z = 0.5, x = 0.25, y = 0.125 meet at (0.25, 0.125, 0.5).
        let v = [p(-1.0, -1.0, 0.5), p(2.0, -1.0, 0.5), p(-1.0, 2.0, 0.5)];
        let w = [p(0.25, 0.0, 0.0), p(0.25, 1.0, 0.0), p(0.25, 0.0, 1.0)];
        let u = [p(0.0, 0.125, 0.0), p(0.0, 0.125, 1.0), p(1.0, 0.125, 0.0)];
        let tpi = TriplePlaneIntersection::new(&v, &w, &u).unwrap();
        let explicit = p(0.25, 0.125, 0.5);
        let approx = tpi.approximate();
        for axis in 0..3 {
            assert_relative_eq!(approx[axis], explicit[axis], epsilon = 1e-12);
        }

        let samples = [
            [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)],
            [p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(0.0, 0.0, 1.0)],
            [p(0.3, 0.0, 0.0), p(0.3, 0.0, 1.0), p(0.3, 1.0, 0.0)],
        ];
        for [a, b, c] in samples {
            assert_eq!(tpi.orient(&a, &b, &c), orient_3d(&a, &b, &c, &explicit));
        }
        assert_eq!(tpi.orient(&w[0], &w[1], &w[2]), Sign::INDETERMINATE);
        assert_eq!(tpi.within_triangle(), Sign::POSITIVE);
    }

    #[test]
    fn tpi_within_triangle_outside_and_on_edge() {
        let v = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        let u = [p(0.0, 0.5, 0.0), p(0.0, 0.5, 1.0), p(1.0, 0.5, 0.0)];

        // x = 0.75, y = 0.5 is beyond the hypotenuse.
        let beyond = [p(0.75, 0.0, 0.0), p(0.75, 1.0, 0.0), p(0.75, 0.0, 1.0)];
        let tpi = TriplePlaneIntersection::new(&v, &beyond, &u).unwrap();
        assert_eq!(tpi.within_triangle(), Sign::NEGATIVE);

        // x = 0.5, y = 0.5 lies on the hypotenuse.
        let on_edge = [p(0.5, 0.0, 0.0), p(0.5, 1.0, 0.0), p(0.5, 0.0, 1.0)];
        let tpi = TriplePlaneIntersection::new(&v, &on_edge, &u).unwrap();
        assert_eq!(tpi.within_triangle(), Sign::INDETERMINATE);
    }
}
