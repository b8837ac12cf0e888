//! Triangle classification helpers shared by the prism builder and the
//! containment tests.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::geometry::filtered::relative;
use crate::geometry::matrix::cross;
use crate::geometry::point::Triangle;
use crate::geometry::predicates::{Sign, orient_3d};

/// How a triangle meets the plane of a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriangleCut {
    /// Every vertex is certified strictly on the positive side.
    Positive,
    /// Every vertex is certified strictly on the negative side.
    Negative,
    /// No vertex could be certified off the plane.
    Coplanar,
    /// The triangle may touch or cross the plane. Holds the vertex signs.
    Crossing([Sign; 3]),
}

impl TriangleCut {
    /// Classify from the signs of the three vertices against the plane.
    #[must_use]
    pub fn from_signs(signs: [Sign; 3]) -> Self {
        match signs {
            [Sign::POSITIVE, Sign::POSITIVE, Sign::POSITIVE] => Self::Positive,
            [Sign::NEGATIVE, Sign::NEGATIVE, Sign::NEGATIVE] => Self::Negative,
            [Sign::INDETERMINATE, Sign::INDETERMINATE, Sign::INDETERMINATE] => Self::Coplanar,
            _ => Self::Crossing(signs),
        }
    }
}

/// Signs of the vertices of `triangle` against the plane of `facet`.
#[must_use]
pub fn plane_signs(facet: &Triangle, triangle: &Triangle) -> [Sign; 3] {
    triangle.map(|v| orient_3d(&facet[0], &facet[1], &facet[2], &v))
}

/// Whether `triangle` can meet the plane of `facet`.
///
/// # Examples
///
/// ```
/// use tolerance_envelope::geometry::point::Point;
/// use tolerance_envelope::geometry::util::{TriangleCut, tri_cut_tri_simple};
///
/// let p = |x, y, z| Point::new([x, y, z]);
/// let floor = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
/// let above = [p(0.0, 0.0, 1.0), p(1.0, 0.0, 2.0), p(0.0, 1.0, 1.0)];
/// let through = [p(0.0, 0.0, -1.0), p(1.0, 0.0, 2.0), p(0.0, 1.0, 1.0)];
/// assert_eq!(tri_cut_tri_simple(&floor, &above), TriangleCut::Positive);
/// assert!(matches!(tri_cut_tri_simple(&floor, &through), TriangleCut::Crossing(_)));
/// assert_eq!(tri_cut_tri_simple(&floor, &floor), TriangleCut::Coplanar);
/// ```
#[must_use]
pub fn tri_cut_tri_simple(facet: &Triangle, triangle: &Triangle) -> TriangleCut {
    TriangleCut::from_signs(plane_signs(facet, triangle))
}

/// Dimension of a query triangle as far as the filter can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriangleShape {
    /// The normal is certified non-zero.
    Proper,
    /// The vertices may be collinear; the triangle is handled as its edges.
    Collinear,
    /// All three vertices coincide.
    Point,
}

/// Classify `triangle` by whether its normal can be certified non-zero.
///
/// # Examples
///
/// ```
/// use tolerance_envelope::geometry::point::Point;
/// use tolerance_envelope::geometry::util::{TriangleShape, classify_triangle};
///
/// let p = |x, y, z| Point::new([x, y, z]);
/// let flat = [p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0), p(2.0, 2.0, 2.0)];
/// assert_eq!(classify_triangle(&flat), TriangleShape::Collinear);
/// let proper = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
/// assert_eq!(classify_triangle(&proper), TriangleShape::Proper);
/// ```
#[must_use]
pub fn classify_triangle(triangle: &Triangle) -> TriangleShape {
    let [a, b, c] = triangle;
    let normal = cross(relative(b, a), relative(c, a));
    if normal.iter().any(|component| component.sign().is_certain()) {
        TriangleShape::Proper
    } else if a == b && b == c {
        TriangleShape::Point
    } else {
        TriangleShape::Collinear
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::point::Point;

    fn p(x: f64, y: f64, z: f64) -> Point {
        Point::new([x, y, z])
    }

    #[test]
    fn cut_classification_from_signs() {
        use Sign::{INDETERMINATE as Z, NEGATIVE as N, POSITIVE as P};
        assert_eq!(TriangleCut::from_signs([N, N, N]), TriangleCut::Negative);
        assert_eq!(TriangleCut::from_signs([P, P, P]), TriangleCut::Positive);
        assert_eq!(TriangleCut::from_signs([Z, Z, Z]), TriangleCut::Coplanar);
        assert_eq!(TriangleCut::from_signs([P, N, P]), TriangleCut::Crossing([P, N, P]));
        assert_eq!(TriangleCut::from_signs([P, Z, P]), TriangleCut::Crossing([P, Z, P]));
    }

    #[test]
    fn touching_vertex_is_crossing() {
        let floor = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        let touching = [p(0.5, 0.5, 0.0), p(1.0, 0.0, 2.0), p(0.0, 1.0, 1.0)];
        let signs = [Sign::INDETERMINATE, Sign::POSITIVE, Sign::POSITIVE];
        assert_eq!(plane_signs(&floor, &touching), signs);
        assert_eq!(tri_cut_tri_simple(&floor, &touching), TriangleCut::Crossing(signs));
    }

    #[test]
    fn degenerate_query_shapes() {
        let a = p(0.1, 0.2, 0.3);
        assert_eq!(classify_triangle(&[a, a, a]), TriangleShape::Point);
        assert_eq!(classify_triangle(&[a, a, p(1.0, 0.0, 0.0)]), TriangleShape::Collinear);
        assert_eq!(
            classify_triangle(&[a, p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)]),
            TriangleShape::Proper
        );
    }
}
