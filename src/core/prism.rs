//! Convex tolerance volumes around reference triangles.
//!
//! A [`Prism`] is a 12-vertex convex polyhedron containing every point
//! within `epsilon` of its source triangle. Vertices `0..6` form the top
//! hexagon and `6..12` the bottom hexagon; both run counter-clockwise around
//! the prism's normal, and vertex `k + 6` lies below vertex `k`.
//!
//! The eight facets ([`PRISM_FACETS`]) are each given by three of the
//! twelve vertices, ordered so that [`orient_3d`](crate::geometry::predicates::orient_3d)
//! against a facet is [`Sign::POSITIVE`] on the outside. The prism is the
//! intersection of the eight inner half-spaces.
//!
//! # Construction
//!
//! For a well-shaped triangle with unit normal `n` the hexagon is bounded by
//! the three edge lines moved outward by `r` and three cuts tangent to the
//! radius-`r` circle around each corner, then extruded by `±r` along `n`.
//! Slivers, collinear and coincident vertices use an oriented box in a frame
//! aligned with the longest edge, closed into a hexagon with pointed ends.
//! So does a face whose hexagon is ill-conditioned: when `epsilon` is tiny
//! next to the coordinates, a nearly straight corner puts two hexagon
//! vertices so close together that rounding can swing the facet through
//! them past the far corners of the face.
//! The radius `r` is `epsilon` inflated by a relative margin plus a few ulps
//! of the largest coordinate, which absorbs the rounding of the construction.

#![forbid(unsafe_code)]

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geometry::point::{BoundingBox, Point, Triangle};
use crate::geometry::predicates::{ImplicitPoint, Sign};

/// Number of vertices of a prism.
pub const PRISM_VERTEX_COUNT: usize = 12;

/// Number of facets of a prism.
pub const PRISM_FACET_COUNT: usize = 8;

/// Index of the top facet.
pub const TOP_FACET: usize = 0;

/// Index of the bottom facet.
pub const BOTTOM_FACET: usize = 1;

/// Vertex triples defining each facet's plane, oriented outward.
///
/// Facet 0 is the top, facet 1 the bottom; facet `2 + k` is the side between
/// hexagon vertices `k` and `k + 1`.
pub const PRISM_FACETS: [[usize; 3]; PRISM_FACET_COUNT] = [
    [0, 2, 4],
    [6, 10, 8],
    [6, 7, 1],
    [7, 8, 2],
    [8, 9, 3],
    [9, 10, 4],
    [10, 11, 5],
    [11, 6, 0],
];

/// Relative inflation of `epsilon`.
const RADIUS_INFLATION: f64 = 1.0e-10;

/// Absolute inflation in units of the face's largest coordinate.
const ROUNDING_SLACK: f64 = 16.0 * f64::EPSILON;

/// Faces with `|(b - a) × (c - a)|` at or below this fraction of the
/// squared longest edge use the box construction.
const SLIVER_RATIO: f64 = 1.0e-4;

/// Smallest usable norm of the sum of two unit edge normals at a corner.
const MIN_BISECTOR_NORM: f64 = 1.0e-6;

/// Rounding of a constructed vertex, per unit of the face's magnitude.
const VERTEX_ROUNDING: f64 = 2.0 * f64::EPSILON;

/// Relative error bound of `orient_3d`, generously rounded up.
const FILTER_SLACK: f64 = 32.0 * f64::EPSILON;

/// Required ratio between a corner's depth inside a facet and the largest
/// shift rounding can cause there.
const CONDITIONING_SAFETY: f64 = 2.0;

/// The convex tolerance volume of one reference triangle.
///
/// # Examples
///
/// ```
/// use tolerance_envelope::core::prism::Prism;
/// use tolerance_envelope::geometry::point::Point;
/// use tolerance_envelope::geometry::predicates::Sign;
///
/// let face = [
///     Point::new([0.0, 0.0, 0.0]),
///     Point::new([1.0, 0.0, 0.0]),
///     Point::new([0.0, 1.0, 0.0]),
/// ];
/// let prism = Prism::new(&face, 0.1);
/// assert!(!prism.is_degenerate());
/// assert_eq!(prism.contains(&Point::new([0.2, 0.2, 0.09])), Sign::POSITIVE);
/// assert_eq!(prism.contains(&Point::new([0.2, 0.2, 0.2])), Sign::NEGATIVE);
/// assert_eq!(prism.contains(&Point::new([-0.05, -0.05, 0.0])), Sign::POSITIVE);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prism {
    vertices: [Point; PRISM_VERTEX_COUNT],
    bounding_box: BoundingBox,
    degenerate: bool,
}

impl Prism {
    /// Build the prism of `triangle` for tolerance `epsilon`.
    ///
    /// Never fails: degenerate triangles get the box construction. The
    /// caller is responsible for `epsilon > 0` and finite coordinates; with
    /// non-finite input the prism certifies nothing.
    #[must_use]
    pub fn new(triangle: &Triangle, epsilon: f64) -> Self {
        let magnitude = face_magnitude(triangle);
        let radius = epsilon.mul_add(1.0 + RADIUS_INFLATION, ROUNDING_SLACK * magnitude);
        let vertex_error = VERTEX_ROUNDING * (magnitude + radius);
        let (vertices, degenerate) = regular_hexagon(triangle, radius)
            .map(|(hexagon, normal)| extrude(&hexagon, normal * radius, normal * -radius))
            .filter(|vertices| encloses_robustly(vertices, triangle, vertex_error))
            .map_or_else(|| (box_prism(triangle, radius), true), |vertices| (vertices, false));
        let seed = BoundingBox::new(vertices[0], vertices[0]);
        let bounding_box = vertices[1..]
            .iter()
            .fold(seed, |acc, v| acc.union(&BoundingBox::new(*v, *v)));
        Self {
            vertices,
            bounding_box,
            degenerate,
        }
    }

    /// The twelve vertices: top hexagon then bottom hexagon.
    #[must_use]
    pub const fn vertices(&self) -> &[Point; PRISM_VERTEX_COUNT] {
        &self.vertices
    }

    /// Axis-aligned bounds of the vertices.
    #[must_use]
    pub const fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Whether the box construction was used.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// The three points spanning facet `index`, outward-oriented.
    ///
    /// # Panics
    ///
    /// Panics if `index >= PRISM_FACET_COUNT`.
    #[must_use]
    pub fn facet(&self, index: usize) -> Triangle {
        PRISM_FACETS[index].map(|v| self.vertices[v])
    }

    /// All eight facets in index order.
    pub fn facets(&self) -> impl Iterator<Item = Triangle> + '_ {
        (0..PRISM_FACET_COUNT).map(|f| self.facet(f))
    }

    /// Whether facets `f` and `g` share an edge.
    ///
    /// The top and bottom facets touch every side; each side touches its two
    /// neighbours. A facet is not adjacent to itself.
    ///
    /// # Examples
    ///
    /// ```
    /// use tolerance_envelope::core::prism::Prism;
    ///
    /// assert!(Prism::facets_adjacent(0, 5));
    /// assert!(Prism::facets_adjacent(7, 2));
    /// assert!(!Prism::facets_adjacent(0, 1));
    /// assert!(!Prism::facets_adjacent(3, 5));
    /// ```
    #[must_use]
    pub const fn facets_adjacent(f: usize, g: usize) -> bool {
        if f == g || f >= PRISM_FACET_COUNT || g >= PRISM_FACET_COUNT {
            return false;
        }
        if is_cap(f) && is_cap(g) {
            return false;
        }
        if is_cap(f) || is_cap(g) {
            return true;
        }
        let (a, b) = (f - 2, g - 2);
        (a + 1) % 6 == b || (b + 1) % 6 == a
    }

    /// Strict containment of `point`.
    ///
    /// [`Sign::POSITIVE`] when every facet certifies the point inside,
    /// [`Sign::NEGATIVE`] when some facet certifies it outside (so it is
    /// outside the closed prism), [`Sign::INDETERMINATE`] otherwise.
    pub fn contains<P: ImplicitPoint + ?Sized>(&self, point: &P) -> Sign {
        let mut inside = true;
        for [a, b, c] in PRISM_FACETS {
            match point.orient_against(&self.vertices[a], &self.vertices[b], &self.vertices[c]) {
                Sign::POSITIVE => return Sign::NEGATIVE,
                Sign::INDETERMINATE => inside = false,
                Sign::NEGATIVE => {}
            }
        }
        if inside {
            Sign::POSITIVE
        } else {
            Sign::INDETERMINATE
        }
    }
}

const fn is_cap(facet: usize) -> bool {
    facet == TOP_FACET || facet == BOTTOM_FACET
}

/// Largest absolute coordinate of the face.
fn face_magnitude(triangle: &Triangle) -> f64 {
    triangle
        .iter()
        .flat_map(Point::coords)
        .fold(0.0_f64, |acc, c| acc.max(c.abs()))
}

/// Whether every corner of `triangle` lies deep enough inside every facet
/// of `vertices` that moving each vertex by `vertex_error` cannot carry the
/// facet past it, and that the orientation filter can certify it.
///
/// A facet spanned by nearly coincident vertices pivots on them, so the
/// shift at a corner grows with the corner's barycentric coordinates in the
/// facet. That is what rejects the corner cuts of a nearly straight corner
/// when `epsilon` is tiny relative to the coordinates.
fn encloses_robustly(
    vertices: &[Point; PRISM_VERTEX_COUNT],
    triangle: &Triangle,
    vertex_error: f64,
) -> bool {
    let corners = triangle.map(|p| p.to_vector());
    PRISM_FACETS.iter().all(|&[a, b, c]| {
        let origin = vertices[a].to_vector();
        let e1 = vertices[b].to_vector() - origin;
        let e2 = vertices[c].to_vector() - origin;
        let normal = e1.cross(&e2);
        let gram = normal.norm_squared();
        if !(gram.is_finite() && gram > 0.0) {
            return false;
        }
        let area = gram.sqrt();
        corners.iter().all(|corner| {
            let w = corner - origin;
            // Barycentric coordinates of the corner's projection.
            let l1 = w.cross(&e2).dot(&normal) / gram;
            let l2 = e1.cross(&w).dot(&normal) / gram;
            let l0 = 1.0 - l1 - l2;
            let depth = -normal.dot(&w) / area;
            let drift = vertex_error * (l0.abs() + l1.abs() + l2.abs());
            let filter = FILTER_SLACK * e1.norm() * e2.norm() * w.norm() / area;
            depth > CONDITIONING_SAFETY * (drift + filter)
        })
    })
}

fn extrude(hexagon: &[Vector3<f64>; 6], up: Vector3<f64>, down: Vector3<f64>) -> [Point; 12] {
    std::array::from_fn(|i| {
        if i < 6 {
            Point::from(hexagon[i] + up)
        } else {
            Point::from(hexagon[i - 6] + down)
        }
    })
}

/// The hexagon of a well-shaped triangle and its unit normal, or `None` when
/// the box construction must be used.
fn regular_hexagon(triangle: &Triangle, radius: f64) -> Option<([Vector3<f64>; 6], Vector3<f64>)> {
    let corners = triangle.map(|p| p.to_vector());
    let [a, b, c] = corners;
    let longest = (b - a)
        .norm_squared()
        .max((c - b).norm_squared())
        .max((a - c).norm_squared());
    let cross = (b - a).cross(&(c - a));
    let well_shaped = cross.norm() > SLIVER_RATIO * longest;
    if !well_shaped {
        return None;
    }
    let normal = cross.normalize();

    // Outward normal of the edge from corner k to corner k + 1.
    let edge_normals = [0, 1, 2].map(|k| (corners[(k + 1) % 3] - corners[k]).cross(&normal).normalize());

    let mut hexagon = [Vector3::zeros(); 6];
    for k in 0..3 {
        let prev = edge_normals[(k + 2) % 3];
        let next = edge_normals[k];
        let bisector = prev + next;
        let length = bisector.norm();
        let usable = length > MIN_BISECTOR_NORM;
        if !usable {
            return None;
        }
        let u = bisector / length;
        hexagon[2 * k] = corners[k] + (prev + u) * (radius / (1.0 + prev.dot(&u)));
        hexagon[2 * k + 1] = corners[k] + (next + u) * (radius / (1.0 + next.dot(&u)));
    }
    Some((hexagon, normal))
}

/// A unit vector perpendicular to the unit vector `d`.
fn perpendicular(d: &Vector3<f64>) -> Vector3<f64> {
    let smallest = d.iamin();
    d.cross(&Vector3::ith(smallest, 1.0)).normalize()
}

/// Oriented box around a degenerate triangle, closed into a hexagon with
/// pointed ends so the facet layout matches the regular construction.
fn box_prism(triangle: &Triangle, radius: f64) -> [Point; 12] {
    let corners = triangle.map(|p| p.to_vector());
    let [a, b, c] = corners;
    let longest = [b - a, c - b, a - c]
        .into_iter()
        .fold(Vector3::zeros(), |best, e| if e.norm_squared() > best.norm_squared() { e } else { best });
    let d = longest.try_normalize(0.0).unwrap_or_else(Vector3::x);
    let cross = (b - a).cross(&(c - a));
    let n = (cross - d * d.dot(&cross))
        .try_normalize(f64::MIN_POSITIVE)
        .unwrap_or_else(|| perpendicular(&d));
    let e = n.cross(&d);

    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for corner in &corners {
        let offset = corner - a;
        for (axis, direction) in [d, e, n].iter().enumerate() {
            let t = direction.dot(&offset);
            lo[axis] = lo[axis].min(t);
            hi[axis] = hi[axis].max(t);
        }
    }
    let [x0, y0, z0] = lo.map(|t| t - radius);
    let [x1, y1, z1] = hi.map(|t| t + radius);
    let half_height = 0.5 * (y1 - y0);
    let middle = 0.5 * (y0 + y1);
    let outline = [
        (x0, y0),
        (x1, y0),
        (x1 + half_height, middle),
        (x1, y1),
        (x0, y1),
        (x0 - half_height, middle),
    ];
    let at = |(x, y): (f64, f64), z: f64| Point::from(a + d * x + e * y + n * z);
    std::array::from_fn(|i| if i < 6 { at(outline[i], z1) } else { at(outline[i - 6], z0) })
}

// =============================================================================
// TESTS
// =============================================================================
