//! Three-dimensional points and axis-aligned bounding boxes.
//!
//! Points are immutable `f64` triples. Every predicate in this crate reads
//! coordinates exactly as stored, so a [`Point`] never normalizes, rounds or
//! otherwise rewrites the values it was created with.

#![forbid(unsafe_code)]

use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Index;

// =============================================================================
// POINT STRUCT DEFINITION
// =============================================================================

/// A point in three-dimensional space with `f64` coordinates.
///
/// # Examples
///
/// ```
/// use tolerance_envelope::geometry::point::Point;
///
/// let p = Point::new([1.0, 2.0, 3.0]);
/// assert_eq!(p.coords(), [1.0, 2.0, 3.0]);
/// assert_eq!(p[1], 2.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Point {
    coords: [f64; 3],
}

/// A triangle given by its three corners. Orientation-dependent predicates
/// follow the order of the array.
pub type Triangle = [Point; 3];

impl Point {
    /// Create a new point from its coordinates.
    #[inline]
    #[must_use]
    pub const fn new(coords: [f64; 3]) -> Self {
        Self { coords }
    }

    /// The coordinates of the point.
    #[inline]
    #[must_use]
    pub const fn coords(&self) -> [f64; 3] {
        self.coords
    }

    /// The x coordinate.
    #[inline]
    #[must_use]
    pub const fn x(&self) -> f64 {
        self.coords[0]
    }

    /// The y coordinate.
    #[inline]
    #[must_use]
    pub const fn y(&self) -> f64 {
        self.coords[1]
    }

    /// The z coordinate.
    #[inline]
    #[must_use]
    pub const fn z(&self) -> f64 {
        self.coords[2]
    }

    /// Returns `true` if no coordinate is NaN or infinite.
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.coords.iter().all(|c| c.is_finite())
    }

    /// Index of the first non-finite coordinate, if any.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<usize> {
        self.coords.iter().position(|c| !c.is_finite())
    }

    /// The point as an `nalgebra` column vector.
    #[inline]
    #[must_use]
    pub fn to_vector(&self) -> na::Vector3<f64> {
        na::Vector3::new(self.coords[0], self.coords[1], self.coords[2])
    }

    /// Build a point from an `nalgebra` column vector.
    #[inline]
    #[must_use]
    pub fn from_vector(v: &na::Vector3<f64>) -> Self {
        Self::new([v.x, v.y, v.z])
    }

    /// Translate the point by `offset`.
    #[inline]
    #[must_use]
    pub fn translated(&self, offset: [f64; 3]) -> Self {
        Self::new([
            self.coords[0] + offset[0],
            self.coords[1] + offset[1],
            self.coords[2] + offset[2],
        ])
    }
}

impl Index<usize> for Point {
    type Output = f64;

    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.coords[index]
    }
}

impl From<[f64; 3]> for Point {
    #[inline]
    fn from(coords: [f64; 3]) -> Self {
        Self::new(coords)
    }
}

impl From<Point> for [f64; 3] {
    #[inline]
    fn from(point: Point) -> Self {
        point.coords
    }
}

impl From<&Point> for [f64; 3] {
    #[inline]
    fn from(point: &Point) -> Self {
        point.coords
    }
}

impl From<na::Vector3<f64>> for Point {
    #[inline]
    fn from(v: na::Vector3<f64>) -> Self {
        Self::from_vector(&v)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.coords[0], self.coords[1], self.coords[2])
    }
}

// =============================================================================
// BOUNDING BOX
// =============================================================================

/// An axis-aligned bounding box given by its `min` and `max` corners.
///
/// Boxes are closed: two boxes touching along a face overlap.
///
/// # Examples
///
/// ```
/// use tolerance_envelope::geometry::point::{BoundingBox, Point};
///
/// let bbox = BoundingBox::from_points(&[
///     Point::new([0.0, 1.0, 2.0]),
///     Point::new([3.0, -1.0, 2.5]),
/// ])
/// .unwrap();
/// assert_eq!(bbox.min(), Point::new([0.0, -1.0, 2.0]));
/// assert_eq!(bbox.max(), Point::new([3.0, 1.0, 2.5]));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    min: Point,
    max: Point,
}

impl BoundingBox {
    /// Create a box from its corners. The corners are taken as given.
    #[must_use]
    pub const fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// The tightest box around `points`, or `None` for an empty slice.
    #[must_use]
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let mut min = first.coords();
        let mut max = first.coords();
        for p in rest {
            for axis in 0..3 {
                min[axis] = min[axis].min(p[axis]);
                max[axis] = max[axis].max(p[axis]);
            }
        }
        Some(Self::new(Point::new(min), Point::new(max)))
    }

    /// The minimum corner.
    #[inline]
    #[must_use]
    pub const fn min(&self) -> Point {
        self.min
    }

    /// The maximum corner.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> Point {
        self.max
    }

    /// Edge lengths along x, y and z.
    #[must_use]
    pub fn extent(&self) -> [f64; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Smallest box containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let mut min = self.min.coords();
        let mut max = self.max.coords();
        for axis in 0..3 {
            min[axis] = min[axis].min(other.min[axis]);
            max[axis] = max[axis].max(other.max[axis]);
        }
        Self::new(Point::new(min), Point::new(max))
    }

    /// The box grown by `margin` on every side.
    #[must_use]
    pub fn padded(&self, margin: f64) -> Self {
        Self::new(
            self.min.translated([-margin, -margin, -margin]),
            self.max.translated([margin, margin, margin]),
        )
    }

    /// Returns `true` if the closed boxes share at least one point.
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && other.min[axis] <= self.max[axis])
    }

    /// Returns `true` if `point` lies in the closed box.
    #[inline]
    #[must_use]
    pub fn contains_point(&self, point: &Point) -> bool {
        (0..3).all(|axis| self.min[axis] <= point[axis] && point[axis] <= self.max[axis])
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn point_accessors_and_conversions() {
        let p = Point::new([1.5, -2.0, 3.25]);
        assert_relative_eq!(p.x(), 1.5);
        assert_relative_eq!(p.y(), -2.0);
        assert_relative_eq!(p.z(), 3.25);

        let arr: [f64; 3] = p.into();
        assert_eq!(arr, [1.5, -2.0, 3.25]);
        assert_eq!(Point::from(arr), p);
        assert_eq!(Point::from_vector(&p.to_vector()), p);
        assert_eq!(p.to_string(), "(1.5, -2, 3.25)");
    }

    #[test]
    fn point_finiteness() {
        assert!(Point::new([0.0, 1.0, 2.0]).is_finite());
        let bad = Point::new([0.0, f64::NAN, f64::INFINITY]);
        assert!(!bad.is_finite());
        assert_eq!(bad.first_non_finite(), Some(1));
    }

    #[test]
    fn point_serializes_as_plain_array() {
        let p = Point::new([1.0, 2.0, 3.0]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0]");
        let back: Point = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn bounding_box_overlap_is_closed() {
        let a = BoundingBox::new(Point::new([0.0; 3]), Point::new([1.0; 3]));
        let touching = BoundingBox::new(Point::new([1.0, 0.0, 0.0]), Point::new([2.0, 1.0, 1.0]));
        let apart = BoundingBox::new(Point::new([1.5, 0.0, 0.0]), Point::new([2.0, 1.0, 1.0]));

        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
        assert!(!a.overlaps(&apart));
        assert!(a.contains_point(&Point::new([1.0, 0.5, 0.0])));
        assert!(!a.contains_point(&Point::new([1.0, 0.5, -0.1])));
    }

    #[test]
    fn bounding_box_union_and_padding() {
        let a = BoundingBox::new(Point::new([0.0; 3]), Point::new([1.0; 3]));
        let b = BoundingBox::new(Point::new([-1.0, 0.5, 0.5]), Point::new([0.5, 3.0, 0.5]));
        let u = a.union(&b);
        assert_eq!(u.min(), Point::new([-1.0, 0.0, 0.0]));
        assert_eq!(u.max(), Point::new([1.0, 3.0, 1.0]));
        assert_eq!(u.extent(), [2.0, 3.0, 1.0]);

        let padded = a.padded(0.25);
        assert_eq!(padded.min(), Point::new([-0.25; 3]));
        assert_eq!(padded.max(), Point::new([1.25; 3]));
        assert!(BoundingBox::from_points(&[]).is_none());
    }
}
