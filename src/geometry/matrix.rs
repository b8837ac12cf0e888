//! Small fixed-size determinants.
//!
//! These helpers are written against a minimal arithmetic bound
//! ([`Scalar`]) so the same expression trees run on plain `f64` values and on
//! [`Filtered`](crate::geometry::filtered::Filtered) values that carry a
//! rigorous error bound. Keeping one expression per determinant means the
//! filtered and unfiltered evaluations always round the same operations.

#![forbid(unsafe_code)]

use std::ops::{Add, Mul, Sub};

/// Arithmetic needed by the determinant helpers.
pub trait Scalar: Copy + Add<Output = Self> + Sub<Output = Self> + Mul<Output = Self> {}

impl<T> Scalar for T where T: Copy + Add<Output = T> + Sub<Output = T> + Mul<Output = T> {}

/// A three-component vector of any [`Scalar`].
pub type Vec3<T> = [T; 3];

/// Determinant of the 2×2 matrix with rows `(a1, a2)` and `(b1, b2)`.
///
/// # Examples
///
/// ```rust
/// use tolerance_envelope::geometry::matrix::det2x2;
///
/// assert_eq!(det2x2(1.0, 2.0, 3.0, 4.0), -2.0);
/// ```
#[inline]
#[must_use]
pub fn det2x2<T: Scalar>(a1: T, a2: T, b1: T, b2: T) -> T {
    a1 * b2 - a2 * b1
}

/// Determinant of a 3×3 matrix given row by row.
///
/// # Examples
///
/// ```rust
/// use tolerance_envelope::geometry::matrix::det3x3;
///
/// let det = det3x3([[2.0, 0.0, 0.0], [0.0, 3.0, 0.0], [0.0, 0.0, 4.0]]);
/// assert_eq!(det, 24.0);
/// ```
#[inline]
#[must_use]
pub fn det3x3<T: Scalar>(m: [Vec3<T>; 3]) -> T {
    let [[a11, a12, a13], [a21, a22, a23], [a31, a32, a33]] = m;
    a11 * det2x2(a22, a23, a32, a33) - a12 * det2x2(a21, a23, a31, a33)
        + a13 * det2x2(a21, a22, a31, a32)
}

/// Dot product of two 3-vectors.
#[inline]
#[must_use]
pub fn dot<T: Scalar>(a: Vec3<T>, b: Vec3<T>) -> T {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product of two 3-vectors.
#[inline]
#[must_use]
pub fn cross<T: Scalar>(a: Vec3<T>, b: Vec3<T>) -> Vec3<T> {
    [
        det2x2(a[1], a[2], b[1], b[2]),
        det2x2(a[2], a[0], b[2], b[0]),
        det2x2(a[0], a[1], b[0], b[1]),
    ]
}

/// Every component of `v` multiplied by `s`.
#[inline]
#[must_use]
pub fn scale<T: Scalar>(v: Vec3<T>, s: T) -> Vec3<T> {
    [v[0] * s, v[1] * s, v[2] * s]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn det3x3_matches_triple_product() {
        let a = [1.0, 2.0, 3.0];
        let b = [-2.0, 0.5, 4.0];
        let c = [0.25, -1.0, 2.0];
        let triple = dot(a, cross(b, c));
        assert_relative_eq!(det3x3([a, b, c]), triple, epsilon = 1e-12);
    }

    #[test]
    fn vector_helpers() {
        assert_eq!(cross([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
        assert_eq!(scale([1.0, -2.0, 0.5], 2.0), [2.0, -4.0, 1.0]);
        assert_relative_eq!(dot([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]), 32.0);
    }
}
