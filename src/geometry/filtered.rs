//! Floating-point values with a certified error bound.
//!
//! A [`Filtered`] number is an `f64` approximation of the exact real result
//! of an arithmetic expression, paired with an upper bound on the absolute
//! difference between the two. Every `+`, `-` and `*` updates the bound with
//! the standard forward error model:
//!
//! ```text
//! fl(x ± y) : e = e_x + e_y + ε·|z|
//! fl(x · y) : e = |x|·e_y + |y|·e_x + e_x·e_y + ε·|z| + η
//! ```
//!
//! where `ε` is the machine epsilon and `η` the smallest subnormal, which
//! absorbs the absolute error of a product that underflows. The bound is
//! derived from the magnitudes of the operands, so it adapts to the scale
//! of the input: a sign is certified only when `|value|` exceeds the bound.
//!
//! Overflow and invalid operations surface as non-finite values or bounds,
//! which never certify a sign. Each value carries its own evidence of
//! exceptional arithmetic, so nothing has to be cleared before a predicate
//! runs and nothing leaks from one predicate into the next.

#![forbid(unsafe_code)]

use std::ops::{Add, Mul, Neg, Sub};

use crate::geometry::matrix::Vec3;
use crate::geometry::point::Point;
use crate::geometry::predicates::Sign;

/// Relative error charged to every rounded operation. This is twice the
/// unit roundoff, which also covers bounding the error through the rounded
/// result instead of the exact one.
const ROUNDING: f64 = f64::EPSILON;

/// Absolute error charged to every product for gradual underflow.
const UNDERFLOW: f64 = 4.0 * f64::MIN_POSITIVE * f64::EPSILON;

/// Inflation applied to the accumulated bound before a sign is certified,
/// covering the rounding of the bound's own arithmetic.
const BOUND_INFLATION: f64 = 1.0 + 1.0e-12;

/// An `f64` value together with a rigorous bound on its absolute error.
///
/// # Examples
///
/// ```rust
/// use tolerance_envelope::geometry::filtered::Filtered;
/// use tolerance_envelope::geometry::predicates::Sign;
///
/// let a = Filtered::exact(0.1);
/// let b = Filtered::exact(0.2);
/// let sum = a + b;
/// assert!(sum.error() > 0.0);
/// assert_eq!(sum.sign(), Sign::POSITIVE);
///
/// // A cancellation below the error bound cannot be certified.
/// let cancelled = (a + b) - Filtered::exact(0.3);
/// assert_eq!(cancelled.sign(), Sign::INDETERMINATE);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Filtered {
    value: f64,
    error: f64,
}

impl Filtered {
    /// The exact value zero.
    pub const ZERO: Self = Self::exact(0.0);

    /// The exact value one.
    pub const ONE: Self = Self::exact(1.0);

    /// A value known exactly, such as an input coordinate.
    #[inline]
    #[must_use]
    pub const fn exact(value: f64) -> Self {
        Self { value, error: 0.0 }
    }

    /// The computed approximation.
    #[inline]
    #[must_use]
    pub const fn value(self) -> f64 {
        self.value
    }

    /// Upper bound on `|value - exact|`.
    #[inline]
    #[must_use]
    pub const fn error(self) -> f64 {
        self.error
    }

    /// Returns `true` if neither the value nor its bound overflowed or
    /// became NaN.
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.value.is_finite() && self.error.is_finite()
    }

    /// The certified sign of the exact value.
    ///
    /// Returns [`Sign::INDETERMINATE`] when the exact value may be zero, when
    /// the bound is too wide to decide, or when the computation overflowed or
    /// produced NaN.
    #[must_use]
    pub fn sign(self) -> Sign {
        if !self.is_finite() {
            return Sign::INDETERMINATE;
        }
        let bound = self.error * BOUND_INFLATION;
        if self.value > bound {
            Sign::POSITIVE
        } else if self.value < -bound {
            Sign::NEGATIVE
        } else {
            Sign::INDETERMINATE
        }
    }
}

impl From<f64> for Filtered {
    #[inline]
    fn from(value: f64) -> Self {
        Self::exact(value)
    }
}

impl Add for Filtered {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        let value = self.value + rhs.value;
        Self {
            value,
            error: ROUNDING.mul_add(value.abs(), self.error + rhs.error),
        }
    }
}

impl Sub for Filtered {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        let value = self.value - rhs.value;
        Self {
            value,
            error: ROUNDING.mul_add(value.abs(), self.error + rhs.error),
        }
    }
}

impl Mul for Filtered {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let value = self.value * rhs.value;
        let propagated = self.value.abs() * rhs.error
            + rhs.value.abs() * self.error
            + self.error * rhs.error;
        Self {
            value,
            error: ROUNDING.mul_add(value.abs(), propagated) + UNDERFLOW,
        }
    }
}

impl Neg for Filtered {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            value: -self.value,
            error: self.error,
        }
    }
}

/// The coordinates of `p` as exact filtered values.
#[inline]
#[must_use]
pub fn exact_coords(p: &Point) -> Vec3<Filtered> {
    let [x, y, z] = p.coords();
    [Filtered::exact(x), Filtered::exact(y), Filtered::exact(z)]
}

/// `p - origin` with the rounding of the subtraction tracked.
///
/// Predicates express their inputs relative to a nearby origin so that the
/// error bounds scale with the local feature size rather than with the
/// absolute coordinates.
#[inline]
#[must_use]
pub fn relative(p: &Point, origin: &Point) -> Vec3<Filtered> {
    let [px, py, pz] = exact_coords(p);
    let [ox, oy, oz] = exact_coords(origin);
    [px - ox, py - oy, pz - oz]
}
