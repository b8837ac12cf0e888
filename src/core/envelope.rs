//! The envelope: prisms around a reference surface plus their spatial index.
//!
//! An [`Envelope`] is immutable once built. Queries borrow it, keep all of
//! their scratch state local and can run from several threads at once.
//!
//! # Examples
//!
//! ```rust
//! use tolerance_envelope::core::envelope::Envelope;
//! use tolerance_envelope::geometry::point::Point;
//!
//! let vertices = [
//!     Point::new([0.0, 0.0, 0.0]),
//!     Point::new([1.0, 0.0, 0.0]),
//!     Point::new([0.0, 1.0, 0.0]),
//! ];
//! let envelope = Envelope::new(&vertices, &[[0, 1, 2]], 0.01).unwrap();
//!
//! let lifted = vertices.map(|v| v.translated([0.0, 0.0, 0.005]));
//! let far = vertices.map(|v| v.translated([0.0, 0.0, 1.0]));
//! assert!(envelope.is_inside(&lifted));
//! assert!(!envelope.is_inside(&far));
//! ```

#![forbid(unsafe_code)]

use serde::{Deserialize, Deserializer, Serialize, de};
use thiserror::Error;

use crate::core::algorithms::containment::{ContainmentQuery, QueryStatistics};
use crate::core::builder::{EnvelopeBuilder, EnvelopeConstructionError};
use crate::core::collections::spatial_grid::{GridValidationError, SpatialGrid};
use crate::core::prism::Prism;
use crate::geometry::point::{BoundingBox, Point, Triangle};

/// Errors found when checking a deserialized envelope.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnvelopeValidationError {
    /// The stored tolerance is not a finite positive number.
    #[error("Invalid epsilon {value}: expected a finite positive tolerance")]
    InvalidEpsilon {
        /// The stored value, formatted.
        value: String,
    },
    /// A non-empty envelope without a spatial grid.
    #[error("Envelope with {prism_count} prisms has no spatial grid")]
    MissingGrid {
        /// Number of stored prisms.
        prism_count: usize,
    },
    /// An empty envelope carrying a spatial grid.
    #[error("Envelope without prisms carries a spatial grid")]
    UnexpectedGrid,
    /// The spatial grid is inconsistent with the prisms.
    #[error(transparent)]
    Grid(#[from] GridValidationError),
}

/// A tolerance envelope around a triangle surface.
///
/// Holds one [`Prism`] per input face, in face order, and a uniform grid
/// over their bounding boxes. A triangle is *inside* when every point of it
/// is certified to lie strictly inside some prism.
///
/// Deserialization checks the grid against the prisms, so a restored
/// envelope never indexes past its prisms.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
    prisms: Vec<Prism>,
    epsilon: f64,
    /// `None` only when there are no prisms.
    grid: Option<SpatialGrid>,
}

/// The serialized fields of an [`Envelope`], before validation.
#[derive(Deserialize)]
struct EnvelopeData {
    prisms: Vec<Prism>,
    epsilon: f64,
    grid: Option<SpatialGrid>,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = EnvelopeData::deserialize(deserializer)?;
        let envelope = Self::from_parts(data.prisms, data.epsilon, data.grid);
        envelope
            .validate()
            .map_err(|e| de::Error::custom(format!("Invalid envelope: {e}")))?;
        Ok(envelope)
    }
}

impl Envelope {
    /// Build the envelope of the surface `(vertices, faces)` with tolerance
    /// `epsilon` and the default grid settings.
    ///
    /// # Errors
    ///
    /// See [`EnvelopeBuilder::build`].
    pub fn new(
        vertices: &[Point],
        faces: &[[usize; 3]],
        epsilon: f64,
    ) -> Result<Self, EnvelopeConstructionError> {
        EnvelopeBuilder::new(vertices, faces).epsilon(epsilon).build()
    }

    pub(crate) const fn from_parts(
        prisms: Vec<Prism>,
        epsilon: f64,
        grid: Option<SpatialGrid>,
    ) -> Self {
        Self {
            prisms,
            epsilon,
            grid,
        }
    }

    /// Check that the tolerance is usable and that the grid only refers to
    /// stored prisms.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), EnvelopeValidationError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(EnvelopeValidationError::InvalidEpsilon {
                value: self.epsilon.to_string(),
            });
        }
        match (&self.grid, self.prisms.is_empty()) {
            (None, true) => Ok(()),
            (None, false) => Err(EnvelopeValidationError::MissingGrid {
                prism_count: self.prisms.len(),
            }),
            (Some(_), true) => Err(EnvelopeValidationError::UnexpectedGrid),
            (Some(grid), false) => Ok(grid.validate(self.prisms.len())?),
        }
    }

    /// Number of prisms, equal to the number of input faces.
    #[must_use]
    pub const fn prism_count(&self) -> usize {
        self.prisms.len()
    }

    /// The prisms, in face order.
    #[must_use]
    pub fn prisms(&self) -> &[Prism] {
        &self.prisms
    }

    /// The prism built for face `index`.
    #[must_use]
    pub fn prism(&self, index: usize) -> Option<&Prism> {
        self.prisms.get(index)
    }

    /// The tolerance the envelope was built with.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// The union of the prisms' bounding boxes, or `None` when empty.
    #[must_use]
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let (first, rest) = self.prisms.split_first()?;
        Some(
            rest.iter()
                .fold(first.bounding_box(), |acc, p| acc.union(&p.bounding_box())),
        )
    }

    /// Grid cells along x, y and z, or `None` when empty.
    #[must_use]
    pub fn grid_dimensions(&self) -> Option<[usize; 3]> {
        self.grid.as_ref().map(SpatialGrid::dimensions)
    }

    /// Ascending indices of the prisms whose bounding box overlaps `query`.
    #[must_use]
    pub fn candidate_prisms(&self, query: &BoundingBox) -> Vec<usize> {
        let Some(grid) = &self.grid else {
            return Vec::new();
        };
        let mut candidates = grid.cells_overlapping(query);
        candidates.retain(|&index| self.prisms[index].bounding_box().overlaps(query));
        candidates
    }

    /// Whether every point of `triangle` is inside the envelope.
    ///
    /// Conservative: `false` may be returned for a triangle that is inside
    /// but whose containment the floating-point filters cannot certify. A
    /// `true` answer is always correct.
    #[must_use]
    pub fn is_inside(&self, triangle: &Triangle) -> bool {
        self.is_inside_with_statistics(triangle).0
    }

    /// [`Envelope::is_inside`] together with the query's counters.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use tolerance_envelope::core::algorithms::containment::QueryTier;
    /// use tolerance_envelope::core::envelope::Envelope;
    /// use tolerance_envelope::geometry::point::Point;
    ///
    /// let vertices = [
    ///     Point::new([0.0, 0.0, 0.0]),
    ///     Point::new([1.0, 0.0, 0.0]),
    ///     Point::new([0.0, 1.0, 0.0]),
    /// ];
    /// let envelope = Envelope::new(&vertices, &[[0, 1, 2]], 0.01).unwrap();
    ///
    /// let (inside, stats) = envelope.is_inside_with_statistics(&vertices);
    /// assert!(inside);
    /// assert_eq!(stats.decided_by, QueryTier::Vertex);
    /// ```
    #[must_use]
    pub fn is_inside_with_statistics(&self, triangle: &Triangle) -> (bool, QueryStatistics) {
        if !triangle.iter().all(Point::is_finite) {
            tracing::trace!("non-finite query is outside");
            return (false, QueryStatistics::default());
        }
        let candidates = BoundingBox::from_points(triangle)
            .map(|query| self.candidate_prisms(&query))
            .unwrap_or_default();
        ContainmentQuery::new(&self.prisms, &candidates, triangle).run()
    }

    /// Whether `point` is inside the envelope.
    #[must_use]
    pub fn is_point_inside(&self, point: &Point) -> bool {
        self.is_inside(&[*point, *point, *point])
    }

    /// Whether the segment `a b` is inside the envelope.
    #[must_use]
    pub fn is_segment_inside(&self, a: &Point, b: &Point) -> bool {
        self.is_inside(&[*a, *b, *b])
    }
}

// =============================================================================
// TESTS
// =============================================================================
