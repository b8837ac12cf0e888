//! Fluent builder for [`Envelope`].
//!
//! [`EnvelopeBuilder`] validates the reference surface, builds one prism per
//! face and sizes the spatial grid. [`Envelope::new`] is shorthand for the
//! builder with its default grid settings.
//!
//! # Grid sizing
//!
//! | Setting | Effect |
//! |---|---|
//! | default | about one cell per prism ([`DEFAULT_PRISMS_PER_CELL`]) |
//! | [`.prisms_per_cell(k)`](EnvelopeBuilder::prisms_per_cell) | `ceil(faces / k)` cells |
//! | [`.cell_budget(n)`](EnvelopeBuilder::cell_budget) | exactly `n` cells requested, overriding the above |
//!
//! The budget is always clamped to `1..=MAX_CELL_BUDGET`.
//!
//! # Examples
//!
//! ```rust
//! use tolerance_envelope::core::builder::EnvelopeBuilder;
//! use tolerance_envelope::geometry::point::Point;
//!
//! let vertices = [
//!     Point::new([0.0, 0.0, 0.0]),
//!     Point::new([1.0, 0.0, 0.0]),
//!     Point::new([0.0, 1.0, 0.0]),
//! ];
//! let faces = [[0, 1, 2]];
//!
//! let envelope = EnvelopeBuilder::new(&vertices, &faces)
//!     .epsilon(0.01)
//!     .cell_budget(8)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(envelope.prism_count(), 1);
//! ```

#![forbid(unsafe_code)]

use crate::core::collections::SpatialGrid;
use crate::core::envelope::Envelope;
use crate::core::prism::Prism;
use crate::geometry::point::{BoundingBox, Point};

/// Tolerance used when [`EnvelopeBuilder::epsilon`] is not called.
pub const DEFAULT_EPSILON: f64 = 1.0e-3;

/// Target number of prisms per grid cell when no explicit budget is given.
pub const DEFAULT_PRISMS_PER_CELL: usize = 1;

/// Upper bound on the number of grid cells.
pub const MAX_CELL_BUDGET: usize = 1 << 21;

/// Errors reported while building an [`Envelope`].
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeConstructionError {
    /// The tolerance is zero, negative or not finite.
    #[error("Epsilon must be finite and positive, got {value}")]
    NonPositiveEpsilon {
        /// String representation of the rejected tolerance.
        value: String,
    },
    /// A vertex has a NaN or infinite coordinate.
    #[error(
        "Non-finite coordinate at vertex {vertex_index}, coordinate index {coordinate_index}: {coordinate_value}"
    )]
    NonFiniteCoordinate {
        /// Index of the offending vertex.
        vertex_index: usize,
        /// Which coordinate (0, 1 or 2) is non-finite.
        coordinate_index: usize,
        /// String representation of the coordinate value.
        coordinate_value: String,
    },
    /// A face references a vertex that does not exist.
    #[error("Face {face_index} references vertex {vertex_index}, but only {vertex_count} vertices were given")]
    FaceIndexOutOfBounds {
        /// Index of the offending face.
        face_index: usize,
        /// The out-of-range vertex index.
        vertex_index: usize,
        /// Number of vertices supplied.
        vertex_count: usize,
    },
    /// The cell budget or the prisms-per-cell target is zero.
    #[error("Cell budget and prisms per cell must be positive")]
    ZeroCellBudget,
}

/// Builder for [`Envelope`] with validated input and configurable grid
/// resolution.
///
/// # Examples
///
/// ```rust
/// use tolerance_envelope::core::builder::{EnvelopeBuilder, EnvelopeConstructionError};
/// use tolerance_envelope::geometry::point::Point;
///
/// let vertices = [Point::new([0.0, 0.0, 0.0]), Point::new([1.0, 0.0, 0.0])];
/// let err = EnvelopeBuilder::new(&vertices, &[[0, 1, 2]])
///     .epsilon(0.1)
///     .build()
///     .unwrap_err();
/// assert_eq!(
///     err,
///     EnvelopeConstructionError::FaceIndexOutOfBounds {
///         face_index: 0,
///         vertex_index: 2,
///         vertex_count: 2,
///     }
/// );
/// ```
#[derive(Clone, Debug)]
pub struct EnvelopeBuilder<'a> {
    vertices: &'a [Point],
    faces: &'a [[usize; 3]],
    epsilon: f64,
    /// Explicit cell budget; overrides `prisms_per_cell` when set.
    cell_budget: Option<usize>,
    prisms_per_cell: usize,
}

impl<'a> EnvelopeBuilder<'a> {
    /// Start a builder for the surface given by `vertices` and `faces`.
    #[must_use]
    pub const fn new(vertices: &'a [Point], faces: &'a [[usize; 3]]) -> Self {
        Self {
            vertices,
            faces,
            epsilon: DEFAULT_EPSILON,
            cell_budget: None,
            prisms_per_cell: DEFAULT_PRISMS_PER_CELL,
        }
    }

    /// Set the tolerance.
    #[must_use]
    pub const fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Request `budget` grid cells in total.
    #[must_use]
    pub const fn cell_budget(mut self, budget: usize) -> Self {
        self.cell_budget = Some(budget);
        self
    }

    /// Size the grid for about `count` prisms per cell.
    #[must_use]
    pub const fn prisms_per_cell(mut self, count: usize) -> Self {
        self.prisms_per_cell = count;
        self
    }

    fn validate(&self) -> Result<(), EnvelopeConstructionError> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(EnvelopeConstructionError::NonPositiveEpsilon {
                value: self.epsilon.to_string(),
            });
        }
        if self.cell_budget == Some(0) || self.prisms_per_cell == 0 {
            return Err(EnvelopeConstructionError::ZeroCellBudget);
        }
        for (vertex_index, vertex) in self.vertices.iter().enumerate() {
            if let Some(coordinate_index) = vertex.first_non_finite() {
                return Err(EnvelopeConstructionError::NonFiniteCoordinate {
                    vertex_index,
                    coordinate_index,
                    coordinate_value: vertex[coordinate_index].to_string(),
                });
            }
        }
        let vertex_count = self.vertices.len();
        for (face_index, face) in self.faces.iter().enumerate() {
            if let Some(&vertex_index) = face.iter().find(|&&v| v >= vertex_count) {
                return Err(EnvelopeConstructionError::FaceIndexOutOfBounds {
                    face_index,
                    vertex_index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }

    /// The grid budget this builder resolves to for its faces.
    #[must_use]
    pub fn resolved_cell_budget(&self) -> usize {
        let prisms_per_cell = self.prisms_per_cell.max(1);
        self.cell_budget
            .unwrap_or_else(|| self.faces.len().div_ceil(prisms_per_cell))
            .clamp(1, MAX_CELL_BUDGET)
    }

    /// Validate the input and build the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeConstructionError`] if `epsilon` is not finite and
    /// positive, if the cell budget or prisms-per-cell target is zero, if a
    /// vertex has a non-finite coordinate, or if a face references a missing
    /// vertex. No partial envelope is produced.
    pub fn build(self) -> Result<Envelope, EnvelopeConstructionError> {
        self.validate()?;

        let prisms: Vec<Prism> = self
            .faces
            .iter()
            .map(|face| Prism::new(&face.map(|v| self.vertices[v]), self.epsilon))
            .collect();
        let boxes: Vec<BoundingBox> = prisms.iter().map(Prism::bounding_box).collect();
        let budget = self.resolved_cell_budget();
        let grid = SpatialGrid::new(&boxes, budget);

        tracing::debug!(
            prisms = prisms.len(),
            degenerate = prisms.iter().filter(|p| p.is_degenerate()).count(),
            epsilon = self.epsilon,
            budget,
            dimensions = ?grid.as_ref().map(SpatialGrid::dimensions),
            occupied_cells = grid.as_ref().map_or(0, SpatialGrid::occupied_cells),
            "built envelope"
        );

        Ok(Envelope::from_parts(prisms, self.epsilon, grid))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> (Vec<Point>, Vec<[usize; 3]>) {
        let vertices = vec![
            Point::new([0.0, 0.0, 0.0]),
            Point::new([1.0, 0.0, 0.0]),
            Point::new([1.0, 1.0, 0.0]),
            Point::new([0.0, 1.0, 0.0]),
        ];
        (vertices, vec![[0, 1, 2], [0, 2, 3]])
    }

    #[test]
    fn test_rejects_bad_epsilon() {
        let (vertices, faces) = square();
        for eps in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = EnvelopeBuilder::new(&vertices, &faces).epsilon(eps).build().unwrap_err();
            assert!(matches!(err, EnvelopeConstructionError::NonPositiveEpsilon { .. }), "{eps}");
        }
    }

    #[test]
    fn test_rejects_non_finite_vertex() {
        let (mut vertices, faces) = square();
        vertices[2] = Point::new([1.0, f64::INFINITY, 0.0]);
        let err = EnvelopeBuilder::new(&vertices, &faces).epsilon(0.1).build().unwrap_err();
        assert_eq!(
            err,
            EnvelopeConstructionError::NonFiniteCoordinate {
                vertex_index: 2,
                coordinate_index: 1,
                coordinate_value: "inf".to_string(),
            }
        );
        assert!(err.to_string().contains("vertex 2"));
    }

    #[test]
    fn test_rejects_zero_budget() {
        let (vertices, faces) = square();
        let err = EnvelopeBuilder::new(&vertices, &faces).cell_budget(0).build().unwrap_err();
        assert_eq!(err, EnvelopeConstructionError::ZeroCellBudget);
        let err = EnvelopeBuilder::new(&vertices, &faces).prisms_per_cell(0).build().unwrap_err();
        assert_eq!(err, EnvelopeConstructionError::ZeroCellBudget);
    }

    #[test]
    fn test_budget_resolution() {
        let (vertices, faces) = square();
        assert_eq!(EnvelopeBuilder::new(&vertices, &faces).resolved_cell_budget(), 2);
        assert_eq!(
            EnvelopeBuilder::new(&vertices, &faces).prisms_per_cell(4).resolved_cell_budget(),
            1
        );
        assert_eq!(
            EnvelopeBuilder::new(&vertices, &faces).cell_budget(usize::MAX).resolved_cell_budget(),
            MAX_CELL_BUDGET
        );
        assert_eq!(EnvelopeBuilder::new(&vertices, &[]).resolved_cell_budget(), 1);
    }

    #[test]
    fn test_builds_one_prism_per_face() {
        let (vertices, faces) = square();
        let envelope = EnvelopeBuilder::new(&vertices, &faces)
            .epsilon(0.05)
            .cell_budget(27)
            .build()
            .unwrap();
        assert_eq!(envelope.prism_count(), 2);
        assert!((envelope.epsilon() - 0.05).abs() < f64::EPSILON);
        assert!(envelope.grid_dimensions().is_some());
    }

    #[test]
    fn test_degenerate_faces_are_kept() {
        let vertices = vec![Point::new([0.0, 0.0, 0.0]), Point::new([1.0, 0.0, 0.0])];
        let faces = vec![[0, 0, 1], [1, 1, 1]];
        let envelope = EnvelopeBuilder::new(&vertices, &faces).epsilon(0.01).build().unwrap();
        assert_eq!(envelope.prism_count(), 2);
        assert!(envelope.prisms().iter().all(Prism::is_degenerate));
    }
}
