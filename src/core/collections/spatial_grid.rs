//! Uniform grid over the envelope's bounding box.
//!
//! The grid maps each cell to the ascending list of prisms whose bounding
//! boxes overlap it. A query box is answered by visiting the inclusive range
//! of cells it covers, so every prism whose box overlaps the query box is
//! returned (possibly together with a few that do not).
//!
//! ## Resolution
//!
//! Cells are cubes of edge `h` and axis `k` is split into
//! `max(1, ceil(extent_k / h))` cells. Given a cell budget `N`, `h` is the
//! smallest edge whose total cell count stays within `N`, so a flat or thin
//! surface spreads the budget over the axes it actually spans instead of
//! multiplying it. Cell `(i, j, k)` has id `k·subx·suby + j·subx + i`; only
//! non-empty cells are stored.

use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::FastHashMap;
use crate::geometry::point::{BoundingBox, Point};

/// Fraction of the smallest extent added on every side of the global box.
const BOUNDS_PADDING_FRACTION: f64 = 0.1;

/// Bisection steps on the cell edge. Each step halves the ratio between the
/// bracketing edges on a log scale, so this resolves `h` far below the
/// granularity at which the cell counts change.
const RESOLUTION_STEPS: usize = 64;

/// Errors found when checking a grid against the prisms it indexes.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GridValidationError {
    /// An axis with no cells.
    #[error("Grid axis {axis} has no cells")]
    EmptyAxis {
        /// The axis (0, 1 or 2).
        axis: usize,
    },
    /// The cell count does not fit in `usize`.
    #[error("Grid dimensions {dimensions:?} overflow the cell id range")]
    TooManyCells {
        /// Cells along each axis.
        dimensions: [usize; 3],
    },
    /// A stored cell id beyond the grid.
    #[error("Cell {cell} is outside a grid of {cell_count} cells")]
    CellOutOfRange {
        /// The stored cell id.
        cell: usize,
        /// Number of cells in the grid.
        cell_count: usize,
    },
    /// A cell listing a prism the envelope does not have.
    #[error("Cell {cell} lists prism {prism_index}, but the envelope has {prism_count} prisms")]
    PrismIndexOutOfBounds {
        /// The cell holding the index.
        cell: usize,
        /// The offending prism index.
        prism_index: usize,
        /// Number of prisms in the envelope.
        prism_count: usize,
    },
    /// A cell whose prism indices are not strictly ascending.
    #[error("Cell {cell} lists its prisms out of order")]
    UnsortedCell {
        /// The cell id.
        cell: usize,
    },
}

/// A uniform spatial grid mapping cell ids to ascending prism indices.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SpatialGrid {
    bounds: BoundingBox,
    dimensions: [usize; 3],
    cell_size: [f64; 3],
    cells: FastHashMap<usize, Vec<usize>>,
}

impl SpatialGrid {
    /// Build the grid for `boxes` with at most `budget` cells in total.
    ///
    /// Returns `None` when `boxes` is empty. A zero budget is treated as 1.
    ///
    /// # Examples
    ///
    /// ```
    /// use tolerance_envelope::core::collections::SpatialGrid;
    /// use tolerance_envelope::geometry::point::{BoundingBox, Point};
    ///
    /// let boxes = [
    ///     BoundingBox::new(Point::new([0.0; 3]), Point::new([1.0; 3])),
    ///     BoundingBox::new(Point::new([5.0; 3]), Point::new([6.0; 3])),
    /// ];
    /// let grid = SpatialGrid::new(&boxes, 8).unwrap();
    /// let near_first = BoundingBox::new(Point::new([0.5; 3]), Point::new([0.6; 3]));
    /// assert_eq!(grid.cells_overlapping(&near_first), vec![0]);
    /// ```
    #[must_use]
    pub fn new(boxes: &[BoundingBox], budget: usize) -> Option<Self> {
        let (first, rest) = boxes.split_first()?;
        let tight = rest.iter().fold(*first, |acc, b| acc.union(b));
        let extent = tight.extent();
        let smallest = extent.iter().copied().fold(f64::INFINITY, f64::min);
        let bounds = tight.padded(BOUNDS_PADDING_FRACTION * smallest);

        let budget = budget.max(1);
        let dimensions = Self::resolution(&bounds, budget);
        let padded_extent = bounds.extent();
        let cell_size = [0, 1, 2].map(|axis| {
            padded_extent[axis] / dimensions[axis].to_f64().unwrap_or(1.0)
        });

        let mut grid = Self {
            bounds,
            dimensions,
            cell_size,
            cells: FastHashMap::default(),
        };
        for (index, b) in boxes.iter().enumerate() {
            let (lo, hi) = grid.index_range(b);
            for k in lo[2]..=hi[2] {
                for j in lo[1]..=hi[1] {
                    for i in lo[0]..=hi[0] {
                        let id = grid.cell_id([i, j, k]);
                        grid.cells.entry(id).or_default().push(index);
                    }
                }
            }
        }
        Some(grid)
    }

    /// Cells along each axis for cubes of edge `edge`, as floats so that a
    /// tiny edge cannot overflow the count.
    fn cells_per_axis(extent: [f64; 3], edge: f64) -> [f64; 3] {
        extent.map(|e| (e / edge).ceil().max(1.0))
    }

    fn resolution(bounds: &BoundingBox, budget: usize) -> [usize; 3] {
        let extent = bounds.extent();
        let cells = budget.to_f64().unwrap_or(1.0);
        let total = |edge: f64| Self::cells_per_axis(extent, edge).iter().product::<f64>();

        // `within` never exceeds the budget; `beyond` always does.
        let longest = extent.iter().copied().fold(0.0_f64, f64::max);
        if !(longest.is_finite() && longest > 0.0) {
            return [1, 1, 1];
        }
        let mut within = longest;
        let mut beyond = longest / cells;
        if total(beyond) <= cells {
            within = beyond;
        } else {
            for _ in 0..RESOLUTION_STEPS {
                let middle = (within * beyond).sqrt();
                if total(middle) <= cells {
                    within = middle;
                } else {
                    beyond = middle;
                }
            }
        }
        Self::cells_per_axis(extent, within).map(|n| n.to_usize().map_or(1, |n| n.clamp(1, budget)))
    }

    /// Cells along x, y and z.
    #[must_use]
    pub const fn dimensions(&self) -> [usize; 3] {
        self.dimensions
    }

    /// The padded box covered by the grid.
    #[must_use]
    pub const fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Number of cells holding at least one prism.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// The id of cell `(i, j, k)`.
    #[must_use]
    pub const fn cell_id(&self, [i, j, k]: [usize; 3]) -> usize {
        k * self.dimensions[0] * self.dimensions[1] + j * self.dimensions[0] + i
    }

    /// The prisms registered in cell `id`, in ascending order.
    #[must_use]
    pub fn cell(&self, id: usize) -> &[usize] {
        self.cells.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Cell index of `p` along each axis, clamped to the grid.
    fn cell_index(&self, p: &Point) -> [usize; 3] {
        [0, 1, 2].map(|axis| {
            let t = ((p[axis] - self.bounds.min()[axis]) / self.cell_size[axis]).floor();
            let last = self.dimensions[axis] - 1;
            if t >= 0.0 {
                t.to_usize().map_or(last, |n| n.min(last))
            } else if t.is_nan() {
                last
            } else {
                0
            }
        })
    }

    fn index_range(&self, b: &BoundingBox) -> ([usize; 3], [usize; 3]) {
        (self.cell_index(&b.min()), self.cell_index(&b.max()))
    }

    /// Check that every stored cell lies in the grid and lists strictly
    /// ascending indices below `prism_count`.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self, prism_count: usize) -> Result<(), GridValidationError> {
        if let Some(axis) = self.dimensions.iter().position(|&n| n == 0) {
            return Err(GridValidationError::EmptyAxis { axis });
        }
        let cell_count = self
            .dimensions
            .iter()
            .try_fold(1_usize, |acc, &n| acc.checked_mul(n))
            .ok_or(GridValidationError::TooManyCells {
                dimensions: self.dimensions,
            })?;
        for (&cell, prisms) in &self.cells {
            if cell >= cell_count {
                return Err(GridValidationError::CellOutOfRange { cell, cell_count });
            }
            if prisms.windows(2).any(|w| w[0] >= w[1]) {
                return Err(GridValidationError::UnsortedCell { cell });
            }
            if let Some(&prism_index) = prisms.iter().find(|&&index| index >= prism_count) {
                return Err(GridValidationError::PrismIndexOutOfBounds {
                    cell,
                    prism_index,
                    prism_count,
                });
            }
        }
        Ok(())
    }

    /// Sorted, deduplicated indices of the prisms registered in every cell
    /// that `query` overlaps.
    ///
    /// A box disjoint from the grid's bounds (or containing NaN) yields no
    /// prisms. Callers still filter the result by exact box overlap.
    #[must_use]
    pub fn cells_overlapping(&self, query: &BoundingBox) -> Vec<usize> {
        if !self.bounds.overlaps(query) {
            return Vec::new();
        }
        let (lo, hi) = self.index_range(query);
        let mut found = Vec::new();
        for k in lo[2]..=hi[2] {
            for j in lo[1]..=hi[1] {
                for i in lo[0]..=hi[0] {
                    found.extend_from_slice(self.cell(self.cell_id([i, j, k])));
                }
            }
        }
        found.sort_unstable();
        found.dedup();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(x: f64, y: f64, z: f64) -> BoundingBox {
        BoundingBox::new(Point::new([x, y, z]), Point::new([x + 1.0, y + 1.0, z + 1.0]))
    }

    #[test]
    fn test_grid_resolution_follows_budget() {
        let boxes = [unit_box(0.0, 0.0, 0.0), unit_box(9.0, 0.0, 0.0)];
        let grid = SpatialGrid::new(&boxes, 10).unwrap();
        let [sx, sy, sz] = grid.dimensions();
        assert!(sx > sy && sx > sz);
        assert!(sx <= 10 && sy >= 1 && sz >= 1);

        let single = SpatialGrid::new(&boxes, 1).unwrap();
        assert_eq!(single.dimensions(), [1, 1, 1]);
        assert_eq!(single.cell(0), &[0, 1]);

        let zero_budget = SpatialGrid::new(&boxes, 0).unwrap();
        assert_eq!(zero_budget.dimensions(), [1, 1, 1]);
    }

    /// A flat `n × n` plate of unit squares, each box `2·half_thickness`
    /// thick.
    fn plate_boxes(n: u32, half_thickness: f64) -> Vec<BoundingBox> {
        (0..n * n)
            .map(|k| {
                let (x, y) = (f64::from(k % n), f64::from(k / n));
                BoundingBox::new(
                    Point::new([x, y, -half_thickness]),
                    Point::new([x + 1.0, y + 1.0, half_thickness]),
                )
            })
            .collect()
    }

    #[test]
    fn test_flat_surface_stays_within_budget() {
        for half_thickness in [1e-2, 1e-6, 0.0] {
            let boxes = plate_boxes(40, half_thickness);
            let budget = 2 * boxes.len();
            let grid = SpatialGrid::new(&boxes, budget).unwrap();
            let dims = grid.dimensions();
            let cells: usize = dims.iter().product();
            assert!(cells <= budget, "{dims:?} exceeds {budget}");
            assert!(4 * cells >= budget, "{dims:?} wastes the budget");
            assert_eq!(dims[2], 1);

            let registrations: usize = (0..cells).map(|id| grid.cell(id).len()).sum();
            assert!(registrations <= 9 * boxes.len(), "{registrations} registrations");
        }

        let small = SpatialGrid::new(&plate_boxes(8, 1e-4), 128).unwrap();
        assert!(small.dimensions().iter().product::<usize>() <= 128);
    }

    #[test]
    fn test_thin_needle_uses_budget_along_its_length() {
        let boxes: Vec<_> = (0..100)
            .map(|i| {
                let x = f64::from(i);
                BoundingBox::new(Point::new([x, 0.0, 0.0]), Point::new([x + 1.0, 1e-3, 1e-3]))
            })
            .collect();
        let grid = SpatialGrid::new(&boxes, 100).unwrap();
        let [sx, sy, sz] = grid.dimensions();
        assert_eq!((sy, sz), (1, 1));
        assert!((50..=100).contains(&sx), "{sx} cells along the needle");
    }

    #[test]
    fn test_validate_against_prism_count() {
        let boxes = [unit_box(0.0, 0.0, 0.0), unit_box(3.0, 3.0, 3.0)];
        let grid = SpatialGrid::new(&boxes, 8).unwrap();
        assert_eq!(grid.validate(2), Ok(()));
        assert!(matches!(
            grid.validate(1),
            Err(GridValidationError::PrismIndexOutOfBounds { prism_index: 1, prism_count: 1, .. })
        ));
    }

    #[test]
    fn test_grid_bounds_are_padded() {
        let boxes = [BoundingBox::new(Point::new([0.0; 3]), Point::new([1.0, 2.0, 4.0]))];
        let grid = SpatialGrid::new(&boxes, 4).unwrap();
        assert_eq!(grid.bounds().min(), Point::new([-0.1; 3]));
        assert_eq!(grid.bounds().max(), Point::new([1.1, 2.1, 4.1]));
    }

    #[test]
    fn test_cells_are_sorted_per_cell_and_overall() {
        let boxes: Vec<_> = (0..20)
            .map(|i| unit_box(f64::from(i % 5), f64::from(i / 5), 0.0))
            .collect();
        let grid = SpatialGrid::new(&boxes, 20).unwrap();
        assert!(grid.occupied_cells() > 0);
        for id in 0..grid.dimensions().iter().product::<usize>() {
            let cell = grid.cell(id);
            assert!(cell.windows(2).all(|w| w[0] < w[1]));
        }

        let everything = grid.cells_overlapping(&grid.bounds());
        assert_eq!(everything, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_overlap_superset_guarantee() {
        let boxes: Vec<_> = (0..6)
            .map(|i| unit_box(2.0 * f64::from(i), 0.5 * f64::from(i), -f64::from(i)))
            .collect();
        let grid = SpatialGrid::new(&boxes, 32).unwrap();
        let query = BoundingBox::new(Point::new([3.5, 0.0, -4.0]), Point::new([6.2, 2.0, 0.0]));
        let found = grid.cells_overlapping(&query);
        for (index, b) in boxes.iter().enumerate() {
            if b.overlaps(&query) {
                assert!(found.contains(&index), "missing prism {index}");
            }
        }
    }

    #[test]
    fn test_query_outside_bounds_is_empty() {
        let grid = SpatialGrid::new(&[unit_box(0.0, 0.0, 0.0)], 8).unwrap();
        assert!(grid.cells_overlapping(&unit_box(10.0, 10.0, 10.0)).is_empty());
        let nan = BoundingBox::new(Point::new([f64::NAN; 3]), Point::new([f64::NAN; 3]));
        assert!(grid.cells_overlapping(&nan).is_empty());
        assert!(SpatialGrid::new(&[], 8).is_none());
    }

    #[test]
    fn test_query_partially_outside_is_clamped() {
        let grid = SpatialGrid::new(&[unit_box(0.0, 0.0, 0.0), unit_box(3.0, 3.0, 3.0)], 27).unwrap();
        let straddling = BoundingBox::new(Point::new([-100.0; 3]), Point::new([0.5; 3]));
        assert_eq!(grid.cells_overlapping(&straddling), vec![0]);
    }
}
