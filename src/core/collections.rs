//! Collection aliases and the envelope's spatial index.
//!
//! The aliases keep hashing and small-buffer choices in one place, so the
//! rest of the crate names collections by their role rather than by the
//! backing crate.

#![forbid(unsafe_code)]

mod aliases;
pub mod spatial_grid;

pub use aliases::*;
pub use spatial_grid::SpatialGrid;
