//! # tolerance-envelope
//!
//! Conservative containment queries against the tolerance envelope of a
//! triangle surface in 3D.
//!
//! Given a reference surface and a tolerance `epsilon`, the envelope is the
//! union of one convex prism per face, each covering the points within
//! `epsilon` of its face. A query triangle is accepted only if every one of
//! its points is *proven* to lie strictly inside some prism. The answer is
//! one-sided: `true` is always correct, while `false` also covers cases the
//! floating-point filters cannot decide.
//!
//! # Features
//!
//! - Filtered orientation predicates with a tri-state [`Sign`](geometry::predicates::Sign)
//! - Implicit points: line/plane and triple-plane intersections that are
//!   never rounded to coordinates
//! - Prisms built from exact offsets of each face, with a fallback for
//!   slivers and collapsed faces
//! - A uniform grid for candidate lookup
//! - A tiered query: vertices, then edge/facet points, then
//!   triangle/facet/facet points
//! - Serialization/Deserialization with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use tolerance_envelope::prelude::*;
//!
//! // Two triangles forming the unit square in the plane z = 0
//! let vertices = vec![
//!     Point::new([0.0, 0.0, 0.0]),
//!     Point::new([1.0, 0.0, 0.0]),
//!     Point::new([1.0, 1.0, 0.0]),
//!     Point::new([0.0, 1.0, 0.0]),
//! ];
//! let faces = vec![[0, 1, 2], [0, 2, 3]];
//!
//! let envelope = Envelope::new(&vertices, &faces, 0.01).unwrap();
//! assert_eq!(envelope.prism_count(), 2);
//!
//! // A triangle crossing the diagonal, slightly tilted
//! let near = [
//!     Point::new([0.1, 0.1, 0.005]),
//!     Point::new([0.9, 0.2, -0.005]),
//!     Point::new([0.4, 0.9, 0.0]),
//! ];
//! assert!(envelope.is_inside(&near));
//!
//! // The same triangle lifted well above the tolerance
//! let far = near.map(|p| p.translated([0.0, 0.0, 0.5]));
//! assert!(!envelope.is_inside(&far));
//! ```
//!
//! # Configuration
//!
//! [`EnvelopeBuilder`](core::builder::EnvelopeBuilder) exposes the grid
//! resolution:
//!
//! ```rust
//! use tolerance_envelope::prelude::*;
//!
//! let vertices = vec![
//!     Point::new([0.0, 0.0, 0.0]),
//!     Point::new([1.0, 0.0, 0.0]),
//!     Point::new([0.0, 1.0, 0.0]),
//! ];
//! let envelope = EnvelopeBuilder::new(&vertices, &[[0, 1, 2]])
//!     .epsilon(1e-3)
//!     .cell_budget(64)
//!     .build()
//!     .unwrap();
//!
//! let (inside, stats) = envelope.is_inside_with_statistics(&[
//!     Point::new([0.1, 0.1, 0.0]),
//!     Point::new([0.5, 0.1, 0.0]),
//!     Point::new([0.1, 0.5, 0.0]),
//! ]);
//! assert!(inside);
//! assert_eq!(stats.decided_by, QueryTier::Vertex);
//! ```
//!
//! # Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events: `debug` when
//! an envelope is built (prism count, degenerate faces, grid resolution) and
//! `trace` for each query verdict. Install any subscriber to see them.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

/// Envelope construction, the spatial index and the containment query.
pub mod core {
    /// Query algorithms over a built envelope
    pub mod algorithms {
        /// Tiered triangle-in-prisms containment test
        pub mod containment;
    }
    pub mod builder;
    /// Collection aliases and the uniform spatial grid
    pub mod collections;
    pub mod envelope;
    pub mod prism;

    pub use builder::*;
    pub use envelope::*;
    pub use prism::*;
    // Note: collections module not re-exported here to avoid namespace pollution
}

/// Points, boxes and the filtered predicate kernel.
///
/// Every predicate returns a [`Sign`](predicates::Sign) that is either
/// certified for the exact inputs or `INDETERMINATE`.
pub mod geometry {
    /// Interval-style error tracking for `f64` arithmetic
    pub mod filtered;
    pub mod matrix;
    pub mod point;
    pub mod predicates;
    /// Triangle classification helpers built on the predicates
    pub mod util;

    pub use point::*;
    pub use predicates::*;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    pub use crate::core::{
        algorithms::containment::{QueryStatistics, QueryTier},
        builder::{EnvelopeBuilder, EnvelopeConstructionError},
        envelope::{Envelope, EnvelopeValidationError},
        prism::Prism,
    };

    pub use crate::core::collections::{FastHashMap, JumpList, SmallBuffer, SpatialGrid};

    pub use crate::geometry::{
        point::{BoundingBox, Point, Triangle},
        predicates::{ImplicitPoint, LinePlaneIntersection, Sign, TriplePlaneIntersection, orient_3d},
        util::{TriangleCut, TriangleShape, classify_triangle, tri_cut_tri_simple},
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
