//! Tiered containment test of a triangle against a set of prisms.
//!
//! A triangle `T` is inside the union of the prisms when every point of `T`
//! is certified to lie strictly inside some prism. If that fails, the part
//! of `T` outside the union is a union of convex pieces bounded by `T`'s
//! edges and by prism facets, so one of its corners is one of:
//!
//! 1. a vertex of `T`;
//! 2. the intersection of an edge of `T` with a facet plane;
//! 3. the intersection of the plane of `T` with two facet planes.
//!
//! The tiers check exactly these points, cheapest first. A point that lies
//! on a facet of prism `p` must be certified inside a prism other than `p`
//! (the *jump list* names the prisms to skip). Points provably off `T` or
//! off the closed facets that define them are not corners and are skipped.
//!
//! # Algorithm
//!
//! 1. Classify each candidate prism by the signs of `T`'s vertices against
//!    its facets. A facet with every vertex strictly outside discards the
//!    prism; a facet containing a whole edge of `T` (up to filter precision)
//!    marks the prism unreliable, and it is never used to certify.
//! 2. **Vertex tier**: every vertex needs a reliable prism strictly
//!    containing it. One prism containing all three contains `T`.
//! 3. **Edge tier**: every edge/facet intersection point needs a reliable
//!    prism other than the facet's own.
//! 4. **Facet tier**: every triangle/facet/facet point needs a reliable
//!    prism other than the two facets' prisms.
//!
//! Indeterminate predicates never decide a verdict: an uncertified point
//! falls through to the next prism, and a point no prism certifies makes the
//! triangle *outside*.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::collections::{CANDIDATE_INLINE_CAPACITY, JumpList, SmallBuffer, jump_list};
use crate::core::prism::{PRISM_FACET_COUNT, Prism};
use crate::geometry::point::Triangle;
use crate::geometry::predicates::{
    ImplicitPoint, LinePlaneIntersection, Sign, TriplePlaneIntersection,
};
use crate::geometry::util::{TriangleCut, TriangleShape, classify_triangle, tri_cut_tri_simple};

/// Vertex index pairs of a triangle's edges.
const EDGES: [(usize, usize); 3] = [(0, 1), (1, 2), (2, 0)];

/// The step of the containment test that produced the verdict.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryTier {
    /// No prism overlaps the query's bounding box.
    #[default]
    BroadPhase,
    /// Decided by the vertices: a vertex no prism contains, or a single
    /// prism containing all of them.
    Vertex,
    /// An edge/facet intersection point no other prism contains.
    Edge,
    /// A triangle/facet/facet intersection point no other prism contains.
    Facet,
    /// Every candidate point was covered.
    Exhausted,
}

impl fmt::Display for QueryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BroadPhase => write!(f, "broad phase"),
            Self::Vertex => write!(f, "vertex tier"),
            Self::Edge => write!(f, "edge tier"),
            Self::Facet => write!(f, "facet tier"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Counters collected while answering one containment query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryStatistics {
    /// Prisms whose bounding box overlaps the query's.
    pub candidate_prisms: usize,
    /// Candidates with a facet that has the whole query strictly outside.
    pub discarded_prisms: usize,
    /// Candidates excluded because a query edge lies on one of their facet
    /// planes as far as the filter can tell.
    pub unreliable_prisms: usize,
    /// Facets of reliable prisms that the query may cross.
    pub cutting_facets: usize,
    /// Edge/facet intersection points that needed a certificate.
    pub edge_points: usize,
    /// Facet pairs whose common point with the query's plane was computed.
    pub facet_pairs: usize,
    /// Triangle/facet/facet intersection points that needed a certificate.
    pub facet_points: usize,
    /// Containment tests that returned [`Sign::INDETERMINATE`], plus
    /// implicit points whose denominator could not be certified.
    pub indeterminate_results: usize,
    /// The step that decided the verdict.
    pub decided_by: QueryTier,
}

/// A facet of a reliable candidate that the query may cross.
#[derive(Clone, Copy, Debug)]
struct CuttingFacet {
    prism: usize,
    facet: usize,
    signs: [Sign; 3],
}

/// One containment query against `prisms`.
///
/// Construct with the candidate prisms from the broad phase, then call
/// [`ContainmentQuery::run`].
#[derive(Debug)]
pub struct ContainmentQuery<'a> {
    prisms: &'a [Prism],
    triangle: Triangle,
    shape: TriangleShape,
    reliable: SmallBuffer<usize, CANDIDATE_INLINE_CAPACITY>,
    /// Per reliable prism, which query vertices it strictly contains.
    vertex_inside: SmallBuffer<[bool; 3], CANDIDATE_INLINE_CAPACITY>,
    cutting: Vec<CuttingFacet>,
    stats: QueryStatistics,
}

impl<'a> ContainmentQuery<'a> {
    /// Classify `candidates` (indices into `prisms`) against `triangle`.
    ///
    /// # Panics
    ///
    /// Panics if a candidate index is out of bounds for `prisms`.
    #[must_use]
    pub fn new(prisms: &'a [Prism], candidates: &[usize], triangle: &Triangle) -> Self {
        let mut query = Self {
            prisms,
            triangle: *triangle,
            shape: classify_triangle(triangle),
            reliable: SmallBuffer::new(),
            vertex_inside: SmallBuffer::new(),
            cutting: Vec::new(),
            stats: QueryStatistics {
                candidate_prisms: candidates.len(),
                ..QueryStatistics::default()
            },
        };
        for &index in candidates {
            query.classify(index);
        }
        query
    }

    fn classify(&mut self, index: usize) {
        let prism = &self.prisms[index];
        let mut inside = [true; 3];
        let mut reliable = true;
        let mut cutting: SmallBuffer<CuttingFacet, PRISM_FACET_COUNT> = SmallBuffer::new();

        for (facet, plane) in prism.facets().enumerate() {
            let signs = match tri_cut_tri_simple(&plane, &self.triangle) {
                TriangleCut::Positive => {
                    self.stats.discarded_prisms += 1;
                    return;
                }
                TriangleCut::Negative => continue,
                TriangleCut::Coplanar => {
                    reliable = false;
                    continue;
                }
                TriangleCut::Crossing(signs) => signs,
            };
            for (vertex, sign) in signs.iter().enumerate() {
                inside[vertex] &= *sign == Sign::NEGATIVE;
            }
            if EDGES
                .iter()
                .any(|&(i, j)| signs[i] == Sign::INDETERMINATE && signs[j] == Sign::INDETERMINATE)
            {
                reliable = false;
            }
            cutting.push(CuttingFacet {
                prism: index,
                facet,
                signs,
            });
        }

        if !reliable {
            self.stats.unreliable_prisms += 1;
            return;
        }
        self.stats.cutting_facets += cutting.len();
        self.reliable.push(index);
        self.vertex_inside.push(inside);
        self.cutting.extend(cutting);
    }

    /// Run the tiers and return the verdict with the collected statistics.
    #[must_use]
    pub fn run(mut self) -> (bool, QueryStatistics) {
        let inside = self.evaluate();
        tracing::trace!(
            inside,
            tier = %self.stats.decided_by,
            candidates = self.stats.candidate_prisms,
            "containment query decided"
        );
        (inside, self.stats)
    }

    fn evaluate(&mut self) -> bool {
        if self.stats.candidate_prisms == 0 {
            self.stats.decided_by = QueryTier::BroadPhase;
            return false;
        }

        if let Some(verdict) = self.vertex_tier() {
            self.stats.decided_by = QueryTier::Vertex;
            return verdict;
        }
        if !self.edge_tier() {
            self.stats.decided_by = QueryTier::Edge;
            return false;
        }
        if self.shape != TriangleShape::Point && !self.facet_tier() {
            self.stats.decided_by = QueryTier::Facet;
            return false;
        }
        self.stats.decided_by = QueryTier::Exhausted;
        true
    }

    /// `Some(verdict)` when the vertices decide the query on their own.
    fn vertex_tier(&self) -> Option<bool> {
        if self.vertex_inside.iter().any(|mask| mask.iter().all(|&v| v)) {
            return Some(true);
        }
        let covered = (0..3).all(|vertex| self.vertex_inside.iter().any(|mask| mask[vertex]));
        if !covered {
            return Some(false);
        }
        (self.shape == TriangleShape::Point).then_some(true)
    }

    /// `false` as soon as an edge/facet point cannot be certified.
    fn edge_tier(&mut self) -> bool {
        for k in 0..self.cutting.len() {
            let cut = self.cutting[k];
            let jump = jump_list(&[cut.prism]);
            let plane = self.prisms[cut.prism].facet(cut.facet);
            for (i, j) in EDGES {
                let (si, sj) = (cut.signs[i], cut.signs[j]);
                if si == sj && si.is_certain() {
                    continue;
                }
                let (a, b) = (self.triangle[i], self.triangle[j]);
                let Some(point) = LinePlaneIntersection::new(&a, &b, &plane[0], &plane[1], &plane[2])
                else {
                    self.stats.indeterminate_results += 1;
                    return false;
                };
                if point.within_segment() == Sign::NEGATIVE
                    || self.prisms[cut.prism].contains(&point) == Sign::NEGATIVE
                {
                    continue;
                }
                self.stats.edge_points += 1;
                if !self.certify(&point, &jump) {
                    return false;
                }
            }
        }
        true
    }

    /// `false` as soon as a triangle/facet/facet point cannot be certified.
    fn facet_tier(&mut self) -> bool {
        let prisms = self.prisms;
        for first in 0..self.cutting.len() {
            for second in first + 1..self.cutting.len() {
                let (f, g) = (self.cutting[first], self.cutting[second]);
                if f.prism == g.prism && !Prism::facets_adjacent(f.facet, g.facet) {
                    continue;
                }
                let (p, q) = (&prisms[f.prism], &prisms[g.prism]);
                self.stats.facet_pairs += 1;
                let Some(point) =
                    TriplePlaneIntersection::new(&self.triangle, &p.facet(f.facet), &q.facet(g.facet))
                else {
                    // Planes without a certified common point meet along a
                    // line or not at all; either way no isolated corner.
                    continue;
                };
                if point.within_triangle() == Sign::NEGATIVE
                    || p.contains(&point) == Sign::NEGATIVE
                    || q.contains(&point) == Sign::NEGATIVE
                {
                    continue;
                }
                self.stats.facet_points += 1;
                let jump = jump_list(&[f.prism, g.prism]);
                if !self.certify(&point, &jump) {
                    return false;
                }
            }
        }
        true
    }

    /// Whether some reliable prism outside `jump` strictly contains `point`.
    fn certify<P: ImplicitPoint>(&mut self, point: &P, jump: &JumpList) -> bool {
        for &index in &self.reliable {
            if jump.binary_search(&index).is_ok() {
                continue;
            }
            match self.prisms[index].contains(point) {
                Sign::POSITIVE => return true,
                Sign::INDETERMINATE => self.stats.indeterminate_results += 1,
                Sign::NEGATIVE => {}
            }
        }
        false
    }
}

/// Whether `triangle` is inside the union of `prisms`, using `candidates`
/// (indices into `prisms`) from the broad phase.
#[must_use]
pub fn triangle_in_prisms(prisms: &[Prism], candidates: &[usize], triangle: &Triangle) -> bool {
    ContainmentQuery::new(prisms, candidates, triangle).run().0
}

// =============================================================================
// TESTS
// =============================================================================
