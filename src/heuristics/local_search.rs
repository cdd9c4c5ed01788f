//! Local search improvement heuristics.
//!
//! Improvements operate on closed tours whose first and last positions are
//! pinned to the origin; only interior positions move.

use crate::distance::DistanceResolver;
use crate::instance::NodeId;
use crate::solution::Tour;

/// Minimum gain (km) for a move to count as an improvement
pub const IMPROVEMENT_EPSILON: f64 = 0.001;

/// Trait for local search improvement methods
pub trait LocalSearch {
    /// Improve the tour in place; returns whether it changed
    fn improve(&self, resolver: &DistanceResolver, tour: &mut Tour) -> bool;
    fn name(&self) -> &str;
}

/// 2-Opt Local Search
///
/// Scans interior position pairs `1 <= i < j <= n - 2` and reverses
/// `tour[i..=j]` whenever replacing edges (A,B),(C,D) with (A,C),(B,D)
/// saves more than `epsilon`. Moves are applied as soon as they are found;
/// passes repeat until one completes without a move.
#[derive(Debug, Clone)]
pub struct TwoOptSearch {
    pub epsilon: f64,
    /// Optional cap on full passes, `None` runs to convergence
    pub max_passes: Option<usize>,
}

impl TwoOptSearch {
    pub fn new() -> Self {
        TwoOptSearch {
            epsilon: IMPROVEMENT_EPSILON,
            max_passes: None,
        }
    }

    pub fn with_max_passes(max_passes: usize) -> Self {
        TwoOptSearch {
            max_passes: Some(max_passes),
            ..Self::new()
        }
    }

    /// Cost of edges (A,B),(C,D) and of their replacement (A,C),(B,D)
    #[inline]
    fn edge_costs(&self, resolver: &DistanceResolver, nodes: &[NodeId], i: usize, j: usize) -> (f64, f64) {
        let (a, b, c, d) = (nodes[i - 1], nodes[i], nodes[j], nodes[j + 1]);
        let current = resolver.distance(a, b) + resolver.distance(c, d);
        let candidate = resolver.distance(a, c) + resolver.distance(b, d);
        (current, candidate)
    }

    #[inline]
    fn is_improving(&self, current: f64, candidate: f64) -> bool {
        candidate < current - self.epsilon
    }

    /// One full scan; returns the number of moves applied
    fn pass(&self, resolver: &DistanceResolver, tour: &mut Tour) -> usize {
        let n = tour.len();
        let mut moves = 0;

        for i in 1..n - 2 {
            for j in i + 1..n - 1 {
                let (current, candidate) = self.edge_costs(resolver, tour.nodes(), i, j);
                if self.is_improving(current, candidate) {
                    tour.reverse_segment(i, j);
                    moves += 1;
                }
            }
        }

        moves
    }

    /// Check that no single interior reversal saves more than `epsilon`
    pub fn is_local_optimum(&self, resolver: &DistanceResolver, tour: &Tour) -> bool {
        let nodes = tour.nodes();
        let n = nodes.len();
        if n < 4 {
            return true;
        }
        (1..n - 2).all(|i| {
            (i + 1..n - 1).all(|j| {
                let (current, candidate) = self.edge_costs(resolver, nodes, i, j);
                !self.is_improving(current, candidate)
            })
        })
    }
}

impl Default for TwoOptSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSearch for TwoOptSearch {
    fn improve(&self, resolver: &DistanceResolver, tour: &mut Tour) -> bool {
        if tour.len() < 4 {
            return false;
        }

        let mut improved = false;
        let mut passes = 0;

        loop {
            passes += 1;
            let moves = self.pass(resolver, tour);
            if moves == 0 {
                break;
            }
            improved = true;
            if self.max_passes.is_some_and(|limit| passes >= limit) {
                log::debug!("2-opt stopped after {} passes", passes);
                break;
            }
        }

        improved
    }

    fn name(&self) -> &str {
        "2-Opt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Coordinates, RoadNetwork};
    use std::sync::Arc;

    /// Five nodes on a rough circle, no roads: distances are geodesic
    fn pentagon() -> DistanceResolver {
        let mut network = RoadNetwork::new("pentagon");
        let points = [(0.0, 0.0), (0.0, 1.0), (0.8, 1.5), (1.6, 1.0), (1.6, 0.0)];
        for (i, (lat, lon)) in points.iter().enumerate() {
            network.add_node(format!("N{}", i), Some(Coordinates::new(*lat, *lon))).unwrap();
        }
        DistanceResolver::new(Arc::new(network))
    }

    #[test]
    fn test_untangles_crossing() {
        let resolver = pentagon();
        // 0 -> 1 -> 3 -> 2 -> 4 -> 0 crosses itself between 1-3 and 2-4
        let mut tour = Tour::new(vec![0, 1, 3, 2, 4, 0]);
        let before = resolver.tour_distance(tour.nodes());

        let two_opt = TwoOptSearch::new();
        assert!(two_opt.improve(&resolver, &mut tour));

        assert_eq!(tour.nodes(), &[0, 1, 2, 3, 4, 0]);
        assert!(resolver.tour_distance(tour.nodes()) < before);
        assert!(two_opt.is_local_optimum(&resolver, &tour));
    }

    #[test]
    fn test_short_tours_unchanged() {
        let resolver = pentagon();
        let two_opt = TwoOptSearch::new();
        for nodes in [vec![], vec![0], vec![0, 0], vec![0, 1, 0]] {
            let mut tour = Tour::new(nodes.clone());
            assert!(!two_opt.improve(&resolver, &mut tour));
            assert_eq!(tour.nodes(), nodes.as_slice());
        }
    }

    #[test]
    fn test_optimal_tour_untouched() {
        let resolver = pentagon();
        let mut tour = Tour::new(vec![0, 1, 2, 3, 4, 0]);
        assert!(!TwoOptSearch::new().improve(&resolver, &mut tour));
        assert_eq!(tour.nodes(), &[0, 1, 2, 3, 4, 0]);
    }

    #[test]
    fn test_keeps_endpoints_and_node_set() {
        let resolver = pentagon();
        let mut tour = Tour::new(vec![2, 4, 1, 3, 0, 2]);
        TwoOptSearch::new().improve(&resolver, &mut tour);
        assert_eq!(tour.origin(), Some(2));
        assert!(tour.is_complete(5));
    }

    #[test]
    fn test_ignores_negligible_gains() {
        let mut network = RoadNetwork::new("flat");
        for name in ["A", "B", "C", "D"] {
            network.add_node(name, None).unwrap();
        }
        network.add_edge("A", "B", 10.0).unwrap();
        network.add_edge("C", "D", 10.0).unwrap();
        network.add_edge("A", "C", 9.9995).unwrap();
        network.add_edge("B", "D", 10.0).unwrap();
        network.add_edge("B", "C", 10.0).unwrap();
        network.add_edge("A", "D", 10.0).unwrap();
        let resolver = DistanceResolver::new(Arc::new(network));

        let mut tour = Tour::new(vec![0, 1, 2, 3, 0]);
        assert!(!TwoOptSearch::new().improve(&resolver, &mut tour));
        assert_eq!(tour.nodes(), &[0, 1, 2, 3, 0]);
    }
}
