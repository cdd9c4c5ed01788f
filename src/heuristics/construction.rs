//! Tour construction heuristics.

use crate::distance::DistanceResolver;
use crate::instance::NodeId;
use crate::solution::Tour;

pub trait ConstructionHeuristic {
    /// Build a closed tour starting and ending at `start`
    fn construct(&self, resolver: &DistanceResolver, start: NodeId) -> Tour;
    fn name(&self) -> &str;
}

/// Nearest Neighbor Heuristic
///
/// Builds a tour by repeatedly stepping to the nearest unvisited node.
/// Ties go to the candidate that comes first in network node order.
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestNeighborHeuristic;

impl NearestNeighborHeuristic {
    pub fn new() -> Self {
        NearestNeighborHeuristic
    }

    fn find_nearest(
        &self,
        resolver: &DistanceResolver,
        current: NodeId,
        visited: &[bool],
    ) -> Option<NodeId> {
        let mut best = None;
        let mut best_dist = f64::INFINITY;

        for candidate in (0..visited.len()).filter(|&n| !visited[n]) {
            let dist = resolver.distance(current, candidate);
            if dist < best_dist {
                best_dist = dist;
                best = Some(candidate);
            }
        }

        best
    }
}

impl ConstructionHeuristic for NearestNeighborHeuristic {
    fn construct(&self, resolver: &DistanceResolver, start: NodeId) -> Tour {
        let n = resolver.network().len();
        let mut visited = vec![false; n];
        let mut tour = Vec::with_capacity(n + 1);

        tour.push(start);
        visited[start] = true;
        let mut remaining = n - 1;
        let mut current = start;

        while remaining > 0 {
            match self.find_nearest(resolver, current, &visited) {
                Some(next) => {
                    tour.push(next);
                    visited[next] = true;
                    remaining -= 1;
                    current = next;
                }
                None => {
                    log::warn!("Nearest neighbor stopped with {} nodes unvisited", remaining);
                    break;
                }
            }
        }

        tour.push(start);
        Tour::new(tour)
    }

    fn name(&self) -> &str {
        "NearestNeighbor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Coordinates, RoadNetwork};
    use std::sync::Arc;

    fn line_network() -> Arc<RoadNetwork> {
        let mut network = RoadNetwork::new("line");
        for (name, lon) in [("W", 0.0), ("X", 1.0), ("Y", 2.0), ("Z", 3.0)] {
            network.add_node(name, Some(Coordinates::new(0.0, lon))).unwrap();
        }
        Arc::new(network)
    }

    #[test]
    fn test_nearest_neighbor_covers_all_nodes() {
        let resolver = DistanceResolver::new(line_network());
        let tour = NearestNeighborHeuristic::new().construct(&resolver, 0);
        assert_eq!(tour.nodes(), &[0, 1, 2, 3, 0]);
        assert!(tour.is_complete(4));
    }

    #[test]
    fn test_nearest_neighbor_from_middle() {
        let resolver = DistanceResolver::new(line_network());
        let tour = NearestNeighborHeuristic::new().construct(&resolver, 2);
        // X and Z are equidistant from Y; X comes first in node order
        assert_eq!(tour.nodes(), &[2, 1, 0, 3, 2]);
    }

    #[test]
    fn test_ties_follow_node_order() {
        let mut network = RoadNetwork::new("star");
        for name in ["Hub", "P", "Q", "R"] {
            network.add_node(name, None).unwrap();
        }
        network.add_edge("Hub", "R", 5.0).unwrap();
        network.add_edge("Hub", "Q", 5.0).unwrap();
        network.add_edge("Hub", "P", 9.0).unwrap();
        network.add_edge("Q", "P", 1.0).unwrap();
        let resolver = DistanceResolver::new(Arc::new(network));

        let tour = NearestNeighborHeuristic::new().construct(&resolver, 0);
        // Q (id 2) beats R (id 3) on the tie at 5 km
        assert_eq!(tour.nodes(), &[0, 2, 1, 3, 0]);
    }

    #[test]
    fn test_single_node_network() {
        let mut network = RoadNetwork::new("solo");
        network.add_node("Only", None).unwrap();
        let resolver = DistanceResolver::new(Arc::new(network));
        let tour = NearestNeighborHeuristic::new().construct(&resolver, 0);
        assert_eq!(tour.nodes(), &[0, 0]);
    }
}
