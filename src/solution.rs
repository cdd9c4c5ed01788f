//! Tour and search result representation.
//!
//! A [`Tour`] is a closed node sequence: the first and last entries are the
//! same node and every other network node appears exactly once in between.

use crate::instance::{NodeId, RoadNetwork};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashSet;

/// Closed tour as a sequence of node ids
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tour {
    nodes: Vec<NodeId>,
}

impl Tour {
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Tour { nodes }
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn into_nodes(self) -> Vec<NodeId> {
        self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First node of the tour
    pub fn origin(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    /// Whether the tour ends where it starts
    pub fn is_closed(&self) -> bool {
        self.nodes.len() >= 2 && self.nodes.first() == self.nodes.last()
    }

    /// Check that each of the `num_nodes` nodes is visited exactly once,
    /// plus the closing return to the origin
    pub fn is_complete(&self, num_nodes: usize) -> bool {
        if self.nodes.len() != num_nodes + 1 || !self.is_closed() {
            return false;
        }

        let interior = &self.nodes[..num_nodes];
        let unique: HashSet<NodeId> = interior.iter().copied().collect();
        unique.len() == num_nodes && interior.iter().all(|&n| n < num_nodes)
    }

    /// Rotate the tour so it starts and ends at `origin`.
    ///
    /// The tour is returned unchanged when it already starts there or when
    /// `origin` is not part of its open section.
    pub fn rotated_to(self, origin: NodeId) -> Tour {
        if self.nodes.is_empty() {
            return self;
        }

        let open = &self.nodes[..self.nodes.len() - 1];
        let k = match open.iter().position(|&n| n == origin) {
            Some(0) | None => return self,
            Some(k) => k,
        };

        let mut rotated = Vec::with_capacity(self.nodes.len());
        rotated.extend_from_slice(&open[k..]);
        rotated.extend_from_slice(&open[..k]);
        rotated.push(origin);
        Tour { nodes: rotated }
    }

    /// Reverse positions `i..=j` in place (the 2-opt move)
    #[inline]
    pub fn reverse_segment(&mut self, i: usize, j: usize) {
        self.nodes[i..=j].reverse();
    }

    /// Node names along the tour
    pub fn names<'a>(&self, network: &'a RoadNetwork) -> Vec<&'a str> {
        network.names(&self.nodes)
    }
}

impl From<Vec<NodeId>> for Tour {
    fn from(nodes: Vec<NodeId>) -> Self {
        Tour::new(nodes)
    }
}

/// Distribution of per-trial tour distances
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialStatistics {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl TrialStatistics {
    /// Summarise finite trial distances; `None` when there are none
    pub fn from_distances(distances: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = distances.iter().copied().filter(|d| d.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let std_dev = if finite.len() > 1 {
            Statistics::std_dev(finite.iter())
        } else {
            0.0
        };

        Some(TrialStatistics {
            mean: Statistics::mean(finite.iter()),
            std_dev,
            min: Statistics::min(finite.iter()),
            max: Statistics::max(finite.iter()),
        })
    }
}

/// Outcome of a multi-start search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Best tour found, `None` when no trial ran
    pub tour: Option<Tour>,
    /// Total distance of `tour`, `f64::INFINITY` when there is none
    pub distance: f64,
    /// Number of trials actually executed
    pub trials: usize,
    /// Number of trials that replaced the best-so-far
    pub improved_trials: usize,
    pub statistics: Option<TrialStatistics>,
}

impl SearchResult {
    /// Result carrying no tour
    pub fn empty() -> Self {
        SearchResult {
            tour: None,
            distance: f64::INFINITY,
            trials: 0,
            improved_trials: 0,
            statistics: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tour.is_none()
    }
}

impl Default for SearchResult {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Display for SearchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Search result")?;
        writeln!(f, "  Distance: {:.1} km", self.distance)?;
        writeln!(f, "  Trials: {} ({} improving)", self.trials, self.improved_trials)?;
        if let Some(stats) = &self.statistics {
            writeln!(
                f,
                "  Trial distances: mean {:.1}, std {:.1}, min {:.1}, max {:.1}",
                stats.mean, stats.std_dev, stats.min, stats.max
            )?;
        }
        match &self.tour {
            Some(tour) => writeln!(f, "  Tour: {:?}", tour.nodes()),
            None => writeln!(f, "  Tour: none"),
        }
    }
}
