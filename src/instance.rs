//! Module for loading and representing road networks.
//!
//! A network is a fixed, ordered list of named nodes, optional geographic
//! coordinates per node and a sparse set of symmetric road distances (km).
//! Node order matters: it is the enumeration order used by construction
//! heuristics to break ties.

use crate::error::{Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Index of a node in [`RoadNetwork::nodes`]
pub type NodeId = usize;

/// Bundled 64-district Bangladesh highway network
const BANGLADESH_JSON: &str = include_str!("../data/bangladesh.json");

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinates { lat, lon }
    }

    /// Check that both components are finite and inside the usual ranges
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && self.lat.abs() <= 90.0
            && self.lon.abs() <= 180.0
    }
}

/// Immutable road network handed to the solver
#[derive(Debug, Clone)]
pub struct RoadNetwork {
    /// Name of the network
    pub name: String,
    nodes: Vec<String>,
    coordinates: Vec<Option<Coordinates>>,
    index: HashMap<String, NodeId>,
    /// Edge weights keyed by the ordered pair (min id, max id)
    edges: HashMap<(NodeId, NodeId), f64>,
    origin: Option<NodeId>,
}

#[derive(Debug, Deserialize)]
struct NetworkFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    origin: Option<String>,
    nodes: Vec<NodeRecord>,
    #[serde(default)]
    edges: Vec<EdgeRecord>,
}

#[derive(Debug, Deserialize)]
struct NodeRecord {
    name: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EdgeRecord {
    from: String,
    to: String,
    km: f64,
}

#[inline]
fn edge_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl RoadNetwork {
    /// Create an empty network
    pub fn new(name: impl Into<String>) -> Self {
        RoadNetwork {
            name: name.into(),
            nodes: Vec::new(),
            coordinates: Vec::new(),
            index: HashMap::new(),
            edges: HashMap::new(),
            origin: None,
        }
    }

    /// The bundled Bangladesh district network (origin: Dhaka)
    pub fn bangladesh() -> Result<Self> {
        Self::from_json_str(BANGLADESH_JSON)
    }

    /// Load a network from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(&path)?;
        let network = Self::from_json_str(&text)?;
        log::info!(
            "Loaded network '{}' from {:?}: {} nodes, {} edges",
            network.name,
            path.as_ref(),
            network.len(),
            network.edge_count()
        );
        Ok(network)
    }

    /// Parse a network from its JSON representation
    pub fn from_json_str(text: &str) -> Result<Self> {
        let file: NetworkFile = serde_json::from_str(text)?;
        if file.nodes.is_empty() {
            return Err(Error::EmptyNetwork);
        }

        let mut network = RoadNetwork::new(file.name.unwrap_or_else(|| "network".to_string()));

        for record in file.nodes {
            let coords = match (record.lat, record.lon) {
                (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
                (None, None) => None,
                (lat, lon) => {
                    return Err(Error::InvalidCoordinates {
                        node: record.name,
                        lat: lat.unwrap_or(f64::NAN),
                        lon: lon.unwrap_or(f64::NAN),
                    });
                }
            };
            network.add_node(record.name, coords)?;
        }

        for edge in file.edges {
            network.add_edge(&edge.from, &edge.to, edge.km)?;
        }

        if let Some(origin) = file.origin {
            network.set_origin(&origin)?;
        }

        Ok(network)
    }

    /// Append a node; its id is its position in insertion order
    pub fn add_node(&mut self, name: impl Into<String>, coords: Option<Coordinates>) -> Result<NodeId> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateNode(name));
        }
        if let Some(c) = coords {
            if !c.is_valid() {
                return Err(Error::InvalidCoordinates { node: name, lat: c.lat, lon: c.lon });
            }
        }

        let id = self.nodes.len();
        self.index.insert(name.clone(), id);
        self.nodes.push(name);
        self.coordinates.push(coords);
        Ok(id)
    }

    /// Store a symmetric road distance. Re-adding a pair replaces its weight.
    pub fn add_edge(&mut self, from: &str, to: &str, km: f64) -> Result<()> {
        let a = self.node_id(from).ok_or_else(|| Error::UnknownNode(from.to_string()))?;
        let b = self.node_id(to).ok_or_else(|| Error::UnknownNode(to.to_string()))?;
        if a == b {
            return Err(Error::invalid_edge(from, to, "self loop"));
        }
        if !km.is_finite() || km <= 0.0 {
            return Err(Error::invalid_edge(from, to, format!("weight must be positive, got {}", km)));
        }

        if let Some(previous) = self.edges.insert(edge_key(a, b), km) {
            if previous != km {
                log::warn!("Edge {} - {} redefined: {} km replaces {} km", from, to, km, previous);
            }
        }
        Ok(())
    }

    /// Set the node every tour starts and ends at
    pub fn set_origin(&mut self, name: &str) -> Result<()> {
        let id = self.node_id(name).ok_or_else(|| Error::UnknownNode(name.to_string()))?;
        self.origin = Some(id);
        Ok(())
    }

    /// Origin node; the first node when none was set explicitly
    pub fn origin(&self) -> NodeId {
        self.origin.unwrap_or(0)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node names in enumeration order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id]
    }

    /// Map a sequence of ids to their names
    pub fn names(&self, ids: &[NodeId]) -> Vec<&str> {
        ids.iter().map(|&id| self.name(id)).collect()
    }

    #[inline]
    pub fn coordinates(&self, id: NodeId) -> Option<Coordinates> {
        self.coordinates[id]
    }

    /// Stored road distance between two nodes, in either direction
    #[inline]
    pub fn edge(&self, a: NodeId, b: NodeId) -> Option<f64> {
        self.edges.get(&edge_key(a, b)).copied()
    }

    /// Number of stored (undirected) edges
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Get statistics about the network
    pub fn statistics(&self) -> NetworkStatistics {
        let n = self.len();
        let mut degree = vec![0usize; n];
        for &(a, b) in self.edges.keys() {
            degree[a] += 1;
            degree[b] += 1;
        }

        let weights: Vec<f64> = self.edges.values().copied().collect();
        let (avg_edge_km, min_edge_km, max_edge_km) = if weights.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            (
                weights.iter().sum::<f64>() / weights.len() as f64,
                weights.iter().copied().min_by_key(|&w| OrderedFloat(w)).unwrap_or(0.0),
                weights.iter().copied().max_by_key(|&w| OrderedFloat(w)).unwrap_or(0.0),
            )
        };

        let possible = n * n.saturating_sub(1) / 2;
        let density = if possible == 0 { 0.0 } else { self.edge_count() as f64 / possible as f64 };

        NetworkStatistics {
            name: self.name.clone(),
            origin: self.nodes.get(self.origin()).cloned().unwrap_or_default(),
            num_nodes: n,
            num_edges: self.edge_count(),
            density,
            missing_coordinates: self.coordinates.iter().filter(|c| c.is_none()).count(),
            isolated_nodes: degree.iter().filter(|&&d| d == 0).count(),
            avg_edge_km,
            min_edge_km,
            max_edge_km,
        }
    }
}

/// Statistics about a road network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatistics {
    pub name: String,
    pub origin: String,
    pub num_nodes: usize,
    pub num_edges: usize,
    /// Share of node pairs with a stored road distance
    pub density: f64,
    pub missing_coordinates: usize,
    pub isolated_nodes: usize,
    pub avg_edge_km: f64,
    pub min_edge_km: f64,
    pub max_edge_km: f64,
}

impl std::fmt::Display for NetworkStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Network: {}", self.name)?;
        writeln!(f, "  Origin: {}", self.origin)?;
        writeln!(f, "  Nodes: {}", self.num_nodes)?;
        writeln!(f, "  Road edges: {} (density {:.1}%)", self.num_edges, self.density * 100.0)?;
        writeln!(f, "  Nodes without coordinates: {}", self.missing_coordinates)?;
        writeln!(f, "  Isolated nodes: {}", self.isolated_nodes)?;
        writeln!(f, "  Avg edge: {:.1} km", self.avg_edge_km)?;
        writeln!(f, "  Min edge: {:.1} km", self.min_edge_km)?;
        writeln!(f, "  Max edge: {:.1} km", self.max_edge_km)
    }
}
