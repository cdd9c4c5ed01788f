//! Pairwise distance resolution over a sparse road network.
//!
//! Resolution order for a pair of distinct nodes:
//! 1. stored road distance,
//! 2. previously memoised estimate,
//! 3. great-circle distance scaled by a road circuity factor, or
//!    [`FALLBACK_DISTANCE_KM`] when either node has no coordinates.
//!
//! Estimates are written to the cache before being returned, so a pair is
//! estimated at most once per cache (modulo racing workers, which compute
//! the same pure value).

use crate::instance::{Coordinates, NodeId, RoadNetwork};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Ratio of road length to straight-line length
pub const ROAD_CIRCUITY: f64 = 1.3;
/// Placeholder distance for pairs that cannot be estimated
pub const FALLBACK_DISTANCE_KM: f64 = 300.0;

/// Cache key: unordered node pair stored as (min, max)
pub type PairKey = (NodeId, NodeId);

#[inline]
pub fn pair_key(a: NodeId, b: NodeId) -> PairKey {
    if a <= b { (a, b) } else { (b, a) }
}

/// Great-circle distance in km between two coordinates (haversine)
pub fn haversine_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let s_lat = (d_lat / 2.0).sin();
    let s_lon = (d_lon / 2.0).sin();
    let h = s_lat * s_lat + s_lon * s_lon * lat1.cos() * lat2.cos();
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Memo table for estimated distances.
///
/// Implementations must be safe to share between search workers. Racing
/// inserts for the same key carry the same value, so last write wins.
pub trait DistanceCache: Send + Sync {
    fn get(&self, key: PairKey) -> Option<f64>;
    fn insert(&self, key: PairKey, km: f64);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the cached value or compute, store and return it
    fn get_or_insert_with(&self, key: PairKey, compute: &dyn Fn() -> f64) -> f64 {
        if let Some(km) = self.get(key) {
            return km;
        }
        let km = compute();
        self.insert(key, km);
        km
    }
}

/// Read-mostly cache: lookups take a shared lock
#[derive(Debug, Default)]
pub struct RwLockCache {
    entries: RwLock<HashMap<PairKey, f64>>,
}

impl RwLockCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DistanceCache for RwLockCache {
    fn get(&self, key: PairKey) -> Option<f64> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(&key).copied()
    }

    fn insert(&self, key: PairKey, km: f64) {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key, km);
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}

/// Single-mutex cache; the whole lookup-compute-insert runs under one lock
#[derive(Debug, Default)]
pub struct MutexCache {
    entries: Mutex<HashMap<PairKey, f64>>,
}

impl MutexCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DistanceCache for MutexCache {
    fn get(&self, key: PairKey) -> Option<f64> {
        let entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(&key).copied()
    }

    fn insert(&self, key: PairKey, km: f64) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key, km);
    }

    fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    fn get_or_insert_with(&self, key: PairKey, compute: &dyn Fn() -> f64) -> f64 {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *entries.entry(key).or_insert_with(compute)
    }
}

/// Where a resolved distance comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceSource {
    /// A node to itself, always 0 km
    Same,
    /// Stored road distance
    Road,
    /// Scaled great-circle estimate
    Estimate,
    /// Placeholder for pairs lacking coordinates
    Fallback,
}

/// Resolves distances between network nodes, memoising estimates
pub struct DistanceResolver {
    network: Arc<RoadNetwork>,
    cache: Box<dyn DistanceCache>,
}

impl DistanceResolver {
    pub fn new(network: Arc<RoadNetwork>) -> Self {
        Self::with_cache(network, Box::new(RwLockCache::new()))
    }

    pub fn with_cache(network: Arc<RoadNetwork>, cache: Box<dyn DistanceCache>) -> Self {
        DistanceResolver { network, cache }
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// Number of memoised estimates
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Distance in km between two nodes. Both must belong to the network.
    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        if a == b {
            return 0.0;
        }
        if let Some(km) = self.network.edge(a, b) {
            return km;
        }
        self.cache.get_or_insert_with(pair_key(a, b), &|| self.estimate(a, b))
    }

    /// Which rule of the resolution chain answers for this pair
    pub fn distance_source(&self, a: NodeId, b: NodeId) -> DistanceSource {
        if a == b {
            return DistanceSource::Same;
        }
        if self.network.edge(a, b).is_some() {
            return DistanceSource::Road;
        }
        match (self.network.coordinates(a), self.network.coordinates(b)) {
            (Some(_), Some(_)) => DistanceSource::Estimate,
            _ => DistanceSource::Fallback,
        }
    }

    fn estimate(&self, a: NodeId, b: NodeId) -> f64 {
        match (self.network.coordinates(a), self.network.coordinates(b)) {
            (Some(from), Some(to)) => haversine_km(from, to) * ROAD_CIRCUITY,
            _ => FALLBACK_DISTANCE_KM,
        }
    }

    /// Sum of leg distances along a node sequence.
    ///
    /// Sequences shorter than two nodes are not tours and score
    /// `f64::INFINITY`, so they never win a minimisation.
    pub fn tour_distance(&self, tour: &[NodeId]) -> f64 {
        if tour.len() < 2 {
            return f64::INFINITY;
        }
        tour.windows(2).map(|leg| self.distance(leg[0], leg[1])).sum()
    }
}

impl std::fmt::Debug for DistanceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistanceResolver")
            .field("network", &self.network.name)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Longitude offset (degrees, on the equator) that is `km` away from 0
    fn lon_for_km(km: f64) -> f64 {
        (km / EARTH_RADIUS_KM).to_degrees()
    }

    fn network() -> Arc<RoadNetwork> {
        let mut network = RoadNetwork::new("test");
        network.add_node("A", Some(Coordinates::new(0.0, 0.0))).unwrap();
        network.add_node("B", None).unwrap();
        network.add_node("C", None).unwrap();
        network.add_node("D", Some(Coordinates::new(0.0, lon_for_km(100.0)))).unwrap();
        network.add_edge("A", "B", 10.0).unwrap();
        network.add_edge("B", "C", 10.0).unwrap();
        network.add_edge("A", "C", 30.0).unwrap();
        Arc::new(network)
    }

    #[test]
    fn test_stored_edge_wins() {
        let resolver = DistanceResolver::new(network());
        assert_eq!(resolver.distance(0, 2), 30.0);
        assert_eq!(resolver.distance(2, 0), 30.0);
        assert_eq!(resolver.distance_source(0, 2), DistanceSource::Road);
        assert!(resolver.cache.is_empty());
    }

    #[test]
    fn test_geodesic_estimate_is_cached() {
        let resolver = DistanceResolver::new(network());
        let first = resolver.distance(0, 3);
        assert!((first - 130.0).abs() < 1e-6, "got {}", first);
        assert_eq!(resolver.cache_len(), 1);

        let again = resolver.distance(3, 0);
        assert_eq!(first.to_bits(), again.to_bits());
        assert_eq!(resolver.cache_len(), 1);
        assert_eq!(resolver.distance_source(0, 3), DistanceSource::Estimate);
    }

    #[test]
    fn test_fallback_without_coordinates() {
        let resolver = DistanceResolver::new(network());
        assert_eq!(resolver.distance(1, 3), FALLBACK_DISTANCE_KM);
        assert_eq!(resolver.distance(3, 1), FALLBACK_DISTANCE_KM);
        assert_eq!(resolver.cache_len(), 1);
        assert_eq!(resolver.distance_source(1, 3), DistanceSource::Fallback);
    }

    #[test]
    fn test_mutex_cache_matches_rwlock_cache() {
        let rw = DistanceResolver::new(network());
        let mx = DistanceResolver::with_cache(network(), Box::new(MutexCache::new()));
        for a in 0..4 {
            for b in 0..4 {
                assert_eq!(rw.distance(a, b).to_bits(), mx.distance(a, b).to_bits());
            }
        }
        assert_eq!(rw.cache_len(), mx.cache_len());
    }

    #[test]
    fn test_node_to_itself() {
        let resolver = DistanceResolver::new(network());
        for id in 0..4 {
            assert_eq!(resolver.distance(id, id), 0.0);
            assert_eq!(resolver.distance_source(id, id), DistanceSource::Same);
        }
        assert!(resolver.cache.is_empty());
    }

    #[test]
    fn test_tour_distance() {
        let resolver = DistanceResolver::new(network());
        assert_eq!(resolver.tour_distance(&[0, 1, 2, 0]), 50.0);
        assert_eq!(resolver.tour_distance(&[0]), f64::INFINITY);
        assert_eq!(resolver.tour_distance(&[]), f64::INFINITY);
    }

    #[test]
    fn test_haversine_known_pair() {
        // Dhaka -> Chittagong, roughly 214 km as the crow flies
        let dhaka = Coordinates::new(23.8103, 90.4125);
        let chittagong = Coordinates::new(22.3569, 91.7832);
        let km = haversine_km(dhaka, chittagong);
        assert!((km - 214.0).abs() < 1.0, "got {}", km);
        assert_eq!(haversine_km(dhaka, dhaka), 0.0);
    }
}
