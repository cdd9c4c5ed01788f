//! Engine facade used by the CLI and by library callers.
//!
//! A [`TourEngine`] owns the network, the distance resolver (and therefore
//! its cache) and the random stream, so every piece of mutable search state
//! lives exactly as long as the engine.

use crate::distance::{DistanceCache, DistanceResolver, RwLockCache};
use crate::error::Result;
use crate::heuristics::{ConstructionHeuristic, LocalSearch, MultiStartSearch, SearchConfig};
use crate::instance::{NodeId, RoadNetwork};
use crate::solution::{SearchResult, Tour};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

pub struct TourEngine {
    resolver: DistanceResolver,
    search: MultiStartSearch,
    rng: ChaCha8Rng,
    trials_run: usize,
}

impl TourEngine {
    /// Sequential engine with default settings and the given seed
    pub fn new(network: RoadNetwork, seed: u64) -> Self {
        let config = SearchConfig { seed, ..Default::default() };
        Self::build(network, config, Box::new(RwLockCache::new()))
    }

    pub fn with_config(network: RoadNetwork, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(network, config, Box::new(RwLockCache::new())))
    }

    /// Like [`TourEngine::with_config`] with a caller-supplied cache
    pub fn with_cache(network: RoadNetwork, config: SearchConfig, cache: Box<dyn DistanceCache>) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(network, config, cache))
    }

    fn build(network: RoadNetwork, config: SearchConfig, cache: Box<dyn DistanceCache>) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        TourEngine {
            resolver: DistanceResolver::with_cache(Arc::new(network), cache),
            search: MultiStartSearch::new(config),
            rng,
            trials_run: 0,
        }
    }

    pub fn network(&self) -> &RoadNetwork {
        self.resolver.network()
    }

    pub fn resolver(&self) -> &DistanceResolver {
        &self.resolver
    }

    pub fn config(&self) -> &SearchConfig {
        self.search.config()
    }

    /// Number of memoised distance estimates
    pub fn cache_len(&self) -> usize {
        self.resolver.cache_len()
    }

    /// Run `restarts` trials and return the best tour found
    pub fn search(&mut self, restarts: usize) -> SearchResult {
        self.search_with_progress(restarts, &|_| {})
    }

    /// Like [`TourEngine::search`], calling `on_trial` after every trial
    pub fn search_with_progress(&mut self, restarts: usize, on_trial: &(dyn Fn(usize) + Sync)) -> SearchResult {
        let result = self.search.run(&self.resolver, restarts, &mut self.rng, self.trials_run, on_trial);
        self.trials_run += restarts;
        result
    }

    /// Run the configured number of restarts
    pub fn search_default(&mut self) -> SearchResult {
        let restarts = self.search.config().restarts;
        self.search(restarts)
    }

    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        self.resolver.distance(a, b)
    }

    /// Distance between two nodes looked up by name
    pub fn distance_by_name(&self, a: &str, b: &str) -> Option<f64> {
        let network = self.network();
        Some(self.distance(network.node_id(a)?, network.node_id(b)?))
    }

    /// Total length of a node sequence; `f64::INFINITY` below two nodes
    pub fn total_distance(&self, tour: &[NodeId]) -> f64 {
        self.resolver.tour_distance(tour)
    }

    /// Single construction from `start`, without rotation or improvement
    pub fn construct(&self, start: NodeId) -> Tour {
        self.search.construction().construct(&self.resolver, start)
    }

    /// Apply the local search to a copy of `tour`
    pub fn improve(&self, tour: &Tour) -> Tour {
        let mut improved = tour.clone();
        self.search.local_search().improve(&self.resolver, &mut improved);
        improved
    }
}

impl std::fmt::Debug for TourEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TourEngine")
            .field("resolver", &self.resolver)
            .field("config", self.search.config())
            .field("trials_run", &self.trials_run)
            .finish()
    }
}
