//! Multi-start search.
//!
//! Each trial picks a random start node, builds a nearest-neighbor tour,
//! rotates it to the origin, improves it with 2-opt and scores it. The best
//! tour over all trials wins; ties keep the earliest trial.
//!
//! Two execution modes share the same trial pipeline:
//! - sequential: one ChaCha8 stream drives every trial, in order;
//! - parallel: trial `k` draws from its own stream seeded by
//!   [`trial_seed`], so results do not depend on thread scheduling.

use crate::distance::DistanceResolver;
use crate::error::{Error, Result};
use crate::heuristics::construction::{ConstructionHeuristic, NearestNeighborHeuristic};
use crate::heuristics::local_search::{LocalSearch, TwoOptSearch};
use crate::instance::NodeId;
use crate::solution::{SearchResult, Tour, TrialStatistics};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Mixing constant for per-trial seeds (64-bit golden ratio)
const TRIAL_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seed of the random stream used by trial `trial` in parallel mode
#[inline]
pub fn trial_seed(seed: u64, trial: usize) -> u64 {
    seed ^ (trial as u64).wrapping_mul(TRIAL_SEED_MIX)
}

/// How trials are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One trial after another on a single random stream
    #[default]
    Sequential,
    /// Trials spread over a rayon pool; `threads == 0` uses the global pool
    Parallel { threads: usize },
}

/// Multi-start configuration parameters
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Number of trials
    pub restarts: usize,
    /// Random seed
    pub seed: u64,
    pub mode: ExecutionMode,
    /// Overall time budget in seconds; no new trial starts once exceeded
    pub time_limit: Option<f64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            restarts: 100,
            seed: 42,
            mode: ExecutionMode::Sequential,
            time_limit: None,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        if let Some(limit) = self.time_limit {
            if !limit.is_finite() || limit < 0.0 {
                return Err(Error::invalid_config(format!(
                    "time limit must be a non-negative number of seconds, got {}",
                    limit
                )));
            }
        }
        Ok(())
    }

    fn deadline(&self, start: Instant) -> Option<Instant> {
        self.time_limit.map(|secs| start + Duration::from_secs_f64(secs))
    }
}

/// Result of a single construct/rotate/improve/evaluate trial
#[derive(Debug, Clone)]
struct TrialOutcome {
    trial: usize,
    tour: Tour,
    distance: f64,
}

impl TrialOutcome {
    /// Shorter wins; equal distances go to the earlier trial
    fn beats(&self, best: Option<&TrialOutcome>) -> bool {
        match best {
            None => self.distance < f64::INFINITY,
            Some(best) => {
                self.distance < best.distance || (self.distance == best.distance && self.trial < best.trial)
            }
        }
    }
}

/// Best trial so far and the distance of every finished trial.
///
/// Only the winning tour is kept; losing tours are dropped as soon as they
/// are scored.
#[derive(Debug, Default)]
struct Incumbent {
    best: Option<TrialOutcome>,
    distances: Vec<(usize, f64)>,
}

impl Incumbent {
    /// Record a finished trial; returns whether it became the best
    fn record(&mut self, outcome: TrialOutcome) -> bool {
        self.distances.push((outcome.trial, outcome.distance));
        if outcome.beats(self.best.as_ref()) {
            self.best = Some(outcome);
            true
        } else {
            false
        }
    }

    /// Combine two partial searches over disjoint trials
    fn merge(mut self, other: Incumbent) -> Incumbent {
        self.distances.extend(other.distances);
        if let Some(outcome) = other.best {
            if outcome.beats(self.best.as_ref()) {
                self.best = Some(outcome);
            }
        }
        self
    }

    fn into_result(mut self) -> SearchResult {
        self.distances.sort_by_key(|&(trial, _)| trial);
        let distances: Vec<f64> = self.distances.iter().map(|&(_, d)| d).collect();

        let mut record = f64::INFINITY;
        let mut improved_trials = 0;
        for &d in &distances {
            if d < record {
                record = d;
                improved_trials += 1;
            }
        }

        SearchResult {
            distance: self.best.as_ref().map_or(f64::INFINITY, |b| b.distance),
            tour: self.best.map(|b| b.tour),
            trials: distances.len(),
            improved_trials,
            statistics: TrialStatistics::from_distances(&distances),
        }
    }
}

/// Multi-start driver combining a construction heuristic and a local search
pub struct MultiStartSearch {
    config: SearchConfig,
    construction: Box<dyn ConstructionHeuristic + Send + Sync>,
    local_search: Box<dyn LocalSearch + Send + Sync>,
}

impl MultiStartSearch {
    /// Nearest neighbor construction followed by 2-opt
    pub fn new(config: SearchConfig) -> Self {
        Self::with_heuristics(config, NearestNeighborHeuristic::new(), TwoOptSearch::new())
    }

    pub fn with_heuristics<C, L>(config: SearchConfig, construction: C, local_search: L) -> Self
    where
        C: ConstructionHeuristic + Send + Sync + 'static,
        L: LocalSearch + Send + Sync + 'static,
    {
        MultiStartSearch {
            config,
            construction: Box::new(construction),
            local_search: Box::new(local_search),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SearchConfig {
        &mut self.config
    }

    pub fn construction(&self) -> &(dyn ConstructionHeuristic + Send + Sync) {
        self.construction.as_ref()
    }

    pub fn local_search(&self) -> &(dyn LocalSearch + Send + Sync) {
        self.local_search.as_ref()
    }

    /// Build, rotate, improve and score one tour from `start`
    pub fn run_trial(&self, resolver: &DistanceResolver, start: NodeId, origin: NodeId) -> (Tour, f64) {
        let tour = self.construction.construct(resolver, start);
        let mut tour = tour.rotated_to(origin);
        self.local_search.improve(resolver, &mut tour);
        let distance = resolver.tour_distance(tour.nodes());
        (tour, distance)
    }

    /// Run `restarts` trials.
    ///
    /// `rng` drives sequential mode; `first_trial` offsets the trial indices
    /// used for parallel seeding so that repeated calls explore new streams.
    /// `on_trial` is invoked once per finished trial.
    pub fn run(
        &self,
        resolver: &DistanceResolver,
        restarts: usize,
        rng: &mut ChaCha8Rng,
        first_trial: usize,
        on_trial: &(dyn Fn(usize) + Sync),
    ) -> SearchResult {
        if restarts == 0 || resolver.network().is_empty() {
            return SearchResult::empty();
        }

        let start = Instant::now();
        let incumbent = match self.config.mode {
            ExecutionMode::Sequential => self.run_sequential(resolver, restarts, rng, start, on_trial),
            ExecutionMode::Parallel { threads } => {
                self.run_parallel(resolver, restarts, first_trial, threads, start, on_trial)
            }
        };

        let result = incumbent.into_result();
        log::info!(
            "{} trials in {:.3}s, best {:.1} km, {} cached estimates",
            result.trials,
            start.elapsed().as_secs_f64(),
            result.distance,
            resolver.cache_len()
        );
        result
    }

    fn run_sequential(
        &self,
        resolver: &DistanceResolver,
        restarts: usize,
        rng: &mut ChaCha8Rng,
        start: Instant,
        on_trial: &(dyn Fn(usize) + Sync),
    ) -> Incumbent {
        let n = resolver.network().len();
        let origin = resolver.network().origin();
        let deadline = self.config.deadline(start);
        let mut incumbent = Incumbent::default();

        for trial in 0..restarts {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::info!("Time limit reached after {} trials", trial);
                break;
            }

            let start_node = rng.gen_range(0..n);
            let (tour, distance) = self.run_trial(resolver, start_node, origin);
            if incumbent.record(TrialOutcome { trial, tour, distance }) {
                log::debug!("Trial {}: new best {:.1} km", trial, distance);
            }
            on_trial(trial);
        }

        incumbent
    }

    fn run_parallel(
        &self,
        resolver: &DistanceResolver,
        restarts: usize,
        first_trial: usize,
        threads: usize,
        start: Instant,
        on_trial: &(dyn Fn(usize) + Sync),
    ) -> Incumbent {
        let n = resolver.network().len();
        let origin = resolver.network().origin();
        let deadline = self.config.deadline(start);
        let seed = self.config.seed;

        let run_all = || -> Incumbent {
            (0..restarts)
                .into_par_iter()
                .filter_map(|trial| {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return None;
                    }
                    let mut rng = ChaCha8Rng::seed_from_u64(trial_seed(seed, first_trial + trial));
                    let start_node = rng.gen_range(0..n);
                    let (tour, distance) = self.run_trial(resolver, start_node, origin);
                    on_trial(trial);
                    Some(TrialOutcome { trial, tour, distance })
                })
                .fold(Incumbent::default, |mut incumbent, outcome| {
                    let (trial, distance) = (outcome.trial, outcome.distance);
                    if incumbent.record(outcome) {
                        log::debug!("Trial {}: new best {:.1} km on this worker", trial, distance);
                    }
                    incumbent
                })
                .reduce(Incumbent::default, Incumbent::merge)
        };

        if threads == 0 {
            return run_all();
        }

        match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                log::warn!("Could not build a {}-thread pool ({}), using the global pool", threads, e);
                run_all()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{Coordinates, RoadNetwork};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn grid() -> Arc<RoadNetwork> {
        let mut network = RoadNetwork::new("grid");
        for row in 0..3 {
            for col in 0..4 {
                let coords = Coordinates::new(row as f64 * 0.3, col as f64 * 0.4 + (row % 2) as f64 * 0.1);
                network.add_node(format!("G{}{}", row, col), Some(coords)).unwrap();
            }
        }
        network.set_origin("G11").unwrap();
        Arc::new(network)
    }

    fn run(config: SearchConfig, restarts: usize) -> SearchResult {
        let resolver = DistanceResolver::new(grid());
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        MultiStartSearch::new(config).run(&resolver, restarts, &mut rng, 0, &|_| {})
    }

    #[test]
    fn test_zero_restarts() {
        let result = run(SearchConfig::default(), 0);
        assert!(result.is_empty());
        assert_eq!(result.distance, f64::INFINITY);
    }

    #[test]
    fn test_result_is_complete_and_rooted() {
        let network = grid();
        let result = run(SearchConfig::default(), 10);
        let tour = result.tour.expect("tour");
        assert!(tour.is_complete(network.len()));
        assert_eq!(tour.origin(), Some(network.origin()));
        assert_eq!(result.trials, 10);
        assert!(result.improved_trials >= 1);
    }

    #[test]
    fn test_sequential_is_deterministic() {
        let a = run(SearchConfig { seed: 7, ..Default::default() }, 15);
        let b = run(SearchConfig { seed: 7, ..Default::default() }, 15);
        assert_eq!(a.tour, b.tour);
        assert_eq!(a.distance.to_bits(), b.distance.to_bits());
    }

    #[test]
    fn test_parallel_is_deterministic() {
        let config = |threads| SearchConfig {
            seed: 11,
            mode: ExecutionMode::Parallel { threads },
            ..Default::default()
        };
        let a = run(config(2), 20);
        let b = run(config(4), 20);
        let c = run(config(0), 20);
        assert_eq!(a.tour, b.tour);
        assert_eq!(a.tour, c.tour);
        assert_eq!(a.distance.to_bits(), b.distance.to_bits());
        assert_eq!(a.trials, 20);
    }

    #[test]
    fn test_on_trial_called_per_trial() {
        let resolver = DistanceResolver::new(grid());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let count = AtomicUsize::new(0);
        let search = MultiStartSearch::new(SearchConfig {
            mode: ExecutionMode::Parallel { threads: 2 },
            ..Default::default()
        });
        search.run(&resolver, 8, &mut rng, 0, &|_| {
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.load(Ordering::Relaxed), 8);
    }

    #[test]
    fn test_zero_time_limit_runs_nothing() {
        let result = run(SearchConfig { time_limit: Some(0.0), ..Default::default() }, 5);
        assert!(result.is_empty());
        assert_eq!(result.trials, 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(SearchConfig::default().validate().is_ok());
        let bad = SearchConfig { time_limit: Some(-1.0), ..Default::default() };
        assert!(matches!(bad.validate(), Err(Error::InvalidConfig(_))));
        let nan = SearchConfig { time_limit: Some(f64::NAN), ..Default::default() };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_sequential_keeps_only_the_best_tour() {
        let resolver = DistanceResolver::new(grid());
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let search = MultiStartSearch::new(SearchConfig::default());
        let incumbent = search.run_sequential(&resolver, 50, &mut rng, Instant::now(), &|_| {});

        assert_eq!(incumbent.distances.len(), 50);
        let best = incumbent.best.as_ref().unwrap();
        let shortest = incumbent.distances.iter().map(|&(_, d)| d).fold(f64::INFINITY, f64::min);
        let first_shortest = incumbent.distances.iter().position(|&(_, d)| d == shortest).unwrap();
        assert_eq!(best.distance, shortest);
        assert_eq!(best.trial, first_shortest);
    }

    #[test]
    fn test_incumbent_ties_go_to_earlier_trial() {
        let outcome = |trial, distance| TrialOutcome { trial, tour: Tour::new(vec![0, trial, 0]), distance };

        let mut late = Incumbent::default();
        assert!(late.record(outcome(3, 10.0)));
        assert!(!late.record(outcome(4, 12.0)));
        let mut early = Incumbent::default();
        assert!(early.record(outcome(1, 10.0)));
        assert!(early.record(outcome(0, 10.0)));
        assert!(!early.record(outcome(2, 10.0)));

        let a = Incumbent::default().merge(late).merge(early);
        assert_eq!(a.best.as_ref().map(|b| b.trial), Some(0));

        let result = a.into_result();
        assert_eq!(result.trials, 5);
        assert_eq!(result.distance, 10.0);
        assert_eq!(result.tour.unwrap().nodes(), &[0, 0, 0]);
        // Trial order 10, 10, 10, 10, 12: only trial 0 improves on infinity
        assert_eq!(result.improved_trials, 1);
    }

    #[test]
    fn test_merge_order_does_not_matter() {
        let outcome = |trial, distance| TrialOutcome { trial, tour: Tour::new(vec![0, 1, 0]), distance };
        let part = |items: &[(usize, f64)]| {
            let mut incumbent = Incumbent::default();
            for &(trial, distance) in items {
                incumbent.record(outcome(trial, distance));
            }
            incumbent
        };
        let left = [(0, 9.0), (1, 7.0)];
        let right = [(2, 7.0), (3, 8.0)];

        let ab = part(&left[..]).merge(part(&right[..])).into_result();
        let ba = part(&right[..]).merge(part(&left[..])).into_result();
        assert_eq!(ab.distance, ba.distance);
        assert_eq!(ab.improved_trials, ba.improved_trials);
        assert_eq!(ab.improved_trials, 2);
        assert_eq!(ab.statistics, ba.statistics);
    }

    #[test]
    fn test_trial_seed_distinct() {
        assert_eq!(trial_seed(5, 0), 5);
        assert_ne!(trial_seed(5, 1), trial_seed(5, 2));
    }
}
