//! Road Tour Solver Library
//!
//! Near-optimal closed tours over a fixed road network: every node visited
//! once, starting and ending at a designated origin.
//!
//! # Features
//!
//! - Distance resolution from stored road distances, with a memoised
//!   great-circle estimate (x1.3 road circuity) for missing pairs
//! - Nearest neighbor construction
//! - 2-opt local search
//! - Multi-start driver, sequential or parallel (rayon), reproducible per seed
//! - Bundled 64-district Bangladesh highway network
//!
//! # Example
//!
//! ```no_run
//! use road_tour_solver::instance::RoadNetwork;
//! use road_tour_solver::engine::TourEngine;
//!
//! let network = RoadNetwork::bangladesh().unwrap();
//! let mut engine = TourEngine::new(network, 42);
//!
//! let result = engine.search(100);
//! println!("Best tour: {:.1} km", result.distance);
//! ```

pub mod distance;
pub mod engine;
pub mod error;
pub mod heuristics;
pub mod instance;
pub mod report;
pub mod solution;

pub use engine::TourEngine;
pub use error::{Error, Result};
pub use instance::RoadNetwork;
pub use solution::{SearchResult, Tour};
