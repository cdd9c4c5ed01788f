//! Heuristics module.
//!
//! This module exports the construction heuristic, the 2-opt local search
//! and the multi-start driver that combines them.

pub mod construction;
pub mod local_search;
pub mod multi_start;

pub use construction::*;
pub use local_search::*;
pub use multi_start::*;
