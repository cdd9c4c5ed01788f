//! Error type shared by the network loader, search configuration and reporting.
//!
//! The optimisation engine itself never fails: unknown pairs resolve through
//! the estimate chain and degenerate tours map to sentinel values.

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("unknown node: {0}")]
    UnknownNode(String),
    #[error("duplicate node: {0}")]
    DuplicateNode(String),
    #[error("invalid edge {from} -> {to}: {reason}")]
    InvalidEdge {
        from: String,
        to: String,
        reason: String,
    },
    #[error("invalid coordinates for {node}: lat={lat}, lon={lon}")]
    InvalidCoordinates { node: String, lat: f64, lon: f64 },
    #[error("network has no nodes")]
    EmptyNetwork,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_edge(from: &str, to: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEdge {
            from: from.to_string(),
            to: to.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
