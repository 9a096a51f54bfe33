//! Error types for the discovery engine.
//!
//! None of these escape an ingestion entry point: callers log them and
//! carry on with the remaining nodes.

use thiserror::Error;

use crate::types::{Direction, NodeId};

/// Consistency faults between the primary store and its indexes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("key mismatch: attempted to retire '{key}' ({expected}), index holds {found}")]
    KeyMismatch {
        key: String,
        expected: NodeId,
        found: NodeId,
    },

    #[error("node '{key}' is not in the key index")]
    NotIndexed { key: String },

    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
}

/// Profile names that do not follow the `output:<t>+input:<t>` grammar.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileNameError {
    #[error("failed to parse profile name '{profile}'")]
    Malformed { profile: String },

    #[error("number of {direction}s exceeds the maximum {max} in profile name '{profile}'")]
    TooManyTargets {
        profile: String,
        direction: Direction,
        max: usize,
    },
}

/// Failures reported by the external audio manager.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioManagerError {
    #[error("audio manager rejected '{key}': {reason}")]
    Rejected { key: String, reason: String },

    #[error("audio manager domain is down")]
    Unavailable,
}

/// Replay scenario loading failures.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse scenario: {0}")]
    Json(#[from] serde_json::Error),
}
