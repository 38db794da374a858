//! Topology-discovery error type.

use thiserror::Error;

use tsc_core::IntersectionId;

/// Reasons discovery could not produce a map from engine data.
///
/// None of these is fatal: [`PhaseTopologyMap::discover`][crate::PhaseTopologyMap::discover]
/// turns every one of them into the default layout.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("intersection {0} reports no signal program")]
    MissingProgram(IntersectionId),

    #[error("signal program of {0} has no phases")]
    EmptyProgram(IntersectionId),

    #[error("engine query failed while reading topology: {0}")]
    Session(String),
}

pub type TopologyResult<T> = Result<T, TopologyError>;
