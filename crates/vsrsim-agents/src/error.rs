use thiserror::Error;
use vsrsim_core::InvalidMaterial;

use crate::controller::DimensionMismatch;

/// Agent construction failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AgentError {
    #[error("brain does not fit its unit: {0}")]
    Dimension(#[from] DimensionMismatch),
    #[error("expected {expected} brains, got {actual}")]
    BrainCount { expected: usize, actual: usize },
    #[error("expected {expected} per-unit sensor lists, got {actual}")]
    SensorListCount { expected: usize, actual: usize },
    #[error("agent body has no voxels")]
    EmptyBody,
    #[error(transparent)]
    Material(#[from] InvalidMaterial),
}
