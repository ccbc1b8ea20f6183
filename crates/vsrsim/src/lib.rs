//! Voxel soft robot simulations
//!
//! This crate ties the workspace together:
//! - Tasks (locomotion, balancing) that set up a scenario and drive an engine
//! - Outcomes: time-indexed observations with task-specific aggregates
//! - Layered configuration for engine, tasks and agents

pub mod config;
pub mod observation;
pub mod outcome;
pub mod tasks;

// Re-export main types for convenience
pub use crate::config::SimulationConfig;
pub use observation::{AgentObservation, AgentsObservation, BalancingObservation};
pub use outcome::{Outcome, OutcomeError};
pub use tasks::{Balancing, BalancingConfig, Locomotion, LocomotionConfig, Task, TaskError, TerrainSpec};
