//! Voxel robots for vsrsim
//!
//! This crate implements:
//! - Numerical controllers (MLP, sinusoidal, constant, stepped) behind one trait
//! - Sensors mapping a body to the sense action that reads it
//! - Grid robots driven by a single centralised controller
//! - Self-assembling robots made of independent units that attach, detach and talk

pub mod controller;
pub mod error;
pub mod grid;
pub mod grid_vsr;
pub mod io;
pub mod self_assembly;
pub mod sensor;

// Re-export main types for convenience
pub use controller::{
    Activation, Constant, ControllerSpec, DimensionMismatch, MultiLayerPerceptron, NumericalController,
    Parametrized, Sinusoidal, SinusoidalParam, Stepped,
};
pub use error::AgentError;
pub use grid::Grid;
pub use grid_vsr::{GridBody, GridCell, GridShape, NumGridVsr};
pub use io::SelfAssemblyIo;
pub use self_assembly::{NumSelfAssemblyVsr, SelfAssemblyConfig};
pub use sensor::{Sensor, SensorKind};
