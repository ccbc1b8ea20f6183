//! Agents: controllers that turn last tick's outcomes into this tick's actions

use serde::{Deserialize, Serialize};
use vsrsim_geometry::DoubleRange;

use crate::action::{Action, ActionError, ActionOutcome};
use crate::engine::{ActionPerformer, WorldAccess};
use crate::ids::BodyId;

/// Values with the interval they live in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedValues {
    pub values: Vec<f64>,
    pub range: DoubleRange,
}

impl RangedValues {
    pub fn new(values: Vec<f64>, range: DoubleRange) -> Self {
        Self { values, range }
    }
}

/// Inputs and outputs of one brain at the last step, for viewers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrainIo {
    pub inputs: RangedValues,
    pub outputs: RangedValues,
}

pub trait Agent {
    /// Produce this tick's actions
    ///
    /// `previous` holds the outcomes of the actions returned by the previous call, in the
    /// same order; it is empty on the first call.
    fn act(&mut self, t: f64, previous: &[ActionOutcome], world: &dyn WorldAccess) -> Vec<Action>;

    fn brain_ios(&self) -> Vec<BrainIo> {
        Vec::new()
    }
}

/// An agent owning bodies in the world
pub trait EmbodiedAgent: Agent {
    /// Create the agent's bodies through `performer`; called once before the agent first acts
    fn assemble(&mut self, performer: &mut dyn ActionPerformer) -> Result<(), ActionError>;

    fn body_parts(&self) -> &[BodyId];
}
