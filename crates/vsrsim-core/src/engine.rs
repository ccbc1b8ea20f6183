//! Engine contract
//!
//! These traits decouple agents and tasks from any concrete physics backend.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use vsrsim_geometry::{BoundingBox, Point, Poly};

use crate::action::{Action, ActionError, ActionOutcome, ActionValue};
use crate::agent::{BrainIo, EmbodiedAgent};
use crate::body::{Body, BodyKind, Side, Voxel};
use crate::ids::{AgentId, AnchorId, BodyId};
use crate::topology::Link;

/// Executes actions on behalf of an agent (or of no agent, for task setup)
pub trait ActionPerformer {
    fn perform(&mut self, action: &Action, agent: Option<AgentId>) -> Result<ActionValue, ActionError>;

    /// Perform `action` and wrap the result; failures are logged and leave the outcome empty
    fn perform_logged(&mut self, action: Action, agent: Option<AgentId>) -> ActionOutcome {
        let outcome = match self.perform(&action, agent) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Action error: {}", e);
                None
            }
        };
        ActionOutcome {
            action,
            agent,
            outcome,
        }
    }
}

/// Read-only view of world state
pub trait WorldAccess {
    /// Simulation time
    fn t(&self) -> f64;

    fn body(&self, id: BodyId) -> Option<&Body>;

    /// Ids of all bodies, in creation order
    fn body_ids(&self) -> Vec<BodyId>;

    fn anchor_point(&self, anchor: AnchorId) -> Option<Point>;

    fn links_of(&self, anchor: AnchorId) -> Vec<Link>;

    fn links(&self) -> Vec<Link>;

    /// Anchors on `side` of a voxel, empty for other bodies
    fn anchors_on(&self, body: BodyId, side: Side) -> SmallVec<[AnchorId; 2]> {
        match self.body(body) {
            Some(Body::Voxel(_)) => Voxel::anchors_on(body, side),
            _ => SmallVec::new(),
        }
    }

    fn body_poly(&self, body: BodyId) -> Option<Poly> {
        self.body(body).map(Body::poly)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("simulation diverged at t={t}: {body} has a non-finite state")]
    Diverged { body: BodyId, t: f64 },
    #[error(transparent)]
    Action(#[from] ActionError),
}

/// A physics backend driving a world and the agents living in it
pub trait Engine: ActionPerformer {
    fn t(&self) -> f64;

    /// Let every active agent act, perform its actions, then advance the physics by one step
    fn tick(&mut self) -> Result<Snapshot, EngineError>;

    /// Hand an agent to the engine; it stays inactive until an `AddAgent` action adds it
    fn register_agent(&mut self, agent: Box<dyn EmbodiedAgent>) -> AgentId;

    fn world(&self) -> &dyn WorldAccess;

    fn agent_bodies(&self, agent: AgentId) -> Option<Vec<BodyId>>;

    /// Box enclosing all bodies of `agent`
    fn agent_bounding_box(&self, agent: AgentId) -> Option<BoundingBox> {
        let world = self.world();
        self.agent_bodies(agent)?
            .into_iter()
            .filter_map(|id| world.body(id).and_then(Body::bounding_box))
            .reduce(|a, b| a.enclosing(&b))
    }
}

/// State of one body at snapshot time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: BodyId,
    pub kind: BodyKind,
    pub poly: Poly,
    pub velocity: Point,
    pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub bodies: Vec<BodyId>,
    pub brain_ios: Vec<BrainIo>,
}

/// Everything an external viewer may want to know about one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulation time at which the tick was executed
    pub t: f64,
    pub bodies: Vec<BodySnapshot>,
    pub links: Vec<Link>,
    pub agents: Vec<AgentSnapshot>,
    /// Outcomes of all actions performed during the tick, in execution order
    pub action_outcomes: Vec<ActionOutcome>,
}

impl Snapshot {
    pub fn body(&self, id: BodyId) -> Option<&BodySnapshot> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn agent(&self, id: AgentId) -> Option<&AgentSnapshot> {
        self.agents.iter().find(|a| a.id == id)
    }
}
