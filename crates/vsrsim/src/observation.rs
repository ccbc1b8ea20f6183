//! Per-tick samples recorded by tasks

use serde::{Deserialize, Serialize};
use vsrsim_core::{AgentId, Engine};
use vsrsim_geometry::{BoundingBox, Point, Poly, Terrain};

/// One agent's body parts, plus the ground height below its center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentObservation {
    pub polys: Vec<Poly>,
    pub terrain_height: f64,
}

impl AgentObservation {
    pub fn sample(engine: &dyn Engine, agent: AgentId, terrain: &Terrain) -> Self {
        let world = engine.world();
        let polys: Vec<Poly> = engine
            .agent_bodies(agent)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| world.body_poly(id))
            .collect();
        let terrain_height = Self::enclosing(&polys)
            .map_or(f64::NEG_INFINITY, |bb| terrain.height_at(bb.center().x));
        Self {
            polys,
            terrain_height,
        }
    }

    fn enclosing(polys: &[Poly]) -> Option<BoundingBox> {
        polys
            .iter()
            .filter_map(Poly::bounding_box)
            .reduce(|a, b| a.enclosing(&b))
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        Self::enclosing(&self.polys)
    }

    /// Mean of the body part centers
    pub fn center(&self) -> Option<Point> {
        if self.polys.is_empty() {
            return None;
        }
        let sum = self
            .polys
            .iter()
            .map(Poly::center)
            .fold(Point::ZERO, |a, b| a + b);
        Some(sum / self.polys.len() as f64)
    }
}

/// Every observed agent at one instant
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentsObservation {
    pub agents: Vec<AgentObservation>,
}

impl AgentsObservation {
    pub fn first_agent(&self) -> Option<&AgentObservation> {
        self.agents.first()
    }
}

/// Agents plus the state of the swing they balance on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancingObservation {
    pub agents: AgentsObservation,
    /// Swing rotation in radians, counterclockwise positive
    pub swing_angle: f64,
    /// Whether every agent body still lies above the swing
    pub all_on_swing: bool,
}
