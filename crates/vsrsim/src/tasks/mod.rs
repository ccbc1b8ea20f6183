//! Tasks: complete runs of an agent against a scenario
//!
//! A task builds the scenario through engine actions, adds and places the agent, then
//! ticks the engine until its duration elapses, recording one observation per tick.

pub mod balancing;
pub mod locomotion;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vsrsim_core::{Action, ActionError, AgentId, EmbodiedAgent, Engine, EngineError, Snapshot};
use vsrsim_geometry::{DoubleRange, Point, Terrain};

use crate::outcome::{Outcome, OutcomeError};

pub use balancing::{Balancing, BalancingConfig};
pub use locomotion::{Locomotion, LocomotionConfig};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("task setup failed: {0}")]
    Setup(#[from] ActionError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
    #[error("{0} has no bodies to place")]
    NoBodies(AgentId),
}

/// A scenario an embodied agent is evaluated on
pub trait Task {
    type Observation;

    /// Run `agent` in `engine` for the task duration, passing every snapshot to `observer`
    fn run(
        &self,
        agent: Box<dyn EmbodiedAgent>,
        engine: &mut dyn Engine,
        observer: &mut dyn FnMut(&Snapshot),
    ) -> Result<Outcome<Self::Observation>, TaskError>;
}

/// Terrain presets
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainSpec {
    #[default]
    Flat,
    Hilly {
        hill_height: f64,
        hill_width: f64,
        seed: u64,
    },
    Downhill {
        angle: f64,
    },
    Uphill {
        angle: f64,
    },
}

/// Dimensions shared by all terrain presets
pub const TERRAIN_WIDTH: f64 = 2000.0;
pub const TERRAIN_HEIGHT: f64 = 0.0;
pub const TERRAIN_BORDER_WIDTH: f64 = 10.0;
pub const TERRAIN_BORDER_HEIGHT: f64 = 100.0;

impl TerrainSpec {
    pub fn build(&self) -> Terrain {
        let (w, h, bw, bh) = (
            TERRAIN_WIDTH,
            TERRAIN_HEIGHT,
            TERRAIN_BORDER_WIDTH,
            TERRAIN_BORDER_HEIGHT,
        );
        match *self {
            TerrainSpec::Flat => Terrain::flat(w, h, bw, bh),
            TerrainSpec::Hilly {
                hill_height,
                hill_width,
                seed,
            } => Terrain::hilly(w, h, bw, bh, hill_height, hill_width, seed),
            TerrainSpec::Downhill { angle } => Terrain::downhill(w, h, bw, bh, angle),
            TerrainSpec::Uphill { angle } => Terrain::uphill(w, h, bw, bh, angle),
        }
    }
}

impl std::str::FromStr for TerrainSpec {
    type Err = String;

    /// Parse `flat`, `hilly`, `downhill-<degrees>` or `uphill-<degrees>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (name, arg) = match lower.split_once('-') {
            Some((name, arg)) => (name, Some(arg)),
            None => (lower.as_str(), None),
        };
        let angle = || -> Result<f64, String> {
            let degrees: f64 = arg
                .unwrap_or("10")
                .parse()
                .map_err(|_| format!("Invalid angle in terrain: {}", s))?;
            Ok(degrees.to_radians())
        };
        match name {
            "flat" => Ok(TerrainSpec::Flat),
            "hilly" => Ok(TerrainSpec::Hilly {
                hill_height: 1.0,
                hill_width: 10.0,
                seed: arg.and_then(|a| a.parse().ok()).unwrap_or(0),
            }),
            "downhill" => Ok(TerrainSpec::Downhill { angle: angle()? }),
            "uphill" => Ok(TerrainSpec::Uphill { angle: angle()? }),
            _ => Err(format!(
                "Unknown terrain: {}. Valid: flat, hilly[-seed], downhill[-deg], uphill[-deg]",
                s
            )),
        }
    }
}

/// Register `agent`, add it to the world and return its id
pub(crate) fn add_agent(engine: &mut dyn Engine, agent: Box<dyn EmbodiedAgent>) -> Result<AgentId, TaskError> {
    let id = engine.register_agent(agent);
    engine.perform(&Action::AddAgent { agent: id }, None)?;
    Ok(id)
}

/// Move `agent` so its bounding box starts at `x` horizontally and rests `y_gap` above the
/// highest point of `ground_height` under it
///
/// The two moves are sequential: the vertical offset is computed from the box after the
/// horizontal move.
pub(crate) fn place_agent(
    engine: &mut dyn Engine,
    agent: AgentId,
    x: f64,
    y_gap: f64,
    ground_height: impl Fn(DoubleRange) -> f64,
) -> Result<(), TaskError> {
    let bb = engine
        .agent_bounding_box(agent)
        .ok_or(TaskError::NoBodies(agent))?;
    engine.perform(
        &Action::TranslateAgent {
            agent,
            translation: Point::new(x - bb.min.x, 0.0),
        },
        None,
    )?;
    let bb = engine
        .agent_bounding_box(agent)
        .ok_or(TaskError::NoBodies(agent))?;
    let ground = ground_height(bb.x_range());
    engine.perform(
        &Action::TranslateAgent {
            agent,
            translation: Point::new(0.0, ground + y_gap - bb.min.y),
        },
        None,
    )?;
    Ok(())
}
