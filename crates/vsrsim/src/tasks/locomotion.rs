//! Locomotion: walk as far right as possible over a terrain

use serde::{Deserialize, Serialize};
use vsrsim_core::{Action, EmbodiedAgent, Engine, Snapshot};
use vsrsim_geometry::Terrain;

use super::{add_agent, place_agent, Task, TaskError, TerrainSpec};
use crate::observation::{AgentObservation, AgentsObservation};
use crate::outcome::{Outcome, OutcomeError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Simulated seconds
    pub duration: f64,
    pub terrain: TerrainSpec,
    /// Distance between the left terrain border and the agent
    pub initial_x_gap: f64,
    /// Clearance between the ground and the agent at start
    pub initial_y_gap: f64,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            duration: 30.0,
            terrain: TerrainSpec::Flat,
            initial_x_gap: 1.0,
            initial_y_gap: 0.25,
        }
    }
}

pub struct Locomotion {
    duration: f64,
    terrain: Terrain,
    initial_x_gap: f64,
    initial_y_gap: f64,
}

impl Locomotion {
    pub fn new(duration: f64, terrain: Terrain, initial_x_gap: f64, initial_y_gap: f64) -> Self {
        Self {
            duration,
            terrain,
            initial_x_gap,
            initial_y_gap,
        }
    }

    pub fn from_config(config: &LocomotionConfig) -> Self {
        Self::new(
            config.duration,
            config.terrain.build(),
            config.initial_x_gap,
            config.initial_y_gap,
        )
    }

    pub fn terrain(&self) -> &Terrain {
        &self.terrain
    }
}

impl Task for Locomotion {
    type Observation = AgentsObservation;

    fn run(
        &self,
        agent: Box<dyn EmbodiedAgent>,
        engine: &mut dyn Engine,
        observer: &mut dyn FnMut(&Snapshot),
    ) -> Result<Outcome<AgentsObservation>, TaskError> {
        engine.perform(
            &Action::CreateUnmovableBody {
                poly: self.terrain.poly().clone(),
            },
            None,
        )?;
        let id = add_agent(engine, agent)?;
        place_agent(
            engine,
            id,
            self.terrain.within_borders_x_range().min + self.initial_x_gap,
            self.initial_y_gap,
            |range| self.terrain.max_height_at(range),
        )?;
        log::info!(
            "Locomotion: placed {} at {:?}, running for {}s",
            id,
            engine.agent_bounding_box(id).map(|bb| bb.min),
            self.duration
        );

        let mut outcome = Outcome::new();
        while engine.t() < self.duration {
            let snapshot = engine.tick()?;
            observer(&snapshot);
            let observation = AgentsObservation {
                agents: vec![AgentObservation::sample(engine, id, &self.terrain)],
            };
            outcome.insert(snapshot.t, observation)?;
        }
        log::info!("Locomotion: done after {} observations", outcome.len());
        Ok(outcome)
    }
}

impl Outcome<AgentsObservation> {
    fn first_agent_x(observation: &AgentsObservation) -> Option<f64> {
        observation
            .first_agent()
            .and_then(AgentObservation::bounding_box)
            .map(|bb| bb.center().x)
    }

    /// Horizontal displacement of the agent's bounding box center over the run
    pub fn x_distance(&self) -> Result<f64, OutcomeError> {
        let (_, first) = self.first().ok_or(OutcomeError::Empty("x distance"))?;
        let (_, last) = self.last().ok_or(OutcomeError::Empty("x distance"))?;
        match (Self::first_agent_x(first), Self::first_agent_x(last)) {
            (Some(start), Some(end)) => Ok(end - start),
            _ => Err(OutcomeError::Empty("x distance")),
        }
    }

    /// Average horizontal speed over the run
    pub fn x_velocity(&self) -> Result<f64, OutcomeError> {
        let distance = self.x_distance()?;
        let (start, _) = self.first().ok_or(OutcomeError::Empty("x velocity"))?;
        let (end, _) = self.last().ok_or(OutcomeError::Empty("x velocity"))?;
        if end <= start {
            return Ok(0.0);
        }
        Ok(distance / (end - start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsrsim_geometry::{Point, Poly};

    fn observation(x: f64) -> AgentsObservation {
        AgentsObservation {
            agents: vec![AgentObservation {
                polys: vec![Poly::square(Point::new(x, 0.5), 1.0)],
                terrain_height: 0.0,
            }],
        }
    }

    #[test]
    fn test_default_config() {
        let config = LocomotionConfig::default();
        assert_eq!(config.duration, 30.0);
        assert_eq!(config.initial_x_gap, 1.0);
        assert_eq!(config.initial_y_gap, 0.25);
        assert_eq!(config.terrain, TerrainSpec::Flat);
    }

    #[test]
    fn test_x_distance_and_velocity() {
        let mut outcome = Outcome::new();
        outcome.insert(0.0, observation(1.0)).unwrap();
        outcome.insert(1.0, observation(2.0)).unwrap();
        outcome.insert(2.0, observation(4.0)).unwrap();
        assert!((outcome.x_distance().unwrap() - 3.0).abs() < 1e-12);
        assert!((outcome.x_velocity().unwrap() - 1.5).abs() < 1e-12);
        let empty: Outcome<AgentsObservation> = Outcome::new();
        assert!(empty.x_distance().is_err());
    }
}
