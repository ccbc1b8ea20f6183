//! Balancing: keep a swing level while standing on it

use serde::{Deserialize, Serialize};
use vsrsim_core::{Action, ActionError, AgentId, Body, BodyId, EmbodiedAgent, Engine, Snapshot};
use vsrsim_geometry::{Point, Poly, Terrain};

use super::{add_agent, place_agent, Task, TaskError, TerrainSpec};
use crate::observation::{AgentObservation, AgentsObservation, BalancingObservation};
use crate::outcome::{Outcome, OutcomeError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancingConfig {
    pub duration: f64,
    pub swing_length: f64,
    pub swing_height: f64,
    pub swing_mass: f64,
    /// Height of the swing pivot above the ground
    pub swing_pivot_height: f64,
    /// Clearance between the swing and the agent at start
    pub initial_y_gap: f64,
}

impl Default for BalancingConfig {
    fn default() -> Self {
        Self {
            duration: 10.0,
            swing_length: 10.0,
            swing_height: 0.5,
            swing_mass: 1.0,
            swing_pivot_height: 2.5,
            initial_y_gap: 0.1,
        }
    }
}

pub struct Balancing {
    config: BalancingConfig,
    terrain: Terrain,
}

impl Balancing {
    pub fn new(config: BalancingConfig) -> Self {
        Self {
            config,
            terrain: TerrainSpec::Flat.build(),
        }
    }

    pub fn pivot(&self) -> Point {
        let x_range = self.terrain.within_borders_x_range();
        let x = x_range.min + self.config.swing_length;
        Point::new(x, self.terrain.height_at(x) + self.config.swing_pivot_height)
    }

    fn swing_poly(&self) -> Poly {
        let pivot = self.pivot();
        let half = Point::new(self.config.swing_length / 2.0, self.config.swing_height / 2.0);
        Poly::rectangle(pivot - half, pivot + half)
    }

    fn observe(&self, engine: &dyn Engine, agent: AgentId, swing: BodyId) -> BalancingObservation {
        let world = engine.world();
        let agents = AgentsObservation {
            agents: vec![AgentObservation::sample(engine, agent, &self.terrain)],
        };
        let swing_body = world.body(swing);
        let swing_angle = swing_body.map_or(0.0, Body::angle);
        let all_on_swing = match swing_body.map(Body::poly) {
            Some(swing_poly) => agents.agents.iter().flat_map(|a| &a.polys).all(|poly| {
                let c = poly.center();
                swing_poly.max_y_at_x(c.x).is_some_and(|y| c.y >= y)
            }),
            None => false,
        };
        BalancingObservation {
            agents,
            swing_angle,
            all_on_swing,
        }
    }
}

impl Default for Balancing {
    fn default() -> Self {
        Self::new(BalancingConfig::default())
    }
}

impl Task for Balancing {
    type Observation = BalancingObservation;

    fn run(
        &self,
        agent: Box<dyn EmbodiedAgent>,
        engine: &mut dyn Engine,
        observer: &mut dyn FnMut(&Snapshot),
    ) -> Result<Outcome<BalancingObservation>, TaskError> {
        engine.perform(
            &Action::CreateUnmovableBody {
                poly: self.terrain.poly().clone(),
            },
            None,
        )?;
        let swing_poly = self.swing_poly();
        let create = Action::CreateRigidBody {
            poly: swing_poly.clone(),
            mass: self.config.swing_mass,
            pivot: Some(self.pivot()),
        };
        let swing = engine
            .perform(&create, None)?
            .as_body()
            .ok_or_else(|| ActionError::new(create.clone(), "no swing created"))?;

        let id = add_agent(engine, agent)?;
        let width = engine
            .agent_bounding_box(id)
            .ok_or(TaskError::NoBodies(id))?
            .width();
        let swing_top = self.pivot().y + self.config.swing_height / 2.0;
        place_agent(
            engine,
            id,
            self.pivot().x - width / 2.0,
            self.config.initial_y_gap,
            |range| swing_poly.max_y_in_x_range(range).unwrap_or(swing_top),
        )?;
        log::info!(
            "Balancing: placed {} on swing {} (pivot {:?}), running for {}s",
            id,
            swing,
            self.pivot(),
            self.config.duration
        );

        let mut outcome = Outcome::new();
        while engine.t() < self.config.duration {
            let snapshot = engine.tick()?;
            observer(&snapshot);
            outcome.insert(snapshot.t, self.observe(engine, id, swing))?;
        }
        log::info!("Balancing: done after {} observations", outcome.len());
        Ok(outcome)
    }
}

impl Outcome<BalancingObservation> {
    /// Mean absolute swing angle
    pub fn avg_swing_angle(&self) -> Result<f64, OutcomeError> {
        self.average("average swing angle", |o| o.swing_angle.abs())
    }

    /// Mean absolute swing angle, plus `malus` for every observation with an agent off the swing
    pub fn avg_swing_angle_with_malus(&self, malus: f64) -> Result<f64, OutcomeError> {
        self.average("average swing angle", |o| {
            o.swing_angle.abs() + if o.all_on_swing { 0.0 } else { malus }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(angle: f64, on: bool) -> BalancingObservation {
        BalancingObservation {
            agents: AgentsObservation::default(),
            swing_angle: angle,
            all_on_swing: on,
        }
    }

    #[test]
    fn test_avg_swing_angle() {
        let mut outcome = Outcome::new();
        outcome.insert(0.0, observation(0.1, true)).unwrap();
        outcome.insert(0.1, observation(-0.3, false)).unwrap();
        assert!((outcome.avg_swing_angle().unwrap() - 0.2).abs() < 1e-12);
        assert!((outcome.avg_swing_angle_with_malus(1.0).unwrap() - 0.7).abs() < 1e-12);
        let empty: Outcome<BalancingObservation> = Outcome::new();
        assert_eq!(
            empty.avg_swing_angle(),
            Err(OutcomeError::Empty("average swing angle"))
        );
    }

    #[test]
    fn test_swing_is_centered_on_pivot() {
        let task = Balancing::default();
        let poly = task.swing_poly();
        assert_eq!(poly.center(), task.pivot());
        assert!((poly.area() - 5.0).abs() < 1e-9);
    }
}
