//! Kinematic reference engine - no external physics engine
//!
//! Bodies move by position-based rules: gravity with a per-body fall speed, voxel sizes
//! relaxing toward their actuated area, iterative link constraints, and support by the
//! unmovable bodies and pinned rigid bodies below them. Pinned rigid bodies swing under the
//! weight of what rests on them. Every rule is deterministic, so identical setups give
//! identical runs.

use serde::{Deserialize, Serialize};
use vsrsim_geometry::{DoubleRange, Point};

use crate::action::{Action, ActionError, ActionOutcome, ActionValue};
use crate::agent::EmbodiedAgent;
use crate::body::Body;
use crate::engine::{
    ActionPerformer, AgentSnapshot, BodySnapshot, Engine, EngineError, Snapshot, WorldAccess,
};
use crate::ids::{AgentId, BodyId};
use crate::topology::LinkType;
use crate::world::World;

/// Tunables of the kinematic engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time step in seconds
    pub dt: f64,
    /// Vertical acceleration (negative is down)
    pub gravity: f64,
    /// Maximum anchor distance for attraction
    pub attach_range: f64,
    /// Maximum distance between an NFC emitter and receiver
    pub nfc_range: f64,
    /// Fraction of the anchor gap a soft link closes per iteration
    pub soft_link_stiffness: f64,
    pub link_iterations: usize,
    /// How far below a support surface a body may start a step and still be lifted onto it
    pub max_penetration: f64,
    /// Fraction of horizontal motion cancelled while in contact
    pub friction: f64,
    /// Rate (1/s) at which voxel sizes approach their actuated target
    pub actuation_rate: f64,
    pub swing_max_angle: f64,
    pub swing_damping: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            gravity: -10.0,
            attach_range: 1.0,
            nfc_range: 0.25,
            soft_link_stiffness: 0.5,
            link_iterations: 4,
            max_penetration: 0.5,
            friction: 0.8,
            actuation_rate: 10.0,
            swing_max_angle: std::f64::consts::FRAC_PI_6,
            swing_damping: 1.0,
        }
    }
}

struct AgentEntry {
    id: AgentId,
    agent: Box<dyn EmbodiedAgent>,
    active: bool,
    last_outcomes: Vec<ActionOutcome>,
}

pub struct KinematicEngine {
    config: EngineConfig,
    world: World,
    agents: Vec<AgentEntry>,
    ticks: u64,
}

impl KinematicEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            world: World::new(config),
            agents: Vec::new(),
            ticks: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Concrete world, e.g. for topology queries
    pub fn world_state(&self) -> &World {
        &self.world
    }

    fn snapshot(&self, t: f64, action_outcomes: Vec<ActionOutcome>) -> Snapshot {
        let bodies = self
            .world
            .bodies
            .iter()
            .enumerate()
            .map(|(i, body)| BodySnapshot {
                id: BodyId::from_raw(i as u32),
                kind: body.kind(),
                poly: body.poly(),
                velocity: body.velocity(),
                angle: body.angle(),
            })
            .collect();
        let agents = self
            .agents
            .iter()
            .filter(|e| e.active)
            .map(|e| AgentSnapshot {
                id: e.id,
                bodies: e.agent.body_parts().to_vec(),
                brain_ios: e.agent.brain_ios(),
            })
            .collect();
        Snapshot {
            t,
            bodies,
            links: self.world.links(),
            agents,
            action_outcomes,
        }
    }

    /// Undo agent additions and body creations made since the given state
    fn rollback(&mut self, bodies_before: usize, active_before: &[bool]) {
        for (entry, was_active) in self.agents.iter_mut().zip(active_before) {
            if entry.active && !was_active {
                log::debug!("KinematicEngine: rolled back addition of {}", entry.id);
                entry.active = false;
            }
        }
        self.world.truncate_bodies(bodies_before);
    }

    /// Advance bodies by one time step
    fn integrate(&mut self) {
        let dt = self.config.dt;
        let world = &mut self.world;
        let n = world.bodies.len();
        let start: Vec<Point> = world.bodies.iter().map(|b| b.poly().center()).collect();
        let start_bottom: Vec<f64> = world
            .bodies
            .iter()
            .map(|b| b.bounding_box().map_or(f64::NEG_INFINITY, |bb| bb.min.y))
            .collect();

        // actuation
        let relax = (self.config.actuation_rate * dt).min(1.0);
        for body in world.bodies.iter_mut() {
            if let Body::Voxel(v) = body {
                let target = v.target_side_length();
                v.side_length += (target - v.side_length) * relax;
            }
        }

        // gravity
        for body in world.bodies.iter_mut() {
            if !body.is_movable() {
                continue;
            }
            let dy = match body {
                Body::Voxel(v) => {
                    v.fall_speed += self.config.gravity * dt;
                    v.fall_speed * dt
                }
                Body::Rigid(r) => {
                    r.fall_speed += self.config.gravity * dt;
                    r.fall_speed * dt
                }
                Body::Unmovable(_) => 0.0,
            };
            body.translate(Point::new(0.0, dy));
        }

        // links
        let links: Vec<_> = world.graph.links().collect();
        for _ in 0..self.config.link_iterations {
            for link in &links {
                let (Some(pa), Some(pb)) = (
                    world.anchor_point(link.source),
                    world.anchor_point(link.target),
                ) else {
                    continue;
                };
                let k = match link.kind {
                    LinkType::Rigid => 1.0,
                    LinkType::Soft => self.config.soft_link_stiffness,
                };
                let a = &world.bodies[link.source.body.index()];
                let b = &world.bodies[link.target.body.index()];
                let wa = if a.is_movable() { 1.0 / a.mass() } else { 0.0 };
                let wb = if b.is_movable() { 1.0 / b.mass() } else { 0.0 };
                if wa + wb <= 0.0 {
                    continue;
                }
                let gap = (pb - pa) * k;
                world.bodies[link.source.body.index()].translate(gap * (wa / (wa + wb)));
                world.bodies[link.target.body.index()].translate(-gap * (wb / (wa + wb)));
            }
        }

        // supports
        let supports: Vec<usize> = (0..n)
            .filter(|i| !world.bodies[*i].is_movable())
            .collect();
        let mut loads: Vec<(usize, f64, f64)> = Vec::new();
        for i in 0..n {
            world.contacts[i] = false;
            if !world.bodies[i].is_movable() {
                continue;
            }
            let Some(bb) = world.bodies[i].bounding_box() else {
                continue;
            };
            let x_range = DoubleRange::new(bb.min.x, bb.max.x);
            let mut best: Option<(usize, f64)> = None;
            for s in &supports {
                let Some(height) = world.bodies[*s].poly().max_y_in_x_range(x_range) else {
                    continue;
                };
                if start_bottom[i] + self.config.max_penetration < height {
                    continue;
                }
                if best.map_or(true, |(_, h)| height > h) {
                    best = Some((*s, height));
                }
            }
            let Some((support, height)) = best else {
                continue;
            };
            if bb.min.y > height + 1e-9 {
                continue;
            }
            world.bodies[i].translate(Point::new(0.0, height - bb.min.y));
            world.contacts[i] = true;
            let dx = world.bodies[i].poly().center().x - start[i].x;
            world.bodies[i].translate(Point::new(-dx * self.config.friction, 0.0));
            match &mut world.bodies[i] {
                Body::Voxel(v) => v.fall_speed = 0.0,
                Body::Rigid(r) => r.fall_speed = 0.0,
                Body::Unmovable(_) => {}
            }
            let mass = world.bodies[i].mass();
            let x = world.bodies[i].poly().center().x;
            loads.push((support, mass, x));
        }

        // swings
        for s in supports {
            let Body::Rigid(swing) = &world.bodies[s] else {
                continue;
            };
            let Some(pivot) = swing.pivot() else {
                continue;
            };
            let half_width = swing
                .poly()
                .bounding_box()
                .map_or(1.0, |bb| bb.width() / 2.0);
            let mut inertia = swing.mass * half_width * half_width / 3.0;
            let mut torque = 0.0;
            for (_, mass, x) in loads.iter().filter(|(support, _, _)| *support == s) {
                let arm = x - pivot.x;
                torque += mass * self.config.gravity * arm;
                inertia += mass * arm * arm;
            }
            if let Body::Rigid(swing) = &mut world.bodies[s] {
                let acceleration = torque / inertia.max(f64::EPSILON)
                    - self.config.swing_damping * swing.angular_velocity;
                swing.angular_velocity += acceleration * dt;
                swing.angle += swing.angular_velocity * dt;
                let max = self.config.swing_max_angle;
                if swing.angle.abs() > max {
                    swing.angle = swing.angle.clamp(-max, max);
                    swing.angular_velocity = 0.0;
                }
            }
        }

        // velocities
        for (i, body) in world.bodies.iter_mut().enumerate() {
            let velocity = if body.is_movable() {
                (body.poly().center() - start[i]) / dt
            } else {
                Point::ZERO
            };
            match body {
                Body::Voxel(v) => v.velocity = velocity,
                Body::Rigid(r) => r.velocity = velocity,
                Body::Unmovable(_) => {}
            }
        }
    }
}

impl ActionPerformer for KinematicEngine {
    fn perform(&mut self, action: &Action, agent: Option<AgentId>) -> Result<ActionValue, ActionError> {
        match action {
            Action::AddAgent { agent: added } => {
                let world = &mut self.world;
                let entry = self
                    .agents
                    .iter_mut()
                    .find(|e| e.id == *added)
                    .ok_or_else(|| ActionError::new(action.clone(), format!("unknown {}", added)))?;
                if entry.active {
                    return Err(ActionError::new(action.clone(), format!("{} already added", added)));
                }
                let bodies_before = world.bodies.len();
                if let Err(e) = entry.agent.assemble(&mut *world) {
                    world.truncate_bodies(bodies_before);
                    log::warn!("KinematicEngine: assembly of {} failed: {}", added, e);
                    return Err(e);
                }
                entry.active = true;
                log::info!(
                    "KinematicEngine: added {} with {} bodies",
                    added,
                    entry.agent.body_parts().len()
                );
                Ok(ActionValue::Agent(*added))
            }
            Action::TranslateAgent {
                agent: moved,
                translation,
            } => {
                let bodies = self
                    .agent_bodies(*moved)
                    .ok_or_else(|| ActionError::new(action.clone(), format!("unknown {}", moved)))?;
                for body in bodies {
                    self.world.translate_body(body, *translation);
                }
                Ok(ActionValue::Unit)
            }
            other if other.is_self_described() => {
                let bodies_before = self.world.bodies.len();
                let active_before: Vec<bool> = self.agents.iter().map(|e| e.active).collect();
                let result = other.perform_self_described(self, agent);
                if result.is_err() {
                    self.rollback(bodies_before, &active_before);
                }
                result
            }
            other => self.world.perform(other, agent),
        }
    }
}

impl Engine for KinematicEngine {
    fn t(&self) -> f64 {
        self.world.t
    }

    fn tick(&mut self) -> Result<Snapshot, EngineError> {
        let t = self.world.t;
        self.world.nfc.swap();

        let mut performed = Vec::new();
        for i in 0..self.agents.len() {
            if !self.agents[i].active {
                continue;
            }
            let id = self.agents[i].id;
            let actions = {
                let entry = &mut self.agents[i];
                entry.agent.act(t, &entry.last_outcomes, &self.world)
            };
            let outcomes: Vec<ActionOutcome> = actions
                .into_iter()
                .map(|action| self.perform_logged(action, Some(id)))
                .collect();
            performed.extend(outcomes.iter().cloned());
            self.agents[i].last_outcomes = outcomes;
        }

        self.integrate();
        self.ticks += 1;
        self.world.t = self.ticks as f64 * self.config.dt;

        if let Some(i) = self.world.bodies.iter().position(|b| !b.is_finite()) {
            return Err(EngineError::Diverged {
                body: BodyId::from_raw(i as u32),
                t,
            });
        }
        Ok(self.snapshot(t, performed))
    }

    fn register_agent(&mut self, agent: Box<dyn EmbodiedAgent>) -> AgentId {
        let id = AgentId::from_raw(self.agents.len() as u32);
        self.agents.push(AgentEntry {
            id,
            agent,
            active: false,
            last_outcomes: Vec::new(),
        });
        id
    }

    fn world(&self) -> &dyn WorldAccess {
        &self.world
    }

    fn agent_bodies(&self, agent: AgentId) -> Option<Vec<BodyId>> {
        self.agents
            .iter()
            .find(|e| e.id == agent && e.active)
            .map(|e| e.agent.body_parts().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::body::Material;
    use vsrsim_geometry::Poly;

    struct Block {
        bodies: Vec<BodyId>,
    }

    impl Agent for Block {
        fn act(&mut self, _t: f64, _previous: &[ActionOutcome], _world: &dyn WorldAccess) -> Vec<Action> {
            Vec::new()
        }
    }

    impl EmbodiedAgent for Block {
        fn assemble(&mut self, performer: &mut dyn ActionPerformer) -> Result<(), ActionError> {
            let value = performer.perform(
                &Action::CreateVoxel {
                    side_length: 1.0,
                    mass: 1.0,
                    material: Material::default(),
                },
                None,
            )?;
            self.bodies.extend(value.as_body());
            Ok(())
        }

        fn body_parts(&self) -> &[BodyId] {
            &self.bodies
        }
    }

    /// Creates one voxel, then fails
    struct Broken;

    impl Agent for Broken {
        fn act(&mut self, _t: f64, _previous: &[ActionOutcome], _world: &dyn WorldAccess) -> Vec<Action> {
            Vec::new()
        }
    }

    impl EmbodiedAgent for Broken {
        fn assemble(&mut self, performer: &mut dyn ActionPerformer) -> Result<(), ActionError> {
            let voxel = Action::CreateVoxel {
                side_length: 1.0,
                mass: 1.0,
                material: Material::default(),
            };
            let first = performer.perform(&voxel, None)?.as_body();
            if let Some(body) = first {
                performer.perform(
                    &Action::CreateLink {
                        source: crate::ids::AnchorId::new(body, 0),
                        target: crate::ids::AnchorId::new(BodyId::from_raw(0), 0),
                        kind: LinkType::Soft,
                    },
                    None,
                )?;
            }
            Err(ActionError::new(voxel, "out of material"))
        }

        fn body_parts(&self) -> &[BodyId] {
            &[]
        }
    }

    fn ground(engine: &mut KinematicEngine) {
        engine
            .perform(
                &Action::CreateUnmovableBody {
                    poly: Poly::rectangle(Point::new(-10.0, -5.0), Point::new(10.0, 0.0)),
                },
                None,
            )
            .unwrap();
    }

    #[test]
    fn test_voxel_lands_on_ground() {
        let mut engine = KinematicEngine::new(EngineConfig::default());
        ground(&mut engine);
        let agent = engine.register_agent(Box::new(Block { bodies: Vec::new() }));
        engine
            .perform(
                &Action::AddAndTranslateAgent {
                    agent,
                    translation: Point::new(0.0, 2.0),
                },
                None,
            )
            .unwrap();
        for _ in 0..120 {
            engine.tick().unwrap();
        }
        let bb = engine.agent_bounding_box(agent).unwrap();
        assert!(bb.min.y.abs() < 1e-9, "bottom at {}", bb.min.y);
        let body = engine.agent_bodies(agent).unwrap()[0];
        assert!(engine.world_state().is_in_contact(body));
    }

    #[test]
    fn test_time_advances_by_dt() {
        let config = EngineConfig::default();
        let mut engine = KinematicEngine::new(config);
        assert_eq!(engine.t(), 0.0);
        let first = engine.tick().unwrap();
        assert_eq!(first.t, 0.0);
        engine.tick().unwrap();
        assert!((engine.t() - 2.0 * config.dt).abs() < 1e-12);
    }

    #[test]
    fn test_add_unknown_agent_fails() {
        let mut engine = KinematicEngine::new(EngineConfig::default());
        let err = engine
            .perform(
                &Action::AddAndTranslateAgent {
                    agent: AgentId::from_raw(7),
                    translation: Point::ZERO,
                },
                None,
            )
            .unwrap_err();
        assert_eq!(err.reason, "Undoable addition");
    }

    #[test]
    fn test_failed_assembly_leaves_no_bodies_behind() {
        let mut engine = KinematicEngine::new(EngineConfig::default());
        let block = engine.register_agent(Box::new(Block { bodies: Vec::new() }));
        engine.perform(&Action::AddAgent { agent: block }, None).unwrap();
        let broken = engine.register_agent(Box::new(Broken));

        let err = engine
            .perform(&Action::AddAgent { agent: broken }, None)
            .unwrap_err();
        assert_eq!(err.reason, "out of material");
        assert_eq!(engine.world().body_ids().len(), 1);
        assert!(engine.world().links().is_empty());
        assert!(engine.world_state().graph().is_consistent());
        assert_eq!(engine.agent_bodies(broken), None);

        let err = engine
            .perform(
                &Action::AddAndTranslateAgent {
                    agent: broken,
                    translation: Point::new(1.0, 0.0),
                },
                None,
            )
            .unwrap_err();
        assert_eq!(err.reason, "Undoable addition");
        assert_eq!(engine.world().body_ids().len(), 1);
        let snapshot = engine.tick().unwrap();
        assert_eq!(snapshot.agents.len(), 1);
    }

    #[test]
    fn test_agent_cannot_be_added_twice() {
        let mut engine = KinematicEngine::new(EngineConfig::default());
        let agent = engine.register_agent(Box::new(Block { bodies: Vec::new() }));
        assert!(engine.perform(&Action::AddAgent { agent }, None).is_ok());
        assert!(engine.perform(&Action::AddAgent { agent }, None).is_err());
        assert_eq!(engine.agent_bodies(agent).map(|b| b.len()), Some(1));
    }

    #[test]
    fn test_rigidly_linked_voxels_fall_together() {
        let mut engine = KinematicEngine::new(EngineConfig::default());
        ground(&mut engine);
        let mut ids = Vec::new();
        for x in [0.0, 1.0] {
            let id = engine
                .perform(
                    &Action::CreateVoxel {
                        side_length: 1.0,
                        mass: 1.0,
                        material: Material::default(),
                    },
                    None,
                )
                .unwrap()
                .as_body()
                .unwrap();
            engine
                .perform(
                    &Action::TranslateBody {
                        body: id,
                        translation: Point::new(x, 3.0),
                    },
                    None,
                )
                .unwrap();
            ids.push(id);
        }
        engine
            .perform(
                &Action::AttractAndLinkClosestAnchorable {
                    anchors: crate::world::side_anchors(ids[0], crate::body::Side::E),
                    link_count: 2,
                    kind: LinkType::Rigid,
                },
                None,
            )
            .unwrap();
        for _ in 0..180 {
            engine.tick().unwrap();
        }
        let world = engine.world();
        let a = world.body(ids[0]).unwrap().poly().center();
        let b = world.body(ids[1]).unwrap().poly().center();
        assert!((b.x - a.x - 1.0).abs() < 1e-6);
        assert!((a.y - 0.5).abs() < 1e-6);
        assert!((b.y - 0.5).abs() < 1e-6);
    }
}
