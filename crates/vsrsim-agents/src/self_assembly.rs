//! Self-assembling voxel robots
//!
//! Every unit is a free voxel with its own brain. Units talk to whatever touches them
//! through near-field messages and decide, side by side, whether to attach to a neighbour
//! or to let go of it.

use serde::{Deserialize, Serialize};
use vsrsim_core::{
    Action, ActionError, ActionOutcome, ActionPerformer, Agent, BodyId, BrainIo, EmbodiedAgent,
    LinkType, Material, RangedValues, Side, Voxel, WorldAccess,
};
use vsrsim_geometry::{Point, PointExt};

use crate::controller::{ControllerSpec, NumericalController};
use crate::error::AgentError;
use crate::io::{fit_outputs, sensed_input, SelfAssemblyIo, ATTACH_THRESHOLD, INPUT_RANGE, OUTPUT_RANGE};
use crate::sensor::{Sensor, SensorKind};

/// Construction parameters of a [`NumSelfAssemblyVsr`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfAssemblyConfig {
    pub units: usize,
    pub material: Material,
    pub voxel_side_length: f64,
    pub voxel_mass: f64,
    /// Gap between consecutive units of the initial row
    pub unit_spacing: f64,
    pub n_signals: usize,
    pub directional_communication: bool,
    pub directional_attach: bool,
    /// Sensors shared by every unit without its own list
    pub sensors: Vec<SensorKind>,
    /// One sensor list per unit, overriding `sensors`
    pub unit_sensors: Option<Vec<Vec<SensorKind>>>,
    /// Kind of link created by attach requests
    pub link_type: LinkType,
    pub controller: ControllerSpec,
}

impl Default for SelfAssemblyConfig {
    fn default() -> Self {
        Self {
            units: 4,
            material: Material::default(),
            voxel_side_length: 1.0,
            voxel_mass: 1.0,
            unit_spacing: 0.1,
            n_signals: 1,
            directional_communication: true,
            directional_attach: true,
            sensors: {
                let mut sensors = vec![SensorKind::AreaRatio, SensorKind::Contact];
                sensors.extend(SensorKind::side_attachments());
                sensors
            },
            unit_sensors: None,
            link_type: LinkType::Soft,
            controller: ControllerSpec::default(),
        }
    }
}

impl SelfAssemblyConfig {
    /// Layout of a unit using the shared sensor list
    pub fn io(&self) -> SelfAssemblyIo {
        self.io_with(self.sensors.len())
    }

    /// Sensors of unit `unit`
    pub fn sensors_of(&self, unit: usize) -> &[SensorKind] {
        match &self.unit_sensors {
            Some(lists) => lists.get(unit).map_or(&self.sensors[..], |l| &l[..]),
            None => &self.sensors,
        }
    }

    /// Layout of unit `unit`, sized by its own sensor list
    pub fn unit_io(&self, unit: usize) -> SelfAssemblyIo {
        self.io_with(self.sensors_of(unit).len())
    }

    fn io_with(&self, n_sensors: usize) -> SelfAssemblyIo {
        SelfAssemblyIo {
            n_sensors,
            n_signals: self.n_signals,
            directional_communication: self.directional_communication,
            directional_attach: self.directional_attach,
        }
    }
}

struct Unit {
    brain: Box<dyn NumericalController>,
    io: SelfAssemblyIo,
    sensors: Vec<SensorKind>,
    body: Option<BodyId>,
    inputs: Vec<f64>,
    outputs: Vec<f64>,
}

pub struct NumSelfAssemblyVsr {
    config: SelfAssemblyConfig,
    units: Vec<Unit>,
    bodies: Vec<BodyId>,
    /// `(unit, input index)` fed by each action emitted last tick
    pending_slots: Vec<Option<(usize, usize)>>,
}

impl NumSelfAssemblyVsr {
    /// One brain per unit; every brain must fit the I/O layout of its unit
    pub fn new(config: SelfAssemblyConfig, brains: Vec<Box<dyn NumericalController>>) -> Result<Self, AgentError> {
        config.material.validate()?;
        if brains.len() != config.units {
            return Err(AgentError::BrainCount {
                expected: config.units,
                actual: brains.len(),
            });
        }
        if let Some(lists) = &config.unit_sensors {
            if lists.len() != config.units {
                return Err(AgentError::SensorListCount {
                    expected: config.units,
                    actual: lists.len(),
                });
            }
        }
        let mut units = Vec::with_capacity(brains.len());
        for (i, brain) in brains.into_iter().enumerate() {
            let io = config.unit_io(i);
            brain.check_dimension(io.n_of_inputs(), io.n_of_outputs())?;
            units.push(Unit {
                brain,
                io,
                sensors: config.sensors_of(i).to_vec(),
                body: None,
                inputs: vec![0.0; io.n_of_inputs()],
                outputs: vec![0.0; io.n_of_outputs()],
            });
        }
        Ok(Self {
            config,
            units,
            bodies: Vec::new(),
            pending_slots: Vec::new(),
        })
    }

    /// Brains built from the configured `ControllerSpec`, unit `i` seeded with `seed + i`
    pub fn from_config(config: SelfAssemblyConfig, seed: u64) -> Result<Self, AgentError> {
        let brains = (0..config.units)
            .map(|i| {
                let io = config.unit_io(i);
                config
                    .controller
                    .build(io.n_of_inputs(), io.n_of_outputs(), seed.wrapping_add(i as u64))
            })
            .collect();
        Self::new(config, brains)
    }

    /// I/O layout of unit `unit`
    pub fn io(&self, unit: usize) -> Option<&SelfAssemblyIo> {
        self.units.get(unit).map(|u| &u.io)
    }

    /// Side midpoint relative to the voxel center, read from the world when possible
    fn side_displacement(&self, world: &dyn WorldAccess, body: BodyId, side: Side) -> Point {
        match world.body(body).and_then(|b| b.as_voxel()) {
            Some(voxel) => voxel.side(side).center() - voxel.center(),
            None => {
                let angle = side.normal_angle();
                Point::new(angle.cos(), angle.sin()) * (self.config.voxel_side_length / 2.0)
            }
        }
    }

    fn read_inputs(&mut self, previous: &[ActionOutcome]) {
        if !previous.is_empty() && previous.len() != self.pending_slots.len() {
            log::warn!(
                "NumSelfAssemblyVsr: got {} outcomes for {} actions",
                previous.len(),
                self.pending_slots.len()
            );
        }
        for (slot, outcome) in self.pending_slots.iter().zip(previous) {
            let Some((unit, index)) = slot else {
                continue;
            };
            if outcome.action.is_sense() {
                self.units[*unit].inputs[*index] = sensed_input(outcome);
            }
        }
    }
}

impl Agent for NumSelfAssemblyVsr {
    fn act(&mut self, t: f64, previous: &[ActionOutcome], world: &dyn WorldAccess) -> Vec<Action> {
        self.read_inputs(previous);

        for unit in self.units.iter_mut() {
            let outputs = unit.brain.step(t, &unit.inputs);
            unit.outputs = fit_outputs(outputs, unit.io.n_of_outputs());
        }

        let bodies: Vec<(usize, BodyId)> = self
            .units
            .iter()
            .enumerate()
            .filter_map(|(i, u)| u.body.map(|b| (i, b)))
            .collect();
        let mut actions = Vec::new();
        let mut slots = Vec::new();

        // sensors
        for (i, body) in &bodies {
            for (k, sensor) in self.units[*i].sensors.iter().enumerate() {
                actions.push(sensor.apply(*body));
                slots.push(Some((*i, k)));
            }
        }
        // actuation
        for (i, body) in &bodies {
            let value = self.units[*i].outputs[SelfAssemblyIo::ACTUATION_INDEX];
            actions.push(Action::actuate_uniform(*body, value));
            slots.push(None);
        }
        // attach and detach
        for side in Side::ALL {
            for (i, body) in &bodies {
                let unit = &self.units[*i];
                let m = unit.outputs[unit.io.attach_index(side)];
                let anchors = Voxel::anchors_on(*body, side).to_vec();
                if m > ATTACH_THRESHOLD {
                    actions.push(Action::AttractAndLinkClosestAnchorable {
                        anchors,
                        link_count: 1,
                        kind: self.config.link_type,
                    });
                    slots.push(None);
                } else if m < -ATTACH_THRESHOLD {
                    actions.push(Action::DetachAnchors { anchors });
                    slots.push(None);
                }
            }
        }
        // communication
        for side in Side::ALL {
            for (i, body) in &bodies {
                let displacement = self.side_displacement(world, *body, side);
                let direction = displacement.direction();
                let io = self.units[*i].io;
                for channel in 0..io.n_signals {
                    actions.push(Action::EmitNfcMessage {
                        body: *body,
                        displacement,
                        direction,
                        channel,
                        value: self.units[*i].outputs[io.signal_index(side, channel)],
                    });
                    slots.push(None);
                    actions.push(Action::SenseNfc {
                        body: *body,
                        displacement,
                        direction,
                        channel,
                    });
                    slots.push(Some((*i, io.nfc_input_index(side, channel))));
                }
            }
        }

        self.pending_slots = slots;
        actions
    }

    fn brain_ios(&self) -> Vec<BrainIo> {
        self.units
            .iter()
            .map(|u| BrainIo {
                inputs: RangedValues::new(u.inputs.clone(), INPUT_RANGE),
                outputs: RangedValues::new(u.outputs.clone(), OUTPUT_RANGE),
            })
            .collect()
    }
}

impl EmbodiedAgent for NumSelfAssemblyVsr {
    fn assemble(&mut self, performer: &mut dyn ActionPerformer) -> Result<(), ActionError> {
        let l = self.config.voxel_side_length;
        let pitch = l + self.config.unit_spacing;
        for (i, unit) in self.units.iter_mut().enumerate() {
            let create = Action::CreateVoxel {
                side_length: l,
                mass: self.config.voxel_mass,
                material: self.config.material,
            };
            let id = performer
                .perform(&create, None)?
                .as_body()
                .ok_or_else(|| ActionError::new(create.clone(), "no body created"))?;
            performer.perform(
                &Action::TranslateBody {
                    body: id,
                    translation: Point::new(l / 2.0 + i as f64 * pitch, l / 2.0),
                },
                None,
            )?;
            unit.body = Some(id);
            self.bodies.push(id);
        }
        log::debug!("NumSelfAssemblyVsr: assembled {} units", self.bodies.len());
        Ok(())
    }

    fn body_parts(&self) -> &[BodyId] {
        &self.bodies
    }
}
