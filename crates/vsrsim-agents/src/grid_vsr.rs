//! Grid voxel robots: voxels placed on a grid, rigidly joined to their neighbours and
//! driven by one centralised controller

use serde::{Deserialize, Serialize};
use vsrsim_core::{
    Action, ActionError, ActionOutcome, ActionPerformer, Agent, AnchorId, BodyId, BrainIo,
    EmbodiedAgent, LinkType, Material, RangedValues, Vertex, Voxel, WorldAccess,
};
use vsrsim_geometry::Point;

use crate::controller::NumericalController;
use crate::error::AgentError;
use crate::grid::Grid;
use crate::io::{fit_outputs, sensed_input, INPUT_RANGE, OUTPUT_RANGE};
use crate::sensor::{Sensor, SensorKind};

pub const VOXEL_SIDE_LENGTH: f64 = 1.0;
pub const VOXEL_MASS: f64 = 1.0;

/// Body plan presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridShape {
    /// Full rectangle
    Box { width: usize, height: usize },
    /// Single row
    Worm { length: usize },
    /// Rectangle with the bottom row hollowed out between two legs
    Biped { width: usize, height: usize },
    /// Biped with a third leg in the middle
    Tripod { width: usize, height: usize },
}

impl GridShape {
    pub fn grid(&self) -> Grid<bool> {
        match *self {
            GridShape::Box { width, height } => Grid::filled(width, height, true),
            GridShape::Worm { length } => Grid::filled(length, 1, true),
            GridShape::Biped { width, height } => {
                Grid::from_fn(width, height, |x, y| y > 0 || x == 0 || x + 1 == width)
            }
            GridShape::Tripod { width, height } => Grid::from_fn(width, height, |x, y| {
                y > 0 || x == 0 || x + 1 == width || x == width / 2
            }),
        }
    }
}

fn parse_size(s: &str) -> Option<(usize, usize)> {
    let (w, h) = s.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

impl std::str::FromStr for GridShape {
    type Err = String;

    /// Parse `box-WxH`, `worm-L`, `biped-WxH` or `tripod-WxH`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let (name, size) = lower
            .split_once('-')
            .ok_or_else(|| format!("Missing size in shape: {}", s))?;
        let bad_size = || format!("Invalid size in shape: {}", s);
        match name {
            "worm" => Ok(GridShape::Worm {
                length: size.parse().map_err(|_| bad_size())?,
            }),
            "box" | "biped" | "tripod" => {
                let (width, height) = parse_size(size).ok_or_else(bad_size)?;
                Ok(match name {
                    "box" => GridShape::Box { width, height },
                    "biped" => GridShape::Biped { width, height },
                    _ => GridShape::Tripod { width, height },
                })
            }
            _ => Err(format!(
                "Unknown shape: {}. Valid: box-WxH, worm-L, biped-WxH, tripod-WxH",
                s
            )),
        }
    }
}

/// Material and sensors of one grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub material: Material,
    pub sensors: Vec<SensorKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridBody {
    cells: Grid<Option<GridCell>>,
}

impl GridBody {
    pub fn new(cells: Grid<Option<GridCell>>) -> Result<Self, AgentError> {
        let mut n = 0;
        for (_, cell) in cells.entries() {
            if let Some(cell) = cell {
                cell.material.validate()?;
                n += 1;
            }
        }
        if n == 0 {
            return Err(AgentError::EmptyBody);
        }
        Ok(Self { cells })
    }

    /// Same material and sensors in every cell of `shape`
    pub fn from_shape(shape: GridShape, material: Material, sensors: &[SensorKind]) -> Result<Self, AgentError> {
        let cells = shape.grid().map(|present| {
            present.then(|| GridCell {
                material,
                sensors: sensors.to_vec(),
            })
        });
        Self::new(cells)
    }

    pub fn cells(&self) -> &Grid<Option<GridCell>> {
        &self.cells
    }

    pub fn n_of_voxels(&self) -> usize {
        self.cells.entries().filter(|(_, c)| c.is_some()).count()
    }

    pub fn n_of_sensors(&self) -> usize {
        self.cells
            .entries()
            .filter_map(|(_, c)| c.as_ref())
            .map(|c| c.sensors.len())
            .sum()
    }
}

/// Grid robot with one controller taking every sensor reading and producing one actuation
/// value per voxel
pub struct NumGridVsr {
    body: GridBody,
    voxel_side_length: f64,
    voxel_mass: f64,
    controller: Box<dyn NumericalController>,
    voxels: Grid<Option<BodyId>>,
    bodies: Vec<BodyId>,
    inputs: Vec<f64>,
    outputs: Vec<f64>,
    /// Input slot of each action emitted last tick
    pending_slots: Vec<Option<usize>>,
}

impl NumGridVsr {
    pub fn new(body: GridBody, controller: Box<dyn NumericalController>) -> Result<Self, AgentError> {
        Self::with_voxels(body, VOXEL_SIDE_LENGTH, VOXEL_MASS, controller)
    }

    pub fn with_voxels(
        body: GridBody,
        voxel_side_length: f64,
        voxel_mass: f64,
        controller: Box<dyn NumericalController>,
    ) -> Result<Self, AgentError> {
        let n_in = Self::n_of_inputs(&body);
        let n_out = Self::n_of_outputs(&body);
        controller.check_dimension(n_in, n_out)?;
        let voxels = body.cells().map(|_| None);
        Ok(Self {
            body,
            voxel_side_length,
            voxel_mass,
            controller,
            voxels,
            bodies: Vec::new(),
            inputs: vec![0.0; n_in],
            outputs: vec![0.0; n_out],
            pending_slots: Vec::new(),
        })
    }

    pub fn n_of_inputs(body: &GridBody) -> usize {
        body.n_of_sensors()
    }

    pub fn n_of_outputs(body: &GridBody) -> usize {
        body.n_of_voxels()
    }

    pub fn body(&self) -> &GridBody {
        &self.body
    }

    fn anchor(&self, x: usize, y: usize, vertex: Vertex) -> Option<AnchorId> {
        self.voxels
            .get(x, y)
            .copied()
            .flatten()
            .map(|id| Voxel::anchor_on(id, vertex))
    }
}

impl Agent for NumGridVsr {
    fn act(&mut self, t: f64, previous: &[ActionOutcome], _world: &dyn WorldAccess) -> Vec<Action> {
        if !previous.is_empty() && previous.len() != self.pending_slots.len() {
            log::warn!(
                "NumGridVsr: got {} outcomes for {} actions",
                previous.len(),
                self.pending_slots.len()
            );
        }
        for (slot, outcome) in self.pending_slots.iter().zip(previous) {
            if let Some(i) = slot {
                if outcome.action.is_sense() {
                    self.inputs[*i] = sensed_input(outcome);
                }
            }
        }

        let outputs = self.controller.step(t, &self.inputs);
        self.outputs = fit_outputs(outputs, self.outputs.len());

        let mut actions = Vec::new();
        let mut slots = Vec::new();
        let mut input = 0;
        for ((x, y), cell) in self.body.cells.entries() {
            let (Some(cell), Some(Some(id))) = (cell, self.voxels.get(x, y)) else {
                continue;
            };
            for sensor in &cell.sensors {
                actions.push(sensor.apply(*id));
                slots.push(Some(input));
                input += 1;
            }
        }
        for (output, id) in self.bodies.iter().enumerate() {
            actions.push(Action::actuate_uniform(*id, self.outputs[output]));
            slots.push(None);
        }
        self.pending_slots = slots;
        actions
    }

    fn brain_ios(&self) -> Vec<BrainIo> {
        vec![BrainIo {
            inputs: RangedValues::new(self.inputs.clone(), INPUT_RANGE),
            outputs: RangedValues::new(self.outputs.clone(), OUTPUT_RANGE),
        }]
    }
}

impl EmbodiedAgent for NumGridVsr {
    fn assemble(&mut self, performer: &mut dyn ActionPerformer) -> Result<(), ActionError> {
        let l = self.voxel_side_length;
        let cells: Vec<((usize, usize), Material)> = self
            .body
            .cells
            .entries()
            .filter_map(|(k, c)| c.as_ref().map(|c| (k, c.material)))
            .collect();
        for ((x, y), material) in cells {
            let create = Action::CreateVoxel {
                side_length: l,
                mass: self.voxel_mass,
                material,
            };
            let id = performer
                .perform(&create, None)?
                .as_body()
                .ok_or_else(|| ActionError::new(create.clone(), "no body created"))?;
            performer.perform(
                &Action::TranslateBody {
                    body: id,
                    translation: Point::new(x as f64 * l + l / 2.0, y as f64 * l + l / 2.0),
                },
                None,
            )?;
            self.voxels.set(x, y, Some(id));
            self.bodies.push(id);
        }

        let mut pairs = Vec::new();
        for y in 0..self.voxels.height() {
            for x in 0..self.voxels.width() {
                pairs.push((self.anchor(x, y, Vertex::NE), self.anchor(x + 1, y, Vertex::NW)));
                pairs.push((self.anchor(x, y, Vertex::SE), self.anchor(x + 1, y, Vertex::SW)));
                pairs.push((self.anchor(x, y, Vertex::NW), self.anchor(x, y + 1, Vertex::SW)));
                pairs.push((self.anchor(x, y, Vertex::NE), self.anchor(x, y + 1, Vertex::SE)));
            }
        }
        for (source, target) in pairs {
            if let (Some(source), Some(target)) = (source, target) {
                performer.perform(
                    &Action::CreateLink {
                        source,
                        target,
                        kind: LinkType::Rigid,
                    },
                    None,
                )?;
            }
        }
        log::debug!("NumGridVsr: assembled {} voxels", self.bodies.len());
        Ok(())
    }

    fn body_parts(&self) -> &[BodyId] {
        &self.bodies
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Constant;

    #[test]
    fn test_parse_shapes() {
        assert_eq!(
            "box-3x2".parse::<GridShape>(),
            Ok(GridShape::Box {
                width: 3,
                height: 2
            })
        );
        assert_eq!("Worm-5".parse::<GridShape>(), Ok(GridShape::Worm { length: 5 }));
        assert!("biped-3".parse::<GridShape>().is_err());
        assert!("blob-3x3".parse::<GridShape>().is_err());
    }

    #[test]
    fn test_shape_cells() {
        let biped = GridShape::Biped {
            width: 4,
            height: 2,
        }
        .grid();
        let count = biped.entries().filter(|(_, v)| **v).count();
        assert_eq!(count, 6);
        assert_eq!(biped.get(1, 0), Some(&false));
        let tripod = GridShape::Tripod {
            width: 5,
            height: 2,
        }
        .grid();
        assert_eq!(tripod.get(2, 0), Some(&true));
    }

    #[test]
    fn test_dimension_mismatch_fails_construction() {
        let body = GridBody::from_shape(
            GridShape::Worm { length: 3 },
            Material::default(),
            &[SensorKind::AreaRatio, SensorKind::Contact],
        )
        .unwrap();
        assert_eq!(NumGridVsr::n_of_inputs(&body), 6);
        assert_eq!(NumGridVsr::n_of_outputs(&body), 3);
        let ok = NumGridVsr::new(body.clone(), Box::new(Constant::new(6, vec![0.0; 3])));
        assert!(ok.is_ok());
        let bad = NumGridVsr::new(body, Box::new(Constant::new(6, vec![0.0; 4])));
        assert!(matches!(bad, Err(AgentError::Dimension(_))));
    }

    #[test]
    fn test_empty_body_is_rejected() {
        let cells = Grid::filled(2, 2, None);
        assert_eq!(GridBody::new(cells), Err(AgentError::EmptyBody));
    }
}
