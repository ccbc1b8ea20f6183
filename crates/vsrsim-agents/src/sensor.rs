//! Sensors: functions from a body to the sense action reading it

use serde::{Deserialize, Serialize};
use vsrsim_core::{Action, BodyId, Side};

pub trait Sensor {
    /// Sense action bound to `body`, evaluated fresh every tick
    fn apply(&self, body: BodyId) -> Action;
}

impl<F: Fn(BodyId) -> Action> Sensor for F {
    fn apply(&self, body: BodyId) -> Action {
        self(body)
    }
}

/// Sensors available to voxel agents
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    AreaRatio,
    Contact,
    /// Velocity projected on the axis at `angle` radians
    Velocity { angle: f64 },
    SideAttachment { side: Side },
    SideCompression { side: Side },
}

impl SensorKind {
    pub const VELOCITY_X: SensorKind = SensorKind::Velocity { angle: 0.0 };
    pub const VELOCITY_Y: SensorKind = SensorKind::Velocity {
        angle: std::f64::consts::FRAC_PI_2,
    };

    /// One side-attachment sensor per side, in side order
    pub fn side_attachments() -> Vec<SensorKind> {
        Side::ALL
            .iter()
            .map(|side| SensorKind::SideAttachment { side: *side })
            .collect()
    }
}

impl Sensor for SensorKind {
    fn apply(&self, body: BodyId) -> Action {
        match self {
            SensorKind::AreaRatio => Action::SenseAreaRatio { body },
            SensorKind::Contact => Action::SenseContact { body },
            SensorKind::Velocity { angle } => Action::SenseVelocity {
                body,
                direction: *angle,
            },
            SensorKind::SideAttachment { side } => Action::SenseSideAttachment { body, side: *side },
            SensorKind::SideCompression { side } => Action::SenseSideCompression { body, side: *side },
        }
    }
}

fn parse_side(s: &str) -> Option<Side> {
    match s {
        "n" => Some(Side::N),
        "e" => Some(Side::E),
        "s" => Some(Side::S),
        "w" => Some(Side::W),
        _ => None,
    }
}

impl std::str::FromStr for SensorKind {
    type Err = String;

    /// Parse `ar`, `c`, `vx`, `vy`, `sa-<side>` or `sc-<side>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        match lower.split_once('-') {
            None => match lower.as_str() {
                "ar" | "area_ratio" => Ok(SensorKind::AreaRatio),
                "c" | "contact" => Ok(SensorKind::Contact),
                "vx" => Ok(SensorKind::VELOCITY_X),
                "vy" => Ok(SensorKind::VELOCITY_Y),
                _ => Err(format!(
                    "Unknown sensor: {}. Valid: ar, c, vx, vy, sa-<n|e|s|w>, sc-<n|e|s|w>",
                    s
                )),
            },
            Some((kind, side)) => {
                let side = parse_side(side).ok_or_else(|| format!("Unknown side in sensor: {}", s))?;
                match kind {
                    "sa" => Ok(SensorKind::SideAttachment { side }),
                    "sc" => Ok(SensorKind::SideCompression { side }),
                    _ => Err(format!("Unknown sensor: {}", s)),
                }
            }
        }
    }
}
