//! Numerical I/O layout shared by voxel agents
//!
//! Sensed values reach controllers denormalized into [`INPUT_RANGE`]; controller outputs
//! are clipped into [`OUTPUT_RANGE`] before they become actions.

use serde::{Deserialize, Serialize};
use vsrsim_core::{ActionOutcome, Side};
use vsrsim_geometry::DoubleRange;

pub const INPUT_RANGE: DoubleRange = DoubleRange::SYMMETRIC_UNIT;
pub const OUTPUT_RANGE: DoubleRange = DoubleRange::SYMMETRIC_UNIT;

/// Attach outputs above this value request an attachment, below its opposite a detachment
pub const ATTACH_THRESHOLD: f64 = 0.25;

/// Controller input for the outcome of a sense action; an absent outcome reads as zero
pub fn sensed_input(outcome: &ActionOutcome) -> f64 {
    let value = outcome.sensed().unwrap_or(0.0);
    match outcome.action.range() {
        Some(range) => INPUT_RANGE.denormalize(range.normalize(value)),
        None => INPUT_RANGE.clip(value),
    }
}

/// Clip `outputs` into the output range and force them to length `n`
pub fn fit_outputs(mut outputs: Vec<f64>, n: usize) -> Vec<f64> {
    if outputs.len() != n {
        log::warn!(
            "Controller produced {} outputs, expected {}; padding/truncating",
            outputs.len(),
            n
        );
        outputs.resize(n, 0.0);
    }
    outputs.iter_mut().for_each(|o| *o = OUTPUT_RANGE.clip(*o));
    outputs
}

/// Input/output layout of one self-assembling unit
///
/// Inputs: the unit's sensors, then one near-field value per side and signal channel.
/// Outputs: actuation, then attach outputs (one per side, or one for all sides), then
/// communication outputs (one per side and channel, or one per channel for all sides).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfAssemblyIo {
    pub n_sensors: usize,
    pub n_signals: usize,
    pub directional_communication: bool,
    pub directional_attach: bool,
}

impl SelfAssemblyIo {
    pub const ACTUATION_INDEX: usize = 0;

    pub fn n_of_inputs(&self) -> usize {
        self.n_sensors + 4 * self.n_signals
    }

    pub fn n_of_outputs(&self) -> usize {
        let communication = if self.directional_communication {
            4 * self.n_signals
        } else {
            self.n_signals
        };
        let attach = if self.directional_attach { 4 } else { 1 };
        communication + attach + 1
    }

    pub fn attach_index(&self, side: Side) -> usize {
        if self.directional_attach {
            1 + side.index()
        } else {
            1
        }
    }

    fn communication_start(&self) -> usize {
        if self.directional_attach {
            5
        } else {
            2
        }
    }

    /// Output index of the signal sent on `channel` through `side`
    pub fn signal_index(&self, side: Side, channel: usize) -> usize {
        if self.directional_communication {
            self.communication_start() + side.index() * self.n_signals + channel
        } else {
            self.communication_start() + channel
        }
    }

    /// Input index of the signal received on `channel` through `side`
    pub fn nfc_input_index(&self, side: Side, channel: usize) -> usize {
        self.n_sensors + side.index() * self.n_signals + channel
    }
}
