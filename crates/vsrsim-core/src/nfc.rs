//! Near-field messages
//!
//! Messages emitted during a tick become readable during the next one.

use serde::{Deserialize, Serialize};
use vsrsim_geometry::{DoubleRange, Point};

use crate::ids::BodyId;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NfcMessage {
    pub source: BodyId,
    /// Absolute emission point
    pub position: Point,
    pub direction: f64,
    pub channel: usize,
    pub value: f64,
}

#[derive(Debug, Clone, Default)]
pub struct NfcBuffer {
    pending: Vec<NfcMessage>,
    delivered: Vec<NfcMessage>,
}

impl NfcBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, message: NfcMessage) {
        self.pending.push(NfcMessage {
            value: DoubleRange::SYMMETRIC_UNIT.clip(message.value),
            ..message
        });
    }

    /// Make last tick's emissions readable and drop the ones read during it
    pub fn swap(&mut self) {
        self.delivered = std::mem::take(&mut self.pending);
    }

    pub fn delivered(&self) -> &[NfcMessage] {
        &self.delivered
    }

    /// Value of the closest delivered message facing the receiver on `channel`, 0 if none
    ///
    /// A message faces the receiver when it was emitted by another body within `range` of
    /// `position`, pointing roughly against `direction`.
    pub fn receive(
        &self,
        body: BodyId,
        position: Point,
        direction: f64,
        channel: usize,
        range: f64,
    ) -> f64 {
        self.delivered
            .iter()
            .filter(|m| m.channel == channel && m.source != body)
            .filter(|m| (m.direction - direction).cos() < 0.0)
            .map(|m| (m.position.distance(position), m))
            .filter(|(d, _)| *d <= range)
            .fold(None, |best: Option<(f64, &NfcMessage)>, (d, m)| match best {
                Some((bd, _)) if bd <= d => best,
                _ => Some((d, m)),
            })
            .map(|(_, m)| m.value)
            .unwrap_or(0.0)
    }
}
