//! Time-indexed observations produced by a task run

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vsrsim_geometry::DoubleRange;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutcomeError {
    #[error("observation at t={t} does not follow the last one at t={last}")]
    NonIncreasingTime { t: f64, last: f64 },
    #[error("observation time must be finite, got {0}")]
    NonFiniteTime(f64),
    #[error("no observations: cannot compute {0}")]
    Empty(&'static str),
}

/// Observations keyed by strictly increasing simulation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome<O> {
    observations: BTreeMap<OrderedFloat<f64>, O>,
}

impl<O> Default for Outcome<O> {
    fn default() -> Self {
        Self {
            observations: BTreeMap::new(),
        }
    }
}

impl<O> Outcome<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation; `t` must be later than every recorded time
    pub fn insert(&mut self, t: f64, observation: O) -> Result<(), OutcomeError> {
        if !t.is_finite() {
            return Err(OutcomeError::NonFiniteTime(t));
        }
        if let Some(last) = self.last_time() {
            if t <= last {
                return Err(OutcomeError::NonIncreasingTime { t, last });
            }
        }
        self.observations.insert(OrderedFloat(t), observation);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.keys().map(|t| t.0)
    }

    pub fn observations(&self) -> impl Iterator<Item = (f64, &O)> {
        self.observations.iter().map(|(t, o)| (t.0, o))
    }

    pub fn first(&self) -> Option<(f64, &O)> {
        self.observations.iter().next().map(|(t, o)| (t.0, o))
    }

    pub fn last(&self) -> Option<(f64, &O)> {
        self.observations.iter().next_back().map(|(t, o)| (t.0, o))
    }

    fn last_time(&self) -> Option<f64> {
        self.observations.keys().next_back().map(|t| t.0)
    }

    /// Mean of `f` over all observations
    pub fn average(&self, what: &'static str, f: impl Fn(&O) -> f64) -> Result<f64, OutcomeError> {
        if self.observations.is_empty() {
            return Err(OutcomeError::Empty(what));
        }
        let sum: f64 = self.observations.values().map(f).sum();
        Ok(sum / self.observations.len() as f64)
    }
}

impl<O: Clone> Outcome<O> {
    /// Observations with time inside `range`, bounds included
    pub fn sub_outcome(&self, range: DoubleRange) -> Self {
        let (min, max) = (OrderedFloat(range.min), OrderedFloat(range.max));
        if min > max {
            return Self::default();
        }
        Self {
            observations: self
                .observations
                .range(min..=max)
                .map(|(t, o)| (*t, o.clone()))
                .collect(),
        }
    }
}
