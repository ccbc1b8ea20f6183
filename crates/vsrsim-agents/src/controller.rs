//! Numerical controllers ("brains")
//!
//! A controller maps time and a fixed-size input vector to a fixed-size output vector.
//! Agents never look inside; they only rely on the declared dimensions.

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionMismatch {
    #[error("controller is {actual_inputs}->{actual_outputs}, expected {expected_inputs}->{expected_outputs}")]
    Io {
        expected_inputs: usize,
        expected_outputs: usize,
        actual_inputs: usize,
        actual_outputs: usize,
    },
    #[error("expected {expected} parameters, got {actual}")]
    Params { expected: usize, actual: usize },
}

pub trait NumericalController {
    fn n_of_inputs(&self) -> usize;

    fn n_of_outputs(&self) -> usize;

    /// Compute outputs at time `t`; `inputs` must have `n_of_inputs()` values
    fn step(&mut self, t: f64, inputs: &[f64]) -> Vec<f64>;

    /// Forget any internal state
    fn reset(&mut self) {}

    fn check_dimension(&self, n_of_inputs: usize, n_of_outputs: usize) -> Result<(), DimensionMismatch> {
        if self.n_of_inputs() != n_of_inputs || self.n_of_outputs() != n_of_outputs {
            return Err(DimensionMismatch::Io {
                expected_inputs: n_of_inputs,
                expected_outputs: n_of_outputs,
                actual_inputs: self.n_of_inputs(),
                actual_outputs: self.n_of_outputs(),
            });
        }
        Ok(())
    }
}

impl<C: NumericalController + ?Sized> NumericalController for Box<C> {
    fn n_of_inputs(&self) -> usize {
        (**self).n_of_inputs()
    }

    fn n_of_outputs(&self) -> usize {
        (**self).n_of_outputs()
    }

    fn step(&mut self, t: f64, inputs: &[f64]) -> Vec<f64> {
        (**self).step(t, inputs)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// Controllers whose behavior is fully described by a flat parameter vector
pub trait Parametrized {
    fn params(&self) -> Vec<f64>;

    fn set_params(&mut self, params: &[f64]) -> Result<(), DimensionMismatch>;
}

fn check_params(expected: usize, actual: usize) -> Result<(), DimensionMismatch> {
    if expected != actual {
        return Err(DimensionMismatch::Params { expected, actual });
    }
    Ok(())
}

// ============================================================================
// Constant
// ============================================================================

/// Always outputs the same values, whatever the inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    n_of_inputs: usize,
    values: Vec<f64>,
}

impl Constant {
    pub fn new(n_of_inputs: usize, values: Vec<f64>) -> Self {
        Self {
            n_of_inputs,
            values,
        }
    }
}

impl NumericalController for Constant {
    fn n_of_inputs(&self) -> usize {
        self.n_of_inputs
    }

    fn n_of_outputs(&self) -> usize {
        self.values.len()
    }

    fn step(&mut self, _t: f64, _inputs: &[f64]) -> Vec<f64> {
        self.values.clone()
    }
}

impl Parametrized for Constant {
    fn params(&self) -> Vec<f64> {
        self.values.clone()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<(), DimensionMismatch> {
        check_params(self.values.len(), params.len())?;
        self.values.copy_from_slice(params);
        Ok(())
    }
}

// ============================================================================
// Sinusoidal
// ============================================================================

/// Which per-output quantities of a [`Sinusoidal`] are exposed as parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinusoidalParam {
    Phase,
    Frequency,
    Amplitude,
}

/// Open-loop oscillator: output `i` is `a_i * sin(2π f_i t + φ_i)`
#[derive(Debug, Clone, PartialEq)]
pub struct Sinusoidal {
    n_of_inputs: usize,
    phases: Vec<f64>,
    frequencies: Vec<f64>,
    amplitudes: Vec<f64>,
    exposed: Vec<SinusoidalParam>,
}

impl Sinusoidal {
    pub fn new(n_of_inputs: usize, n_of_outputs: usize, exposed: &[SinusoidalParam]) -> Self {
        let mut exposed = exposed.to_vec();
        exposed.sort();
        exposed.dedup();
        Self {
            n_of_inputs,
            phases: vec![0.0; n_of_outputs],
            frequencies: vec![1.0; n_of_outputs],
            amplitudes: vec![1.0; n_of_outputs],
            exposed,
        }
    }

    pub fn set_frequencies(&mut self, frequency: f64) {
        self.frequencies.iter_mut().for_each(|f| *f = frequency);
    }

    pub fn set_amplitudes(&mut self, amplitude: f64) {
        self.amplitudes.iter_mut().for_each(|a| *a = amplitude);
    }

    pub fn set_phases(&mut self, phases: &[f64]) -> Result<(), DimensionMismatch> {
        check_params(self.phases.len(), phases.len())?;
        self.phases.copy_from_slice(phases);
        Ok(())
    }

    fn exposed_mut(&mut self, param: SinusoidalParam) -> &mut Vec<f64> {
        match param {
            SinusoidalParam::Phase => &mut self.phases,
            SinusoidalParam::Frequency => &mut self.frequencies,
            SinusoidalParam::Amplitude => &mut self.amplitudes,
        }
    }
}

impl NumericalController for Sinusoidal {
    fn n_of_inputs(&self) -> usize {
        self.n_of_inputs
    }

    fn n_of_outputs(&self) -> usize {
        self.phases.len()
    }

    fn step(&mut self, t: f64, _inputs: &[f64]) -> Vec<f64> {
        (0..self.phases.len())
            .map(|i| {
                self.amplitudes[i]
                    * (2.0 * std::f64::consts::PI * self.frequencies[i] * t + self.phases[i]).sin()
            })
            .collect()
    }
}

impl Parametrized for Sinusoidal {
    fn params(&self) -> Vec<f64> {
        let mut params = Vec::new();
        for param in &self.exposed {
            match param {
                SinusoidalParam::Phase => params.extend(&self.phases),
                SinusoidalParam::Frequency => params.extend(&self.frequencies),
                SinusoidalParam::Amplitude => params.extend(&self.amplitudes),
            }
        }
        params
    }

    fn set_params(&mut self, params: &[f64]) -> Result<(), DimensionMismatch> {
        let n = self.phases.len();
        check_params(n * self.exposed.len(), params.len())?;
        for (k, param) in self.exposed.clone().into_iter().enumerate() {
            self.exposed_mut(param)
                .copy_from_slice(&params[k * n..(k + 1) * n]);
        }
        Ok(())
    }
}

// ============================================================================
// Multi-layer perceptron
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
    Relu,
    Identity,
}

impl Activation {
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Relu => x.max(0.0),
            Activation::Identity => x,
        }
    }
}

/// Fully connected feed-forward network with a bias per neuron
#[derive(Debug, Clone, PartialEq)]
pub struct MultiLayerPerceptron {
    activation: Activation,
    /// One matrix per layer, shaped `(outputs, inputs + 1)`; the last column is the bias
    weights: Vec<Array2<f64>>,
}

impl MultiLayerPerceptron {
    /// Network with all weights at zero
    pub fn new(n_of_inputs: usize, inner_layers: &[usize], n_of_outputs: usize, activation: Activation) -> Self {
        let mut sizes = vec![n_of_inputs];
        sizes.extend_from_slice(inner_layers);
        sizes.push(n_of_outputs);
        let weights = sizes
            .windows(2)
            .map(|w| Array2::zeros((w[1], w[0] + 1)))
            .collect();
        Self {
            activation,
            weights,
        }
    }

    /// Network with weights drawn uniformly from [-1, 1]
    pub fn seeded(
        n_of_inputs: usize,
        inner_layers: &[usize],
        n_of_outputs: usize,
        activation: Activation,
        seed: u64,
    ) -> Self {
        let mut mlp = Self::new(n_of_inputs, inner_layers, n_of_outputs, activation);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        for layer in mlp.weights.iter_mut() {
            layer.mapv_inplace(|_| rng.gen_range(-1.0..=1.0));
        }
        mlp
    }

    /// Inner layer sizes shrinking from the inputs toward a center of `ratio * n_of_inputs`
    /// neurons and back toward the outputs
    pub fn inner_layers_for(n_of_inputs: usize, n_of_outputs: usize, ratio: f64, n_of_layers: usize) -> Vec<usize> {
        let center = ((n_of_inputs as f64 * ratio).round() as i64).max(2);
        let (n_in, n_out) = (n_of_inputs as i64, n_of_outputs as i64);
        if n_of_layers == 0 {
            return Vec::new();
        }
        if n_of_layers == 1 {
            return vec![center as usize];
        }
        let half = n_of_layers as i64 / 2;
        (0..n_of_layers as i64)
            .map(|i| {
                let size = if i < half {
                    n_in + (center - n_in) / (half + 1) * (i + 1)
                } else {
                    center + (n_out - center) / (half + 1) * (i - half)
                };
                size.max(1) as usize
            })
            .collect()
    }

    pub fn n_of_weights(&self) -> usize {
        self.weights.iter().map(|w| w.len()).sum()
    }
}

impl NumericalController for MultiLayerPerceptron {
    fn n_of_inputs(&self) -> usize {
        self.weights.first().map_or(0, |w| w.ncols() - 1)
    }

    fn n_of_outputs(&self) -> usize {
        self.weights.last().map_or(0, |w| w.nrows())
    }

    fn step(&mut self, _t: f64, inputs: &[f64]) -> Vec<f64> {
        let mut x = Array1::from_vec(inputs.to_vec());
        for layer in &self.weights {
            let mut augmented = Array1::ones(x.len() + 1);
            augmented.slice_mut(ndarray::s![..x.len()]).assign(&x);
            x = layer.dot(&augmented).mapv(|v| self.activation.apply(v));
        }
        x.to_vec()
    }
}

impl Parametrized for MultiLayerPerceptron {
    fn params(&self) -> Vec<f64> {
        self.weights.iter().flat_map(|w| w.iter().copied()).collect()
    }

    fn set_params(&mut self, params: &[f64]) -> Result<(), DimensionMismatch> {
        check_params(self.n_of_weights(), params.len())?;
        let mut values = params.iter();
        for layer in self.weights.iter_mut() {
            for (w, v) in layer.iter_mut().zip(&mut values) {
                *w = *v;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Stepped
// ============================================================================

/// Holds the outputs of an inner controller, refreshing them at most every `interval` seconds
#[derive(Debug, Clone, PartialEq)]
pub struct Stepped<C> {
    inner: C,
    interval: f64,
    last: Option<(f64, Vec<f64>)>,
}

impl<C: NumericalController> Stepped<C> {
    pub fn new(inner: C, interval: f64) -> Self {
        Self {
            inner,
            interval,
            last: None,
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: NumericalController> NumericalController for Stepped<C> {
    fn n_of_inputs(&self) -> usize {
        self.inner.n_of_inputs()
    }

    fn n_of_outputs(&self) -> usize {
        self.inner.n_of_outputs()
    }

    fn step(&mut self, t: f64, inputs: &[f64]) -> Vec<f64> {
        match &self.last {
            Some((last_t, outputs)) if t - last_t < self.interval => outputs.clone(),
            _ => {
                let outputs = self.inner.step(t, inputs);
                self.last = Some((t, outputs.clone()));
                outputs
            }
        }
    }

    fn reset(&mut self) {
        self.last = None;
        self.inner.reset();
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Serializable recipe for a controller of yet unknown dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerSpec {
    Mlp {
        inner_layer_ratio: f64,
        n_of_inner_layers: usize,
        activation: Activation,
    },
    Sinusoidal {
        frequency: f64,
        amplitude: f64,
    },
    Constant {
        value: f64,
    },
    Stepped {
        interval: f64,
        inner: Box<ControllerSpec>,
    },
}

impl Default for ControllerSpec {
    fn default() -> Self {
        ControllerSpec::Mlp {
            inner_layer_ratio: 0.65,
            n_of_inner_layers: 1,
            activation: Activation::Tanh,
        }
    }
}

impl ControllerSpec {
    /// Build a controller with the given dimensions; `seed` drives any random initialisation
    pub fn build(&self, n_of_inputs: usize, n_of_outputs: usize, seed: u64) -> Box<dyn NumericalController> {
        match self {
            ControllerSpec::Mlp {
                inner_layer_ratio,
                n_of_inner_layers,
                activation,
            } => {
                let inner = MultiLayerPerceptron::inner_layers_for(
                    n_of_inputs,
                    n_of_outputs,
                    *inner_layer_ratio,
                    *n_of_inner_layers,
                );
                Box::new(MultiLayerPerceptron::seeded(
                    n_of_inputs,
                    &inner,
                    n_of_outputs,
                    *activation,
                    seed,
                ))
            }
            ControllerSpec::Sinusoidal {
                frequency,
                amplitude,
            } => {
                let mut sin = Sinusoidal::new(n_of_inputs, n_of_outputs, &[SinusoidalParam::Phase]);
                sin.set_frequencies(*frequency);
                sin.set_amplitudes(*amplitude);
                Box::new(sin)
            }
            ControllerSpec::Constant { value } => {
                Box::new(Constant::new(n_of_inputs, vec![*value; n_of_outputs]))
            }
            ControllerSpec::Stepped { interval, inner } => Box::new(Stepped::new(
                inner.build(n_of_inputs, n_of_outputs, seed),
                *interval,
            )),
        }
    }
}
