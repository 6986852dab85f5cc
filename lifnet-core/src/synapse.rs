//! Dense synaptic projection: weight matrix plus bias.

use rand::Rng;

use crate::error::{SnnError, SnnResult};
use crate::matrix::Matrix;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SynapticWeights {
    weights: Matrix,
    bias: Vec<f64>,
}

impl SynapticWeights {
    /// `weights` is `[outputs × inputs]`, `bias` has one entry per output.
    pub fn new(weights: Matrix, bias: Vec<f64>) -> SnnResult<Self> {
        if bias.len() != weights.rows() {
            return Err(SnnError::shape_mismatch("bias", vec![weights.rows()], vec![bias.len()]));
        }
        Ok(Self { weights, bias })
    }

    pub fn zeros(outputs: usize, inputs: usize) -> Self {
        Self { weights: Matrix::zeros(outputs, inputs), bias: vec![0.0; outputs] }
    }

    /// Weights and biases drawn from U(−1/√in, 1/√in).
    pub fn uniform<R: Rng + ?Sized>(outputs: usize, inputs: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (inputs.max(1) as f64).sqrt();
        let mut weights = Matrix::zeros(outputs, inputs);
        for w in weights.data_mut() {
            *w = rng.gen_range(-bound..bound);
        }
        let bias = (0..outputs).map(|_| rng.gen_range(-bound..bound)).collect();
        Self { weights, bias }
    }

    pub fn inputs(&self) -> usize {
        self.weights.cols()
    }

    pub fn outputs(&self) -> usize {
        self.weights.rows()
    }

    pub fn weights(&self) -> &Matrix {
        &self.weights
    }

    pub fn bias(&self) -> &[f64] {
        &self.bias
    }

    /// Mutable views of (weights, bias) for the optimizer.
    pub fn params_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (self.weights.data_mut(), &mut self.bias)
    }

    /// Input current `W·x + b`.
    pub fn current(&self, input: &[f64]) -> SnnResult<Vec<f64>> {
        let mut out = self.weights.mul_vec(input)?;
        for (o, b) in out.iter_mut().zip(&self.bias) {
            *o += b;
        }
        Ok(out)
    }

    /// Copy with every weight and bias passed through `f`.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            weights: self.weights.map(&f),
            bias: self.bias.iter().map(|&b| f(b)).collect(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.weights.data().iter().chain(&self.bias).all(|v| v.is_finite())
    }
}
