//! Per-sample simulation history. Doubles as the tape the backward pass walks.

use crate::matrix::Matrix;
use crate::neuron::LayerStep;

#[derive(Debug, Clone, PartialEq)]
pub struct LayerRecord {
    pub spikes: Vec<f64>,
    /// Pre-reset potential.
    pub potential: Vec<f64>,
    /// Post-reset membrane, as carried into the next step.
    pub mem: Vec<f64>,
}

impl From<&LayerStep> for LayerRecord {
    fn from(step: &LayerStep) -> Self {
        Self {
            spikes: step.spikes.clone(),
            potential: step.potentials.clone(),
            mem: step.state.potentials().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Input vector presented at this step (static value or encoded spikes).
    pub input: Vec<f64>,
    pub hidden: LayerRecord,
    pub output: LayerRecord,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationTrace {
    steps: Vec<StepRecord>,
}

impl SimulationTrace {
    pub fn with_capacity(num_steps: usize) -> Self {
        Self { steps: Vec::with_capacity(num_steps) }
    }

    pub fn push(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn step(&self, t: usize) -> Option<&StepRecord> {
        self.steps.get(t)
    }

    /// Class score: total output spikes per neuron over the horizon.
    pub fn score(&self) -> Vec<f64> {
        let width = self.steps.first().map_or(0, |s| s.output.spikes.len());
        let mut score = vec![0.0; width];
        for record in &self.steps {
            for (acc, s) in score.iter_mut().zip(&record.output.spikes) {
                *acc += s;
            }
        }
        score
    }

    pub fn hidden_spike_count(&self) -> f64 {
        self.steps.iter().flat_map(|r| &r.hidden.spikes).sum()
    }

    /// Inputs of every step, concatenated (`T × n_in` values).
    pub fn flat_inputs(&self) -> Vec<f64> {
        self.steps.iter().flat_map(|r| r.input.iter().copied()).collect()
    }

    /// Output spikes as a `[T × C]` matrix.
    pub fn output_spikes(&self) -> Matrix {
        let width = self.steps.first().map_or(0, |s| s.output.spikes.len());
        let mut m = Matrix::zeros(self.steps.len(), width);
        for (t, record) in self.steps.iter().enumerate() {
            m.data_mut()[t * width..(t + 1) * width].copy_from_slice(&record.output.spikes);
        }
        m
    }
}
