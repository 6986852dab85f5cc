//! Read-only evaluation: class prediction from spike counts, accuracy, and
//! the `[samples × C]` output matrix the comparator consumes.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use lifnet_core::{Matrix, SnnError, SnnResult, SpikingNetwork, TemporalSimulator};

use crate::dataset::Dataset;

/// Arg-max of the score with ties going to the lowest index. A single-output
/// network predicts class 1 when its score reaches 0.5.
pub fn predict(score: &[f64]) -> usize {
    if let [only] = score {
        return usize::from(*only >= 0.5);
    }
    let mut best = 0;
    for (i, &s) in score.iter().enumerate().skip(1) {
        if s > score[best] {
            best = i;
        }
    }
    best
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub accuracy: f64,
    pub correct: usize,
    pub total: usize,
    pub predictions: Vec<usize>,
    /// Summed output spikes per sample.
    pub outputs: Matrix,
}

pub struct Evaluator<'a> {
    network: &'a SpikingNetwork,
    seed: u64,
}

impl<'a> Evaluator<'a> {
    /// `seed` only matters for rate-encoded networks.
    pub fn new(network: &'a SpikingNetwork, seed: u64) -> Self {
        Self { network, seed }
    }

    pub fn evaluate(&self, dataset: &Dataset) -> SnnResult<Evaluation> {
        if dataset.is_empty() {
            return Err(SnnError::data_format("dataset", 1, "no samples to evaluate"));
        }
        let simulator = TemporalSimulator::new(self.network)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let width = self.network.num_outputs();
        let mut outputs = Matrix::zeros(dataset.len(), width);
        let mut predictions = Vec::with_capacity(dataset.len());
        let mut correct = 0;

        for (i, sample) in dataset.iter().enumerate() {
            let trace = simulator.simulate(&[sample.feature], &mut rng).map_err(|e| e.in_sample(i))?;
            let score = trace.score();
            outputs.data_mut()[i * width..(i + 1) * width].copy_from_slice(&score);
            let predicted = predict(&score);
            if predicted == sample.label {
                correct += 1;
            }
            predictions.push(predicted);
        }

        if outputs.data().iter().all(|&s| s == 0.0) {
            warn!(samples = dataset.len(), "output layer never fired; predictions are all class 0");
        }
        let total = dataset.len();
        let accuracy = correct as f64 / total as f64;
        info!(correct, total, accuracy = accuracy * 100.0, "evaluation complete");
        Ok(Evaluation { accuracy, correct, total, predictions, outputs })
    }
}
