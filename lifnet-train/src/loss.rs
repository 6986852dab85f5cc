//! Per-sample loss on the spike-count score and its gradient w.r.t. the score.

use lifnet_core::{SnnError, SnnResult};

use crate::config::LossKind;

#[derive(Debug, Clone, PartialEq)]
pub struct LossOutput {
    pub loss: f64,
    /// ∂loss/∂score, one entry per output neuron.
    pub grad: Vec<f64>,
}

fn check_label(score: &[f64], label: usize, classes: usize) -> SnnResult<()> {
    if score.is_empty() {
        return Err(SnnError::shape_mismatch("class score", vec![1], vec![0]));
    }
    if label >= classes {
        return Err(SnnError::config(format!("label {} outside {} classes", label, classes)));
    }
    Ok(())
}

/// Softmax cross-entropy. Uses the max-shifted log-sum-exp so large spike
/// counts do not overflow.
pub fn cross_entropy(score: &[f64], label: usize) -> SnnResult<LossOutput> {
    check_label(score, label, score.len())?;
    let max = score.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = score.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    let log_sum = sum.ln() + max;
    let loss = log_sum - score[label];
    let grad = exps
        .iter()
        .enumerate()
        .map(|(i, e)| e / sum - if i == label { 1.0 } else { 0.0 })
        .collect();
    Ok(LossOutput { loss, grad })
}

/// Mean squared error against the label itself (one output) or its one-hot
/// encoding (several outputs).
pub fn mean_squared(score: &[f64], label: usize) -> SnnResult<LossOutput> {
    let c = score.len();
    check_label(score, label, c.max(2))?;
    let target = |i: usize| {
        if c == 1 {
            label as f64
        } else if i == label {
            1.0
        } else {
            0.0
        }
    };
    let n = c as f64;
    let loss = score.iter().enumerate().map(|(i, s)| (s - target(i)).powi(2)).sum::<f64>() / n;
    let grad = score.iter().enumerate().map(|(i, s)| 2.0 * (s - target(i)) / n).collect();
    Ok(LossOutput { loss, grad })
}

impl LossKind {
    pub fn evaluate(self, score: &[f64], label: usize) -> SnnResult<LossOutput> {
        match self {
            LossKind::CrossEntropy => cross_entropy(score, label),
            LossKind::MeanSquared => mean_squared(score, label),
        }
    }
}
