//! First-order optimizers over the network's flat parameter tensors.

use lifnet_core::{SnnError, SnnResult};

use crate::config::OptimizerConfig;

/// Per-tensor optimizer memory: velocity for SGD, first and second moments for Adam.
#[derive(Debug, Clone, PartialEq)]
struct Slot {
    first: Vec<f64>,
    second: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Optimizer {
    config: OptimizerConfig,
    learning_rate: f64,
    slots: Vec<Slot>,
    t: u64,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig, learning_rate: f64) -> SnnResult<Self> {
        config.validate()?;
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(SnnError::config(format!("learning rate must be positive, got {}", learning_rate)));
        }
        Ok(Self { config, learning_rate, slots: Vec::new(), t: 0 })
    }

    pub fn config(&self) -> OptimizerConfig {
        self.config
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// Apply one update. `params[i]` and `grads[i]` must have equal lengths,
    /// and the tensor layout must stay the same across calls.
    pub fn step(&mut self, params: &mut [&mut [f64]], grads: &[&[f64]]) -> SnnResult<()> {
        if params.len() != grads.len() {
            return Err(SnnError::shape_mismatch("optimizer tensors", vec![params.len()], vec![grads.len()]));
        }
        for (p, g) in params.iter().zip(grads) {
            if p.len() != g.len() {
                return Err(SnnError::shape_mismatch("optimizer gradient", vec![p.len()], vec![g.len()]));
            }
        }
        if self.slots.is_empty() {
            self.slots = params
                .iter()
                .map(|p| Slot { first: vec![0.0; p.len()], second: vec![0.0; p.len()] })
                .collect();
        } else if self.slots.len() != params.len()
            || self.slots.iter().zip(params.iter()).any(|(s, p)| s.first.len() != p.len())
        {
            return Err(SnnError::shape_mismatch(
                "optimizer state",
                self.slots.iter().map(|s| s.first.len()).collect(),
                params.iter().map(|p| p.len()).collect(),
            ));
        }

        self.t += 1;
        let lr = self.learning_rate;
        match self.config {
            OptimizerConfig::Sgd { momentum } => {
                for ((param, grad), slot) in params.iter_mut().zip(grads).zip(&mut self.slots) {
                    for ((p, &g), v) in param.iter_mut().zip(grad.iter()).zip(&mut slot.first) {
                        *v = momentum * *v - lr * g;
                        *p += *v;
                    }
                }
            }
            OptimizerConfig::Adam { beta1, beta2, epsilon } => {
                let t = self.t as f64;
                let bc1 = 1.0 - beta1.powf(t);
                let bc2 = 1.0 - beta2.powf(t);
                for ((param, grad), slot) in params.iter_mut().zip(grads).zip(&mut self.slots) {
                    for (((p, &g), m), v) in
                        param.iter_mut().zip(grad.iter()).zip(&mut slot.first).zip(&mut slot.second)
                    {
                        *m = beta1 * *m + (1.0 - beta1) * g;
                        *v = beta2 * *v + (1.0 - beta2) * g * g;
                        let m_hat = *m / bc1;
                        let v_hat = *v / bc2;
                        *p -= lr * m_hat / (v_hat.sqrt() + epsilon);
                    }
                }
            }
        }
        Ok(())
    }
}
