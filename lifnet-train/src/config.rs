//! Training hyper-parameters. `Default` is a
//! 1-10-2 network, β = 0.8, T = 20, static input, Adam at lr 0.01, batches of 10.

use serde::{Deserialize, Serialize};

use lifnet_core::{NetworkConfig, SnnError, SnnResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerConfig {
    /// `v = μv − lr·g; θ += v`
    Sgd { momentum: f64 },
    /// Bias-corrected Adam.
    Adam { beta1: f64, beta2: f64, epsilon: f64 },
}

impl OptimizerConfig {
    pub fn adam() -> Self {
        OptimizerConfig::Adam { beta1: 0.9, beta2: 0.999, epsilon: 1e-8 }
    }

    pub fn validate(&self) -> SnnResult<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..1.0).contains(&v) {
                Ok(())
            } else {
                Err(SnnError::config(format!("{} must lie in [0, 1), got {}", name, v)))
            }
        };
        match *self {
            OptimizerConfig::Sgd { momentum } => unit("momentum", momentum),
            OptimizerConfig::Adam { beta1, beta2, epsilon } => {
                unit("beta1", beta1)?;
                unit("beta2", beta2)?;
                if epsilon.is_finite() && epsilon > 0.0 {
                    Ok(())
                } else {
                    Err(SnnError::config(format!("epsilon must be positive, got {}", epsilon)))
                }
            }
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Softmax cross-entropy of the class scores against the label.
    #[default]
    CrossEntropy,
    /// Squared error of the scores against the label (one output) or its one-hot vector.
    MeanSquared,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub network: NetworkConfig,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub optimizer: OptimizerConfig,
    pub epochs: usize,
    pub seed: u64,
    pub loss: LossKind,
    /// Reshuffle sample order every epoch.
    pub shuffle: bool,
    /// Keep the input sequences fed to the network during the first epoch.
    pub record_input_spikes: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            batch_size: 10,
            learning_rate: 0.01,
            optimizer: OptimizerConfig::adam(),
            epochs: 10,
            seed: 42,
            loss: LossKind::CrossEntropy,
            shuffle: true,
            record_input_spikes: false,
        }
    }
}

impl TrainConfig {
    pub fn validate(&self) -> SnnResult<()> {
        self.network.validate()?;
        self.optimizer.validate()?;
        if self.batch_size == 0 {
            return Err(SnnError::config("batch size must be at least 1"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(SnnError::config(format!("learning rate must be positive, got {}", self.learning_rate)));
        }
        if self.loss == LossKind::CrossEntropy && self.network.num_outputs < 2 {
            return Err(SnnError::config("cross-entropy needs at least two output neurons"));
        }
        Ok(())
    }
}
