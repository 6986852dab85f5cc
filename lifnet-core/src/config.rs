//! Network configuration. Every constant the simulation depends on lives here
//! and is passed in at construction time.

use crate::error::{SnnError, SnnResult};

/// How a sample's feature vector becomes the per-step input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InputEncoding {
    /// The same feature value is presented at every step.
    #[default]
    Static,
    /// Each step is an independent Bernoulli draw with the feature as probability.
    Rate,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetworkConfig {
    pub num_inputs: usize,
    pub num_hidden: usize,
    pub num_outputs: usize,
    /// Leak factor of the hidden layer, in (0, 1).
    pub beta_hidden: f64,
    /// Leak factor of the output layer, in (0, 1).
    pub beta_output: f64,
    pub threshold: f64,
    /// Simulation horizon T.
    pub num_steps: usize,
    pub encoding: InputEncoding,
    /// Steepness k of the surrogate spike derivative.
    pub surrogate_slope: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_inputs: 1,
            num_hidden: 10,
            num_outputs: 2,
            beta_hidden: 0.8,
            beta_output: 0.8,
            threshold: 1.0,
            num_steps: 20,
            encoding: InputEncoding::Static,
            surrogate_slope: crate::surrogate::DEFAULT_SLOPE,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> SnnResult<()> {
        if self.num_inputs == 0 || self.num_hidden == 0 || self.num_outputs == 0 {
            return Err(SnnError::config(format!(
                "layer widths must be non-zero (inputs {}, hidden {}, outputs {})",
                self.num_inputs, self.num_hidden, self.num_outputs
            )));
        }
        if self.num_steps == 0 {
            return Err(SnnError::config("time horizon must be at least one step"));
        }
        validate_beta("beta_hidden", self.beta_hidden)?;
        validate_beta("beta_output", self.beta_output)?;
        validate_threshold(self.threshold)?;
        if !(self.surrogate_slope.is_finite() && self.surrogate_slope > 0.0) {
            return Err(SnnError::config(format!(
                "surrogate slope must be positive, got {}",
                self.surrogate_slope
            )));
        }
        Ok(())
    }
}

pub(crate) fn validate_beta(name: &str, beta: f64) -> SnnResult<()> {
    if beta > 0.0 && beta < 1.0 {
        Ok(())
    } else {
        Err(SnnError::config(format!("{} must lie in (0, 1), got {}", name, beta)))
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> SnnResult<()> {
    if threshold.is_finite() && threshold > 0.0 {
        Ok(())
    } else {
        Err(SnnError::config(format!("threshold must be positive, got {}", threshold)))
    }
}
