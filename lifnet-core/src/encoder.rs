//! Stochastic rate encoding of a scalar feature into a spike train.

use rand::Rng;

use crate::error::{SnnError, SnnResult};

/// T binary values for one sample and one input channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpikeTrain {
    spikes: Vec<bool>,
}

impl SpikeTrain {
    pub fn from_bits(spikes: Vec<bool>) -> Self {
        Self { spikes }
    }

    pub fn len(&self) -> usize {
        self.spikes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spikes.is_empty()
    }

    pub fn get(&self, t: usize) -> Option<bool> {
        self.spikes.get(t).copied()
    }

    /// Spike at step `t` as 0.0 / 1.0; steps past the end read as 0.
    #[inline]
    pub fn value(&self, t: usize) -> f64 {
        if self.get(t).unwrap_or(false) { 1.0 } else { 0.0 }
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.spikes.iter().copied()
    }

    pub fn spike_count(&self) -> usize {
        self.spikes.iter().filter(|&&s| s).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateEncoder {
    num_steps: usize,
}

impl RateEncoder {
    pub fn new(num_steps: usize) -> SnnResult<Self> {
        if num_steps == 0 {
            return Err(SnnError::config("rate encoder needs at least one step"));
        }
        Ok(Self { num_steps })
    }

    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    /// Out-of-range features are clamped into [0, 1]; NaN never fires.
    #[inline]
    pub fn firing_probability(x: f64) -> f64 {
        if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
    }

    /// Draws exactly one uniform sample per step, whatever the probability,
    /// so the generator advances identically for every input.
    pub fn encode<R: Rng + ?Sized>(&self, x: f64, rng: &mut R) -> SpikeTrain {
        let p = Self::firing_probability(x);
        let spikes = (0..self.num_steps).map(|_| rng.gen::<f64>() < p).collect();
        SpikeTrain { spikes }
    }
}
