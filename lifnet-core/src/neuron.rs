//! Leaky integrate-and-fire layer with reset-by-subtraction.
//!
//! The layer holds parameters only. Membrane potentials live in a
//! [`LayerState`] that the caller passes in and gets back from every step.

use crate::config::{validate_beta, validate_threshold};
use crate::error::{Site, SnnError, SnnResult};
use crate::surrogate::{fast_sigmoid_grad, heaviside};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    /// Spikes feed the next linear layer.
    Hidden,
    /// Spikes are only summed into class scores. Reset policy is the same.
    Output,
}

/// Per-neuron membrane potential, zero at the start of each sample.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerState {
    mem: Vec<f64>,
}

impl LayerState {
    pub fn zeros(size: usize) -> Self {
        Self { mem: vec![0.0; size] }
    }

    pub fn from_potentials(mem: Vec<f64>) -> Self {
        Self { mem }
    }

    pub fn potentials(&self) -> &[f64] {
        &self.mem
    }

    pub fn len(&self) -> usize {
        self.mem.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mem.is_empty()
    }
}

/// Result of one layer update.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerStep {
    /// Exactly 0.0 or 1.0 per neuron.
    pub spikes: Vec<f64>,
    /// Potential after integration, before reset. The surrogate is evaluated here.
    pub potentials: Vec<f64>,
    /// Post-reset state carried into the next step.
    pub state: LayerState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifLayer {
    index: usize,
    size: usize,
    beta: f64,
    threshold: f64,
    role: LayerRole,
}

impl LifLayer {
    /// `index` only identifies the layer in diagnostics.
    pub fn new(index: usize, size: usize, beta: f64, threshold: f64, role: LayerRole) -> SnnResult<Self> {
        if size == 0 {
            return Err(SnnError::config(format!("layer {} must have at least one neuron", index)));
        }
        validate_beta("beta", beta)?;
        validate_threshold(threshold)?;
        Ok(Self { index, size, beta, threshold, role })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn role(&self) -> LayerRole {
        self.role
    }

    pub fn initial_state(&self) -> LayerState {
        LayerState::zeros(self.size)
    }

    /// Integrate, fire, reset for every neuron at step `t`.
    pub fn step(&self, state: &LayerState, current: &[f64], t: usize) -> SnnResult<LayerStep> {
        if state.len() != self.size {
            return Err(SnnError::shape_mismatch("layer state", vec![self.size], vec![state.len()]));
        }
        if current.len() != self.size {
            return Err(SnnError::shape_mismatch("layer input current", vec![self.size], vec![current.len()]));
        }

        let mut spikes = Vec::with_capacity(self.size);
        let mut potentials = Vec::with_capacity(self.size);
        let mut mem = Vec::with_capacity(self.size);
        for (i, (&prev, &input)) in state.mem.iter().zip(current).enumerate() {
            let u = self.beta * prev + input;
            if !u.is_finite() {
                return Err(SnnError::divergence(
                    "membrane potential",
                    Site::layer(self.index).with_step(t).with_neuron(i),
                    u,
                ));
            }
            let spk = heaviside(u, self.threshold);
            spikes.push(spk);
            potentials.push(u);
            mem.push(u - self.threshold * spk);
        }

        Ok(LayerStep { spikes, potentials, state: LayerState { mem } })
    }

    /// Surrogate ∂spike/∂potential for the backward pass.
    #[inline]
    pub fn spike_grad(&self, potential: f64, slope: f64) -> f64 {
        fast_sigmoid_grad(potential, self.threshold, slope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(beta: f64) -> LifLayer {
        LifLayer::new(0, 1, beta, 1.0, LayerRole::Hidden).unwrap()
    }

    /// Spike times of one neuron under constant input current.
    fn spike_times(beta: f64, current: f64, steps: usize) -> Vec<usize> {
        let layer = single(beta);
        let mut state = layer.initial_state();
        let mut times = Vec::new();
        for t in 0..steps {
            let out = layer.step(&state, &[current], t).unwrap();
            if out.spikes[0] == 1.0 {
                times.push(t);
                assert!(out.state.potentials()[0] < layer.threshold());
            }
            state = out.state;
        }
        times
    }

    /// Steps needed to reach threshold from rest: β^n ≤ 1 − θ(1−β)/I.
    fn closed_form_period(beta: f64, current: f64, threshold: f64) -> f64 {
        ((1.0 - threshold * (1.0 - beta) / current).ln() / beta.ln()).ceil()
    }

    #[test]
    fn integrates_with_leak() {
        let layer = single(0.5);
        let s0 = layer.step(&layer.initial_state(), &[0.4], 0).unwrap();
        assert_eq!(s0.spikes, vec![0.0]);
        assert_eq!(s0.state.potentials(), &[0.4]);
        let s1 = layer.step(&s0.state, &[0.4], 1).unwrap();
        assert!((s1.state.potentials()[0] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn fires_at_threshold_and_subtracts() {
        let layer = single(0.9);
        let out = layer.step(&layer.initial_state(), &[1.0], 0).unwrap();
        assert_eq!(out.spikes, vec![1.0]);
        assert_eq!(out.potentials, vec![1.0]);
        assert_eq!(out.state.potentials(), &[0.0]);

        let out = layer.step(&LayerState::from_potentials(vec![1.0]), &[0.6], 1).unwrap();
        assert_eq!(out.spikes, vec![1.0]);
        assert!((out.state.potentials()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn output_role_resets_the_same_way() {
        let hidden = LifLayer::new(0, 2, 0.8, 1.0, LayerRole::Hidden).unwrap();
        let output = LifLayer::new(1, 2, 0.8, 1.0, LayerRole::Output).unwrap();
        let state = LayerState::from_potentials(vec![0.5, 0.9]);
        let a = hidden.step(&state, &[0.7, 0.1], 4).unwrap();
        let b = output.step(&state, &[0.7, 0.1], 4).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn periodic_firing_matches_closed_form() {
        for (beta, current) in [(0.9, 0.2), (0.8, 0.5), (0.95, 0.1)] {
            let period = closed_form_period(beta, current, 1.0);
            let times = spike_times(beta, current, 300);
            assert!(times.len() > 5, "beta {beta} current {current}");
            assert!(((times[0] + 1) as f64 - period).abs() <= 1.0);
            for pair in times.windows(2) {
                let interval = (pair[1] - pair[0]) as f64;
                assert!(
                    (interval - period).abs() <= 1.0,
                    "beta {beta} current {current}: interval {interval} vs {period}"
                );
            }
        }
    }

    #[test]
    fn subthreshold_never_fires() {
        // steady state I/(1−β) = 0.5 < θ
        assert!(spike_times(0.8, 0.1, 500).is_empty());
    }

    #[test]
    fn non_finite_input_is_fatal() {
        let layer = LifLayer::new(3, 2, 0.8, 1.0, LayerRole::Output).unwrap();
        let err = layer.step(&layer.initial_state(), &[0.0, f64::INFINITY], 6).unwrap_err();
        match err {
            SnnError::NumericDivergence { site, .. } => {
                assert_eq!(site.layer, Some(3));
                assert_eq!(site.step, Some(6));
                assert_eq!(site.neuron, Some(1));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_parameters_and_shapes() {
        assert!(LifLayer::new(0, 0, 0.8, 1.0, LayerRole::Hidden).is_err());
        assert!(LifLayer::new(0, 1, 1.2, 1.0, LayerRole::Hidden).is_err());
        assert!(LifLayer::new(0, 1, 0.8, -1.0, LayerRole::Hidden).is_err());
        let layer = single(0.8);
        assert!(matches!(
            layer.step(&layer.initial_state(), &[0.1, 0.2], 0),
            Err(SnnError::ShapeMismatch { .. })
        ));
    }
}
