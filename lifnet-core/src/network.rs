//! Two-layer feed-forward spiking network:
//! `fc1 (n_in→H) → LIF (H) → fc2 (H→C) → LIF (C, output)`.
//!
//! State is threaded explicitly: [`SpikingNetwork::step`] takes the current
//! [`NetworkState`] and hands back the next one, so the network itself is
//! never mutated by simulation.

use rand::Rng;

use crate::config::NetworkConfig;
use crate::error::{SnnError, SnnResult};
use crate::neuron::{LayerRole, LayerState, LayerStep, LifLayer};
use crate::quant::snap_q07;
use crate::synapse::SynapticWeights;
use crate::trace::{LayerRecord, SimulationTrace, StepRecord};

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkState {
    pub hidden: LayerState,
    pub output: LayerState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkStep {
    pub hidden: LayerStep,
    pub output: LayerStep,
}

impl NetworkStep {
    pub fn into_state(self) -> NetworkState {
        NetworkState { hidden: self.hidden.state, output: self.output.state }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpikingNetwork {
    config: NetworkConfig,
    fc1: SynapticWeights,
    lif1: LifLayer,
    fc2: SynapticWeights,
    lif2: LifLayer,
}

impl SpikingNetwork {
    /// Validates the configuration and that `fc1: n_in→H`, `fc2: H→C`.
    pub fn new(config: &NetworkConfig, fc1: SynapticWeights, fc2: SynapticWeights) -> SnnResult<Self> {
        config.validate()?;
        let expect = |name: &'static str, syn: &SynapticWeights, outputs: usize, inputs: usize| {
            if syn.outputs() == outputs && syn.inputs() == inputs {
                Ok(())
            } else {
                Err(SnnError::shape_mismatch(name, vec![outputs, inputs], vec![syn.outputs(), syn.inputs()]))
            }
        };
        expect("fc1 weights", &fc1, config.num_hidden, config.num_inputs)?;
        expect("fc2 weights", &fc2, config.num_outputs, config.num_hidden)?;

        let lif1 = LifLayer::new(0, config.num_hidden, config.beta_hidden, config.threshold, LayerRole::Hidden)?;
        let lif2 = LifLayer::new(1, config.num_outputs, config.beta_output, config.threshold, LayerRole::Output)?;
        Ok(Self { config: config.clone(), fc1, lif1, fc2, lif2 })
    }

    /// Fresh network with uniform fan-in scaled weights.
    pub fn random<R: Rng + ?Sized>(config: &NetworkConfig, rng: &mut R) -> SnnResult<Self> {
        config.validate()?;
        let fc1 = SynapticWeights::uniform(config.num_hidden, config.num_inputs, rng);
        let fc2 = SynapticWeights::uniform(config.num_outputs, config.num_hidden, rng);
        Self::new(config, fc1, fc2)
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn num_inputs(&self) -> usize {
        self.config.num_inputs
    }

    pub fn num_hidden(&self) -> usize {
        self.config.num_hidden
    }

    pub fn num_outputs(&self) -> usize {
        self.config.num_outputs
    }

    pub fn num_steps(&self) -> usize {
        self.config.num_steps
    }

    pub fn surrogate_slope(&self) -> f64 {
        self.config.surrogate_slope
    }

    pub fn fc1(&self) -> &SynapticWeights {
        &self.fc1
    }

    pub fn fc2(&self) -> &SynapticWeights {
        &self.fc2
    }

    pub fn hidden_layer(&self) -> &LifLayer {
        &self.lif1
    }

    pub fn output_layer(&self) -> &LifLayer {
        &self.lif2
    }

    /// Mutable parameter tensors in fixed order: fc1 weights, fc1 bias, fc2 weights, fc2 bias.
    pub fn parameters_mut(&mut self) -> [&mut [f64]; 4] {
        let (w1, b1) = self.fc1.params_mut();
        let (w2, b2) = self.fc2.params_mut();
        [w1, b1, w2, b2]
    }

    pub fn initial_state(&self) -> NetworkState {
        NetworkState { hidden: self.lif1.initial_state(), output: self.lif2.initial_state() }
    }

    /// One time step. Layer 1 finishes integrate/fire/reset before layer 2
    /// sees its spikes.
    pub fn step(&self, input: &[f64], state: &NetworkState, t: usize) -> SnnResult<NetworkStep> {
        let cur1 = self.fc1.current(input)?;
        let hidden = self.lif1.step(&state.hidden, &cur1, t)?;
        let cur2 = self.fc2.current(&hidden.spikes)?;
        let output = self.lif2.step(&state.output, &cur2, t)?;
        Ok(NetworkStep { hidden, output })
    }

    /// Run `inputs` (exactly T vectors) from a zeroed state.
    pub fn unroll(&self, inputs: &[Vec<f64>]) -> SnnResult<SimulationTrace> {
        if inputs.len() != self.config.num_steps {
            return Err(SnnError::shape_mismatch("input sequence", vec![self.config.num_steps], vec![inputs.len()]));
        }
        let mut state = self.initial_state();
        let mut trace = SimulationTrace::with_capacity(inputs.len());
        for (t, input) in inputs.iter().enumerate() {
            let step = self.step(input, &state, t)?;
            trace.push(StepRecord {
                input: input.clone(),
                hidden: LayerRecord::from(&step.hidden),
                output: LayerRecord::from(&step.output),
            });
            state = step.into_state();
        }
        Ok(trace)
    }

    /// Copy with every weight and bias snapped to the Q0.7 grid.
    ///
    /// Weight-only quantization: decay, threshold and membrane integration
    /// stay in `f64`, so the copy runs through the same LIF step as the
    /// original and only the synaptic currents change.
    pub fn quantized(&self) -> Self {
        Self {
            config: self.config.clone(),
            fc1: self.fc1.map(snap_q07),
            lif1: self.lif1.clone(),
            fc2: self.fc2.map(snap_q07),
            lif2: self.lif2.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn tiny_config() -> NetworkConfig {
        NetworkConfig { num_hidden: 2, num_outputs: 2, num_steps: 6, ..NetworkConfig::default() }
    }

    fn tiny_network() -> SpikingNetwork {
        let fc1 = SynapticWeights::new(Matrix::from_rows(vec![vec![1.5], vec![0.3]]).unwrap(), vec![0.0, 0.0]).unwrap();
        let fc2 = SynapticWeights::new(
            Matrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap(),
            vec![0.0, 0.0],
        )
        .unwrap();
        SpikingNetwork::new(&tiny_config(), fc1, fc2).unwrap()
    }

    #[test]
    fn rejects_incompatible_widths() {
        let cfg = tiny_config();
        let fc1 = SynapticWeights::zeros(3, 1);
        let fc2 = SynapticWeights::zeros(2, 2);
        assert!(matches!(
            SpikingNetwork::new(&cfg, fc1, fc2),
            Err(SnnError::ShapeMismatch { context: "fc1 weights", .. })
        ));
        let bad = NetworkConfig { threshold: 0.0, ..cfg };
        assert!(matches!(
            SpikingNetwork::random(&bad, &mut ChaCha8Rng::seed_from_u64(0)),
            Err(SnnError::Configuration(_))
        ));
    }

    #[test]
    fn layer_one_drives_layer_two_in_the_same_step() {
        let net = tiny_network();
        let step = net.step(&[1.0], &net.initial_state(), 0).unwrap();
        // hidden 0 receives 1.5 and fires at once; output 0 receives its spike
        assert_eq!(step.hidden.spikes, vec![1.0, 0.0]);
        assert_eq!(step.output.spikes, vec![1.0, 0.0]);
        let state = step.into_state();
        assert!((state.hidden.potentials()[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn unroll_is_deterministic() {
        let net = SpikingNetwork::random(&NetworkConfig::default(), &mut ChaCha8Rng::seed_from_u64(11)).unwrap();
        let inputs = vec![vec![0.7]; net.num_steps()];
        let a = net.unroll(&inputs).unwrap();
        let b = net.unroll(&inputs).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
        for (x, y) in a.steps().iter().zip(b.steps()) {
            for (p, q) in x.output.mem.iter().zip(&y.output.mem) {
                assert_eq!(p.to_bits(), q.to_bits());
            }
        }
    }

    #[test]
    fn unroll_matches_manual_stepping() {
        let net = tiny_network();
        let inputs = vec![vec![1.0]; 6];
        let trace = net.unroll(&inputs).unwrap();
        let mut state = net.initial_state();
        for (t, record) in trace.steps().iter().enumerate() {
            let step = net.step(&inputs[t], &state, t).unwrap();
            assert_eq!(record.hidden.spikes, step.hidden.spikes);
            assert_eq!(record.output.potential, step.output.potentials);
            state = step.into_state();
        }
        // hidden 1 integrates 0.3 with β=0.8: 0.3, 0.54, 0.732, 0.8856, 1.008 → fires at t=4
        let hidden1: Vec<f64> = trace.steps().iter().map(|r| r.hidden.spikes[1]).collect();
        assert_eq!(hidden1, vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn unroll_checks_sequence_length() {
        let net = tiny_network();
        assert!(matches!(net.unroll(&[vec![1.0]]), Err(SnnError::ShapeMismatch { .. })));
    }

    #[test]
    fn quantized_copy_snaps_weights() {
        let net = tiny_network().quantized();
        assert_eq!(net.fc1().weights().data(), &[127.0 / 128.0, 38.0 / 128.0]);
        assert_eq!(net.hidden_layer(), tiny_network().hidden_layer());
    }

    #[test]
    fn quantized_copy_keeps_float_membranes() {
        let net = tiny_network().quantized();
        assert_eq!(net.output_layer(), tiny_network().output_layer());
        let trace = net.unroll(&vec![vec![0.5]; 6]).unwrap();
        let u = trace.steps()[0].hidden.potential[0];
        // 127/128 · 0.5 sits between two Q0.7 grid points
        assert_eq!(u, 0.5 * 127.0 / 128.0);
        assert_ne!((u * 128.0).fract(), 0.0);
    }
}
