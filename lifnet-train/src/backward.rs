//! Backpropagation through time over a recorded [`SimulationTrace`].
//!
//! The forward pass spikes with the exact step function; here every
//! ∂spike/∂potential is replaced by the fast-sigmoid surrogate. The reset
//! term `θ·spike` is treated as a constant, so the membrane carries gradient
//! from one step to the next through `β` alone.
//!
//! Walking the steps in reverse, with `g` the gradient w.r.t. a pre-reset potential:
//!
//! ```text
//! g_out[t] = ∂L/∂score · σ'(u_out[t]) + β_out · g_out[t+1]
//! g_hid[t] = (W2ᵀ g_out[t]) · σ'(u_hid[t]) + β_hid · g_hid[t+1]
//! ∂L/∂W2 += g_out[t] ⊗ s_hid[t]     ∂L/∂b2 += g_out[t]
//! ∂L/∂W1 += g_hid[t] ⊗ x[t]         ∂L/∂b1 += g_hid[t]
//! ```

use lifnet_core::{Matrix, SimulationTrace, SnnError, SnnResult, SpikingNetwork, SynapticWeights};

#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub bias: Vec<f64>,
}

impl LayerGradients {
    pub fn zeros_like(syn: &SynapticWeights) -> Self {
        Self { weights: Matrix::zeros(syn.outputs(), syn.inputs()), bias: vec![0.0; syn.outputs()] }
    }

    /// Add the contribution of one step: `delta ⊗ input` to the weights, `delta` to the bias.
    pub fn accumulate(&mut self, delta: &[f64], input: &[f64]) {
        self.weights.add_outer(delta, input);
        for (b, d) in self.bias.iter_mut().zip(delta) {
            *b += d;
        }
    }

    fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.weights.data().iter().chain(&self.bias).copied()
    }

    fn values_mut(&mut self) -> impl Iterator<Item = &mut f64> + '_ {
        self.weights.data_mut().iter_mut().chain(self.bias.iter_mut())
    }
}

/// Parameter gradients in the same layout as the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    pub fc1: LayerGradients,
    pub fc2: LayerGradients,
}

impl Gradients {
    pub fn zeros(network: &SpikingNetwork) -> Self {
        Self {
            fc1: LayerGradients::zeros_like(network.fc1()),
            fc2: LayerGradients::zeros_like(network.fc2()),
        }
    }

    pub fn add(&mut self, other: &Gradients) {
        let others = other.fc1.values().chain(other.fc2.values());
        for (g, o) in self.fc1.values_mut().chain(self.fc2.values_mut()).zip(others) {
            *g += o;
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for g in self.fc1.values_mut().chain(self.fc2.values_mut()) {
            *g *= factor;
        }
    }

    /// First non-finite entry, if any.
    pub fn non_finite(&self) -> Option<f64> {
        self.fc1.values().chain(self.fc2.values()).find(|g| !g.is_finite())
    }

    pub fn norm(&self) -> f64 {
        self.fc1.values().chain(self.fc2.values()).map(|g| g * g).sum::<f64>().sqrt()
    }

    /// Same order as [`SpikingNetwork::parameters_mut`].
    pub fn tensors(&self) -> [&[f64]; 4] {
        [self.fc1.weights.data(), &self.fc1.bias, self.fc2.weights.data(), &self.fc2.bias]
    }
}

/// Gradients of a loss whose derivative w.r.t. the spike-count score is
/// `score_grad`, for the sample recorded in `trace`.
pub fn backward(network: &SpikingNetwork, trace: &SimulationTrace, score_grad: &[f64]) -> SnnResult<Gradients> {
    let (n_in, hidden, outputs) = (network.num_inputs(), network.num_hidden(), network.num_outputs());
    if score_grad.len() != outputs {
        return Err(SnnError::shape_mismatch("score gradient", vec![outputs], vec![score_grad.len()]));
    }
    let slope = network.surrogate_slope();
    let lif1 = network.hidden_layer();
    let lif2 = network.output_layer();
    let w2 = network.fc2().weights();

    let mut grads = Gradients::zeros(network);
    let mut carry_hidden = vec![0.0; hidden];
    let mut carry_output = vec![0.0; outputs];

    for record in trace.steps().iter().rev() {
        if record.input.len() != n_in
            || record.hidden.spikes.len() != hidden
            || record.hidden.potential.len() != hidden
            || record.output.potential.len() != outputs
        {
            return Err(SnnError::shape_mismatch(
                "trace step",
                vec![n_in, hidden, outputs],
                vec![record.input.len(), record.hidden.spikes.len(), record.output.potential.len()],
            ));
        }

        let g_out: Vec<f64> = record
            .output
            .potential
            .iter()
            .zip(score_grad)
            .zip(&carry_output)
            .map(|((&u, &g), &carry)| g * lif2.spike_grad(u, slope) + carry)
            .collect();
        grads.fc2.accumulate(&g_out, &record.hidden.spikes);

        let g_spk1 = w2.mul_vec_transposed(&g_out)?;
        let g_hid: Vec<f64> = record
            .hidden
            .potential
            .iter()
            .zip(&g_spk1)
            .zip(&carry_hidden)
            .map(|((&u, &g), &carry)| g * lif1.spike_grad(u, slope) + carry)
            .collect();
        grads.fc1.accumulate(&g_hid, &record.input);

        carry_output = g_out.iter().map(|g| lif2.beta() * g).collect();
        carry_hidden = g_hid.iter().map(|g| lif1.beta() * g).collect();
    }
    Ok(grads)
}
