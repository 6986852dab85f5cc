// Raster source abstraction so the TUI does not depend on how spikes are produced.

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use lifnet_core::{NetworkState, SpikingNetwork, TemporalSimulator};
use lifnet_train::{predict, Dataset};

/// Anything that can feed the spike raster one time step at a time.
pub trait RasterBackend {
    /// Advance by one step and return the rows that fired.
    fn step(&mut self) -> Result<Vec<usize>>;
    /// Number of raster rows.
    fn rows(&self) -> usize;
    /// Short label drawn in front of a row.
    fn row_label(&self, row: usize) -> String;
    /// Abandon the current sample and start the next one.
    fn next_sample(&mut self) -> Result<()>;
    /// One-line description of where the simulation stands.
    fn status(&self) -> String;
}

/// Steps a trained network through a dataset, sample by sample.
/// Rows are the hidden neurons followed by the output neurons.
pub struct NetworkBackend {
    network: SpikingNetwork,
    dataset: Dataset,
    rng: ChaCha8Rng,
    sample: usize,
    inputs: Vec<Vec<f64>>,
    state: NetworkState,
    t: usize,
    score: Vec<f64>,
}

impl NetworkBackend {
    pub fn new(network: SpikingNetwork, dataset: Dataset, first_sample: usize, seed: u64) -> Result<Self> {
        anyhow::ensure!(!dataset.is_empty(), "raster needs at least one sample");
        let state = network.initial_state();
        let score = vec![0.0; network.num_outputs()];
        let mut backend = Self {
            network,
            dataset,
            rng: ChaCha8Rng::seed_from_u64(seed),
            sample: 0,
            inputs: Vec::new(),
            state,
            t: 0,
            score,
        };
        backend.load_sample(first_sample % backend.dataset.len())?;
        Ok(backend)
    }

    fn load_sample(&mut self, index: usize) -> Result<()> {
        let feature = self
            .dataset
            .get(index)
            .with_context(|| format!("sample {} out of range", index))?
            .feature;
        let simulator = TemporalSimulator::new(&self.network)?;
        self.inputs = simulator.input_sequence(&[feature], &mut self.rng)?;
        self.sample = index;
        self.state = self.network.initial_state();
        self.t = 0;
        self.score.iter_mut().for_each(|s| *s = 0.0);
        Ok(())
    }
}

impl RasterBackend for NetworkBackend {
    fn step(&mut self) -> Result<Vec<usize>> {
        if self.t >= self.network.num_steps() {
            self.next_sample()?;
        }
        let step = self
            .network
            .step(&self.inputs[self.t], &self.state, self.t)
            .with_context(|| format!("sample {}", self.sample))?;

        let hidden = self.network.num_hidden();
        let mut fired: Vec<usize> = step
            .hidden
            .spikes
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > 0.0)
            .map(|(i, _)| i)
            .collect();
        for (i, &s) in step.output.spikes.iter().enumerate() {
            self.score[i] += s;
            if s > 0.0 {
                fired.push(hidden + i);
            }
        }
        self.state = step.into_state();
        self.t += 1;
        Ok(fired)
    }

    fn rows(&self) -> usize {
        self.network.num_hidden() + self.network.num_outputs()
    }

    fn row_label(&self, row: usize) -> String {
        let hidden = self.network.num_hidden();
        if row < hidden {
            format!("h{:02}", row)
        } else {
            format!("o{:02}", row - hidden)
        }
    }

    fn next_sample(&mut self) -> Result<()> {
        let next = (self.sample + 1) % self.dataset.len();
        self.load_sample(next)
    }

    fn status(&self) -> String {
        let label = self.dataset.get(self.sample).map_or(0, |s| s.label);
        let done = self.t >= self.network.num_steps();
        format!(
            "Sample {}/{} (label {}) | Step {}/{} | Score {:?}{}",
            self.sample + 1,
            self.dataset.len(),
            label,
            self.t,
            self.network.num_steps(),
            self.score,
            if done { format!(" → class {}", predict(&self.score)) } else { String::new() }
        )
    }
}
