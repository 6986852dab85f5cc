//! Drives a network over the time horizon for one or many samples.

use rand::Rng;

use crate::config::InputEncoding;
use crate::encoder::RateEncoder;
use crate::error::{SnnError, SnnResult};
use crate::network::SpikingNetwork;
use crate::trace::SimulationTrace;

pub struct TemporalSimulator<'a> {
    network: &'a SpikingNetwork,
    encoder: RateEncoder,
    encoding: InputEncoding,
}

impl<'a> TemporalSimulator<'a> {
    pub fn new(network: &'a SpikingNetwork) -> SnnResult<Self> {
        Ok(Self {
            network,
            encoder: RateEncoder::new(network.num_steps())?,
            encoding: network.config().encoding,
        })
    }

    pub fn network(&self) -> &SpikingNetwork {
        self.network
    }

    pub fn encoding(&self) -> InputEncoding {
        self.encoding
    }

    /// Per-step input vectors for one sample. With static encoding the
    /// generator is not touched.
    pub fn input_sequence<R: Rng + ?Sized>(&self, features: &[f64], rng: &mut R) -> SnnResult<Vec<Vec<f64>>> {
        let n_in = self.network.num_inputs();
        if features.len() != n_in {
            return Err(SnnError::shape_mismatch("sample features", vec![n_in], vec![features.len()]));
        }
        let steps = self.encoder.num_steps();
        Ok(match self.encoding {
            InputEncoding::Static => vec![features.to_vec(); steps],
            InputEncoding::Rate => {
                let trains: Vec<_> = features.iter().map(|&x| self.encoder.encode(x, rng)).collect();
                (0..steps)
                    .map(|t| trains.iter().map(|train| train.value(t)).collect())
                    .collect()
            }
        })
    }

    pub fn simulate<R: Rng + ?Sized>(&self, features: &[f64], rng: &mut R) -> SnnResult<SimulationTrace> {
        let inputs = self.input_sequence(features, rng)?;
        self.network.unroll(&inputs)
    }

    /// One trace per sample, in order. Divergences are tagged with the sample index.
    pub fn simulate_batch<R: Rng + ?Sized>(&self, samples: &[Vec<f64>], rng: &mut R) -> SnnResult<Vec<SimulationTrace>> {
        samples
            .iter()
            .enumerate()
            .map(|(i, features)| self.simulate(features, rng).map_err(|e| e.in_sample(i)))
            .collect()
    }
}
