//! Mini-batch surrogate-gradient training.
//!
//! Per batch: build every sample's input sequence from the trainer's seeded
//! generator (always in sample order), unroll and backpropagate each sample,
//! sum the per-sample gradients in sample order, average, then take exactly
//! one optimizer step. With the `parallel` feature the unroll/backward work
//! runs on the rayon pool; the summation order does not change, so results
//! are identical either way.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use lifnet_core::{
    ensure_finite, Matrix, Site, SnnError, SnnResult, SpikingNetwork, TemporalSimulator,
};

use crate::backward::{backward, Gradients};
use crate::config::TrainConfig;
use crate::dataset::Dataset;
use crate::optim::Optimizer;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    /// Mean per-sample loss of every epoch.
    pub epoch_losses: Vec<f64>,
    /// Input sequences of the first epoch as a `[(T·n_in) × samples]` matrix,
    /// one column per sample in dataset order, when `record_input_spikes` is set.
    pub input_spikes: Option<Matrix>,
}

impl TrainReport {
    pub fn final_loss(&self) -> Option<f64> {
        self.epoch_losses.last().copied()
    }
}

/// One sample's contribution to a batch.
struct SamplePass {
    loss: f64,
    grads: Gradients,
}

/// Input sequence of one sample, tagged with its dataset index.
struct PreparedSample {
    index: usize,
    label: usize,
    inputs: Vec<Vec<f64>>,
}

pub struct Trainer {
    config: TrainConfig,
    network: SpikingNetwork,
    optimizer: Optimizer,
    rng: ChaCha8Rng,
}

impl Trainer {
    /// Fresh, randomly initialized network. Initialization, shuffling and
    /// rate encoding all draw from one generator seeded with `config.seed`.
    pub fn new(config: TrainConfig) -> SnnResult<Self> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let network = SpikingNetwork::random(&config.network, &mut rng)?;
        let optimizer = Optimizer::new(config.optimizer, config.learning_rate)?;
        Ok(Self { config, network, optimizer, rng })
    }

    /// Continue from existing weights. The network must have been built from
    /// `config.network`.
    pub fn with_network(config: TrainConfig, network: SpikingNetwork) -> SnnResult<Self> {
        config.validate()?;
        if network.config() != &config.network {
            return Err(SnnError::config("network was built from a different configuration"));
        }
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let optimizer = Optimizer::new(config.optimizer, config.learning_rate)?;
        Ok(Self { config, network, optimizer, rng })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn network(&self) -> &SpikingNetwork {
        &self.network
    }

    pub fn into_network(self) -> SpikingNetwork {
        self.network
    }

    /// Train for `config.epochs` epochs over `dataset`.
    pub fn fit(&mut self, dataset: &Dataset) -> SnnResult<TrainReport> {
        self.check_dataset(dataset)?;
        let mut recorded = self
            .config
            .record_input_spikes
            .then(|| Matrix::zeros(self.recorded_width(), dataset.len()));

        let mut epoch_losses = Vec::with_capacity(self.config.epochs);
        for epoch in 0..self.config.epochs {
            let recorder = if epoch == 0 { recorded.as_mut() } else { None };
            let loss = self.train_epoch(dataset, epoch, recorder)?;
            info!(epoch = epoch + 1, epochs = self.config.epochs, loss, "epoch complete");
            epoch_losses.push(loss);
        }
        Ok(TrainReport { epoch_losses, input_spikes: recorded })
    }

    /// One pass over the dataset; returns the mean per-sample loss. A
    /// `recorder` must be `[(T·n_in) × samples]` and receives each sample's
    /// input sequence in its column.
    pub fn train_epoch(&mut self, dataset: &Dataset, epoch: usize, mut recorder: Option<&mut Matrix>) -> SnnResult<f64> {
        self.check_dataset(dataset)?;
        if let Some(matrix) = recorder.as_deref() {
            let expected = (self.recorded_width(), dataset.len());
            if matrix.shape() != expected {
                return Err(SnnError::shape_mismatch(
                    "input spike recorder",
                    vec![expected.0, expected.1],
                    vec![matrix.rows(), matrix.cols()],
                ));
            }
        }
        let batches = dataset.batches(self.config.batch_size, self.config.shuffle, &mut self.rng);
        let mut total = 0.0;
        for (batch, indices) in batches.iter().enumerate() {
            let batch_loss = self
                .train_batch(dataset, indices, recorder.as_deref_mut())
                .map_err(|e| e.in_batch(epoch, batch))?;
            total += batch_loss * indices.len() as f64;
            debug!(epoch, batch, loss = batch_loss, "batch");
        }
        Ok(total / dataset.len() as f64)
    }

    fn train_batch(&mut self, dataset: &Dataset, indices: &[usize], recorder: Option<&mut Matrix>) -> SnnResult<f64> {
        let prepared = self.prepare(dataset, indices)?;
        if let Some(matrix) = recorder {
            let samples = matrix.cols();
            let data = matrix.data_mut();
            for sample in &prepared {
                for (row, &v) in sample.inputs.iter().flatten().enumerate() {
                    data[row * samples + sample.index] = v;
                }
            }
        }

        let passes = self.run_passes(&prepared);
        let mut grads = Gradients::zeros(&self.network);
        let mut loss = 0.0;
        for (sample, pass) in prepared.iter().zip(passes) {
            let pass = pass.map_err(|e| e.in_sample(sample.index))?;
            loss += pass.loss;
            grads.add(&pass.grads);
        }
        let scale = 1.0 / prepared.len() as f64;
        loss *= scale;
        grads.scale(scale);

        ensure_finite("loss", loss, Site::default())?;
        if let Some(value) = grads.non_finite() {
            return Err(SnnError::divergence("gradient", Site::default(), value));
        }
        debug!(grad_norm = grads.norm(), "gradients");

        let mut params = self.network.parameters_mut();
        self.optimizer.step(&mut params, &grads.tensors())?;
        Ok(loss)
    }

    /// Input sequences for a batch, drawn from the trainer's generator in sample order.
    fn prepare(&mut self, dataset: &Dataset, indices: &[usize]) -> SnnResult<Vec<PreparedSample>> {
        let simulator = TemporalSimulator::new(&self.network)?;
        indices
            .iter()
            .map(|&index| {
                let sample = dataset
                    .get(index)
                    .ok_or_else(|| SnnError::shape_mismatch("batch index", vec![dataset.len()], vec![index]))?;
                let inputs = simulator.input_sequence(&[sample.feature], &mut self.rng)?;
                Ok(PreparedSample { index, label: sample.label, inputs })
            })
            .collect()
    }

    #[cfg(feature = "parallel")]
    fn run_passes(&self, prepared: &[PreparedSample]) -> Vec<SnnResult<SamplePass>> {
        prepared.par_iter().map(|s| self.sample_pass(s)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    fn run_passes(&self, prepared: &[PreparedSample]) -> Vec<SnnResult<SamplePass>> {
        prepared.iter().map(|s| self.sample_pass(s)).collect()
    }

    fn sample_pass(&self, sample: &PreparedSample) -> SnnResult<SamplePass> {
        let trace = self.network.unroll(&sample.inputs)?;
        let score = trace.score();
        for (neuron, &s) in score.iter().enumerate() {
            ensure_finite("score", s, Site::layer(1).with_neuron(neuron))?;
        }
        let out = self.config.loss.evaluate(&score, sample.label)?;
        ensure_finite("loss", out.loss, Site::default())?;
        let grads = backward(&self.network, &trace, &out.grad)?;
        Ok(SamplePass { loss: out.loss, grads })
    }

    /// Rows of the recorded input matrix: every step's input vector, stacked.
    fn recorded_width(&self) -> usize {
        self.network.num_steps() * self.network.num_inputs()
    }

    fn check_dataset(&self, dataset: &Dataset) -> SnnResult<()> {
        if dataset.is_empty() {
            return Err(SnnError::data_format("dataset", 1, "no samples to train on"));
        }
        let classes = self.network.num_outputs().max(2);
        if let Some((i, s)) = dataset.iter().enumerate().find(|(_, s)| s.label >= classes) {
            return Err(SnnError::data_format(
                "dataset",
                i + 1,
                format!("label {} outside {} classes", s.label, classes),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LossKind, OptimizerConfig};
    use crate::dataset::Sample;
    use lifnet_core::{InputEncoding, NetworkConfig};

    fn toy_dataset() -> Dataset {
        let samples = (0..20)
            .map(|i| {
                let label = i % 2;
                Sample { feature: if label == 1 { 0.1 } else { 0.9 }, label }
            })
            .collect();
        Dataset::new(samples)
    }

    fn config(epochs: usize) -> TrainConfig {
        TrainConfig { epochs, seed: 9, ..TrainConfig::default() }
    }

    #[test]
    fn fit_is_reproducible() {
        let data = toy_dataset();
        let mut a = Trainer::new(config(3)).unwrap();
        let mut b = Trainer::new(config(3)).unwrap();
        let ra = a.fit(&data).unwrap();
        let rb = b.fit(&data).unwrap();
        assert_eq!(ra, rb);
        assert_eq!(ra.epoch_losses.len(), 3);
        assert_eq!(a.network(), b.network());
        assert!(ra.input_spikes.is_none());
    }

    #[test]
    fn one_optimizer_step_per_batch() {
        let data = toy_dataset();
        let mut trainer = Trainer::new(TrainConfig { batch_size: 6, ..config(2) }).unwrap();
        trainer.fit(&data).unwrap();
        // 20 samples in batches of 6 → 4 batches per epoch
        assert_eq!(trainer.optimizer.steps(), 8);
    }

    #[test]
    fn training_moves_the_weights() {
        let data = toy_dataset();
        let mut trainer = Trainer::new(config(1)).unwrap();
        let before = trainer.network().clone();
        trainer.fit(&data).unwrap();
        assert_ne!(trainer.network().fc2(), before.fc2());
    }

    #[test]
    fn records_first_epoch_inputs_in_dataset_order() {
        let data = toy_dataset();
        let cfg = TrainConfig {
            record_input_spikes: true,
            network: NetworkConfig { encoding: InputEncoding::Rate, num_steps: 8, ..NetworkConfig::default() },
            ..config(2)
        };
        let report = Trainer::new(cfg).unwrap().fit(&data).unwrap();
        let spikes = report.input_spikes.unwrap();
        assert_eq!(spikes.shape(), (8, 20));
        assert!(spikes.data().iter().all(|&v| v == 0.0 || v == 1.0));
        // label-1 samples fire with p = 0.1, label-0 samples with p = 0.9
        let rate = |label: usize| {
            let cols: Vec<usize> = (0..20).filter(|c| c % 2 == label).collect();
            let fired: f64 = cols.iter().flat_map(|&c| (0..8).map(move |r| (r, c))).map(|(r, c)| spikes.get(r, c)).sum();
            fired / (cols.len() * 8) as f64
        };
        assert!(rate(0) > rate(1));
    }

    #[test]
    fn static_inputs_fill_one_column_per_sample() {
        let data = Dataset::new(vec![Sample { feature: 0.25, label: 0 }, Sample { feature: 0.75, label: 1 }]);
        let cfg = TrainConfig {
            record_input_spikes: true,
            network: NetworkConfig { num_steps: 3, ..NetworkConfig::default() },
            ..config(1)
        };
        let spikes = Trainer::new(cfg).unwrap().fit(&data).unwrap().input_spikes.unwrap();
        assert_eq!(spikes.shape(), (3, 2));
        for r in 0..3 {
            assert_eq!(spikes.row(r), &[0.25, 0.75]);
        }
    }

    #[test]
    fn mis_sized_recorder_is_rejected() {
        let data = toy_dataset();
        let mut trainer = Trainer::new(config(1)).unwrap();
        let mut small = Matrix::zeros(1, 1);
        let err = trainer.train_epoch(&data, 0, Some(&mut small)).unwrap_err();
        assert!(matches!(err, SnnError::ShapeMismatch { context: "input spike recorder", .. }));
        assert_eq!(trainer.optimizer.steps(), 0);

        let steps = trainer.network().num_steps();
        let mut short = Matrix::zeros(steps, data.len() - 1);
        assert!(trainer.train_epoch(&data, 0, Some(&mut short)).is_err());
        let mut fitting = Matrix::zeros(steps, data.len());
        assert!(trainer.train_epoch(&data, 0, Some(&mut fitting)).is_ok());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_passes_match_serial_ones() {
        let data = toy_dataset();
        let mut trainer = Trainer::new(config(1)).unwrap();
        let indices: Vec<usize> = (0..data.len()).collect();
        let prepared = trainer.prepare(&data, &indices).unwrap();
        for (sample, pass) in prepared.iter().zip(trainer.run_passes(&prepared)) {
            let pass = pass.unwrap();
            let serial = trainer.sample_pass(sample).unwrap();
            assert_eq!(pass.loss.to_bits(), serial.loss.to_bits());
            assert_eq!(pass.grads, serial.grads);
        }
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn fit_does_not_depend_on_pool_size() {
        let fit = |threads: usize| {
            let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
            pool.install(|| {
                let cfg = TrainConfig {
                    network: NetworkConfig { encoding: InputEncoding::Rate, ..NetworkConfig::default() },
                    batch_size: 7,
                    ..config(3)
                };
                let mut trainer = Trainer::new(cfg).unwrap();
                let report = trainer.fit(&toy_dataset()).unwrap();
                (report, trainer.into_network())
            })
        };
        let (serial_report, serial_net) = fit(1);
        let (report, net) = fit(4);
        let bits = |losses: &[f64]| losses.iter().map(|l| l.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&report.epoch_losses), bits(&serial_report.epoch_losses));
        assert_eq!(net, serial_net);
    }

    #[test]
    fn mean_squared_single_output() {
        let cfg = TrainConfig {
            loss: LossKind::MeanSquared,
            optimizer: OptimizerConfig::Sgd { momentum: 0.9 },
            network: NetworkConfig { num_outputs: 1, ..NetworkConfig::default() },
            ..config(2)
        };
        let report = Trainer::new(cfg).unwrap().fit(&toy_dataset()).unwrap();
        assert!(report.epoch_losses.iter().all(|l| l.is_finite()));
    }

    #[test]
    fn rejects_unusable_datasets() {
        let mut trainer = Trainer::new(config(1)).unwrap();
        assert!(matches!(trainer.fit(&Dataset::default()), Err(SnnError::DataFormat { .. })));
        let bad = Dataset::new(vec![Sample { feature: 0.5, label: 2 }]);
        assert!(matches!(trainer.fit(&bad), Err(SnnError::DataFormat { line: 1, .. })));
    }

    #[test]
    fn divergence_names_epoch_and_batch() {
        let data = Dataset::new(vec![Sample { feature: f64::INFINITY, label: 0 }]);
        let err = Trainer::new(config(1)).unwrap().fit(&data).unwrap_err();
        match err {
            SnnError::NumericDivergence { site, .. } => {
                assert_eq!(site.epoch, Some(0));
                assert_eq!(site.batch, Some(0));
                assert_eq!(site.sample, Some(0));
                assert_eq!(site.layer, Some(0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn with_network_checks_configuration() {
        let trainer = Trainer::new(config(1)).unwrap();
        let net = trainer.into_network();
        let other = TrainConfig {
            network: NetworkConfig { num_steps: 5, ..NetworkConfig::default() },
            ..config(1)
        };
        assert!(matches!(Trainer::with_network(other, net.clone()), Err(SnnError::Configuration(_))));
        assert_eq!(Trainer::with_network(config(1), net.clone()).unwrap().network(), &net);
    }
}
