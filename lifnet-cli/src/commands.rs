// Subcommand handlers other than the raster TUI.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use lifnet_core::{compare, InputEncoding};
use lifnet_train::text_io::{read_matrix, write_matrix};
use lifnet_train::{
    generate_two_clusters, load_network, save_network, ClusterSpec, Dataset, Evaluator, TrainConfig, Trainer,
};

pub const DATA_FILE: &str = "data.txt";
pub const LABELS_FILE: &str = "labels.txt";

/// Flag overrides applied on top of the JSON configuration.
#[derive(Debug, Default)]
pub struct Overrides {
    pub epochs: Option<usize>,
    pub seed: Option<u64>,
    pub learning_rate: Option<f64>,
    pub batch_size: Option<usize>,
    pub rate_encoding: bool,
}

/// Defaults, then the JSON file (if any), then flags; validated before use.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<TrainConfig> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => TrainConfig::default(),
    };
    if let Some(epochs) = overrides.epochs {
        config.epochs = epochs;
    }
    if let Some(seed) = overrides.seed {
        config.seed = seed;
    }
    if let Some(lr) = overrides.learning_rate {
        config.learning_rate = lr;
    }
    if let Some(batch_size) = overrides.batch_size {
        config.batch_size = batch_size;
    }
    if overrides.rate_encoding {
        config.network.encoding = InputEncoding::Rate;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

pub fn load_dataset(data: &Path, labels: &Path, normalize: bool) -> Result<Dataset> {
    let dataset = Dataset::load(data, labels)
        .with_context(|| format!("loading {} / {}", data.display(), labels.display()))?;
    info!(samples = dataset.len(), normalize, "dataset loaded");
    Ok(if normalize { dataset.normalized() } else { dataset })
}

pub fn generate(out_dir: &Path, spec: &ClusterSpec, seed: u64) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
    let dataset = generate_two_clusters(spec, &mut ChaCha8Rng::seed_from_u64(seed)).context("generating clusters")?;
    let (data, labels) = (out_dir.join(DATA_FILE), out_dir.join(LABELS_FILE));
    dataset.save(&data, &labels).context("writing dataset")?;
    info!(samples = dataset.len(), data = %data.display(), labels = %labels.display(), "dataset written");
    Ok(())
}

pub fn train(config: TrainConfig, dataset: &Dataset, weights_dir: &Path, record_inputs: Option<&Path>) -> Result<()> {
    let config = TrainConfig { record_input_spikes: record_inputs.is_some(), ..config };
    let seed = config.seed;
    let epochs = config.epochs;
    let mut trainer = Trainer::new(config)?;
    let report = trainer.fit(dataset).context("training failed")?;
    for (epoch, loss) in report.epoch_losses.iter().enumerate() {
        println!("Epoch {}/{}, Loss: {}", epoch + 1, epochs, loss);
    }

    let network = trainer.into_network();
    save_network(weights_dir, &network).context("saving weights")?;
    if let (Some(path), Some(spikes)) = (record_inputs, report.input_spikes.as_ref()) {
        write_matrix(path, spikes).context("writing input spikes")?;
    }

    let eval = Evaluator::new(&network, seed).evaluate(dataset)?;
    println!("Training Accuracy: {:.2}%", eval.accuracy * 100.0);
    Ok(())
}

pub fn eval(
    config: &TrainConfig,
    dataset: &Dataset,
    weights_dir: &Path,
    quantized: bool,
    outputs: Option<&Path>,
) -> Result<()> {
    let mut network = load_network(weights_dir, &config.network)
        .with_context(|| format!("loading weights from {}", weights_dir.display()))?;
    if quantized {
        network = network.quantized();
    }
    let eval = Evaluator::new(&network, config.seed).evaluate(dataset)?;
    println!("Test Accuracy: {:.2}%", eval.accuracy * 100.0);
    if let Some(path) = outputs {
        write_matrix(path, &eval.outputs).context("writing output spikes")?;
    }
    Ok(())
}

/// Prints the report; with `strict`, any mismatch is an error.
pub fn compare_files(a: &Path, b: &Path, strict: bool) -> Result<()> {
    let ma = read_matrix(a).with_context(|| format!("reading {}", a.display()))?;
    let mb = read_matrix(b).with_context(|| format!("reading {}", b.display()))?;
    let report = compare(&ma, &mb)?;
    println!("{}", report);
    if strict && !report.is_exact_match() {
        anyhow::bail!("{} of {} outputs differ", report.mismatches, report.total_comparisons);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lifnet-cli-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn overrides_apply_after_file() {
        let dir = scratch("config");
        let path = dir.join("train.json");
        fs::write(&path, r#"{"epochs": 3, "batch_size": 4}"#).unwrap();
        let overrides = Overrides { epochs: Some(7), rate_encoding: true, ..Overrides::default() };
        let cfg = load_config(Some(path.as_path()), &overrides).unwrap();
        assert_eq!(cfg.epochs, 7);
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(cfg.network.encoding, InputEncoding::Rate);

        let bad = Overrides { batch_size: Some(0), ..Overrides::default() };
        assert!(load_config(None, &bad).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn generate_train_eval_compare() {
        let dir = scratch("pipeline");
        let spec = ClusterSpec { samples_per_class: 10, ..ClusterSpec::default() };
        generate(&dir, &spec, 3).unwrap();
        let dataset = load_dataset(&dir.join(DATA_FILE), &dir.join(LABELS_FILE), false).unwrap();
        assert_eq!(dataset.len(), 20);

        let config = TrainConfig { epochs: 1, ..TrainConfig::default() };
        train(config.clone(), &dataset, &dir, None).unwrap();
        let (a, b) = (dir.join("a.txt"), dir.join("b.txt"));
        eval(&config, &dataset, &dir, false, Some(a.as_path())).unwrap();
        eval(&config, &dataset, &dir, false, Some(b.as_path())).unwrap();
        compare_files(&a, &b, true).unwrap();
        let _ = fs::remove_dir_all(&dir);
    }
}
