//! Labeled scalar samples: loading, synthetic generation, normalization, batching.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use lifnet_core::{SnnError, SnnResult};

use crate::text_io;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub feature: f64,
    pub label: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    /// Pair line-aligned features and labels.
    pub fn from_columns(features: Vec<f64>, labels: Vec<usize>) -> SnnResult<Self> {
        if features.len() != labels.len() {
            return Err(SnnError::data_format(
                "dataset",
                features.len().min(labels.len()) + 1,
                format!("{} features but {} labels", features.len(), labels.len()),
            ));
        }
        let samples = features
            .into_iter()
            .zip(labels)
            .map(|(feature, label)| Sample { feature, label })
            .collect();
        Ok(Self { samples })
    }

    /// Features and labels in two text files, one value per line. Labels may
    /// be written as floats (`1.0`) but must be non-negative integers.
    pub fn load(features_path: &Path, labels_path: &Path) -> SnnResult<Self> {
        let features = text_io::read_values(features_path)?;
        let raw_labels = text_io::read_values(labels_path)?;
        let source = labels_path.display().to_string();
        let labels = raw_labels
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                if v >= 0.0 && v.fract() == 0.0 {
                    Ok(v as usize)
                } else {
                    Err(SnnError::data_format(source.as_str(), i + 1, format!("label {} is not a class index", v)))
                }
            })
            .collect::<SnnResult<Vec<_>>>()?;
        Self::from_columns(features, labels)
    }

    pub fn save(&self, features_path: &Path, labels_path: &Path) -> SnnResult<()> {
        text_io::write_values(features_path, &self.features())?;
        let labels: Vec<f64> = self.samples.iter().map(|s| s.label as f64).collect();
        text_io::write_values(labels_path, &labels)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn features(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.feature).collect()
    }

    pub fn labels(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// z-score, then min–max into [0, 1]. A constant feature maps to 0.
    pub fn normalized(&self) -> Self {
        let n = self.samples.len();
        if n == 0 {
            return self.clone();
        }
        let mean = self.samples.iter().map(|s| s.feature).sum::<f64>() / n as f64;
        let var = self.samples.iter().map(|s| (s.feature - mean).powi(2)).sum::<f64>() / n as f64;
        let std = var.sqrt();
        let z: Vec<f64> = self
            .samples
            .iter()
            .map(|s| if std > 0.0 { (s.feature - mean) / std } else { 0.0 })
            .collect();
        let lo = z.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = hi - lo;
        let samples = self
            .samples
            .iter()
            .zip(z)
            .map(|(s, v)| Sample {
                feature: if range > 0.0 { (v - lo) / range } else { 0.0 },
                label: s.label,
            })
            .collect();
        Self { samples }
    }

    /// Sample indices grouped into mini-batches; the last one may be short.
    pub fn batches<R: Rng + ?Sized>(&self, batch_size: usize, shuffle: bool, rng: &mut R) -> Vec<Vec<usize>> {
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        if shuffle {
            order.shuffle(rng);
        }
        order.chunks(batch_size.max(1)).map(<[usize]>::to_vec).collect()
    }
}

/// Two Gaussian clusters; the `positive` cluster is labeled 1, the other 0.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSpec {
    pub samples_per_class: usize,
    pub mean_positive: f64,
    pub mean_negative: f64,
    pub std_dev: f64,
    pub normalize: bool,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            samples_per_class: 100,
            mean_positive: 0.0,
            mean_negative: 10.0,
            std_dev: 1.0,
            normalize: true,
        }
    }
}

/// Positive samples first, then negative ones. A negative or NaN `std_dev`
/// is a configuration error.
pub fn generate_two_clusters<R: Rng + ?Sized>(spec: &ClusterSpec, rng: &mut R) -> SnnResult<Dataset> {
    let mut samples = Vec::with_capacity(spec.samples_per_class * 2);
    for (mean, label) in [(spec.mean_positive, 1), (spec.mean_negative, 0)] {
        let normal = Normal::new(mean, spec.std_dev)
            .map_err(|e| SnnError::config(format!("cluster at {} with std_dev {}: {}", mean, spec.std_dev, e)))?;
        samples.extend((0..spec.samples_per_class).map(|_| Sample { feature: normal.sample(rng), label }));
    }
    let dataset = Dataset::new(samples);
    Ok(if spec.normalize { dataset.normalized() } else { dataset })
}
