use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Location of a numeric failure. Each detector fills in what it knows and
/// callers further up add the rest (sample, batch, epoch).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Site {
    pub epoch: Option<usize>,
    pub batch: Option<usize>,
    pub sample: Option<usize>,
    pub layer: Option<usize>,
    pub step: Option<usize>,
    pub neuron: Option<usize>,
}

impl Site {
    pub fn layer(layer: usize) -> Self {
        Self { layer: Some(layer), ..Self::default() }
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_neuron(mut self, neuron: usize) -> Self {
        self.neuron = Some(neuron);
        self
    }

    pub fn with_sample(mut self, sample: usize) -> Self {
        self.sample = Some(sample);
        self
    }

    pub fn with_batch(mut self, epoch: usize, batch: usize) -> Self {
        self.epoch = Some(epoch);
        self.batch = Some(batch);
        self
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            ("epoch", self.epoch),
            ("batch", self.batch),
            ("sample", self.sample),
            ("layer", self.layer),
            ("step", self.step),
            ("neuron", self.neuron),
        ];
        let mut first = true;
        for (name, value) in parts {
            if let Some(v) = value {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{} {}", name, v)?;
                first = false;
            }
        }
        if first {
            write!(f, "unknown site")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum SnnError {
    /// Rejected at construction time, never raised mid-simulation.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("non-finite {quantity} at {site}: {value}")]
    NumericDivergence {
        quantity: &'static str,
        site: Site,
        value: f64,
    },

    #[error("shape mismatch in {context}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("{source_name}:{line}: {message}")]
    DataFormat {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("i/o error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SnnError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        SnnError::Configuration(msg.into())
    }

    pub fn shape_mismatch(context: &'static str, expected: Vec<usize>, actual: Vec<usize>) -> Self {
        SnnError::ShapeMismatch { context, expected, actual }
    }

    pub fn divergence(quantity: &'static str, site: Site, value: f64) -> Self {
        SnnError::NumericDivergence { quantity, site, value }
    }

    pub fn data_format<S: Into<String>, M: Into<String>>(source_name: S, line: usize, message: M) -> Self {
        SnnError::DataFormat {
            source_name: source_name.into(),
            line,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        SnnError::Io { path: path.into(), source }
    }

    /// Tag a divergence with the sample it happened in. Other variants pass through.
    pub fn in_sample(self, sample: usize) -> Self {
        match self {
            SnnError::NumericDivergence { quantity, site, value } if site.sample.is_none() => {
                SnnError::NumericDivergence { quantity, site: site.with_sample(sample), value }
            }
            other => other,
        }
    }

    /// Tag a divergence with the epoch and batch it happened in.
    pub fn in_batch(self, epoch: usize, batch: usize) -> Self {
        match self {
            SnnError::NumericDivergence { quantity, site, value } if site.batch.is_none() => {
                SnnError::NumericDivergence { quantity, site: site.with_batch(epoch, batch), value }
            }
            other => other,
        }
    }
}

pub type SnnResult<T, E = SnnError> = core::result::Result<T, E>;

/// Fails with `NumericDivergence` unless `value` is finite.
#[inline]
pub fn ensure_finite(quantity: &'static str, value: f64, site: Site) -> SnnResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SnnError::divergence(quantity, site, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            format!("{}", SnnError::config("threshold must be positive")),
            "invalid configuration: threshold must be positive"
        );
        assert_eq!(
            format!("{}", SnnError::shape_mismatch("compare", vec![2, 3], vec![3, 2])),
            "shape mismatch in compare: expected [2, 3], got [3, 2]"
        );
        assert_eq!(
            format!("{}", SnnError::data_format("labels.txt", 4, "bad label")),
            "labels.txt:4: bad label"
        );
    }

    #[test]
    fn divergence_names_its_site() {
        let err = SnnError::divergence("membrane potential", Site::layer(1).with_step(3).with_neuron(0), f64::NAN);
        let err = err.in_sample(7).in_batch(2, 5);
        let msg = format!("{}", err);
        assert_eq!(
            msg,
            "non-finite membrane potential at epoch 2, batch 5, sample 7, layer 1, step 3, neuron 0: NaN"
        );
    }

    #[test]
    fn context_does_not_overwrite() {
        let err = SnnError::divergence("loss", Site::default().with_sample(1), f64::INFINITY).in_sample(9);
        match err {
            SnnError::NumericDivergence { site, .. } => assert_eq!(site.sample, Some(1)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(SnnError::config("x").in_sample(3), SnnError::Configuration(_)));
    }

    #[test]
    fn ensure_finite_checks() {
        assert!(ensure_finite("score", 3.0, Site::default()).is_ok());
        assert!(ensure_finite("score", f64::NEG_INFINITY, Site::default()).is_err());
        assert_eq!(format!("{}", Site::default()), "unknown site");
    }
}
