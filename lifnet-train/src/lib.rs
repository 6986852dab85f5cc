//! lifnet-train: surrogate-gradient training and evaluation for `lifnet-core`
//!
//! - Datasets: text loading, two-cluster generation, normalization, batching
//! - Loss on spike-count scores (cross-entropy, mean squared)
//! - Backpropagation through time over the simulation trace
//! - SGD/Adam optimizers, one step per mini-batch
//! - Evaluation and weight persistence in numpy-compatible text files

pub mod backward;
pub mod config;
pub mod dataset;
pub mod eval;
pub mod loss;
pub mod optim;
pub mod text_io;
pub mod trainer;

// Re-exports
pub use backward::{backward, Gradients, LayerGradients};
pub use config::{LossKind, OptimizerConfig, TrainConfig};
pub use dataset::{generate_two_clusters, ClusterSpec, Dataset, Sample};
pub use eval::{predict, Evaluation, Evaluator};
pub use loss::{cross_entropy, mean_squared, LossOutput};
pub use optim::Optimizer;
pub use text_io::{load_network, save_network};
pub use trainer::{TrainReport, Trainer};
