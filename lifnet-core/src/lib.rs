//! lifnet-core: two-layer leaky integrate-and-fire network
//!
//! - Rate encoding of scalar features into spike trains
//! - LIF layer with reset-by-subtraction and a surrogate spike derivative
//! - Explicitly threaded network state, unrolled into a replayable trace
//! - Exact comparison of spike-output matrices
//!
//! Training lives in `lifnet-train`; this crate only simulates.

pub mod compare;
pub mod config;
pub mod encoder;
pub mod error;
pub mod matrix;
pub mod network;
pub mod neuron;
pub mod quant;
pub mod simulator;
pub mod surrogate;
pub mod synapse;
pub mod trace;

// Re-exports
pub use compare::{compare, ComparisonReport, Mismatch};
pub use config::{InputEncoding, NetworkConfig};
pub use encoder::{RateEncoder, SpikeTrain};
pub use error::{ensure_finite, Site, SnnError, SnnResult};
pub use matrix::Matrix;
pub use network::{NetworkState, NetworkStep, SpikingNetwork};
pub use neuron::{LayerRole, LayerState, LayerStep, LifLayer};
pub use quant::{dequantize_q07, quantize_q07, Q07};
pub use simulator::TemporalSimulator;
pub use surrogate::{fast_sigmoid_grad, heaviside};
pub use synapse::SynapticWeights;
pub use trace::{LayerRecord, SimulationTrace, StepRecord};
