//! OpLab DSP library -- op-amp lab bench simulation core.
//!
//! Pure signal math: a function generator, ideal op-amp circuit evaluators
//! and rail clipping. No plotting or UI dependencies.

// Shared plumbing
pub mod config;
pub mod error;
pub mod metrics;
pub mod response;
pub mod saturation;
pub mod units;

// Function generator
pub mod waveform;

// Linear stages
pub mod amplifier;
pub mod calculus;
pub mod filter;

// Non-linear stages
pub mod comparator;
pub mod rectifier;
pub mod schmitt;
pub mod shaping;

// Oscillators
pub mod oscillator;

// Dispatch and record keeping
pub mod circuit;
pub mod history;

pub use circuit::{CircuitParameters, Evaluate};
pub use config::LabConfig;
pub use error::{Fault, LabError, Result};
pub use response::ResponseResult;
pub use waveform::{SampledSignal, Stimulus, WaveShape, WaveformSpec};
