//! Error types.
//!
//! Two tiers: `LabError` for things that stop a caller (bad config file,
//! unknown labels, out-of-range bench input), and `Fault` for degenerate
//! circuits. Evaluators never return `LabError`; a `Fault` travels inside
//! the `ResponseResult` next to a defined zero output.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unknown {kind} label: {label:?}")]
    UnknownLabel { kind: &'static str, label: String },

    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LabError>;

/// Why an evaluator fell back to its "no output" result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Fault {
    #[error("{circuit}: {what} must be positive, output forced to zero")]
    NonPositiveComponent {
        circuit: &'static str,
        what: &'static str,
    },

    #[error("filter R and C must be non-zero to define a cutoff frequency")]
    UndefinedCutoff,

    #[error("no oscillation: {reason}")]
    NoOscillation { reason: &'static str },
}
