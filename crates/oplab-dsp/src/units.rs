//! Lab-unit conversions.
//!
//! Bench controls are labelled in kΩ, µF and Hz/kHz/MHz; everything past
//! this module works in ohms, farads and hertz.

use std::str::FromStr;

use crate::error::LabError;

/// kΩ -> Ω
pub fn kohm(value_kohm: f64) -> f64 {
    value_kohm * 1e3
}

/// µF -> F
pub fn microfarad(value_uf: f64) -> f64 {
    value_uf * 1e-6
}

/// Ω -> kΩ (for reporting designed resistor values back in lab units).
pub fn to_kohm(value_ohm: f64) -> f64 {
    value_ohm / 1e3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrequencyUnit {
    #[default]
    Hz,
    KHz,
    MHz,
}

impl FrequencyUnit {
    pub fn to_hz(self, value: f64) -> f64 {
        match self {
            Self::Hz => value,
            Self::KHz => value * 1e3,
            Self::MHz => value * 1e6,
        }
    }
}

impl FromStr for FrequencyUnit {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hz" => Ok(Self::Hz),
            "khz" => Ok(Self::KHz),
            "mhz" => Ok(Self::MHz),
            _ => Err(LabError::UnknownLabel {
                kind: "frequency unit",
                label: s.to_string(),
            }),
        }
    }
}

/// Format a frequency with an auto-selected unit, two decimals.
pub fn format_frequency(hz: f64) -> String {
    if hz >= 1e6 {
        format!("{:.2} MHz", hz / 1e6)
    } else if hz >= 1e3 {
        format!("{:.2} kHz", hz / 1e3)
    } else {
        format!("{hz:.2} Hz")
    }
}
