//! Bench configuration.
//!
//! Every field has a default matching the lab's +/-15 V supply and its
//! display conventions, so an empty TOML file is a valid config.
//!
//! ```toml
//! clip_tolerance = 0.01
//! default_cycles = 3
//!
//! [saturation]
//! v_sat_plus = 12.0
//! v_sat_minus = -12.0
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{LabError, Result};
use crate::saturation::{DEFAULT_CLIP_TOLERANCE, SaturationLimits};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub saturation: SaturationLimits,
    /// Rail proximity (V) that counts as clipped.
    pub clip_tolerance: f64,
    /// Cycles shown for signal-driven experiments.
    pub default_cycles: u32,
    /// Cycles synthesized for oscillator displays.
    pub oscillator_cycles: u32,
    /// Sample rate used for DC (f = 0) and "no oscillation" traces.
    pub dc_sample_rate: f64,
    /// Window length for DC traces, seconds.
    pub dc_duration_s: f64,
    /// Floor on samples per period when f > 0.
    pub min_samples_per_cycle: f64,
    /// Floor on the sample rate when f > 0.
    pub min_sample_rate: f64,
    /// Ceiling on trace length. Longer windows are sampled more coarsely.
    pub max_samples: usize,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            saturation: SaturationLimits::default(),
            clip_tolerance: DEFAULT_CLIP_TOLERANCE,
            default_cycles: 3,
            oscillator_cycles: 5,
            dc_sample_rate: 10_000.0,
            dc_duration_s: 0.01,
            min_samples_per_cycle: 100.0,
            min_sample_rate: 1000.0,
            max_samples: 200_000,
        }
    }
}

impl LabConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let sat = &self.saturation;
        if !(sat.v_sat_plus > 0.0 && sat.v_sat_minus < 0.0) {
            return Err(LabError::Config(format!(
                "saturation rails must straddle 0 V (got {} / {})",
                sat.v_sat_plus, sat.v_sat_minus
            )));
        }
        if !(self.clip_tolerance >= 0.0) {
            return Err(LabError::Config("clip_tolerance must be >= 0".into()));
        }
        if self.default_cycles == 0 || self.oscillator_cycles == 0 {
            return Err(LabError::Config("cycle counts must be >= 1".into()));
        }
        let rates = [
            self.dc_sample_rate,
            self.dc_duration_s,
            self.min_samples_per_cycle,
            self.min_sample_rate,
        ];
        if rates.iter().any(|r| !(r.is_finite() && *r > 0.0)) {
            return Err(LabError::Config(
                "sample rates and durations must be positive".into(),
            ));
        }
        if self.max_samples < 2 {
            return Err(LabError::Config("max_samples must be >= 2".into()));
        }
        Ok(())
    }
}
