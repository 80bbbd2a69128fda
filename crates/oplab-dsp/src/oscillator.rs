//! Op-amp oscillators -- frequency from component values, plus a display trace.
//!
//! These stages take no input. The Barkhausen condition fixes the loop gain
//! and the RC network fixes the frequency:
//!
//!   RC phase shift:  f = 1 / (2π R C √6),  amplifier gain >= 29
//!   Wien bridge:     f = 1 / (2π R C),     amplifier gain >= 3
//!   Astable (square-wave generator):
//!                    T = 2 Rf C ln(1 + 2 R2/R1)
//!
//! A few cycles of the resulting sine (1 V) or rail-to-rail square are
//! synthesized for display. Component values that cannot oscillate give a
//! flat zero trace and a `NoOscillation` fault.

use std::f64::consts::PI;

use crate::circuit::Evaluate;
use crate::config::LabConfig;
use crate::error::Fault;
use crate::metrics::{Metrics, keys};
use crate::response::ResponseResult;
use crate::units::{kohm, microfarad, to_kohm};
use crate::waveform::{SampledSignal, Stimulus, time_grid};

/// Display amplitude of the sine oscillators, volts.
const SINE_AMPLITUDE: f64 = 1.0;

/// Gain-stage input resistor used when no target frequency is given, kΩ.
const DEFAULT_AMP_R1_KOHM: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SineTopology {
    RcPhaseShift,
    WienBridge,
}

impl SineTopology {
    pub fn label(self) -> &'static str {
        match self {
            Self::RcPhaseShift => "RC Phase Shift Oscillator",
            Self::WienBridge => "Wien Bridge Oscillator",
        }
    }

    /// Extra divisor on 2πRC.
    fn network_factor(self) -> f64 {
        match self {
            Self::RcPhaseShift => 6f64.sqrt(),
            Self::WienBridge => 1.0,
        }
    }

    /// Minimum amplifier gain for sustained oscillation.
    pub fn min_gain(self) -> f64 {
        match self {
            Self::RcPhaseShift => 29.0,
            Self::WienBridge => 3.0,
        }
    }
}

/// RC phase-shift or Wien-bridge sine oscillator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SineOscillator {
    pub topology: SineTopology,
    /// Network resistor, ohms.
    pub r: f64,
    /// Network capacitor, farads.
    pub c: f64,
    /// Optional design target, Hz. Drives the `required_r_kohm` readout.
    pub target_hz: Option<f64>,
}

impl SineOscillator {
    pub fn rc_phase_shift(r_kohm: f64, c_uf: f64) -> Self {
        Self {
            topology: SineTopology::RcPhaseShift,
            r: kohm(r_kohm),
            c: microfarad(c_uf),
            target_hz: None,
        }
    }

    pub fn wien_bridge(r_kohm: f64, c_uf: f64) -> Self {
        Self {
            topology: SineTopology::WienBridge,
            r: kohm(r_kohm),
            c: microfarad(c_uf),
            target_hz: None,
        }
    }

    pub fn with_target(mut self, target_hz: f64) -> Self {
        self.target_hz = Some(target_hz);
        self
    }

    /// Oscillation frequency in Hz, `None` unless R and C are positive and
    /// the result is finite.
    pub fn frequency(&self) -> Option<f64> {
        (self.r > 0.0 && self.c > 0.0)
            .then(|| 1.0 / (2.0 * PI * self.r * self.c * self.topology.network_factor()))
            .filter(|f| f.is_finite())
    }

    /// Network R (kΩ) that hits `target_hz` with the current C.
    pub fn required_r_kohm(&self) -> Option<f64> {
        let f = self.target_hz?;
        (f > 0.0 && self.c > 0.0)
            .then(|| to_kohm(1.0 / (2.0 * PI * f * self.c * self.topology.network_factor())))
    }

    /// Gain-stage resistor pair (R1, Rf) in kΩ meeting the minimum gain.
    ///
    /// RC phase shift uses an inverting stage: R1 = 10 R keeps the network
    /// unloaded and Rf = 29 R1. Wien bridge uses a non-inverting stage with
    /// Rf = 2 R1 (gain exactly 3).
    pub fn amplifier_resistors_kohm(&self) -> (f64, f64) {
        match self.topology {
            SineTopology::RcPhaseShift => {
                let r1 = match self.required_r_kohm() {
                    Some(r) if r > 0.0 => 10.0 * r,
                    _ => DEFAULT_AMP_R1_KOHM,
                };
                (r1, 29.0 * r1)
            }
            SineTopology::WienBridge => (DEFAULT_AMP_R1_KOHM, 2.0 * DEFAULT_AMP_R1_KOHM),
        }
    }

    pub fn synthesize(&self, config: &LabConfig) -> ResponseResult {
        let _span = tracing::debug_span!("oscillator", kind = self.topology.label()).entered();
        let mut metrics = Metrics::new();
        let (amp_r1, amp_rf) = self.amplifier_resistors_kohm();

        let f = self.frequency();
        metrics.number(keys::FREQUENCY_HZ, f.unwrap_or(0.0));
        match f {
            Some(f) => metrics.number(keys::PERIOD_S, 1.0 / f),
            None => metrics.not_applicable(keys::PERIOD_S),
        };
        metrics.number(keys::MIN_GAIN, self.topology.min_gain());
        match self.required_r_kohm() {
            Some(r) => metrics.number(keys::REQUIRED_R_KOHM, r),
            None => metrics.not_applicable(keys::REQUIRED_R_KOHM),
        };
        metrics
            .number(keys::AMP_R1_KOHM, amp_r1)
            .number(keys::AMP_RF_KOHM, amp_rf);

        let Some(f) = f else {
            let times = time_grid(0.0, config.oscillator_cycles, config);
            let fault = Fault::NoOscillation {
                reason: "R and C must be positive",
            };
            return ResponseResult::no_output(&times, metrics, fault, config);
        };
        tracing::debug!(f, "oscillation frequency");

        let times = time_grid(f, config.oscillator_cycles, config);
        let trace = SampledSignal::from_fn(times, |t| SINE_AMPLITUDE * (2.0 * PI * f * t).sin());
        ResponseResult::settle(trace.times(), trace.values().to_vec(), metrics, None, config)
    }
}

/// Op-amp astable multivibrator (square-wave generator).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AstableMultivibrator {
    /// Timing resistor, ohms.
    pub rf: f64,
    /// Timing capacitor, farads.
    pub c: f64,
    /// Divider resistor from output, ohms.
    pub r1: f64,
    /// Divider resistor to ground, ohms.
    pub r2: f64,
}

impl AstableMultivibrator {
    pub fn new(rf_kohm: f64, c_uf: f64, r1_kohm: f64, r2_kohm: f64) -> Self {
        Self {
            rf: kohm(rf_kohm),
            c: microfarad(c_uf),
            r1: kohm(r1_kohm),
            r2: kohm(r2_kohm),
        }
    }

    /// Feedback fraction β = R2 / (R1 + R2).
    pub fn feedback_fraction(&self) -> Option<f64> {
        let total = self.r1 + self.r2;
        (total > 0.0).then(|| self.r2 / total)
    }

    /// Oscillation period in seconds, or the reason there is none.
    ///
    /// The log argument is checked before `ln` is taken: it must be finite
    /// and strictly above 1, otherwise the period would be zero, negative
    /// or NaN.
    pub fn period(&self) -> Result<f64, Fault> {
        if self.feedback_fraction().is_none() {
            return Err(Fault::NoOscillation {
                reason: "R1 + R2 must be positive",
            });
        }
        let log_arg = if self.r1 > 0.0 {
            1.0 + 2.0 * self.r2 / self.r1
        } else {
            0.0
        };
        if !(log_arg.is_finite() && log_arg > 1.0) {
            return Err(Fault::NoOscillation {
                reason: "R1 must be positive and R2 non-zero (log argument <= 1)",
            });
        }
        let period = 2.0 * self.rf * self.c * log_arg.ln();
        if !(period.is_finite() && period > 0.0) {
            return Err(Fault::NoOscillation {
                reason: "Rf and C must be positive",
            });
        }
        Ok(period)
    }

    pub fn synthesize(&self, config: &LabConfig) -> ResponseResult {
        let _span = tracing::debug_span!("oscillator", kind = "astable").entered();
        let rails = config.saturation;
        let beta = self.feedback_fraction().unwrap_or(0.0);
        let mut metrics = Metrics::new();

        let period = match self.period() {
            Ok(p) => p,
            Err(fault) => {
                metrics
                    .number(keys::FREQUENCY_HZ, 0.0)
                    .not_applicable(keys::PERIOD_S)
                    .number(keys::T_ON_S, 0.0)
                    .number(keys::T_OFF_S, 0.0)
                    .number(keys::FEEDBACK_FRACTION, beta)
                    .number(keys::CAPACITOR_THRESHOLD_V, beta * rails.v_sat_plus);
                let times = time_grid(0.0, config.oscillator_cycles, config);
                return ResponseResult::no_output(&times, metrics, fault, config);
            }
        };
        let f = 1.0 / period;
        tracing::debug!(period, f, beta, "astable timing");

        metrics
            .number(keys::FREQUENCY_HZ, f)
            .number(keys::PERIOD_S, period)
            .number(keys::T_ON_S, period / 2.0)
            .number(keys::T_OFF_S, period / 2.0)
            .number(keys::FEEDBACK_FRACTION, beta)
            .number(keys::CAPACITOR_THRESHOLD_V, beta * rails.v_sat_plus);

        let times = time_grid(f, config.oscillator_cycles, config);
        let trace = SampledSignal::from_fn(times, |t| {
            if (f * t).fract() < 0.5 {
                rails.v_sat_plus
            } else {
                rails.v_sat_minus
            }
        });
        ResponseResult::settle(trace.times(), trace.values().to_vec(), metrics, None, config)
    }
}

// Oscillators have no input terminal; the stimulus is ignored.

impl Evaluate for SineOscillator {
    fn label(&self) -> &'static str {
        self.topology.label()
    }

    fn evaluate(&self, _input: &Stimulus, config: &LabConfig) -> ResponseResult {
        self.synthesize(config)
    }
}

impl Evaluate for AstableMultivibrator {
    fn label(&self) -> &'static str {
        "Square Wave Generator"
    }

    fn evaluate(&self, _input: &Stimulus, config: &LabConfig) -> ResponseResult {
        self.synthesize(config)
    }
}
