//! Schmitt trigger -- comparator with positive feedback (hysteresis).
//!
//! R1 (feedback) and R2 (to ground) divide the output back onto the
//! reference input, giving two switching points:
//!
//!   V_UTP = V_sat+ · R2 / (R1 + R2)
//!   V_LTP = V_sat- · R2 / (R1 + R2)
//!
//! The output is the only sequential state in the lab: sample i depends on
//! the output at i-1. `HysteresisMachine` runs that scan.

use crate::circuit::Evaluate;
use crate::config::LabConfig;
use crate::error::Fault;
use crate::metrics::{Metrics, keys};
use crate::response::ResponseResult;
use crate::saturation::SaturationLimits;
use crate::units::kohm;
use crate::waveform::Stimulus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HysteresisState {
    /// Output at +V_sat.
    High,
    /// Output at -V_sat.
    Low,
}

/// Two-threshold state machine over a sampled input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HysteresisMachine {
    pub v_utp: f64,
    pub v_ltp: f64,
    pub rails: SaturationLimits,
}

impl HysteresisMachine {
    pub fn new(v_utp: f64, v_ltp: f64, rails: SaturationLimits) -> Self {
        Self {
            v_utp,
            v_ltp,
            rails,
        }
    }

    /// Starting state, decided once from the first sample: low only if it
    /// is already above the upper threshold.
    pub fn initial_state(&self, first: f64) -> HysteresisState {
        if first > self.v_utp {
            HysteresisState::Low
        } else {
            HysteresisState::High
        }
    }

    pub fn step(&self, state: HysteresisState, x: f64) -> HysteresisState {
        match state {
            HysteresisState::High if x > self.v_utp => HysteresisState::Low,
            HysteresisState::Low if x < self.v_ltp => HysteresisState::High,
            s => s,
        }
    }

    pub fn level(&self, state: HysteresisState) -> f64 {
        match state {
            HysteresisState::High => self.rails.v_sat_plus,
            HysteresisState::Low => self.rails.v_sat_minus,
        }
    }

    /// Scan the whole input. Returns the output levels, the number of
    /// state changes, and the terminal state.
    pub fn run(&self, input: &[f64]) -> (Vec<f64>, usize, Option<HysteresisState>) {
        let Some(&first) = input.first() else {
            return (Vec::new(), 0, None);
        };

        let mut state = self.initial_state(first);
        let mut transitions = 0;
        let mut out = Vec::with_capacity(input.len());
        out.push(self.level(state));

        for &x in &input[1..] {
            let next = self.step(state, x);
            if next != state {
                transitions += 1;
            }
            state = next;
            out.push(self.level(state));
        }
        (out, transitions, Some(state))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchmittTrigger {
    /// Feedback resistor, ohms.
    pub r1: f64,
    /// Resistor to ground, ohms.
    pub r2: f64,
}

impl SchmittTrigger {
    pub fn new(r1_kohm: f64, r2_kohm: f64) -> Self {
        Self {
            r1: kohm(r1_kohm),
            r2: kohm(r2_kohm),
        }
    }

    /// (V_UTP, V_LTP), or `None` when the divider is undefined.
    pub fn thresholds(&self, rails: &SaturationLimits) -> Option<(f64, f64)> {
        let total = self.r1 + self.r2;
        if !(total > 0.0) || self.r1 < 0.0 || self.r2 < 0.0 {
            return None;
        }
        let beta = self.r2 / total;
        Some((beta * rails.v_sat_plus, beta * rails.v_sat_minus))
    }
}

impl Evaluate for SchmittTrigger {
    fn label(&self) -> &'static str {
        "Schmitt Trigger"
    }

    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult {
        let _span = tracing::debug_span!("schmitt").entered();
        let times = input.signal.times();
        let mut metrics = Metrics::new();

        let Some((v_utp, v_ltp)) = self.thresholds(&config.saturation) else {
            metrics
                .number(keys::V_UTP, 0.0)
                .number(keys::V_LTP, 0.0)
                .number(keys::HYSTERESIS_WIDTH_V, 0.0)
                .number(keys::TRANSITIONS, 0.0);
            let fault = Fault::NonPositiveComponent {
                circuit: "Schmitt trigger",
                what: "R1 + R2",
            };
            return ResponseResult::no_output(times, metrics, fault, config);
        };
        tracing::debug!(v_utp, v_ltp, "switching thresholds");

        let machine = HysteresisMachine::new(v_utp, v_ltp, config.saturation);
        let (raw, transitions, _) = machine.run(input.signal.values());

        metrics
            .number(keys::V_UTP, v_utp)
            .number(keys::V_LTP, v_ltp)
            .number(keys::HYSTERESIS_WIDTH_V, v_utp - v_ltp)
            .number(keys::TRANSITIONS, transitions as f64);

        ResponseResult::settle(times, raw, metrics, None, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::WaveformSpec;
    use approx::assert_abs_diff_eq;

    fn machine() -> HysteresisMachine {
        HysteresisMachine::new(1.0, -1.0, SaturationLimits::default())
    }

    #[test]
    fn test_thresholds() {
        let st = SchmittTrigger::new(10.0, 1.0);
        let (utp, ltp) = st.thresholds(&SaturationLimits::default()).unwrap();
        assert_abs_diff_eq!(utp, 15.0 / 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ltp, -15.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn test_initial_state_from_first_sample() {
        let m = machine();
        assert_eq!(m.initial_state(1.5), HysteresisState::Low);
        assert_eq!(m.initial_state(0.0), HysteresisState::High);
        assert_eq!(m.initial_state(-3.0), HysteresisState::High);
        // Exactly on the threshold is not "above".
        assert_eq!(m.initial_state(1.0), HysteresisState::High);
    }

    #[test]
    fn test_scripted_scan() {
        let input = [0.0, 0.9, 1.1, 0.5, -0.5, -0.9, -1.1, -0.5, 0.5, 1.0, 1.2];
        let (out, transitions, last) = machine().run(&input);
        let expected = [
            15.0, 15.0, -15.0, -15.0, -15.0, -15.0, 15.0, 15.0, 15.0, 15.0, -15.0,
        ];
        assert_eq!(out, expected);
        assert_eq!(transitions, 3);
        assert_eq!(last, Some(HysteresisState::Low));
    }

    #[test]
    fn test_noise_inside_band_does_not_chatter() {
        let input: Vec<f64> = (0..200)
            .map(|i| if i % 2 == 0 { 0.8 } else { -0.8 })
            .collect();
        let (out, transitions, _) = machine().run(&input);
        assert_eq!(transitions, 0);
        assert!(out.iter().all(|&v| v == 15.0));
    }

    #[test]
    fn test_empty_input() {
        let (out, transitions, last) = machine().run(&[]);
        assert!(out.is_empty());
        assert_eq!(transitions, 0);
        assert_eq!(last, None);
    }

    #[test]
    fn test_sine_switches_only_at_crossings() {
        let input = Stimulus::generate(WaveformSpec::sine(5.0, 100.0), &LabConfig::default());
        let st = SchmittTrigger::new(10.0, 1.0);
        let r = st.evaluate(&input, &LabConfig::default());
        let (utp, ltp) = st.thresholds(&SaturationLimits::default()).unwrap();

        let x = input.signal.values();
        let y = r.output.values();
        assert!(y.iter().all(|&v| v == 15.0 || v == -15.0));
        for i in 1..y.len() {
            if y[i] != y[i - 1] {
                if y[i] < 0.0 {
                    assert!(x[i] > utp && x[i - 1] <= utp, "falling edge off crossing at {i}");
                } else {
                    assert!(x[i] < ltp && x[i - 1] >= ltp, "rising edge off crossing at {i}");
                }
            }
        }
        // Three cycles: down at each rising UTP crossing, up at each falling LTP crossing.
        assert_eq!(r.metrics.get_number(keys::TRANSITIONS), Some(6.0));
        assert!(!r.is_clipped());
    }

    #[test]
    fn test_rerun_is_bit_identical() {
        let input = Stimulus::generate(WaveformSpec::sine(5.0, 100.0), &LabConfig::default());
        let st = SchmittTrigger::new(10.0, 1.0);
        let a = st.evaluate(&input, &LabConfig::default());
        let b = st.evaluate(&input, &LabConfig::default());
        assert_eq!(a.output, b.output);
    }

    #[test]
    fn test_zero_divider_fault() {
        let input = Stimulus::generate(WaveformSpec::sine(5.0, 100.0), &LabConfig::default());
        let r = SchmittTrigger::new(0.0, 0.0).evaluate(&input, &LabConfig::default());
        assert!(!r.is_valid());
        assert!(r.output.is_all_zero());
        assert_eq!(r.metrics.get_number(keys::V_UTP), Some(0.0));
    }
}
