//! Basic op-amp amplifier stages -- inverting, non-inverting, voltage follower.
//!
//! Ideal closed-loop gains:
//!   inverting:      Av = -Rf/R1   (180° phase shift)
//!   non-inverting:  Av = 1 + Rf/R1
//!   follower:       Av = 1        (R1 -> inf, Rf -> 0)
//!
//! The output is the input scaled by Av, then clamped at the rails.

use crate::circuit::Evaluate;
use crate::config::LabConfig;
use crate::error::Fault;
use crate::metrics::{Metrics, gain_db, keys};
use crate::response::ResponseResult;
use crate::units::kohm;
use crate::waveform::Stimulus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplifierKind {
    Inverting,
    NonInverting,
    Follower,
}

impl AmplifierKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Inverting => "Inverting Amplifier",
            Self::NonInverting => "Non-Inverting Amplifier",
            Self::Follower => "Voltage Follower",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Amplifier {
    pub kind: AmplifierKind,
    /// Input resistor, ohms.
    pub r1: f64,
    /// Feedback resistor, ohms.
    pub rf: f64,
}

impl Amplifier {
    pub fn inverting(r1_kohm: f64, rf_kohm: f64) -> Self {
        Self {
            kind: AmplifierKind::Inverting,
            r1: kohm(r1_kohm),
            rf: kohm(rf_kohm),
        }
    }

    pub fn non_inverting(r1_kohm: f64, rf_kohm: f64) -> Self {
        Self {
            kind: AmplifierKind::NonInverting,
            r1: kohm(r1_kohm),
            rf: kohm(rf_kohm),
        }
    }

    pub fn follower() -> Self {
        Self {
            kind: AmplifierKind::Follower,
            r1: f64::INFINITY,
            rf: 0.0,
        }
    }

    /// Closed-loop gain, or the fault that leaves it undefined.
    ///
    /// A non-inverting stage with R1 = 0 has no ground leg and degenerates
    /// to a buffer.
    pub fn gain(&self) -> Result<f64, Fault> {
        match self.kind {
            AmplifierKind::Follower => Ok(1.0),
            _ if self.rf < 0.0 || self.r1 < 0.0 => Err(Fault::NonPositiveComponent {
                circuit: "amplifier",
                what: "R1/Rf",
            }),
            AmplifierKind::Inverting if self.r1 == 0.0 => Err(Fault::NonPositiveComponent {
                circuit: "inverting amplifier",
                what: "R1",
            }),
            AmplifierKind::Inverting => Ok(-self.rf / self.r1),
            AmplifierKind::NonInverting if self.r1 == 0.0 => Ok(1.0),
            AmplifierKind::NonInverting => Ok(1.0 + self.rf / self.r1),
        }
    }
}

impl Evaluate for Amplifier {
    fn label(&self) -> &'static str {
        self.kind.label()
    }

    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult {
        let _span = tracing::debug_span!("amplifier", kind = self.kind.label()).entered();
        let times = input.signal.times();
        let mut metrics = Metrics::new();

        let gain = match self.gain() {
            Ok(g) => g,
            Err(fault) => {
                metrics
                    .number(keys::GAIN, f64::NAN)
                    .number(keys::GAIN_DB, f64::NAN)
                    .number(keys::PHASE_DEG, 0.0);
                return ResponseResult::no_output(times, metrics, fault, config);
            }
        };
        tracing::debug!(gain, "closed-loop gain");

        let phase = if self.kind == AmplifierKind::Inverting && input.amplitude() != 0.0 {
            180.0
        } else {
            0.0
        };

        metrics
            .number(keys::GAIN, gain)
            .number(keys::GAIN_DB, gain_db(gain))
            .number(keys::PHASE_DEG, phase);

        let raw = input.signal.values().iter().map(|v| gain * v).collect();
        ResponseResult::settle(times, raw, metrics, None, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::{WaveShape, WaveformSpec};
    use approx::assert_abs_diff_eq;

    fn sine(amplitude: f64) -> Stimulus {
        Stimulus::generate(WaveformSpec::sine(amplitude, 1000.0), &LabConfig::default())
    }

    #[test]
    fn test_inverting_gain_and_phase() {
        let r = Amplifier::inverting(10.0, 50.0).evaluate(&sine(1.0), &LabConfig::default());
        assert_eq!(r.metrics.get_number(keys::GAIN), Some(-5.0));
        assert_eq!(r.metrics.get_number(keys::PHASE_DEG), Some(180.0));
        assert_abs_diff_eq!(r.output_amplitude(), 5.0, epsilon = 5e-3);
        assert!(!r.is_clipped());
        // Output is the mirrored input.
        let input = sine(1.0);
        for (o, i) in r.output.values().iter().zip(input.signal.values()) {
            assert_abs_diff_eq!(*o, -5.0 * i, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_non_inverting_gain() {
        let r = Amplifier::non_inverting(10.0, 50.0).evaluate(&sine(1.0), &LabConfig::default());
        assert_eq!(r.metrics.get_number(keys::GAIN), Some(6.0));
        assert_eq!(r.metrics.get_number(keys::PHASE_DEG), Some(0.0));
        assert_abs_diff_eq!(r.metrics.get_number(keys::GAIN_DB).unwrap(), 15.563, epsilon = 1e-3);
    }

    #[test]
    fn test_follower_is_identity() {
        let input = sine(2.0);
        let r = Amplifier::follower().evaluate(&input, &LabConfig::default());
        assert_eq!(r.output.values(), input.signal.values());
        assert_eq!(r.metrics.get_number(keys::GAIN), Some(1.0));
    }

    #[test]
    fn test_inverting_zero_r1_no_output() {
        let r = Amplifier::inverting(0.0, 50.0).evaluate(&sine(1.0), &LabConfig::default());
        assert!(r.output.is_all_zero());
        assert!(!r.is_valid());
        assert!(r.metrics.get_number(keys::GAIN).unwrap().is_nan());
        assert_eq!(r.metrics.get_number(keys::PHASE_DEG), Some(0.0));
    }

    #[test]
    fn test_non_inverting_zero_r1_is_buffer() {
        let r = Amplifier::non_inverting(0.0, 50.0).evaluate(&sine(1.0), &LabConfig::default());
        assert!(r.is_valid());
        assert_eq!(r.metrics.get_number(keys::GAIN), Some(1.0));
    }

    #[test]
    fn test_overdrive_clips_at_rails() {
        let r = Amplifier::inverting(1.0, 100.0).evaluate(&sine(1.0), &LabConfig::default());
        assert!(r.is_clipped());
        assert_eq!(r.output.max(), 15.0);
        assert_eq!(r.output.min(), -15.0);
    }

    #[test]
    fn test_zero_input_has_no_phase_shift() {
        let input = Stimulus::generate(
            WaveformSpec::new(WaveShape::None, 1.0, 100.0, 3).unwrap(),
            &LabConfig::default(),
        );
        let r = Amplifier::inverting(10.0, 20.0).evaluate(&input, &LabConfig::default());
        assert_eq!(r.metrics.get_number(keys::PHASE_DEG), Some(0.0));
    }
}
