//! First-order active filters -- RC section feeding a non-inverting gain stage.
//!
//!   fc = 1 / (2π R C)
//!   Av = 1 + Rf/R1                    (passband gain)
//!   low-pass:  |H(f)| = Av / sqrt(1 + (f/fc)^2)
//!   high-pass: |H(f)| = Av (f/fc) / sqrt(1 + (f/fc)^2)
//!
//! The response is applied as a single-tone gain: the whole input trace is
//! scaled by |H| at the generator frequency. That is exact for sine/cosine
//! inputs only. Triangle and square inputs keep their shape instead of
//! losing harmonics, which is the intended behavior of this bench.

use std::f64::consts::PI;

use crate::circuit::Evaluate;
use crate::config::LabConfig;
use crate::error::Fault;
use crate::metrics::{Metrics, gain_db, keys, voltage_gain};
use crate::response::ResponseResult;
use crate::units::{kohm, microfarad};
use crate::waveform::Stimulus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
}

impl FilterKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::LowPass => "Lowpass Filter",
            Self::HighPass => "Highpass Filter",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveFilter {
    pub kind: FilterKind,
    /// Gain-stage ground resistor, ohms.
    pub r1: f64,
    /// Gain-stage feedback resistor, ohms.
    pub rf: f64,
    /// RC section resistor, ohms.
    pub r: f64,
    /// RC section capacitor, farads.
    pub c: f64,
}

impl ActiveFilter {
    pub fn new(kind: FilterKind, r1_kohm: f64, rf_kohm: f64, r_kohm: f64, c_uf: f64) -> Self {
        Self {
            kind,
            r1: kohm(r1_kohm),
            rf: kohm(rf_kohm),
            r: kohm(r_kohm),
            c: microfarad(c_uf),
        }
    }

    /// Cutoff frequency in Hz, `None` unless R and C are both positive.
    pub fn cutoff_hz(&self) -> Option<f64> {
        (self.r > 0.0 && self.c > 0.0).then(|| 1.0 / (2.0 * PI * self.r * self.c))
    }

    /// Gain-stage resistors must not be negative. R1 = 0 is allowed.
    pub fn check_gain_stage(&self) -> Result<(), Fault> {
        if self.r1 < 0.0 || self.rf < 0.0 {
            return Err(Fault::NonPositiveComponent {
                circuit: "active filter",
                what: "R1/Rf",
            });
        }
        Ok(())
    }

    /// Passband gain. R1 = 0 leaves the gain stage open-loop (+inf), which
    /// the rails then clip.
    pub fn passband_gain(&self) -> f64 {
        if self.r1 != 0.0 {
            1.0 + self.rf / self.r1
        } else {
            f64::INFINITY
        }
    }

    /// |H(f)| for a tone at `freq` Hz, `None` when the cutoff is undefined.
    pub fn gain_at(&self, freq: f64) -> Option<f64> {
        let fc = self.cutoff_hz()?;
        let av = self.passband_gain();
        let gain = match (self.kind, freq == 0.0) {
            (FilterKind::LowPass, true) => av,
            (FilterKind::HighPass, true) => 0.0,
            (FilterKind::LowPass, false) => {
                let x = freq / fc;
                av / (1.0 + x * x).sqrt()
            }
            (FilterKind::HighPass, false) => {
                let x = freq / fc;
                av * x / (1.0 + x * x).sqrt()
            }
        };
        Some(gain)
    }
}

impl Evaluate for ActiveFilter {
    fn label(&self) -> &'static str {
        self.kind.label()
    }

    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult {
        let _span = tracing::debug_span!("filter", kind = self.kind.label()).entered();
        let times = input.signal.times();
        let mut metrics = Metrics::new();
        let av = self.passband_gain();

        if let Err(fault) = self.check_gain_stage() {
            metrics
                .number(keys::CUTOFF_HZ, self.cutoff_hz().unwrap_or(0.0))
                .number(keys::PASSBAND_GAIN, f64::NAN)
                .number(keys::GAIN_AT_FREQ, f64::NAN)
                .number(keys::GAIN, f64::NAN)
                .number(keys::GAIN_DB, f64::NAN);
            return ResponseResult::no_output(times, metrics, fault, config);
        }

        let (Some(fc), Some(h)) = (self.cutoff_hz(), self.gain_at(input.frequency())) else {
            metrics
                .number(keys::CUTOFF_HZ, 0.0)
                .number(keys::PASSBAND_GAIN, av)
                .number(keys::GAIN_AT_FREQ, 0.0)
                .number(keys::GAIN, 0.0)
                .number(keys::GAIN_DB, f64::NEG_INFINITY);
            return ResponseResult::no_output(times, metrics, Fault::UndefinedCutoff, config);
        };
        tracing::debug!(fc, av, h, "filter response at input frequency");

        // 0 * inf on an all-zero input would be NaN; a silent input stays silent.
        let raw = input
            .signal
            .values()
            .iter()
            .map(|&v| if v == 0.0 { 0.0 } else { h * v })
            .collect();

        metrics
            .number(keys::CUTOFF_HZ, fc)
            .number(keys::PASSBAND_GAIN, av)
            .number(keys::GAIN_AT_FREQ, h);

        let mut result = ResponseResult::settle(times, raw, metrics, None, config);

        // Measured gain from the clipped trace, so clipping shows up in it.
        let measured = voltage_gain(result.output_amplitude(), input.amplitude());
        result
            .metrics
            .number(keys::GAIN, measured)
            .number(keys::GAIN_DB, gain_db(measured));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::{WaveShape, WaveformSpec};
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn tone(freq: f64) -> Stimulus {
        Stimulus::generate(WaveformSpec::sine(1.0, freq), &LabConfig::default())
    }

    #[test]
    fn test_cutoff_frequency() {
        let lp = ActiveFilter::new(FilterKind::LowPass, 10.0, 10.0, 10.0, 0.1);
        assert_relative_eq!(lp.cutoff_hz().unwrap(), 159.154_943, max_relative = 1e-6);
    }

    #[test]
    fn test_lowpass_at_cutoff_is_minus_3db() {
        let lp = ActiveFilter::new(FilterKind::LowPass, 10.0, 10.0, 10.0, 0.1);
        let fc = lp.cutoff_hz().unwrap();
        let av = lp.passband_gain();
        assert_eq!(av, 2.0);
        assert_relative_eq!(lp.gain_at(fc).unwrap(), av / 2f64.sqrt(), max_relative = 1e-12);

        let r = lp.evaluate(&tone(fc), &LabConfig::default());
        assert_relative_eq!(
            r.metrics.get_number(keys::GAIN_AT_FREQ).unwrap(),
            av / 2f64.sqrt(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_highpass_at_cutoff_matches_lowpass() {
        let hp = ActiveFilter::new(FilterKind::HighPass, 10.0, 10.0, 10.0, 0.1);
        let fc = hp.cutoff_hz().unwrap();
        assert_relative_eq!(hp.gain_at(fc).unwrap(), 2.0 / 2f64.sqrt(), max_relative = 1e-12);
    }

    #[test]
    fn test_rolloff_direction() {
        let lp = ActiveFilter::new(FilterKind::LowPass, 10.0, 0.0, 10.0, 0.1);
        let hp = ActiveFilter::new(FilterKind::HighPass, 10.0, 0.0, 10.0, 0.1);
        assert!(lp.gain_at(10.0).unwrap() > 0.99);
        assert!(lp.gain_at(20_000.0).unwrap() < 0.01);
        assert!(hp.gain_at(10.0).unwrap() < 0.07);
        assert!(hp.gain_at(20_000.0).unwrap() > 0.99);
    }

    #[test]
    fn test_dc_behavior() {
        let dc = Stimulus::generate(
            WaveformSpec::new(WaveShape::Sine, 1.0, 0.0, 3).unwrap(),
            &LabConfig::default(),
        );
        let lp = ActiveFilter::new(FilterKind::LowPass, 10.0, 20.0, 10.0, 0.1);
        let r = lp.evaluate(&dc, &LabConfig::default());
        assert!(r.output.values().iter().all(|&v| v == 3.0));

        let hp = ActiveFilter::new(FilterKind::HighPass, 10.0, 20.0, 10.0, 0.1);
        let r = hp.evaluate(&dc, &LabConfig::default());
        assert!(r.output.is_all_zero());
        assert!(r.is_valid(), "a blocked DC input is a valid result");
        assert_eq!(r.metrics.get_number(keys::GAIN_DB), Some(f64::NEG_INFINITY));
    }

    #[test]
    fn test_zero_capacitor_is_config_error() {
        let lp = ActiveFilter::new(FilterKind::LowPass, 10.0, 10.0, 10.0, 0.0);
        let r = lp.evaluate(&tone(100.0), &LabConfig::default());
        assert_eq!(r.fault, Some(Fault::UndefinedCutoff));
        assert!(r.output.is_all_zero());
        assert_eq!(r.metrics.get_number(keys::CUTOFF_HZ), Some(0.0));
    }

    #[test]
    fn test_open_loop_gain_stage_clips() {
        let lp = ActiveFilter::new(FilterKind::LowPass, 0.0, 10.0, 10.0, 0.1);
        let r = lp.evaluate(&tone(100.0), &LabConfig::default());
        assert!(r.is_clipped());
        assert_abs_diff_eq!(r.output_amplitude(), 15.0, epsilon = 1e-12);
        assert!(r.output.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_negative_gain_resistor_is_fault() {
        // Av = 1 + 10k / -10k = 0 would silently mute the output.
        let lp = ActiveFilter::new(FilterKind::LowPass, -10.0, 10.0, 10.0, 0.1);
        let r = lp.evaluate(&tone(100.0), &LabConfig::default());
        assert!(matches!(r.fault, Some(Fault::NonPositiveComponent { .. })));
        assert!(!r.is_valid());
        assert!(r.output.is_all_zero());

        let hp = ActiveFilter::new(FilterKind::HighPass, 10.0, -5.0, 10.0, 0.1);
        assert!(hp.check_gain_stage().is_err());
        assert!(!hp.evaluate(&tone(100.0), &LabConfig::default()).is_valid());
    }

    #[test]
    fn test_measured_gain_without_input_is_nan() {
        let silent = Stimulus::generate(
            WaveformSpec::new(WaveShape::Sine, 0.0, 100.0, 3).unwrap(),
            &LabConfig::default(),
        );
        let lp = ActiveFilter::new(FilterKind::LowPass, 10.0, 10.0, 10.0, 0.1);
        let r = lp.evaluate(&silent, &LabConfig::default());
        assert!(r.metrics.get_number(keys::GAIN).unwrap().is_nan());
        assert!(r.metrics.get_number(keys::GAIN_DB).unwrap().is_nan());
    }
}
