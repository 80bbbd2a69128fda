//! Scalar metrics attached to every response.
//!
//! A flat, insertion-ordered map from stable string keys to values. The
//! keys are the contract with whatever renders or logs the result; values
//! are numbers, flags, or "N/A" when a quantity has no meaning for the
//! current input (e.g. a single phase figure for a square-wave integral).

use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Stable metric keys.
pub mod keys {
    pub const GAIN: &str = "gain";
    pub const GAIN_DB: &str = "gain_db";
    pub const PHASE_DEG: &str = "phase_deg";
    pub const OUTPUT_AMPLITUDE_V: &str = "output_amplitude_v";
    pub const IS_CLIPPED: &str = "is_clipped";
    pub const IS_VALID: &str = "is_valid";

    pub const CUTOFF_HZ: &str = "cutoff_hz";
    pub const PASSBAND_GAIN: &str = "passband_gain";
    pub const GAIN_AT_FREQ: &str = "gain_at_freq";

    pub const TIME_CONSTANT_S: &str = "time_constant_s";

    pub const INPUT_FREQUENCY_HZ: &str = "input_frequency_hz";
    pub const OUTPUT_FREQUENCY_HZ: &str = "output_frequency_hz";
    pub const OUTPUT_PERIOD_S: &str = "output_period_s";

    pub const V_REF: &str = "v_ref";
    pub const OUTPUT_HIGH_V: &str = "output_high_v";
    pub const OUTPUT_LOW_V: &str = "output_low_v";
    pub const DUTY_CYCLE: &str = "duty_cycle";
    pub const PEAK_TO_PEAK_V: &str = "peak_to_peak_v";

    pub const V_UTP: &str = "v_utp";
    pub const V_LTP: &str = "v_ltp";
    pub const HYSTERESIS_WIDTH_V: &str = "hysteresis_width_v";
    pub const TRANSITIONS: &str = "transitions";

    pub const FREQUENCY_HZ: &str = "frequency_hz";
    pub const PERIOD_S: &str = "period_s";
    pub const MIN_GAIN: &str = "min_gain";
    pub const REQUIRED_R_KOHM: &str = "required_r_kohm";
    pub const AMP_R1_KOHM: &str = "amp_r1_kohm";
    pub const AMP_RF_KOHM: &str = "amp_rf_kohm";
    pub const T_ON_S: &str = "t_on_s";
    pub const T_OFF_S: &str = "t_off_s";
    pub const FEEDBACK_FRACTION: &str = "feedback_fraction";
    pub const CAPACITOR_THRESHOLD_V: &str = "capacitor_threshold_v";
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
    NotApplicable,
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Self::Number(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match *self {
            Self::Flag(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Number(v) if v.is_nan() => write!(f, "NaN"),
            Self::Number(v) if v.is_infinite() => {
                write!(f, "{}", if v > 0.0 { "+inf" } else { "-inf" })
            }
            Self::Number(v) if v != 0.0 && (v.abs() < 1e-3 || v.abs() >= 1e6) => {
                write!(f, "{v:.4e}")
            }
            Self::Number(v) => write!(f, "{v:.4}"),
            Self::Flag(b) => write!(f, "{b}"),
            Self::NotApplicable => write!(f, "N/A"),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            // JSON has no NaN/inf; report those as strings instead of null.
            Self::Number(v) if !v.is_finite() => serializer.collect_str(self),
            Self::Number(v) => serializer.serialize_f64(v),
            Self::Flag(b) => serializer.serialize_bool(b),
            Self::NotApplicable => serializer.serialize_str("N/A"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    entries: Vec<(&'static str, MetricValue)>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite, keeping first-insertion order.
    pub fn set(&mut self, key: &'static str, value: MetricValue) -> &mut Self {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn number(&mut self, key: &'static str, v: f64) -> &mut Self {
        self.set(key, MetricValue::Number(v))
    }

    pub fn flag(&mut self, key: &'static str, b: bool) -> &mut Self {
        self.set(key, MetricValue::Flag(b))
    }

    pub fn not_applicable(&mut self, key: &'static str) -> &mut Self {
        self.set(key, MetricValue::NotApplicable)
    }

    pub fn get(&self, key: &str) -> Option<MetricValue> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_number())
    }

    pub fn get_flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_flag())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, MetricValue)> + '_ {
        self.entries.iter().copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(k, _)| *k)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Metrics {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Output/input amplitude ratio. NaN when there is no input to compare to.
pub fn voltage_gain(output_amplitude: f64, input_amplitude: f64) -> f64 {
    if input_amplitude > 0.0 {
        output_amplitude / input_amplitude
    } else {
        f64::NAN
    }
}

/// 20*log10(|gain|); -inf for a blocked output, NaN stays NaN.
pub fn gain_db(gain: f64) -> f64 {
    if gain.is_nan() {
        f64::NAN
    } else if gain == 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * gain.abs().log10()
    }
}

/// Status shown next to the output amplitude readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmplitudeStatus {
    Normal,
    Clipped,
    NoOutput,
}

impl AmplitudeStatus {
    pub fn classify(is_clipped: bool, output_amplitude: f64, input_amplitude: f64) -> Self {
        if is_clipped && input_amplitude > 0.0 {
            Self::Clipped
        } else if output_amplitude == 0.0 && input_amplitude != 0.0 {
            Self::NoOutput
        } else {
            Self::Normal
        }
    }
}

/// "Amp: 5.00 V", with "(Clipped)" / "(No Output)" appended as needed.
pub fn amplitude_label(output_amplitude: f64, status: AmplitudeStatus) -> String {
    let base = format!("Amp: {output_amplitude:.2} V");
    match status {
        AmplitudeStatus::Normal => base,
        AmplitudeStatus::Clipped => base + " (Clipped)",
        AmplitudeStatus::NoOutput => base + " (No Output)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_and_overwrite() {
        let mut m = Metrics::new();
        m.number(keys::GAIN, 2.0)
            .flag(keys::IS_CLIPPED, false)
            .number(keys::GAIN, 3.0);
        let order: Vec<_> = m.keys().collect();
        assert_eq!(order, vec![keys::GAIN, keys::IS_CLIPPED]);
        assert_eq!(m.get_number(keys::GAIN), Some(3.0));
        assert_eq!(m.get_flag(keys::IS_CLIPPED), Some(false));
        assert_eq!(m.get_number(keys::IS_CLIPPED), None);
        assert_eq!(m.get(keys::PHASE_DEG), None);
    }

    #[test]
    fn test_gain_db() {
        assert!((gain_db(10.0) - 20.0).abs() < 1e-12);
        assert!((gain_db(-5.0) - 13.979_400_086_720_377).abs() < 1e-9);
        assert_eq!(gain_db(0.0), f64::NEG_INFINITY);
        assert!(gain_db(f64::NAN).is_nan());
    }

    #[test]
    fn test_voltage_gain_without_input() {
        assert!(voltage_gain(1.0, 0.0).is_nan());
        assert_eq!(voltage_gain(5.0, 1.0), 5.0);
    }

    #[test]
    fn test_display_values() {
        assert_eq!(MetricValue::Number(1.5).to_string(), "1.5000");
        assert_eq!(MetricValue::Number(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(MetricValue::NotApplicable.to_string(), "N/A");
        assert_eq!(MetricValue::Flag(true).to_string(), "true");
    }

    #[test]
    fn test_amplitude_status() {
        assert_eq!(AmplitudeStatus::classify(true, 15.0, 1.0), AmplitudeStatus::Clipped);
        assert_eq!(AmplitudeStatus::classify(false, 0.0, 1.0), AmplitudeStatus::NoOutput);
        assert_eq!(AmplitudeStatus::classify(false, 0.0, 0.0), AmplitudeStatus::Normal);
        assert_eq!(
            amplitude_label(15.0, AmplitudeStatus::Clipped),
            "Amp: 15.00 V (Clipped)"
        );
    }
}
