//! Open-loop comparators.
//!
//! Memoryless: each output sample depends only on the same input sample.
//! Inverting drives the low rail when vin > Vref, non-inverting the high
//! rail. Ties (vin == Vref) count as "not above".

use crate::circuit::Evaluate;
use crate::config::LabConfig;
use crate::metrics::{Metrics, keys};
use crate::response::ResponseResult;
use crate::waveform::Stimulus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparatorKind {
    Inverting,
    NonInverting,
}

impl ComparatorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Inverting => "Inverting Comparator",
            Self::NonInverting => "Non-Inverting Comparator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparator {
    pub kind: ComparatorKind,
    /// Reference voltage, volts.
    pub v_ref: f64,
}

impl Comparator {
    pub fn new(kind: ComparatorKind, v_ref: f64) -> Self {
        Self { kind, v_ref }
    }
}

impl Evaluate for Comparator {
    fn label(&self) -> &'static str {
        self.kind.label()
    }

    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult {
        let _span = tracing::debug_span!("comparator", kind = self.kind.label()).entered();
        let rails = config.saturation;
        let (above, not_above) = match self.kind {
            ComparatorKind::Inverting => (rails.v_sat_minus, rails.v_sat_plus),
            ComparatorKind::NonInverting => (rails.v_sat_plus, rails.v_sat_minus),
        };

        let raw: Vec<f64> = input
            .signal
            .values()
            .iter()
            .map(|&v| if v > self.v_ref { above } else { not_above })
            .collect();

        let high = raw.iter().filter(|&&v| v == rails.v_sat_plus).count();
        let duty = high as f64 / raw.len() as f64;

        let mut metrics = Metrics::new();
        metrics
            .number(keys::V_REF, self.v_ref)
            .number(keys::OUTPUT_HIGH_V, rails.v_sat_plus)
            .number(keys::OUTPUT_LOW_V, rails.v_sat_minus)
            .number(keys::DUTY_CYCLE, duty);

        ResponseResult::settle(input.signal.times(), raw, metrics, None, config)
    }
}
