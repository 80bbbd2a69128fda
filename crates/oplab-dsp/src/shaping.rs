//! Active wave shaping -- precision clippers and clampers.
//!
//! Clippers are elementwise and change the waveform's shape:
//!   positive clipper: vout = min(vin, Vref)
//!   negative clipper: vout = max(vin, Vref)
//!
//! Clampers shift the whole trace and keep its shape. The shift depends on
//! a global extremum, so they cannot be computed sample by sample:
//!   positive clamper: vout = vin + (Vref - min(vin))   -> min lands on Vref
//!   negative clamper: vout = vin + (Vref - max(vin))   -> max lands on Vref

use crate::circuit::Evaluate;
use crate::config::LabConfig;
use crate::metrics::{Metrics, keys};
use crate::response::ResponseResult;
use crate::waveform::Stimulus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaperKind {
    PositiveClipper,
    NegativeClipper,
    PositiveClamper,
    NegativeClamper,
}

impl ShaperKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::PositiveClipper => "Positive Clipper",
            Self::NegativeClipper => "Negative Clipper",
            Self::PositiveClamper => "Positive Clamper",
            Self::NegativeClamper => "Negative Clamper",
        }
    }

    pub fn preserves_shape(self) -> bool {
        matches!(self, Self::PositiveClamper | Self::NegativeClamper)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveShaper {
    pub kind: ShaperKind,
    /// Reference level, volts.
    pub v_ref: f64,
}

impl WaveShaper {
    pub fn new(kind: ShaperKind, v_ref: f64) -> Self {
        Self { kind, v_ref }
    }
}

impl Evaluate for WaveShaper {
    fn label(&self) -> &'static str {
        self.kind.label()
    }

    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult {
        let _span =
            tracing::debug_span!("shaper", kind = self.kind.label(), v_ref = self.v_ref).entered();
        let signal = &input.signal;
        let v_ref = self.v_ref;

        let raw: Vec<f64> = match self.kind {
            ShaperKind::PositiveClipper => signal.values().iter().map(|&v| v.min(v_ref)).collect(),
            ShaperKind::NegativeClipper => signal.values().iter().map(|&v| v.max(v_ref)).collect(),
            ShaperKind::PositiveClamper => {
                let shift = v_ref - signal.min();
                signal.values().iter().map(|&v| v + shift).collect()
            }
            ShaperKind::NegativeClamper => {
                let shift = v_ref - signal.max();
                signal.values().iter().map(|&v| v + shift).collect()
            }
        };

        let mut result = ResponseResult::settle(signal.times(), raw, Metrics::new(), None, config);

        let (high, low, pp) = (
            result.output.max(),
            result.output.min(),
            result.output.peak_to_peak(),
        );
        result
            .metrics
            .number(keys::V_REF, v_ref)
            .number(keys::OUTPUT_HIGH_V, high)
            .number(keys::OUTPUT_LOW_V, low)
            .number(keys::PEAK_TO_PEAK_V, pp);
        result
    }
}
