//! Precision (super-diode) rectifiers.
//!
//! The op-amp cancels the diode drop, so the ideal transfer is exact:
//!   half-wave: vout = max(vin, 0)   -- one hump per input period
//!   full-wave: vout = |vin|         -- two humps per input period,
//!                                      so the output frequency doubles

use crate::circuit::Evaluate;
use crate::config::LabConfig;
use crate::metrics::{Metrics, keys};
use crate::response::ResponseResult;
use crate::waveform::Stimulus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectifierKind {
    HalfWave,
    FullWave,
}

impl RectifierKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::HalfWave => "Half Wave Rectifier",
            Self::FullWave => "Full Wave Rectifier",
        }
    }

    fn frequency_multiplier(self) -> f64 {
        match self {
            Self::HalfWave => 1.0,
            Self::FullWave => 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrecisionRectifier {
    pub kind: RectifierKind,
}

impl PrecisionRectifier {
    pub fn new(kind: RectifierKind) -> Self {
        Self { kind }
    }
}

impl Evaluate for PrecisionRectifier {
    fn label(&self) -> &'static str {
        self.kind.label()
    }

    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult {
        let _span = tracing::debug_span!("rectifier", kind = self.kind.label()).entered();
        let f_in = input.frequency();
        let f_out = f_in * self.kind.frequency_multiplier();

        let mut metrics = Metrics::new();
        metrics
            .number(keys::INPUT_FREQUENCY_HZ, f_in)
            .number(keys::OUTPUT_FREQUENCY_HZ, f_out);
        if f_out > 0.0 {
            metrics.number(keys::OUTPUT_PERIOD_S, 1.0 / f_out);
        } else {
            metrics.not_applicable(keys::OUTPUT_PERIOD_S);
        }

        let raw = input
            .signal
            .values()
            .iter()
            .map(|&v| match self.kind {
                RectifierKind::HalfWave => v.max(0.0),
                RectifierKind::FullWave => v.abs(),
            })
            .collect();

        ResponseResult::settle(input.signal.times(), raw, metrics, None, config)
    }
}
