//! Evaluator output: the clipped trace plus its metrics.

use crate::config::LabConfig;
use crate::error::Fault;
use crate::metrics::{AmplitudeStatus, Metrics, amplitude_label, keys};
use crate::saturation::clip;
use crate::waveform::SampledSignal;

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseResult {
    /// Output trace, already clamped to the rails.
    pub output: SampledSignal,
    pub metrics: Metrics,
    /// Set when the evaluator fell back to its "no output" path.
    pub fault: Option<Fault>,
}

impl ResponseResult {
    /// Clip an ideal output to the rails and attach the common metrics
    /// (`output_amplitude_v`, `is_clipped`, `is_valid`).
    pub(crate) fn settle(
        times: &[f64],
        raw: Vec<f64>,
        mut metrics: Metrics,
        fault: Option<Fault>,
        config: &LabConfig,
    ) -> Self {
        let clipped = clip(&raw, &config.saturation, config.clip_tolerance);
        let output = SampledSignal::new(times.to_vec(), clipped.values);

        if let Some(fault) = &fault {
            tracing::warn!(%fault, "degenerate circuit, returning zero output");
        }

        metrics
            .number(keys::OUTPUT_AMPLITUDE_V, output.peak())
            .flag(keys::IS_CLIPPED, clipped.is_clipped)
            .flag(keys::IS_VALID, fault.is_none());

        Self {
            output,
            metrics,
            fault,
        }
    }

    /// Flat zero output on `times` with the given fault.
    pub(crate) fn no_output(
        times: &[f64],
        metrics: Metrics,
        fault: Fault,
        config: &LabConfig,
    ) -> Self {
        Self::settle(times, vec![0.0; times.len()], metrics, Some(fault), config)
    }

    pub fn is_valid(&self) -> bool {
        self.fault.is_none()
    }

    pub fn is_clipped(&self) -> bool {
        self.metrics.get_flag(keys::IS_CLIPPED).unwrap_or(false)
    }

    pub fn output_amplitude(&self) -> f64 {
        self.output.peak()
    }

    pub fn amplitude_status(&self, input_amplitude: f64) -> AmplitudeStatus {
        AmplitudeStatus::classify(self.is_clipped(), self.output_amplitude(), input_amplitude)
    }

    /// Readout text such as "Amp: 15.00 V (Clipped)".
    pub fn amplitude_label(&self, input_amplitude: f64) -> String {
        amplitude_label(
            self.output_amplitude(),
            self.amplitude_status(input_amplitude),
        )
    }
}
