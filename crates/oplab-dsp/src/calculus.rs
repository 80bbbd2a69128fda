//! Op-amp integrator and differentiator.
//!
//! Integrator:     vout = -1/(RC) ∫ vin dt     (cumulative trapezoid)
//! Differentiator: vout = -RC dvin/dt          (forward difference at the
//!                 sample midpoints, interpolated back onto the grid)
//!
//! Both are numerical approximations on the display grid, not a circuit
//! solve. The one closed form used is the integral of a DC input, which is
//! an exact ramp.

use crate::circuit::Evaluate;
use crate::config::LabConfig;
use crate::error::Fault;
use crate::metrics::{Metrics, keys};
use crate::response::ResponseResult;
use crate::units::{kohm, microfarad};
use crate::waveform::Stimulus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculusKind {
    Integrator,
    Differentiator,
}

impl CalculusKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Integrator => "Integrator",
            Self::Differentiator => "Differentiator",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalculusStage {
    pub kind: CalculusKind,
    /// Ohms.
    pub r: f64,
    /// Farads.
    pub c: f64,
}

impl CalculusStage {
    pub fn integrator(r_kohm: f64, c_uf: f64) -> Self {
        Self {
            kind: CalculusKind::Integrator,
            r: kohm(r_kohm),
            c: microfarad(c_uf),
        }
    }

    pub fn differentiator(r_kohm: f64, c_uf: f64) -> Self {
        Self {
            kind: CalculusKind::Differentiator,
            r: kohm(r_kohm),
            c: microfarad(c_uf),
        }
    }

    pub fn time_constant(&self) -> f64 {
        self.r * self.c
    }
}

impl Evaluate for CalculusStage {
    fn label(&self) -> &'static str {
        self.kind.label()
    }

    fn evaluate(&self, input: &Stimulus, config: &LabConfig) -> ResponseResult {
        let _span = tracing::debug_span!("calculus", kind = self.kind.label()).entered();
        let times = input.signal.times();
        let values = input.signal.values();
        let mut metrics = Metrics::new();
        metrics.number(keys::TIME_CONSTANT_S, self.time_constant());

        if !(self.r > 0.0 && self.c > 0.0) {
            metrics.number(keys::PHASE_DEG, 0.0);
            let fault = Fault::NonPositiveComponent {
                circuit: self.kind.label(),
                what: "R and C",
            };
            return ResponseResult::no_output(times, metrics, fault, config);
        }

        let dc = input.spec.is_dc();
        let phase = if dc {
            Some(0.0)
        } else if input.spec.shape.is_sinusoidal() {
            Some(match self.kind {
                CalculusKind::Integrator => -90.0,
                CalculusKind::Differentiator => 90.0,
            })
        } else {
            None
        };
        match phase {
            Some(p) => metrics.number(keys::PHASE_DEG, p),
            None => metrics.not_applicable(keys::PHASE_DEG),
        };

        let dt = input.signal.dt();
        let raw = match self.kind {
            CalculusKind::Integrator => {
                let k = -1.0 / self.time_constant();
                if dc {
                    values.iter().zip(times).map(|(v, t)| k * v * t).collect()
                } else {
                    cumulative_trapezoid(values, dt)
                        .into_iter()
                        .map(|y| k * y)
                        .collect()
                }
            }
            CalculusKind::Differentiator => {
                if dc {
                    vec![0.0; values.len()]
                } else {
                    let k = -self.time_constant();
                    midpoint_derivative(values, dt)
                        .into_iter()
                        .map(|d| k * d)
                        .collect()
                }
            }
        };

        ResponseResult::settle(times, raw, metrics, None, config)
    }
}

/// Running trapezoid integral, starting at 0.
pub fn cumulative_trapezoid(values: &[f64], dt: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    out.push(acc);
    for w in values.windows(2) {
        acc += 0.5 * dt * (w[0] + w[1]);
        out.push(acc);
    }
    out
}

/// First difference evaluated at the sample midpoints, then linearly
/// interpolated back onto the sample grid. On a uniform grid that is the
/// mean of the two neighbouring differences; the end samples hold the
/// nearest difference.
pub fn midpoint_derivative(values: &[f64], dt: f64) -> Vec<f64> {
    let n = values.len();
    let diffs: Vec<f64> = values.windows(2).map(|w| (w[1] - w[0]) / dt).collect();
    if diffs.is_empty() {
        return vec![0.0; n];
    }

    let mut out = Vec::with_capacity(n);
    out.push(diffs[0]);
    for i in 1..n - 1 {
        out.push(0.5 * (diffs[i - 1] + diffs[i]));
    }
    if n > 1 {
        out.push(diffs[n - 2]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::waveform::{WaveShape, WaveformSpec};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn stimulus(shape: WaveShape, amplitude: f64, freq: f64) -> Stimulus {
        Stimulus::generate(
            WaveformSpec::new(shape, amplitude, freq, 3).unwrap(),
            &LabConfig::default(),
        )
    }

    #[test]
    fn test_trapezoid_of_ramp_is_exact() {
        // ∫ t dt from 0 = t^2/2; trapezoid is exact for linear integrands.
        let dt = 0.1;
        let values: Vec<f64> = (0..11).map(|i| i as f64 * dt).collect();
        let y = cumulative_trapezoid(&values, dt);
        assert_eq!(y.len(), values.len());
        assert_abs_diff_eq!(y[10], 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_midpoint_derivative_of_line() {
        let values: Vec<f64> = (0..5).map(|i| 3.0 * i as f64).collect();
        let d = midpoint_derivative(&values, 1.0);
        assert_eq!(d, vec![3.0; 5]);
    }

    #[test]
    fn test_integrator_sine_amplitude() {
        // |vout| = A / (2π f R C) = 1 / (2π * 100 * 1e4 * 1e-7) ≈ 1.59 V,
        // riding on a DC offset from starting at the sine zero crossing.
        let stage = CalculusStage::integrator(10.0, 0.1);
        let input = stimulus(WaveShape::Sine, 1.0, 100.0);
        let r = stage.evaluate(&input, &LabConfig::default());
        let expected_pp = 2.0 / (2.0 * PI * 100.0 * stage.time_constant());
        assert_abs_diff_eq!(r.output.peak_to_peak(), expected_pp, epsilon = expected_pp * 0.01);
        assert_eq!(r.metrics.get_number(keys::PHASE_DEG), Some(-90.0));
        assert_eq!(r.output.values()[0], 0.0);
    }

    #[test]
    fn test_integrator_dc_is_ramp() {
        let stage = CalculusStage::integrator(10.0, 1.0); // RC = 10 ms
        let input = stimulus(WaveShape::Sine, 2.0, 0.0);
        let r = stage.evaluate(&input, &LabConfig::default());
        for (v, t) in r.output.values().iter().zip(r.output.times()) {
            assert_abs_diff_eq!(*v, -2.0 * t / 0.01, epsilon = 1e-12);
        }
        assert_eq!(r.metrics.get_number(keys::PHASE_DEG), Some(0.0));
    }

    #[test]
    fn test_differentiator_cosine_to_sine() {
        // d/dt A cos(ωt) = -Aω sin(ωt); with the -RC gain: +ARCω sin(ωt).
        let stage = CalculusStage::differentiator(10.0, 0.1);
        let freq = 100.0;
        let input = stimulus(WaveShape::Cosine, 1.0, freq);
        let r = stage.evaluate(&input, &LabConfig::default());
        let scale = stage.time_constant() * 2.0 * PI * freq;
        let quarter = r.output.len() / 12; // 3 cycles -> quarter period
        assert_abs_diff_eq!(r.output.values()[quarter], scale, epsilon = scale * 0.01);
        assert_eq!(r.metrics.get_number(keys::PHASE_DEG), Some(90.0));
    }

    #[test]
    fn test_non_sinusoidal_phase_not_applicable() {
        let stage = CalculusStage::integrator(10.0, 0.1);
        let r = stage.evaluate(&stimulus(WaveShape::Square, 1.0, 100.0), &LabConfig::default());
        assert_eq!(
            r.metrics.get(keys::PHASE_DEG),
            Some(crate::metrics::MetricValue::NotApplicable)
        );
    }

    #[test]
    fn test_differentiator_dc_is_zero() {
        let stage = CalculusStage::differentiator(10.0, 0.1);
        let r = stage.evaluate(&stimulus(WaveShape::Sine, 1.0, 0.0), &LabConfig::default());
        assert!(r.output.is_all_zero());
        assert!(r.is_valid());
    }

    #[test]
    fn test_square_differentiator_spikes_clip() {
        let stage = CalculusStage::differentiator(100.0, 10.0);
        let r = stage.evaluate(&stimulus(WaveShape::Square, 5.0, 100.0), &LabConfig::default());
        assert!(r.is_clipped());
        assert!(r.output.peak() <= 15.0);
    }

    #[test]
    fn test_zero_component_fault() {
        let r = CalculusStage::integrator(0.0, 0.1)
            .evaluate(&stimulus(WaveShape::Sine, 1.0, 100.0), &LabConfig::default());
        assert!(!r.is_valid());
        assert!(r.output.is_all_zero());
        let r = CalculusStage::differentiator(10.0, 0.0)
            .evaluate(&stimulus(WaveShape::Sine, 1.0, 100.0), &LabConfig::default());
        assert!(!r.is_valid());
    }
}
