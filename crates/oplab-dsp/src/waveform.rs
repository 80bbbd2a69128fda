//! Function generator -- sampled sine/cosine/triangle/square test signals.
//!
//! Sampling: at least `min_samples_per_cycle` points per period with a
//! `min_sample_rate` floor, over `cycles` periods. A zero frequency is the
//! DC case and gets a short fixed window instead so it still plots as a
//! flat line.

use std::f64::consts::PI;
use std::str::FromStr;

use crate::config::LabConfig;
use crate::error::{LabError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaveShape {
    #[default]
    Sine,
    Cosine,
    Triangle,
    Square,
    /// Generator output disabled.
    None,
}

impl WaveShape {
    /// Sine and cosine have a single well-defined phase relationship.
    pub fn is_sinusoidal(self) -> bool {
        matches!(self, Self::Sine | Self::Cosine)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Sine => "sine",
            Self::Cosine => "cosine",
            Self::Triangle => "triangle",
            Self::Square => "square",
            Self::None => "none",
        }
    }

    /// Unit-amplitude value at normalized phase `p` in [0, 1).
    fn unit_value(self, p: f64) -> f64 {
        match self {
            Self::Sine => (2.0 * PI * p).sin(),
            Self::Cosine => (2.0 * PI * p).cos(),
            // Symmetric triangle: -1 at p=0, +1 at p=0.5.
            Self::Triangle => {
                if p < 0.5 {
                    -1.0 + 4.0 * p
                } else {
                    3.0 - 4.0 * p
                }
            }
            Self::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::None => 0.0,
        }
    }
}

impl FromStr for WaveShape {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self> {
        let label = s.trim().to_ascii_lowercase();
        let label = label.strip_suffix(" wave").unwrap_or(&label);
        match label {
            "sine" | "sin" => Ok(Self::Sine),
            "cosine" | "cos" => Ok(Self::Cosine),
            "triangle" | "triangular" | "tri" => Ok(Self::Triangle),
            "square" | "sq" => Ok(Self::Square),
            "none" | "off" => Ok(Self::None),
            _ => Err(LabError::UnknownLabel {
                kind: "waveform",
                label: s.to_string(),
            }),
        }
    }
}

/// Generator settings for one interaction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveformSpec {
    pub shape: WaveShape,
    /// Peak amplitude, volts.
    pub amplitude: f64,
    /// Hz. Zero means DC.
    pub frequency: f64,
    /// Periods in the display window.
    pub cycles: u32,
}

impl WaveformSpec {
    pub fn new(shape: WaveShape, amplitude: f64, frequency: f64, cycles: u32) -> Result<Self> {
        if !(amplitude.is_finite() && amplitude >= 0.0) {
            return Err(LabError::InvalidParameter {
                name: "amplitude",
                value: amplitude,
                reason: "must be finite and >= 0",
            });
        }
        if !(frequency.is_finite() && frequency >= 0.0) {
            return Err(LabError::InvalidParameter {
                name: "frequency",
                value: frequency,
                reason: "must be finite and >= 0",
            });
        }
        if cycles == 0 {
            return Err(LabError::InvalidParameter {
                name: "cycles",
                value: 0.0,
                reason: "must be >= 1",
            });
        }
        Ok(Self {
            shape,
            amplitude,
            frequency,
            cycles,
        })
    }

    pub fn sine(amplitude: f64, frequency: f64) -> Self {
        Self {
            shape: WaveShape::Sine,
            amplitude,
            frequency,
            cycles: 3,
        }
    }

    pub fn is_dc(&self) -> bool {
        self.frequency == 0.0
    }

    /// Period in seconds, `None` for DC.
    pub fn period(&self) -> Option<f64> {
        (self.frequency > 0.0).then(|| 1.0 / self.frequency)
    }
}

/// Uniformly sampled time-domain trace. Always at least 2 samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledSignal {
    times: Vec<f64>,
    values: Vec<f64>,
}

impl SampledSignal {
    /// Pair a time grid with values. Panics if lengths differ or the grid
    /// is shorter than 2 samples -- both are programming errors.
    pub fn new(times: Vec<f64>, values: Vec<f64>) -> Self {
        assert_eq!(times.len(), values.len(), "times/values length mismatch");
        assert!(times.len() >= 2, "a sampled signal needs at least 2 samples");
        Self { times, values }
    }

    pub fn from_fn(times: Vec<f64>, f: impl Fn(f64) -> f64) -> Self {
        let values = times.iter().map(|&t| f(t)).collect();
        Self::new(times, values)
    }

    pub fn zeros(times: Vec<f64>) -> Self {
        let values = vec![0.0; times.len()];
        Self::new(times, values)
    }

    /// Same time grid, new values.
    pub fn with_values(&self, values: Vec<f64>) -> Self {
        Self::new(self.times.clone(), values)
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        self.with_values(self.values.iter().map(|&v| f(v)).collect())
    }

    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.times.clone())
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sample spacing.
    pub fn dt(&self) -> f64 {
        self.times[1] - self.times[0]
    }

    /// Window length, `len * dt`.
    pub fn duration(&self) -> f64 {
        self.len() as f64 * self.dt()
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// max |v|
    pub fn peak(&self) -> f64 {
        self.values.iter().fold(0.0f64, |acc, v| acc.max(v.abs()))
    }

    pub fn peak_to_peak(&self) -> f64 {
        self.max() - self.min()
    }

    pub fn is_all_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}

/// A generated input together with the settings that produced it.
///
/// Evaluators that depend on the tone (filters, integrators, rectifier
/// frequency readouts) read `spec`; everything else only touches `signal`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stimulus {
    pub spec: WaveformSpec,
    pub signal: SampledSignal,
}

impl Stimulus {
    pub fn generate(spec: WaveformSpec, config: &LabConfig) -> Self {
        let signal = generate_with(&spec, config);
        Self { spec, signal }
    }

    /// Effective peak amplitude of the input (0 when the generator is off).
    pub fn amplitude(&self) -> f64 {
        if self.spec.shape == WaveShape::None {
            0.0
        } else {
            self.spec.amplitude
        }
    }

    pub fn frequency(&self) -> f64 {
        self.spec.frequency
    }
}

/// Sample grid for `cycles` periods of `frequency` (or the DC window).
///
/// The window always spans the full duration. When that would take more
/// than `config.max_samples` points the rate is lowered to fit.
pub fn time_grid(frequency: f64, cycles: u32, config: &LabConfig) -> Vec<f64> {
    let (rate, duration) = if frequency > 0.0 && frequency.is_finite() {
        let rate = (config.min_samples_per_cycle * frequency).max(config.min_sample_rate);
        (rate, cycles as f64 / frequency)
    } else {
        (config.dc_sample_rate, config.dc_duration_s)
    };

    // Nudge up so 100 * f * (3 / f) lands on 300, not 299.
    let wanted = (rate * duration) * (1.0 + 1e-12);
    let cap = config.max_samples.max(2);
    let n = if wanted > cap as f64 {
        tracing::debug!(wanted, cap, duration, "sample count capped");
        cap
    } else {
        (wanted.floor() as usize).max(2)
    };
    let step = duration / n as f64;
    (0..n).map(|i| i as f64 * step).collect()
}

/// Generate a test signal using the default bench configuration.
pub fn generate(spec: &WaveformSpec) -> SampledSignal {
    generate_with(spec, &LabConfig::default())
}

pub fn generate_with(spec: &WaveformSpec, config: &LabConfig) -> SampledSignal {
    let times = time_grid(spec.frequency, spec.cycles, config);
    let a = spec.amplitude;

    if spec.shape == WaveShape::None || a == 0.0 {
        return SampledSignal::zeros(times);
    }
    if spec.is_dc() {
        return SampledSignal::from_fn(times, |_| a);
    }

    let f = spec.frequency;
    let shape = spec.shape;
    SampledSignal::from_fn(times, |t| a * shape.unit_value((f * t).fract()))
}
