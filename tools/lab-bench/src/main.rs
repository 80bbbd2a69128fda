//! Lab Bench -- op-amp teaching lab CLI.
//!
//! Runs one experiment: generate a test signal, pass it through the chosen
//! circuit, print the metrics, and optionally export the traces.
//!
//! Usage:
//!   lab-bench amplifier --kind inverting --r1 10 --rf 50 [--freq 1 --unit khz]
//!   lab-bench filter --kind low-pass --r 10 --c 0.1 --freq 159
//!   lab-bench schmitt --r1 10 --r2 1 --amplitude 5 --freq 100 --csv out.csv
//!   lab-bench wien --r 10 --c 0.1 --wav wien.wav
//!
//! Resistances are in kΩ and capacitances in µF. Set RUST_LOG=debug for
//! the evaluator trace.

mod output;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use oplab_dsp::amplifier::Amplifier;
use oplab_dsp::calculus::CalculusStage;
use oplab_dsp::comparator::{Comparator, ComparatorKind};
use oplab_dsp::filter::{ActiveFilter, FilterKind};
use oplab_dsp::oscillator::{AstableMultivibrator, SineOscillator};
use oplab_dsp::rectifier::{PrecisionRectifier, RectifierKind};
use oplab_dsp::schmitt::SchmittTrigger;
use oplab_dsp::shaping::{ShaperKind, WaveShaper};
use oplab_dsp::units::FrequencyUnit;
use oplab_dsp::{CircuitParameters, Evaluate, LabConfig, LabError, Stimulus, WaveShape, WaveformSpec};
use thiserror::Error;

use crate::output::RunReport;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error(transparent)]
    Lab(#[from] LabError),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Op-amp lab bench: ideal circuit responses with rail clipping
#[derive(Parser)]
#[command(name = "lab-bench", version)]
struct Cli {
    #[command(subcommand)]
    experiment: Experiment,

    /// TOML bench configuration (rails, sampling)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write time,input,output trace as CSV
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Print the metrics as JSON instead of a table
    #[arg(long, global = true)]
    json: bool,

    /// Write the output trace as a normalized 24-bit mono WAV
    #[arg(long, global = true)]
    wav: Option<PathBuf>,
}

/// Function generator settings.
#[derive(Args, Debug, Clone)]
struct SignalArgs {
    /// sine, cosine, triangle, square or none
    #[arg(long, default_value = "sine")]
    shape: WaveShape,

    /// Peak amplitude, volts
    #[arg(long, default_value_t = 1.0)]
    amplitude: f64,

    /// Frequency in --unit (0 = DC)
    #[arg(long, default_value_t = 1000.0)]
    freq: f64,

    /// hz, khz or mhz
    #[arg(long, default_value = "hz")]
    unit: FrequencyUnit,

    /// Cycles to display (defaults to the config's default_cycles)
    #[arg(long)]
    cycles: Option<u32>,
}

#[derive(Subcommand)]
enum Experiment {
    /// Inverting, non-inverting or follower stage
    Amplifier {
        #[arg(long, value_enum, default_value_t = AmpKind::Inverting)]
        kind: AmpKind,
        #[arg(long, default_value_t = 10.0)]
        r1: f64,
        #[arg(long, default_value_t = 50.0)]
        rf: f64,
        #[command(flatten)]
        signal: SignalArgs,
    },
    /// First-order active low-pass or high-pass filter
    Filter {
        #[arg(long, value_enum, default_value_t = FilterArg::LowPass)]
        kind: FilterArg,
        #[arg(long, default_value_t = 10.0)]
        r1: f64,
        #[arg(long, default_value_t = 10.0)]
        rf: f64,
        #[arg(long, default_value_t = 10.0)]
        r: f64,
        #[arg(long, default_value_t = 0.1)]
        c: f64,
        #[command(flatten)]
        signal: SignalArgs,
    },
    /// Op-amp integrator
    Integrator {
        #[arg(long, default_value_t = 10.0)]
        r: f64,
        #[arg(long, default_value_t = 0.1)]
        c: f64,
        #[command(flatten)]
        signal: SignalArgs,
    },
    /// Op-amp differentiator
    Differentiator {
        #[arg(long, default_value_t = 10.0)]
        r: f64,
        #[arg(long, default_value_t = 0.1)]
        c: f64,
        #[command(flatten)]
        signal: SignalArgs,
    },
    /// Precision half- or full-wave rectifier
    Rectifier {
        #[arg(long, value_enum, default_value_t = RectifierArg::Full)]
        kind: RectifierArg,
        #[command(flatten)]
        signal: SignalArgs,
    },
    /// Open-loop comparator against a reference
    Comparator {
        #[arg(long, value_enum, default_value_t = ComparatorArg::NonInverting)]
        kind: ComparatorArg,
        /// Reference voltage, volts
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        vref: f64,
        #[command(flatten)]
        signal: SignalArgs,
    },
    /// Schmitt trigger (inverting, positive feedback)
    Schmitt {
        /// Feedback resistor
        #[arg(long, default_value_t = 10.0)]
        r1: f64,
        /// Resistor to ground
        #[arg(long, default_value_t = 1.0)]
        r2: f64,
        #[command(flatten)]
        signal: SignalArgs,
    },
    /// Precision clipper or clamper
    Shaper {
        #[arg(long, value_enum, default_value_t = ShaperArg::PositiveClipper)]
        kind: ShaperArg,
        /// Reference voltage, volts
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        vref: f64,
        #[command(flatten)]
        signal: SignalArgs,
    },
    /// RC phase-shift oscillator
    RcPhase {
        #[arg(long, default_value_t = 10.0)]
        r: f64,
        #[arg(long, default_value_t = 0.1)]
        c: f64,
        /// Design target in Hz; reports the R needed to hit it
        #[arg(long)]
        target: Option<f64>,
    },
    /// Wien-bridge oscillator
    Wien {
        #[arg(long, default_value_t = 10.0)]
        r: f64,
        #[arg(long, default_value_t = 0.1)]
        c: f64,
        /// Design target in Hz; reports the R needed to hit it
        #[arg(long)]
        target: Option<f64>,
    },
    /// Astable multivibrator (square-wave generator)
    Astable {
        #[arg(long, default_value_t = 10.0)]
        rf: f64,
        #[arg(long, default_value_t = 0.1)]
        c: f64,
        #[arg(long, default_value_t = 10.0)]
        r1: f64,
        #[arg(long, default_value_t = 10.0)]
        r2: f64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AmpKind {
    Inverting,
    NonInverting,
    Follower,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterArg {
    LowPass,
    HighPass,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RectifierArg {
    Half,
    Full,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ComparatorArg {
    Inverting,
    NonInverting,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ShaperArg {
    PositiveClipper,
    NegativeClipper,
    PositiveClamper,
    NegativeClamper,
}

impl Experiment {
    /// The circuit to evaluate, plus the generator settings if it takes an input.
    fn build(&self) -> (CircuitParameters, Option<&SignalArgs>) {
        match self {
            Self::Amplifier { kind, r1, rf, signal } => {
                let amp = match kind {
                    AmpKind::Inverting => Amplifier::inverting(*r1, *rf),
                    AmpKind::NonInverting => Amplifier::non_inverting(*r1, *rf),
                    AmpKind::Follower => Amplifier::follower(),
                };
                (CircuitParameters::Amplifier(amp), Some(signal))
            }
            Self::Filter { kind, r1, rf, r, c, signal } => {
                let kind = match kind {
                    FilterArg::LowPass => FilterKind::LowPass,
                    FilterArg::HighPass => FilterKind::HighPass,
                };
                let filter = ActiveFilter::new(kind, *r1, *rf, *r, *c);
                (CircuitParameters::Filter(filter), Some(signal))
            }
            Self::Integrator { r, c, signal } => (
                CircuitParameters::Calculus(CalculusStage::integrator(*r, *c)),
                Some(signal),
            ),
            Self::Differentiator { r, c, signal } => (
                CircuitParameters::Calculus(CalculusStage::differentiator(*r, *c)),
                Some(signal),
            ),
            Self::Rectifier { kind, signal } => {
                let kind = match kind {
                    RectifierArg::Half => RectifierKind::HalfWave,
                    RectifierArg::Full => RectifierKind::FullWave,
                };
                (
                    CircuitParameters::Rectifier(PrecisionRectifier::new(kind)),
                    Some(signal),
                )
            }
            Self::Comparator { kind, vref, signal } => {
                let kind = match kind {
                    ComparatorArg::Inverting => ComparatorKind::Inverting,
                    ComparatorArg::NonInverting => ComparatorKind::NonInverting,
                };
                (
                    CircuitParameters::Comparator(Comparator::new(kind, *vref)),
                    Some(signal),
                )
            }
            Self::Schmitt { r1, r2, signal } => (
                CircuitParameters::Schmitt(SchmittTrigger::new(*r1, *r2)),
                Some(signal),
            ),
            Self::Shaper { kind, vref, signal } => {
                let kind = match kind {
                    ShaperArg::PositiveClipper => ShaperKind::PositiveClipper,
                    ShaperArg::NegativeClipper => ShaperKind::NegativeClipper,
                    ShaperArg::PositiveClamper => ShaperKind::PositiveClamper,
                    ShaperArg::NegativeClamper => ShaperKind::NegativeClamper,
                };
                (
                    CircuitParameters::Shaper(WaveShaper::new(kind, *vref)),
                    Some(signal),
                )
            }
            Self::RcPhase { r, c, target } => {
                let mut osc = SineOscillator::rc_phase_shift(*r, *c);
                if let Some(f) = target {
                    osc = osc.with_target(*f);
                }
                (CircuitParameters::SineOscillator(osc), None)
            }
            Self::Wien { r, c, target } => {
                let mut osc = SineOscillator::wien_bridge(*r, *c);
                if let Some(f) = target {
                    osc = osc.with_target(*f);
                }
                (CircuitParameters::SineOscillator(osc), None)
            }
            Self::Astable { rf, c, r1, r2 } => (
                CircuitParameters::Astable(AstableMultivibrator::new(*rf, *c, *r1, *r2)),
                None,
            ),
        }
    }
}

fn stimulus(args: Option<&SignalArgs>, config: &LabConfig) -> Result<Stimulus, LabError> {
    let spec = match args {
        Some(a) => WaveformSpec::new(
            a.shape,
            a.amplitude,
            a.unit.to_hz(a.freq),
            a.cycles.unwrap_or(config.default_cycles),
        )?,
        // Oscillators ignore their input; hand them a silent one.
        None => WaveformSpec::new(WaveShape::None, 0.0, 0.0, 1)?,
    };
    Ok(Stimulus::generate(spec, config))
}

fn run(cli: &Cli) -> Result<(), BenchError> {
    let config = match &cli.config {
        Some(path) => LabConfig::load(path)?,
        None => LabConfig::default(),
    };

    let (circuit, signal) = cli.experiment.build();
    let input = stimulus(signal, &config)?;
    let input_shown = circuit.takes_input().then_some(&input);

    let result = circuit.evaluate(&input, &config);
    let label = circuit.label();

    if cli.json {
        output::print_json(&RunReport::new(label, &result))?;
    } else {
        output::print_table(label, input_shown, &result);
    }

    if let Some(path) = &cli.csv {
        output::write_csv(path, input_shown, &result)?;
        tracing::info!(path = %path.display(), "CSV written");
    }
    if let Some(path) = &cli.wav {
        output::write_wav(path, &result)?;
        tracing::info!(path = %path.display(), "WAV written");
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
