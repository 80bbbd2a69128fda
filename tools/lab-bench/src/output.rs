//! Report rendering: console table, JSON, trace CSV and WAV.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use oplab_dsp::history::write_trace_csv;
use oplab_dsp::metrics::Metrics;
use oplab_dsp::units::format_frequency;
use oplab_dsp::{ResponseResult, Stimulus};
use serde::Serialize;

use crate::BenchError;

/// Peak level for normalized WAV output (-3 dBFS).
const WAV_PEAK: f64 = 0.7;

/// Machine-readable summary of one run.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub circuit: &'a str,
    pub samples: usize,
    pub fault: Option<String>,
    pub metrics: &'a Metrics,
}

impl<'a> RunReport<'a> {
    pub fn new(circuit: &'a str, result: &'a ResponseResult) -> Self {
        Self {
            circuit,
            samples: result.output.len(),
            fault: result.fault.as_ref().map(|f| f.to_string()),
            metrics: &result.metrics,
        }
    }
}

pub fn print_table(circuit: &str, input: Option<&Stimulus>, result: &ResponseResult) {
    println!("{circuit}");
    match input {
        Some(input) => {
            let freq = if input.frequency() > 0.0 {
                format_frequency(input.frequency())
            } else {
                "DC".to_string()
            };
            println!(
                "  Input:     {} wave, {:.3} V, {freq}",
                input.spec.shape.label(),
                input.amplitude()
            );
            println!("  Output:    {}", result.amplitude_label(input.amplitude()));
        }
        None => println!("  Output:    {}", result.amplitude_label(1.0)),
    }
    println!("  Samples:   {} (dt = {:.3e} s)", result.output.len(), result.output.dt());
    if let Some(fault) = &result.fault {
        println!("  Fault:     {fault}");
    }
    println!();
    println!("  {:<24}  {:>14}", "Metric", "Value");
    println!("  {:-<24}  {:->14}", "", "");
    for (key, value) in result.metrics.iter() {
        println!("  {key:<24}  {:>14}", value.to_string());
    }
}

pub fn print_json(report: &RunReport<'_>) -> Result<(), BenchError> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_csv(
    path: &Path,
    input: Option<&Stimulus>,
    result: &ResponseResult,
) -> Result<(), BenchError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_trace_csv(input.map(|s| &s.signal), &result.output, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write the output trace as 24-bit mono PCM at the trace's own sample
/// rate, scaled so the peak sits at -3 dBFS. A silent trace stays silent.
pub fn write_wav(path: &Path, result: &ResponseResult) -> Result<(), BenchError> {
    let output = &result.output;
    let sample_rate = (1.0 / output.dt()).round().clamp(1.0, u32::MAX as f64) as u32;
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 24,
        sample_format: hound::SampleFormat::Int,
    };

    let peak = output.peak();
    let scale = if peak > 0.0 { WAV_PEAK / peak } else { 0.0 };
    let max_val = (1 << 23) - 1;

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in output.values() {
        let scaled = (sample * scale * max_val as f64).round() as i32;
        writer.write_sample(scaled.clamp(-max_val, max_val))?;
    }
    writer.finalize()?;
    Ok(())
}
