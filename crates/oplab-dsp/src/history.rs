//! Log book of recorded results, plus CSV export.

use std::borrow::Cow;
use std::io::Write;

use crate::error::Result;
use crate::metrics::Metrics;
use crate::waveform::SampledSignal;

/// One logged evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// 1-based position in the book.
    pub index: usize,
    pub circuit: String,
    pub metrics: Metrics,
}

/// Append-only table of logged results, owned by the caller.
#[derive(Debug, Clone, Default)]
pub struct LogBook {
    records: Vec<LogRecord>,
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot `metrics` under `circuit` and return the new row's index.
    pub fn push(&mut self, circuit: impl Into<String>, metrics: &Metrics) -> usize {
        let index = self.records.len() + 1;
        self.records.push(LogRecord {
            index,
            circuit: circuit.into(),
            metrics: metrics.clone(),
        });
        index
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Metric keys across all records, in first-seen order.
    pub fn columns(&self) -> Vec<&'static str> {
        let mut cols: Vec<&'static str> = Vec::new();
        for key in self.records.iter().flat_map(|r| r.metrics.keys()) {
            if !cols.contains(&key) {
                cols.push(key);
            }
        }
        cols
    }

    /// Write the book as CSV.
    ///
    /// Format:
    /// ```csv
    /// #,circuit,gain,gain_db,...
    /// 1,Inverting Amplifier,-5.0000,13.9794,...
    /// ```
    /// Records from different circuits share one header; cells a record
    /// has no metric for are left empty.
    pub fn write_csv<W: Write>(&self, writer: &mut W) -> Result<()> {
        let cols = self.columns();
        write!(writer, "#,circuit")?;
        for col in &cols {
            write!(writer, ",{col}")?;
        }
        writeln!(writer)?;

        for record in &self.records {
            write!(writer, "{},{}", record.index, csv_field(&record.circuit))?;
            for col in &cols {
                match record.metrics.get(col) {
                    Some(value) => write!(writer, ",{value}")?,
                    None => write!(writer, ",")?,
                }
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

/// Quote a free-text cell if it contains a delimiter, quote or newline.
fn csv_field(text: &str) -> Cow<'_, str> {
    if text.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", text.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(text)
    }
}

/// Write an input/output trace pair as CSV.
///
/// Format:
/// ```csv
/// time_s,input_v,output_v
/// 0,0,0
/// 0.0001,0.0627905,-0.313952
/// ```
/// Oscillator traces have no input; pass `None` and the column is dropped.
pub fn write_trace_csv<W: Write>(
    input: Option<&SampledSignal>,
    output: &SampledSignal,
    writer: &mut W,
) -> Result<()> {
    match input {
        Some(input) => {
            writeln!(writer, "time_s,input_v,output_v")?;
            for ((t, x), y) in output.times().iter().zip(input.values()).zip(output.values()) {
                writeln!(writer, "{t},{x},{y}")?;
            }
        }
        None => {
            writeln!(writer, "time_s,output_v")?;
            for (t, y) in output.times().iter().zip(output.values()) {
                writeln!(writer, "{t},{y}")?;
            }
        }
    }
    Ok(())
}
