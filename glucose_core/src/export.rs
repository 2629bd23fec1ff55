//! Trajectory export.
//!
//! Sinks write a finished trajectory either as CSV (one row per step) or
//! as JSON Lines (one state object per line).

use crate::{Result, SimulationState, Trajectory};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Destination for simulated trajectories
pub trait TrajectorySink {
    fn write(&mut self, trajectory: &Trajectory) -> Result<()>;
}

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    time: f64,
    bg: f64,
    insulin_on_board: f64,
    carbs_on_board: f64,
    insulin_effect: f64,
    carb_effect: f64,
}

impl From<&SimulationState> for CsvRow {
    fn from(state: &SimulationState) -> Self {
        CsvRow {
            time: state.time,
            bg: state.bg,
            insulin_on_board: state.insulin_on_board,
            carbs_on_board: state.carbs_on_board,
            insulin_effect: state.insulin_effect,
            carb_effect: state.carb_effect,
        }
    }
}

/// CSV sink with a header row
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().has_headers(true).from_writer(inner),
        }
    }
}

impl CsvSink<File> {
    /// Create (or truncate) a CSV file, making parent directories as needed
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> TrajectorySink for CsvSink<W> {
    fn write(&mut self, trajectory: &Trajectory) -> Result<()> {
        for state in trajectory {
            self.writer.serialize(CsvRow::from(state))?;
        }
        self.writer.flush()?;
        tracing::debug!("Wrote {} trajectory rows as CSV", trajectory.len());
        Ok(())
    }
}

/// JSON Lines sink
pub struct JsonlSink<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: BufWriter::new(inner),
        }
    }
}

impl JsonlSink<File> {
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> TrajectorySink for JsonlSink<W> {
    fn write(&mut self, trajectory: &Trajectory) -> Result<()> {
        for state in trajectory {
            let line = serde_json::to_string(state)?;
            self.writer.write_all(line.as_bytes())?;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()?;
        tracing::debug!("Wrote {} trajectory rows as JSONL", trajectory.len());
        Ok(())
    }
}
