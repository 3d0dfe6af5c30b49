//! Per-tick recording of a run
//!
//! Keeps every tick's geometry and controller terms in memory and exports
//! them as CSV for offline plotting.

use anyhow::{Context, Result};
use cartpole_core::ControlOutput;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One recorded tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    /// Tick number (0-indexed)
    pub tick: u64,
    /// Simulated time in milliseconds at the start of the tick
    pub time_ms: f64,
    pub cart_x: f64,
    pub cart_y: f64,
    pub bob_x: f64,
    pub bob_y: f64,
    /// Arm heading in radians, 0 when upright
    pub heading: f64,
    pub error: f64,
    pub delta_error: f64,
    /// Horizontal force applied to the cart
    pub force_x: f64,
}

impl TickRecord {
    pub fn new(
        tick: u64,
        time_ms: f64,
        cart: Point2<f64>,
        bob: Point2<f64>,
        out: &ControlOutput,
    ) -> Self {
        Self {
            tick,
            time_ms,
            cart_x: cart.x,
            cart_y: cart.y,
            bob_x: bob.x,
            bob_y: bob.y,
            heading: out.heading,
            error: out.error,
            delta_error: out.delta_error,
            force_x: out.output,
        }
    }
}

/// Aggregate figures for a recorded run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub ticks: usize,
    pub max_abs_error: f64,
    pub rms_error: f64,
    pub max_abs_force: f64,
}

/// In-memory run recorder
#[derive(Debug, Clone)]
pub struct Recorder {
    name: String,
    /// Recording start time (ISO 8601)
    started_at: String,
    records: Vec<TickRecord>,
}

impl Recorder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: chrono::Utc::now().to_rfc3339(),
            records: Vec::new(),
        }
    }

    pub fn record(&mut self, record: TickRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TickRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started_at(&self) -> &str {
        &self.started_at
    }

    /// Write all records to a CSV file with a header row
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file at {:?}", path))?;

        for record in &self.records {
            writer
                .serialize(record)
                .context("Failed to write CSV record")?;
        }
        writer.flush().context("Failed to flush CSV file")?;

        Ok(())
    }

    /// Read records back from a CSV file written by [`Recorder::export_csv`]
    pub fn import_csv(name: impl Into<String>, path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV file at {:?}", path))?;

        let mut recorder = Self::new(name);
        for row in reader.deserialize() {
            let record: TickRecord = row.context("Malformed CSV record")?;
            recorder.record(record);
        }
        Ok(recorder)
    }

    pub fn summary(&self) -> RunSummary {
        if self.records.is_empty() {
            return RunSummary::default();
        }

        let ticks = self.records.len();
        let max_abs_error = self
            .records
            .iter()
            .map(|r| r.error.abs())
            .fold(0.0, f64::max);
        let max_abs_force = self
            .records
            .iter()
            .map(|r| r.force_x.abs())
            .fold(0.0, f64::max);
        let mean_square =
            self.records.iter().map(|r| r.error * r.error).sum::<f64>() / ticks as f64;

        RunSummary {
            ticks,
            max_abs_error,
            rms_error: mean_square.sqrt(),
            max_abs_force,
        }
    }
}
