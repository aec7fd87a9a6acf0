use std::path::Path;
use std::time::Duration;

use log::info;
use serde::Serialize;

use crate::error::{LoggerError, Result};

/// Timing of one acquisition cycle against its nominal period.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CycleResult {
    pub cycle_id: usize,
    pub samples: usize,
    pub duration_ns: u64,
    pub expected_ns: u64,
    pub lateness_ns: i64,
    pub on_schedule: bool,
}

/// Cycles later than this fraction of their period are reported.
const LATE_TOLERANCE: f64 = 0.5;

/// Per-session cycle timing, owned by whoever drives the cycles.
#[derive(Debug)]
pub struct CycleRecorder {
    results: Vec<CycleResult>,
    expected: Duration,
    late_cycles: usize,
}

impl CycleRecorder {
    pub fn new(expected: Duration, total_cycles: usize) -> Self {
        Self {
            results: Vec::with_capacity(total_cycles),
            expected,
            late_cycles: 0,
        }
    }

    pub fn record(&mut self, cycle_id: usize, samples: usize, duration: Duration) -> &CycleResult {
        let expected_ns = self.expected.as_nanos() as u64;
        let duration_ns = duration.as_nanos() as u64;
        let lateness_ns = duration_ns as i64 - expected_ns as i64;
        let on_schedule = (lateness_ns as f64) <= expected_ns as f64 * LATE_TOLERANCE;
        if !on_schedule {
            self.late_cycles += 1;
        }
        self.results.push(CycleResult {
            cycle_id,
            samples,
            duration_ns,
            expected_ns,
            lateness_ns,
            on_schedule,
        });
        &self.results[self.results.len() - 1]
    }

    pub fn results(&self) -> &[CycleResult] {
        &self.results
    }

    pub fn late_cycles(&self) -> usize {
        self.late_cycles
    }

    pub fn log_summary(&self) {
        if self.results.is_empty() {
            info!("no cycles completed");
            return;
        }
        let total: u64 = self.results.iter().map(|r| r.duration_ns).sum();
        let max = self.results.iter().map(|r| r.duration_ns).max().unwrap_or(0);
        let samples: usize = self.results.iter().map(|r| r.samples).sum();
        info!(
            "{} cycles, {} samples, cycle time avg {:.3}s max {:.3}s (nominal {:.3}s), {} late",
            self.results.len(),
            samples,
            total as f64 / self.results.len() as f64 / 1e9,
            max as f64 / 1e9,
            self.expected.as_secs_f64(),
            self.late_cycles
        );
    }

    pub fn save_to_csv(&self, path: &Path) -> Result<()> {
        let to_err = |e: csv::Error| LoggerError::persistence(path, e.into());
        let mut wtr = csv::Writer::from_path(path).map_err(to_err)?;
        for record in &self.results {
            wtr.serialize(record).map_err(to_err)?;
        }
        wtr.flush().map_err(|e| LoggerError::persistence(path, e))?;
        info!("saved {} cycle timings to {}", self.results.len(), path.display());
        Ok(())
    }
}
