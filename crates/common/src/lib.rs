pub mod clock;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod error;
pub mod frame;
pub mod metrics;

pub use clock::{Clock, SystemClock};
pub use config::{load_config, LinkConfig, SessionConfig, SessionPlan};
pub use dashboard::{DisplayBuffer, PlotFrame, TimeUnit, NO_VALUE};
pub use display::{DisplaySink, PanelSpec, PALETTE};
pub use error::{FrameFault, LoggerError, Result};
pub use frame::FrameParser;
pub use metrics::{CycleRecorder, CycleResult};

/// Header of the first output column.
pub const TIMESTAMP_HEADER: &str = "unix timestamp (s)";

/// One timestamped reading of every sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<'a> {
    pub timestamp: f64,
    pub values: &'a [f64],
}

/// Fixed-capacity storage for one cycle's samples.
///
/// Allocated once per session and overwritten in place every cycle. Readers
/// only ever get shared borrows, so nothing can hold on to a row while the
/// next cycle is being sampled into it.
#[derive(Debug, Clone)]
pub struct Batch {
    timestamps: Vec<f64>,
    values: Vec<f64>, // row-major, `sensors` values per sample
    sensors: usize,
}

impl Batch {
    pub fn new(batch_size: usize, sensors: usize) -> Self {
        Self {
            timestamps: vec![NO_VALUE; batch_size],
            values: vec![NO_VALUE; batch_size * sensors],
            sensors,
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn sensors(&self) -> usize {
        self.sensors
    }

    /// Mutable slot `i`: its timestamp and its sensor row.
    pub fn slot_mut(&mut self, i: usize) -> (&mut f64, &mut [f64]) {
        let row = &mut self.values[i * self.sensors..(i + 1) * self.sensors];
        (&mut self.timestamps[i], row)
    }

    pub fn get(&self, i: usize) -> Sample<'_> {
        Sample {
            timestamp: self.timestamps[i],
            values: &self.values[i * self.sensors..(i + 1) * self.sensors],
        }
    }

    pub fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    pub fn iter(&self) -> impl Iterator<Item = Sample<'_>> + '_ {
        self.timestamps
            .iter()
            .zip(self.values.chunks_exact(self.sensors))
            .map(|(&timestamp, values)| Sample { timestamp, values })
    }
}
