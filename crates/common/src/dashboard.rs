use crate::config::SessionPlan;
use crate::Batch;

/// Marker for history cells whose cycle has not run yet.
pub const NO_VALUE: f64 = f64::NAN;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Unit of the elapsed-time axis, fixed for a whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Hours,
}

impl TimeUnit {
    /// Sessions of an hour or more are plotted in hours.
    pub fn for_duration(total_time: f64) -> Self {
        if total_time >= SECONDS_PER_HOUR {
            TimeUnit::Hours
        } else {
            TimeUnit::Seconds
        }
    }

    pub fn scale(self, seconds: f64) -> f64 {
        match self {
            TimeUnit::Seconds => seconds,
            TimeUnit::Hours => seconds / SECONDS_PER_HOUR,
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            TimeUnit::Seconds => "elapsed time (s)",
            TimeUnit::Hours => "elapsed time (hrs)",
        }
    }
}

/// Geometry handed to the display once per cycle: for every sensor, the
/// cumulative `[elapsed, value]` points recorded so far. Owned, so the
/// display never looks into the live history.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotFrame {
    pub cycle: usize,
    pub total_cycles: usize,
    pub series: Vec<Vec<[f64; 2]>>,
}

/// Whole-session history for the live plot.
///
/// Sized for every planned sample up front and filled with [`NO_VALUE`];
/// each cycle writes exactly its own `batch_size` slice and nothing else.
#[derive(Debug, Clone)]
pub struct DisplayBuffer {
    elapsed: Vec<f64>,
    values: Vec<Vec<f64>>, // one column per sensor
    batch_size: usize,
    total_cycles: usize,
    origin: f64,
    time_unit: TimeUnit,
    written: usize,
}

impl DisplayBuffer {
    pub fn new(plan: &SessionPlan, origin: f64) -> Self {
        Self {
            elapsed: vec![NO_VALUE; plan.total_samples],
            values: vec![vec![NO_VALUE; plan.total_samples]; plan.sensors],
            batch_size: plan.batch_size,
            total_cycles: plan.total_cycles,
            origin,
            time_unit: plan.time_unit,
            written: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.elapsed.len()
    }

    /// Number of leading samples holding real data.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn time_unit(&self) -> TimeUnit {
        self.time_unit
    }

    /// Copies `batch` into `[cycle_index * batch_size, (cycle_index + 1) * batch_size)`,
    /// storing elapsed seconds since the session origin.
    ///
    /// # Panics
    ///
    /// If the slice falls outside the pre-sized history or the batch is not
    /// exactly `batch_size` long. Both are fixed by the session plan, so
    /// either means the caller broke the cycle accounting.
    pub fn write_slice(&mut self, cycle_index: usize, batch: &Batch) {
        let left = cycle_index * self.batch_size;
        let right = left + self.batch_size;
        assert!(
            right <= self.capacity(),
            "cycle {} writes [{}, {}) past history capacity {}",
            cycle_index,
            left,
            right,
            self.capacity()
        );
        assert_eq!(batch.len(), self.batch_size, "batch size does not match session plan");
        assert_eq!(batch.sensors(), self.values.len(), "sensor count does not match session plan");

        for (i, sample) in batch.iter().enumerate() {
            self.elapsed[left + i] = sample.timestamp - self.origin;
            for (column, &value) in self.values.iter_mut().zip(sample.values) {
                column[left + i] = value;
            }
        }
        self.written = self.written.max(right);
    }

    /// Raw elapsed seconds, including unwritten cells.
    pub fn elapsed(&self) -> &[f64] {
        &self.elapsed
    }

    pub fn sensor(&self, k: usize) -> &[f64] {
        &self.values[k]
    }

    /// Points for sensor `k` up to the write position, x in the session's unit.
    pub fn series(&self, k: usize) -> Vec<[f64; 2]> {
        self.elapsed[..self.written]
            .iter()
            .zip(&self.values[k][..self.written])
            .map(|(&t, &v)| [self.time_unit.scale(t), v])
            .collect()
    }

    pub fn frame(&self, cycle: usize) -> PlotFrame {
        PlotFrame {
            cycle,
            total_cycles: self.total_cycles,
            series: (0..self.values.len()).map(|k| self.series(k)).collect(),
        }
    }
}
