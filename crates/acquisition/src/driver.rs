use std::time::Instant;

use common::{
    Batch, Clock, CycleRecorder, DisplayBuffer, DisplaySink, PanelSpec, Result,
};
use log::{debug, warn};

use crate::sampler::BatchSampler;
use crate::sink::CsvSink;
use crate::source::StreamSource;

/// How a session advances its cycles. Chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Cycles run back to back, paced only by the blocking reads.
    Headless,
    /// Each tick also updates the history and repaints the display.
    Live,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Continue,
    Finished,
}

/// Sample-then-persist, one batch at a time.
pub struct CycleRunner<S, C> {
    sampler: BatchSampler<S, C>,
    sink: CsvSink,
    batch: Batch,
    recorder: CycleRecorder,
    completed: usize,
    total_cycles: usize,
}

impl<S: StreamSource, C: Clock> CycleRunner<S, C> {
    pub fn new(
        sampler: BatchSampler<S, C>,
        sink: CsvSink,
        batch: Batch,
        recorder: CycleRecorder,
        total_cycles: usize,
    ) -> Self {
        Self {
            sampler,
            sink,
            batch,
            recorder,
            completed: 0,
            total_cycles,
        }
    }

    /// Runs one cycle and returns the freshly persisted batch.
    pub fn step(&mut self) -> Result<&Batch> {
        debug_assert!(!self.is_finished());
        let cycle = self.completed;
        let started = Instant::now();

        self.sampler.sample_batch(&mut self.batch)?;
        self.sink.append(&self.batch)?;
        self.completed += 1;

        let result = self.recorder.record(cycle, self.batch.len(), started.elapsed());
        if result.on_schedule {
            debug!(
                "cycle {}/{}: {} samples in {:.3}s",
                self.completed,
                self.total_cycles,
                result.samples,
                result.duration_ns as f64 / 1e9
            );
        } else {
            warn!(
                "cycle {}/{} ran {:.3}s over its {:.3}s period",
                self.completed,
                self.total_cycles,
                result.lateness_ns as f64 / 1e9,
                result.expected_ns as f64 / 1e9
            );
        }
        Ok(&self.batch)
    }

    /// Index of the next cycle, equal to the number already persisted.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total_cycles(&self) -> usize {
        self.total_cycles
    }

    pub fn is_finished(&self) -> bool {
        self.completed >= self.total_cycles
    }

    pub fn describe_source(&self) -> String {
        self.sampler.source().describe()
    }

    pub fn into_parts(self) -> (S, CycleRecorder) {
        (self.sampler.into_source(), self.recorder)
    }
}

/// Runs every planned cycle with no display.
pub struct HeadlessDriver<'a, S, C> {
    runner: &'a mut CycleRunner<S, C>,
}

impl<'a, S: StreamSource, C: Clock> HeadlessDriver<'a, S, C> {
    pub fn new(runner: &'a mut CycleRunner<S, C>) -> Self {
        Self { runner }
    }

    pub fn run(&mut self) -> Result<()> {
        while !self.runner.is_finished() {
            self.runner.step()?;
        }
        Ok(())
    }
}

/// Drives cycles one tick at a time and keeps the display in step.
///
/// Ticks never overlap: each one samples, persists, updates the history and
/// hands an owned frame to the display before returning.
pub struct LiveDriver<'a, S, C, D> {
    runner: &'a mut CycleRunner<S, C>,
    history: DisplayBuffer,
    display: D,
    panels: Option<Vec<PanelSpec>>,
}

impl<'a, S: StreamSource, C: Clock, D: DisplaySink> LiveDriver<'a, S, C, D> {
    pub fn new(
        runner: &'a mut CycleRunner<S, C>,
        history: DisplayBuffer,
        display: D,
        panels: Vec<PanelSpec>,
    ) -> Self {
        Self {
            runner,
            history,
            display,
            panels: Some(panels),
        }
    }

    pub fn tick(&mut self) -> Result<TickStatus> {
        if self.runner.is_finished() {
            return Ok(TickStatus::Finished);
        }
        if let Some(panels) = self.panels.take() {
            self.display.init_panels(panels)?;
        }

        let cycle = self.runner.completed();
        let batch = self.runner.step()?;
        self.history.write_slice(cycle, batch);
        self.display.repaint(self.history.frame(cycle))?;

        Ok(if self.runner.is_finished() {
            TickStatus::Finished
        } else {
            TickStatus::Continue
        })
    }

    pub fn run(&mut self) -> Result<()> {
        while self.tick()? == TickStatus::Continue {}
        Ok(())
    }

    pub fn into_parts(self) -> (DisplayBuffer, D) {
        (self.history, self.display)
    }
}
