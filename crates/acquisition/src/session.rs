use std::path::{Path, PathBuf};

use common::{
    Batch, Clock, CycleRecorder, DisplayBuffer, DisplaySink, FrameParser, LoggerError, PanelSpec,
    Result, SessionConfig, SessionPlan,
};
use log::{error, info, warn};

use crate::driver::{CycleRunner, HeadlessDriver, LiveDriver, RenderMode};
use crate::sampler::BatchSampler;
use crate::sink::{session_output_path, CsvSink};
use crate::source::StreamSource;

/// What a finished session produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub output: PathBuf,
    pub cycles: usize,
    pub samples: usize,
    pub late_cycles: usize,
    pub history: Option<DisplayBuffer>,
}

/// One logging run, from validated configuration to the last cycle.
pub struct Session<C> {
    config: SessionConfig,
    plan: SessionPlan,
    sink: CsvSink,
    history: Option<DisplayBuffer>,
    clock: C,
}

impl<C: Clock> Session<C> {
    /// Validates `config`, fixes the time origin, creates the output file
    /// with its header and pre-allocates the plot history if plotting is on.
    pub fn new(config: SessionConfig, clock: C) -> Result<Self> {
        let plan = config.validate()?;
        let origin = clock.now();

        let path = session_output_path(&config.output_dir, &config.filename, origin);
        let sink = CsvSink::open(&path, &config.sensor_headers)?;
        let history = config
            .plot_data_while_running
            .then(|| DisplayBuffer::new(&plan, origin));

        info!(
            "session planned: {} samples every {}s in {} cycles of {}, {} sensors, {} mode",
            plan.total_samples,
            config.time_step,
            plan.total_cycles,
            plan.batch_size,
            plan.sensors,
            if history.is_some() { "live" } else { "headless" }
        );

        Ok(Self {
            config,
            plan,
            sink,
            history,
            clock,
        })
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn output_path(&self) -> &Path {
        self.sink.path()
    }

    pub fn mode(&self) -> RenderMode {
        if self.history.is_some() {
            RenderMode::Live
        } else {
            RenderMode::Headless
        }
    }

    pub fn panels(&self) -> Vec<PanelSpec> {
        PanelSpec::for_session(&self.config, &self.plan)
    }

    /// Runs every cycle without a display. A session configured for
    /// plotting drops its history and logs headlessly.
    pub fn run_headless<S: StreamSource>(mut self, source: S) -> Result<SessionReport> {
        if self.history.take().is_some() {
            warn!("plotting disabled for this run: no display attached");
        }
        self.run(source, None::<Box<dyn DisplaySink>>)
    }

    /// Runs every planned cycle against `source`, which is released exactly
    /// once before this returns, whatever the outcome.
    ///
    /// `display` is required in live mode and ignored in headless mode. A
    /// live session given no display fails with a configuration error and
    /// leaves its header-only output file behind.
    pub fn run<S, D>(self, source: S, display: Option<D>) -> Result<SessionReport>
    where
        S: StreamSource,
        D: DisplaySink,
    {
        let panels = self.panels();
        let Session {
            config,
            plan,
            sink,
            history,
            clock,
            ..
        } = self;
        let output = sink.path().to_path_buf();

        let parser = FrameParser::new(config.delimiter, plan.sensors);
        let sampler = BatchSampler::new(source, clock, parser);
        let recorder = CycleRecorder::new(config.cycle_period(), plan.total_cycles);
        let batch = Batch::new(plan.batch_size, plan.sensors);
        let mut runner = CycleRunner::new(sampler, sink, batch, recorder, plan.total_cycles);
        info!("acquiring from {}", runner.describe_source());

        let (outcome, history) = match (history, display) {
            (None, _) => (HeadlessDriver::new(&mut runner).run(), None),
            (Some(history), Some(display)) => {
                let mut driver = LiveDriver::new(&mut runner, history, display, panels);
                let outcome = driver.run();
                let (history, mut display) = driver.into_parts();
                display.finish(outcome.as_ref().err().map(ToString::to_string));
                (outcome, Some(history))
            }
            (Some(_), None) => (
                Err(LoggerError::Config(
                    "plotting is enabled but no display is attached".to_string(),
                )),
                None,
            ),
        };

        let cycles = runner.completed();
        let (source, recorder) = runner.into_parts();
        drop(source);

        recorder.log_summary();
        let saved = match &config.cycle_stats_file {
            Some(path) => recorder.save_to_csv(path),
            None => Ok(()),
        };

        match outcome {
            Ok(()) => {
                saved?;
                info!("session complete: {} written", output.display());
                Ok(SessionReport {
                    output,
                    cycles,
                    samples: cycles * plan.batch_size,
                    late_cycles: recorder.late_cycles(),
                    history,
                })
            }
            Err(e) => {
                error!(
                    "session aborted after {} of {} cycles: {}",
                    cycles, plan.total_cycles, e
                );
                Err(e)
            }
        }
    }
}
