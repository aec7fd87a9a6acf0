use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use acquisition::{ReaderSource, RenderMode, Session, StreamSource};
use common::{
    Clock, DisplaySink, LinkConfig, LoggerError, PanelSpec, PlotFrame, Result, SessionConfig,
};

/// Hands out pre-planned timestamps, one per call.
struct ScriptedClock(Mutex<VecDeque<f64>>);

impl ScriptedClock {
    /// Origin at `start`, then one sample per second from `start`.
    fn per_second(start: f64, samples: usize) -> Self {
        let times = std::iter::once(start).chain((0..samples).map(|i| start + i as f64));
        ScriptedClock(Mutex::new(times.collect()))
    }
}

impl Clock for ScriptedClock {
    fn now(&self) -> f64 {
        self.0.lock().unwrap().pop_front().unwrap_or(f64::MAX)
    }
}

/// In-memory instrument that counts how often it is released.
struct CountingSource {
    inner: ReaderSource<Cursor<Vec<u8>>>,
    released: Arc<AtomicUsize>,
}

impl CountingSource {
    fn new(lines: &[&str]) -> (Self, Arc<AtomicUsize>) {
        let text: String = lines.iter().map(|l| format!("{}\r\n", l)).collect();
        let released = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            inner: ReaderSource::new(
                Cursor::new(text.into_bytes()),
                "bench instrument",
                Duration::from_secs(1),
            ),
            released: released.clone(),
        };
        (source, released)
    }
}

impl StreamSource for CountingSource {
    fn read_line(&mut self, buf: &mut String) -> Result<()> {
        self.inner.read_line(buf)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

impl Drop for CountingSource {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Recorded {
    panels: Vec<Vec<PanelSpec>>,
    frames: Vec<PlotFrame>,
    finished: Option<Option<String>>,
}

/// Display that keeps everything it is given; optionally "closes" after
/// `close_after` frames.
#[derive(Clone, Default)]
struct RecordingDisplay {
    seen: Arc<Mutex<Recorded>>,
    close_after: Option<usize>,
}

impl DisplaySink for RecordingDisplay {
    fn init_panels(&mut self, panels: Vec<PanelSpec>) -> Result<()> {
        self.seen.lock().unwrap().panels.push(panels);
        Ok(())
    }

    fn repaint(&mut self, frame: PlotFrame) -> Result<()> {
        let mut seen = self.seen.lock().unwrap();
        if Some(seen.frames.len()) == self.close_after {
            return Err(LoggerError::DisplayClosed);
        }
        seen.frames.push(frame);
        Ok(())
    }

    fn finish(&mut self, error: Option<String>) {
        self.seen.lock().unwrap().finished = Some(error);
    }
}

fn config(dir: &Path, plot: bool) -> SessionConfig {
    SessionConfig {
        link: LinkConfig {
            endpoint: "/dev/ttyACM0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: Some(2000),
            settle_delay_ms: 0,
        },
        time_step: 1.0,
        total_time: 10.0,
        batch_size: 5,
        sensors: 2,
        filename: "log".to_string(),
        output_dir: dir.to_path_buf(),
        sensor_headers: vec!["ambient temp (degC)".into(), "light level (0-256)".into()],
        plot_data_while_running: plot,
        lower_sensor_limits: vec![0.0, 0.0],
        upper_sensor_limits: vec![25.0, 256.0],
        delimiter: ',',
        cycle_stats_file: None,
    }
}

fn ten_lines() -> Vec<String> {
    (0..10).map(|i| format!("{}.5,{}", 20 + i, 100 + i)).collect()
}

fn csv_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn output_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}

const ORIGIN: f64 = 1_700_000_000.0;

#[test]
fn headless_session_writes_header_and_every_sample() {
    let dir = tempfile::tempdir().unwrap();
    let lines = ten_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (source, released) = CountingSource::new(&refs);

    let session = Session::new(config(dir.path(), false), ScriptedClock::per_second(ORIGIN, 10)).unwrap();
    assert_eq!(session.mode(), RenderMode::Headless);
    let report = session.run_headless(source).unwrap();

    assert_eq!(report.cycles, 2);
    assert_eq!(report.samples, 10);
    assert!(report.history.is_none());
    assert_eq!(released.load(Ordering::SeqCst), 1);

    let rows = csv_lines(&report.output);
    assert_eq!(rows.len(), 11);
    assert_eq!(rows[0], "unix timestamp (s),ambient temp (degC),light level (0-256)");
    for (k, line) in lines.iter().enumerate() {
        let expected = format!("{},{}", ORIGIN + k as f64, line);
        assert_eq!(rows[k + 1], expected);
    }
}

#[test]
fn live_session_fills_history_and_repaints_each_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let lines = ten_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (source, released) = CountingSource::new(&refs);
    let display = RecordingDisplay::default();

    let session = Session::new(config(dir.path(), true), ScriptedClock::per_second(ORIGIN, 10)).unwrap();
    assert_eq!(session.mode(), RenderMode::Live);
    let report = session.run(source, Some(display.clone())).unwrap();

    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(csv_lines(&report.output).len(), 11);

    let history = report.history.expect("live session keeps its history");
    assert_eq!(history.written(), 10);
    assert_eq!(history.elapsed(), &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
    assert!(history.sensor(0).iter().chain(history.sensor(1)).all(|v| !v.is_nan()));
    assert_eq!(history.sensor(1)[9], 109.0);

    let seen = display.seen.lock().unwrap();
    assert_eq!(seen.panels.len(), 1, "panels are initialised once");
    let panels = &seen.panels[0];
    assert_eq!(panels.len(), 2);
    assert_eq!(panels[0].x_label, "elapsed time (s)");
    assert_eq!(panels[0].y_bounds, (0.0, 25.0));
    assert_eq!(panels[1].y_bounds, (0.0, 256.0));
    assert_ne!(panels[0].color, panels[1].color);

    assert_eq!(seen.frames.len(), 2);
    assert_eq!(seen.frames[0].series[0].len(), 5);
    assert_eq!(seen.frames[1].series[1].len(), 10);
    assert_eq!(seen.frames[1].series[0][9], [9.0, 29.5]);
    assert_eq!(seen.finished, Some(None));
}

#[test]
fn malformed_line_aborts_and_keeps_committed_batches() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = ten_lines();
    lines[7] = "27.5".to_string();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (source, released) = CountingSource::new(&refs);

    let session = Session::new(config(dir.path(), false), ScriptedClock::per_second(ORIGIN, 10)).unwrap();
    let output = session.output_path().to_path_buf();
    let err = session.run_headless(source).unwrap_err();

    assert!(matches!(err, LoggerError::MalformedFrame { .. }));
    assert_eq!(released.load(Ordering::SeqCst), 1);

    let rows = csv_lines(&output);
    assert_eq!(rows.len(), 6, "header plus the first batch only");
    assert_eq!(rows[5], format!("{},{}", ORIGIN + 4.0, lines[4]));
}

#[test]
fn non_numeric_field_in_first_batch_writes_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = ten_lines();
    lines[2] = "21.0,bright".to_string();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (source, _) = CountingSource::new(&refs);

    let session = Session::new(config(dir.path(), false), ScriptedClock::per_second(ORIGIN, 10)).unwrap();
    let output = session.output_path().to_path_buf();
    assert!(session.run_headless(source).is_err());
    assert_eq!(csv_lines(&output).len(), 1);
}

#[test]
fn instrument_disconnect_mid_session_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let lines = ten_lines();
    let refs: Vec<&str> = lines[..7].iter().map(String::as_str).collect();
    let (source, released) = CountingSource::new(&refs);
    let display = RecordingDisplay::default();

    let session = Session::new(config(dir.path(), true), ScriptedClock::per_second(ORIGIN, 10)).unwrap();
    let output = session.output_path().to_path_buf();
    let err = session.run(source, Some(display.clone())).unwrap_err();

    assert!(matches!(err, LoggerError::StreamClosed));
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(csv_lines(&output).len(), 6);

    let seen = display.seen.lock().unwrap();
    assert_eq!(seen.frames.len(), 1);
    assert!(matches!(seen.finished, Some(Some(_))));
}

#[test]
fn invalid_config_fails_before_any_file_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let mut bad = config(dir.path(), false);
    bad.total_time = 12.0;

    let result = Session::new(bad, ScriptedClock::per_second(ORIGIN, 0));
    assert!(matches!(result, Err(LoggerError::Config(_))));
    assert!(output_files(dir.path()).is_empty());
}

#[test]
fn live_mode_without_display_still_releases_the_stream() {
    let dir = tempfile::tempdir().unwrap();
    let lines = ten_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (source, released) = CountingSource::new(&refs);

    let session = Session::new(config(dir.path(), true), ScriptedClock::per_second(ORIGIN, 10)).unwrap();
    let result = session.run(source, None::<RecordingDisplay>);
    assert!(matches!(result, Err(LoggerError::Config(_))));
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn plotting_session_run_headless_logs_every_sample() {
    let dir = tempfile::tempdir().unwrap();
    let lines = ten_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (source, released) = CountingSource::new(&refs);

    let session = Session::new(config(dir.path(), true), ScriptedClock::per_second(ORIGIN, 10)).unwrap();
    let report = session.run_headless(source).unwrap();

    assert_eq!(report.samples, 10);
    assert!(report.history.is_none());
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(output_files(dir.path()).len(), 1);
    assert_eq!(csv_lines(&report.output).len(), 11);
}

#[test]
fn closing_the_display_aborts_after_the_persisted_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let lines = ten_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (source, released) = CountingSource::new(&refs);
    let display = RecordingDisplay {
        close_after: Some(1),
        ..Default::default()
    };

    let session = Session::new(config(dir.path(), true), ScriptedClock::per_second(ORIGIN, 10)).unwrap();
    let output = session.output_path().to_path_buf();
    let err = session.run(source, Some(display)).unwrap_err();

    assert!(matches!(err, LoggerError::DisplayClosed));
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(csv_lines(&output).len(), 11);
}

#[test]
fn two_sessions_in_the_same_second_get_separate_files() {
    let dir = tempfile::tempdir().unwrap();
    let first = Session::new(config(dir.path(), false), ScriptedClock::per_second(ORIGIN, 0)).unwrap();
    let second = Session::new(config(dir.path(), false), ScriptedClock::per_second(ORIGIN, 0)).unwrap();
    assert_ne!(first.output_path(), second.output_path());
    assert_eq!(output_files(dir.path()).len(), 2);
    for path in output_files(dir.path()) {
        assert_eq!(csv_lines(&path).len(), 1);
    }
}

#[test]
fn cycle_timings_are_saved_when_requested() {
    let dir = tempfile::tempdir().unwrap();
    let stats = dir.path().join("cycles.csv");
    let mut cfg = config(dir.path(), false);
    cfg.cycle_stats_file = Some(stats.clone());
    let lines = ten_lines();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let (source, _) = CountingSource::new(&refs);

    Session::new(cfg, ScriptedClock::per_second(ORIGIN, 10))
        .unwrap()
        .run_headless(source)
        .unwrap();

    assert_eq!(csv_lines(&stats).len(), 3);
}
