use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dashboard::TimeUnit;
use crate::error::{LoggerError, Result};

/// Relative slack allowed when checking that `total_time / time_step` is whole.
const RATIO_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    pub endpoint: String,
    pub baud_rate: u32,
    /// Unset means twice the sampling interval, and never under a second.
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl LinkConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Everything a session needs, fixed at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub link: LinkConfig,
    pub time_step: f64,   // seconds between instrument readings
    pub total_time: f64,  // planned session length in seconds
    pub batch_size: usize,
    pub sensors: usize,
    pub filename: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub sensor_headers: Vec<String>,
    #[serde(default)]
    pub plot_data_while_running: bool,
    #[serde(default)]
    pub lower_sensor_limits: Vec<f64>,
    #[serde(default)]
    pub upper_sensor_limits: Vec<f64>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default)]
    pub cycle_stats_file: Option<PathBuf>,
}

/// Derived sizes of a validated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPlan {
    pub total_samples: usize,
    pub total_cycles: usize,
    pub batch_size: usize,
    pub sensors: usize,
    pub time_unit: TimeUnit,
}

/// Floor for the derived read timeout.
const MIN_READ_TIMEOUT: Duration = Duration::from_secs(1);

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_delimiter() -> char {
    ','
}

pub fn load_config(path: impl AsRef<Path>) -> Result<SessionConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| LoggerError::ConfigFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    SessionConfig::from_toml(&content).map_err(|e| match e {
        LoggerError::Config(reason) => LoggerError::ConfigFile {
            path: path.to_path_buf(),
            reason,
        },
        other => other,
    })
}

impl SessionConfig {
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| LoggerError::Config(e.to_string()))
    }

    /// Checks the session invariants and works out its sizes. Touches no I/O.
    pub fn validate(&self) -> Result<SessionPlan> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(config_err(format!(
                "time_step must be positive, got {}",
                self.time_step
            )));
        }
        if !(self.total_time.is_finite() && self.total_time > 0.0) {
            return Err(config_err(format!(
                "total_time must be positive, got {}",
                self.total_time
            )));
        }
        if self.batch_size == 0 {
            return Err(config_err("batch_size must be at least 1"));
        }
        if self.sensors == 0 {
            return Err(config_err("sensors must be at least 1"));
        }
        if self.filename.trim().is_empty() {
            return Err(config_err("filename must not be empty"));
        }
        if self.delimiter == '\n' || self.delimiter == '\r' || self.delimiter == '.' {
            return Err(config_err(format!(
                "{:?} cannot be used as a field delimiter",
                self.delimiter
            )));
        }

        if let Some(ms) = self.link.read_timeout_ms {
            if Duration::from_millis(ms).as_secs_f64() <= self.time_step {
                return Err(config_err(format!(
                    "link.read_timeout_ms = {} does not outlast the {}s gap between readings",
                    ms, self.time_step
                )));
            }
        }

        let ratio = self.total_time / self.time_step;
        let rounded = ratio.round();
        if rounded < 1.0 || (ratio - rounded).abs() > RATIO_TOLERANCE * rounded {
            return Err(config_err(format!(
                "total_time / time_step = {} / {} = {} is not a whole number of samples",
                self.total_time, self.time_step, ratio
            )));
        }
        let total_samples = rounded as usize;
        if total_samples % self.batch_size != 0 {
            return Err(config_err(format!(
                "{} samples do not split into batches of {}",
                total_samples, self.batch_size
            )));
        }

        check_len("sensor_headers", self.sensor_headers.len(), self.sensors)?;
        check_len("lower_sensor_limits", self.lower_sensor_limits.len(), self.sensors)?;
        check_len("upper_sensor_limits", self.upper_sensor_limits.len(), self.sensors)?;

        for (k, (lower, upper)) in self
            .lower_sensor_limits
            .iter()
            .zip(&self.upper_sensor_limits)
            .enumerate()
        {
            if !(lower < upper) {
                return Err(config_err(format!(
                    "sensor {} ({}): lower limit {} is not below upper limit {}",
                    k, self.sensor_headers[k], lower, upper
                )));
            }
        }

        Ok(SessionPlan {
            total_samples,
            total_cycles: total_samples / self.batch_size,
            batch_size: self.batch_size,
            sensors: self.sensors,
            time_unit: TimeUnit::for_duration(self.total_time),
        })
    }

    /// How long one read may block before the instrument counts as stalled.
    pub fn read_timeout(&self) -> Duration {
        match self.link.read_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => Duration::from_secs_f64(self.time_step * 2.0).max(MIN_READ_TIMEOUT),
        }
    }

    /// Nominal wall time of one cycle.
    pub fn cycle_period(&self) -> Duration {
        Duration::from_secs_f64(self.time_step * self.batch_size as f64)
    }
}

fn check_len(name: &str, len: usize, sensors: usize) -> Result<()> {
    if len != sensors {
        return Err(config_err(format!(
            "{} has {} entries but sensors = {}",
            name, len, sensors
        )));
    }
    Ok(())
}

fn config_err(msg: impl Into<String>) -> LoggerError {
    LoggerError::Config(msg.into())
}

#[cfg(test)]
pub(crate) fn sample_config() -> SessionConfig {
    SessionConfig {
        link: LinkConfig {
            endpoint: "/dev/null".to_string(),
            baud_rate: 9600,
            read_timeout_ms: Some(2000),
            settle_delay_ms: 0,
        },
        time_step: 1.0,
        total_time: 10.0,
        batch_size: 5,
        sensors: 2,
        filename: "log".to_string(),
        output_dir: PathBuf::from("."),
        sensor_headers: vec!["ambient temp (degC)".into(), "light level (0-256)".into()],
        plot_data_while_running: false,
        lower_sensor_limits: vec![0.0, 0.0],
        upper_sensor_limits: vec![25.0, 256.0],
        delimiter: ',',
        cycle_stats_file: None,
    }
}
