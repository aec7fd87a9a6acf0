use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use common::{Batch, LoggerError, Result, TIMESTAMP_HEADER};
use log::{debug, info};

/// Append-only CSV log of one session: a header row, then one row per sample.
pub struct CsvSink {
    file: File,
    path: PathBuf,
    columns: usize,
    committed: u64,
    scratch: Vec<u8>,
}

impl CsvSink {
    /// Opens `path` for appending, writing the header only if the file is new.
    ///
    /// Reopening a file that already carries the same header leaves it as it
    /// is; a file with any other header is refused.
    pub fn open(path: impl AsRef<Path>, sensor_headers: &[String]) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let to_err = |e| LoggerError::persistence(&path, e);

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)
            .map_err(to_err)?;

        let header = encode_row(TIMESTAMP_HEADER, sensor_headers.iter())?;
        let existing = file.metadata().map_err(to_err)?.len();

        let committed = if existing == 0 {
            file.write_all(&header).map_err(to_err)?;
            file.sync_data().map_err(to_err)?;
            debug!("wrote header to {}", path.display());
            header.len() as u64
        } else {
            let mut first = String::new();
            BufReader::new(&file).read_line(&mut first).map_err(to_err)?;
            let expected = String::from_utf8_lossy(&header);
            let eol = &['\r', '\n'][..];
            if first.trim_end_matches(eol) != expected.trim_end_matches(eol) {
                return Err(LoggerError::HeaderMismatch {
                    path,
                    found: first.trim_end().to_string(),
                });
            }
            existing
        };

        Ok(Self {
            file,
            path,
            columns: sensor_headers.len() + 1,
            committed,
            scratch: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends every sample of `batch` in order and syncs it to disk.
    ///
    /// The batch is encoded up front and written with a single call; if that
    /// fails the file is cut back to the end of the previous batch.
    pub fn append(&mut self, batch: &Batch) -> Result<()> {
        debug_assert_eq!(batch.sensors() + 1, self.columns);

        self.scratch.clear();
        {
            let mut wtr = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(&mut self.scratch);
            for sample in batch.iter() {
                let record = std::iter::once(sample.timestamp)
                    .chain(sample.values.iter().copied())
                    .map(|v| v.to_string());
                wtr.write_record(record)
                    .map_err(|e| LoggerError::persistence(&self.path, e.into()))?;
            }
            wtr.flush().map_err(|e| LoggerError::persistence(&self.path, e))?;
        }

        let written = self
            .file
            .write_all(&self.scratch)
            .and_then(|_| self.file.sync_data());
        if let Err(e) = written {
            if let Err(truncate) = self.file.set_len(self.committed) {
                log::error!(
                    "could not roll back partial batch in {}: {}",
                    self.path.display(),
                    truncate
                );
            }
            return Err(LoggerError::persistence(&self.path, e));
        }
        self.committed += self.scratch.len() as u64;
        Ok(())
    }
}

fn encode_row<'a>(first: &'a str, rest: impl Iterator<Item = &'a String>) -> Result<Vec<u8>> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
    wtr.write_record(std::iter::once(first).chain(rest.map(String::as_str)))
        .map_err(|e| LoggerError::persistence("<header>", e.into()))?;
    wtr.into_inner().map_err(|e| {
        let err = e.error();
        LoggerError::persistence("<header>", std::io::Error::new(err.kind(), err.to_string()))
    })
}

/// `<dir>/<base>_<local start time>.csv`, suffixed `_1`, `_2`, ... if a
/// previous session already claimed that name.
pub fn session_output_path(dir: &Path, base: &str, started_at: f64) -> PathBuf {
    let stamp = DateTime::from_timestamp(started_at.trunc() as i64, 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d_%H-%M-%S").to_string())
        .unwrap_or_else(|| format!("{}", started_at.trunc() as i64));

    let mut candidate = dir.join(format!("{}_{}.csv", base, stamp));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}_{}.csv", base, stamp, n));
        n += 1;
    }
    info!("session output: {}", candidate.display());
    candidate
}
