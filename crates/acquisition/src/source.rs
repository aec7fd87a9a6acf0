use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::Duration;

use common::{FrameFault, LinkConfig, LoggerError, Result};
use log::info;

/// Blocking, line-oriented byte stream from the instrument.
///
/// Dropping the source releases the underlying handle.
pub trait StreamSource {
    /// Blocks until one full line is available and appends it to `buf`.
    fn read_line(&mut self, buf: &mut String) -> Result<()>;

    fn describe(&self) -> String;
}

impl<S: StreamSource + ?Sized> StreamSource for Box<S> {
    fn read_line(&mut self, buf: &mut String) -> Result<()> {
        (**self).read_line(buf)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Any buffered reader yielding newline-terminated text.
pub struct ReaderSource<R> {
    reader: R,
    name: String,
    timeout: Duration,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R, name: impl Into<String>, timeout: Duration) -> Self {
        Self {
            reader,
            name: name.into(),
            timeout,
        }
    }
}

impl<R: BufRead> StreamSource for ReaderSource<R> {
    fn read_line(&mut self, buf: &mut String) -> Result<()> {
        match self.reader.read_line(buf) {
            Ok(0) => Err(LoggerError::StreamClosed),
            Ok(_) if !buf.ends_with('\n') => Err(LoggerError::StreamClosed),
            Ok(_) => Ok(()),
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Err(LoggerError::StreamTimeout(self.timeout))
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                Err(LoggerError::malformed(buf, FrameFault::InvalidUtf8))
            }
            Err(e) => Err(LoggerError::Stream(e)),
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl<R> Drop for ReaderSource<R> {
    fn drop(&mut self) {
        info!("released stream {}", self.name);
    }
}

pub type SerialSource = ReaderSource<BufReader<Box<dyn serialport::SerialPort>>>;

/// Opens the instrument's serial endpoint; reads block for at most `timeout`.
pub fn open_serial(link: &LinkConfig, timeout: Duration) -> Result<SerialSource> {
    let port = serialport::new(&link.endpoint, link.baud_rate)
        .timeout(timeout)
        .open()
        .map_err(|e| LoggerError::StreamOpen {
            endpoint: link.endpoint.clone(),
            source: e.into(),
        })?;
    info!("opened {} at {} baud", link.endpoint, link.baud_rate);
    Ok(ReaderSource::new(
        BufReader::new(port),
        link.endpoint.clone(),
        timeout,
    ))
}

/// Replays a captured text file in place of the instrument.
pub fn open_replay(path: &Path) -> Result<ReaderSource<BufReader<File>>> {
    let file = File::open(path).map_err(|e| LoggerError::StreamOpen {
        endpoint: path.display().to_string(),
        source: e,
    })?;
    info!("replaying {}", path.display());
    Ok(ReaderSource::new(
        BufReader::new(file),
        path.display().to_string(),
        Duration::ZERO,
    ))
}
