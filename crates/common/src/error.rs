use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Why a line from the instrument could not be turned into a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameFault {
    Empty,
    FieldCount { expected: usize, found: usize },
    NotNumeric { field: usize, text: String },
    NotFinite { field: usize },
    InvalidUtf8,
}

impl std::fmt::Display for FrameFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FrameFault::Empty => write!(f, "empty line"),
            FrameFault::FieldCount { expected, found } => {
                write!(f, "expected {} fields, found {}", expected, found)
            }
            FrameFault::NotNumeric { field, text } => {
                write!(f, "field {} is not a number: {:?}", field, text)
            }
            FrameFault::NotFinite { field } => write!(f, "field {} is not finite", field),
            FrameFault::InvalidUtf8 => write!(f, "line is not valid UTF-8"),
        }
    }
}

/// Every way a logging session can fail. All of them abort the session.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load config {path}: {reason}")]
    ConfigFile { path: PathBuf, reason: String },

    #[error("malformed frame {line:?}: {fault}")]
    MalformedFrame { line: String, fault: FrameFault },

    #[error("could not open stream {endpoint}: {source}")]
    StreamOpen {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("stream read timed out after {0:?}")]
    StreamTimeout(Duration),

    #[error("stream closed by the instrument")]
    StreamClosed,

    #[error("stream read failed: {0}")]
    Stream(#[source] io::Error),

    #[error("cannot write {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} already holds a different header: {found:?}")]
    HeaderMismatch { path: PathBuf, found: String },

    #[error("display window was closed")]
    DisplayClosed,
}

impl LoggerError {
    pub fn malformed(line: &str, fault: FrameFault) -> Self {
        LoggerError::MalformedFrame {
            line: line.trim_end_matches(&['\r', '\n'][..]).to_string(),
            fault,
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LoggerError::Persistence {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, LoggerError>;
