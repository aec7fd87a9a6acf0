use crate::error::{FrameFault, LoggerError, Result};

/// Decodes one delimited text line from the instrument into sensor readings.
#[derive(Debug, Clone, Copy)]
pub struct FrameParser {
    delimiter: char,
    sensors: usize,
}

impl FrameParser {
    pub fn new(delimiter: char, sensors: usize) -> Self {
        Self { delimiter, sensors }
    }

    pub fn sensors(&self) -> usize {
        self.sensors
    }

    /// Parses `line` into `out`, which must hold exactly `sensors` values.
    ///
    /// Surrounding whitespace and the line terminator are ignored. Anything
    /// else that is not a finite decimal number rejects the whole line.
    pub fn parse_into(&self, line: &str, out: &mut [f64]) -> Result<()> {
        debug_assert_eq!(out.len(), self.sensors);

        let body = line.trim();
        if body.is_empty() {
            return Err(LoggerError::malformed(line, FrameFault::Empty));
        }

        let found = body.split(self.delimiter).count();
        if found != self.sensors {
            return Err(LoggerError::malformed(
                line,
                FrameFault::FieldCount {
                    expected: self.sensors,
                    found,
                },
            ));
        }

        for (field, (text, slot)) in body.split(self.delimiter).zip(out.iter_mut()).enumerate() {
            let text = text.trim();
            let value: f64 = text.parse().map_err(|_| {
                LoggerError::malformed(
                    line,
                    FrameFault::NotNumeric {
                        field,
                        text: text.to_string(),
                    },
                )
            })?;
            if !value.is_finite() {
                return Err(LoggerError::malformed(line, FrameFault::NotFinite { field }));
            }
            *slot = value;
        }
        Ok(())
    }

    /// Convenience wrapper returning a fresh vector.
    pub fn parse(&self, line: &str) -> Result<Vec<f64>> {
        let mut values = vec![0.0; self.sensors];
        self.parse_into(line, &mut values)?;
        Ok(values)
    }
}
