use common::{Batch, Clock, FrameParser, Result};
use log::trace;

use crate::source::StreamSource;

/// Pulls fixed-size batches of frames from the instrument.
pub struct BatchSampler<S, C> {
    source: S,
    clock: C,
    parser: FrameParser,
    line: String,
}

impl<S: StreamSource, C: Clock> BatchSampler<S, C> {
    pub fn new(source: S, clock: C, parser: FrameParser) -> Self {
        Self {
            source,
            clock,
            parser,
            line: String::with_capacity(128),
        }
    }

    /// Fills every slot of `batch` in arrival order, overwriting the previous
    /// cycle. Each timestamp is taken right after its line arrives.
    ///
    /// Any read or parse failure aborts the batch; the slots already filled
    /// are left as they are and must not be used.
    pub fn sample_batch(&mut self, batch: &mut Batch) -> Result<()> {
        debug_assert_eq!(batch.sensors(), self.parser.sensors());
        for i in 0..batch.len() {
            self.line.clear();
            self.source.read_line(&mut self.line)?;
            let received_at = self.clock.now();

            let (timestamp, row) = batch.slot_mut(i);
            self.parser.parse_into(&self.line, row)?;
            *timestamp = received_at;
            trace!("frame {}: {:?}", i, self.line.trim_end());
        }
        Ok(())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Hands back the source so the owner can release it.
    pub fn into_source(self) -> S {
        self.source
    }
}
