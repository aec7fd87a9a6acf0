pub mod driver;
pub mod sampler;
pub mod session;
pub mod sink;
pub mod source;

pub use driver::{CycleRunner, HeadlessDriver, LiveDriver, RenderMode, TickStatus};
pub use sampler::BatchSampler;
pub use session::{Session, SessionReport};
pub use sink::{session_output_path, CsvSink};
pub use source::{open_replay, open_serial, ReaderSource, SerialSource, StreamSource};
