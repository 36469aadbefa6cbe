//! Compactor engine: reducers, codec runtime and effect execution.
mod codec;
mod decode;
mod engine;
mod persist;
mod progress;
mod reducer;
pub mod reducers;
mod settings;
mod types;

pub use codec::{
    CodecLoader, CodecRuntime, CodecUnavailable, FfmpegLoader, FfmpegTranscoder, MediaKind,
    TranscodeError, Transcoder,
};
pub use decode::{decode_text, encode_text, DecodeError, DecodedText};
pub use engine::{EngineEvents, EngineHandle};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::{ChannelProgressSink, ProgressReporter, ProgressSink};
pub use reducer::{Reducer, ReducerRegistry};
pub use settings::{CodecSettings, EngineSettings, ImageSettings, SimulationSettings};
pub use types::{EngineEvent, JobId, JobProgress, ReduceError, SourceFile};
