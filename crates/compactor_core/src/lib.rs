//! Compactor core: pure job state machine, classification and summary helpers.
mod classify;
mod download;
mod effect;
pub mod gate;
mod msg;
mod state;
mod stats;
mod update;
mod view_model;

pub use classify::{classify, file_extension, mime_essence, Family};
pub use download::{download_name, Download};
pub use effect::{Effect, Notice};
pub use msg::{Msg, ReduceOutcome};
pub use state::{AppState, FailureReason, FileJob, JobId, JobState, JobStatus, RawFile};
pub use stats::{summarize, CompressionStats};
pub use update::update;
pub use view_model::{AppViewModel, JobRowView};
