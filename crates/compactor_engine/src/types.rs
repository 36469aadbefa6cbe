use bytes::Bytes;

pub use compactor_core::JobId;

/// Input handed to a reducer. Cloning shares the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub declared_type: String,
    pub bytes: Bytes,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn extension(&self) -> String {
        compactor_core::file_extension(&self.name)
    }
}

impl From<compactor_core::RawFile> for SourceFile {
    fn from(file: compactor_core::RawFile) -> Self {
        Self::new(file.name, file.declared_type, file.bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobProgress {
    pub job_id: JobId,
    pub percent: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(JobProgress),
    JobCompleted {
        job_id: JobId,
        result: Result<Vec<u8>, ReduceError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReduceError {
    #[error("cannot decode input: {0}")]
    Decode(String),
    #[error("pdf error: {0}")]
    Pdf(String),
    #[error("archive error: {0}")]
    Archive(String),
    #[error("worker failed: {0}")]
    Worker(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ReduceError {
    fn from(err: std::io::Error) -> Self {
        ReduceError::Io(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ReduceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ReduceError::Worker(err.to_string())
    }
}
