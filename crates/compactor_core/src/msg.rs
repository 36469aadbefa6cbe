#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User handed over a batch of files.
    FilesSubmitted(Vec<crate::RawFile>),
    /// Engine progress for a job, in percent.
    JobProgress { job_id: crate::JobId, percent: u8 },
    /// Engine completion for a job.
    JobFinished {
        job_id: crate::JobId,
        outcome: ReduceOutcome,
    },
    /// User asked to forget every job.
    ClearAllClicked,
}

/// What a reducer handed back, before the size gate has looked at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceOutcome {
    Reduced(Vec<u8>),
    Faulted { detail: String },
}
