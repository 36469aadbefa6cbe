use crate::{Family, JobId, RawFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run the family's reducer over the file and report back with `JobProgress`/`JobFinished`.
    Reduce {
        job_id: JobId,
        family: Family,
        file: RawFile,
    },
    /// Show a short-lived notification to the user.
    Notify(Notice),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub job_id: JobId,
    pub message: String,
}
