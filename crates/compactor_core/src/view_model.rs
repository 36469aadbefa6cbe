use crate::{CompressionStats, Family, FailureReason, FileJob, JobId, JobStatus};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub job_count: usize,
    pub jobs: Vec<JobRowView>,
    pub stats: CompressionStats,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRowView {
    pub job_id: JobId,
    pub name: String,
    pub declared_type: String,
    pub family: Family,
    pub status: JobStatus,
    pub progress: u8,
    pub source_size: u64,
    pub result_size: Option<u64>,
    pub savings_percent: Option<f64>,
    pub failure: Option<FailureReason>,
}

impl JobRowView {
    pub(crate) fn from_job(job: &FileJob) -> Self {
        Self {
            job_id: job.id(),
            name: job.source_name().to_string(),
            declared_type: job.declared_type().to_string(),
            family: job.family(),
            status: job.status(),
            progress: job.progress(),
            source_size: job.source_size(),
            result_size: job.result_size(),
            savings_percent: job.savings_percent(),
            failure: job.failure_reason(),
        }
    }
}
