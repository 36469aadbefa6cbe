use crate::view_model::{AppViewModel, JobRowView};
use crate::{classify, download_name, gate, summarize, CompressionStats, Download, Family};

pub type JobId = u64;

/// A file as handed over by the front end, with its bytes materialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    pub name: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The reducer could not process the input.
    ReducerFault,
    /// The reducer finished but the result was not smaller than the input.
    NoImprovement,
}

impl FailureReason {
    pub fn user_message(self) -> &'static str {
        match self {
            FailureReason::ReducerFault => "Failed to process file",
            FailureReason::NoImprovement => {
                "Could not compress effectively (result was not smaller)"
            }
        }
    }
}

/// Lifecycle of a job. Result bytes exist only in `Succeeded`, a reason only in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Succeeded { result: Vec<u8> },
    Failed { reason: FailureReason },
}

/// Payload-free view of [`JobState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn status(&self) -> JobStatus {
        match self {
            JobState::Idle => JobStatus::Idle,
            JobState::Running => JobStatus::Running,
            JobState::Succeeded { .. } => JobStatus::Succeeded,
            JobState::Failed { .. } => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileJob {
    id: JobId,
    source_name: String,
    source_size: u64,
    declared_type: String,
    family: Family,
    state: JobState,
    progress: u8,
}

impl FileJob {
    fn new(id: JobId, file: &RawFile) -> Self {
        Self {
            id,
            source_name: file.name.clone(),
            source_size: file.size(),
            declared_type: file.declared_type.clone(),
            family: classify(&file.name, &file.declared_type),
            state: JobState::Idle,
            progress: 0,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn source_size(&self) -> u64 {
        self.source_size
    }

    pub fn declared_type(&self) -> &str {
        &self.declared_type
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn result_bytes(&self) -> Option<&[u8]> {
        match &self.state {
            JobState::Succeeded { result } => Some(result),
            _ => None,
        }
    }

    pub fn result_size(&self) -> Option<u64> {
        self.result_bytes().map(|bytes| bytes.len() as u64)
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self.state {
            JobState::Failed { reason } => Some(reason),
            _ => None,
        }
    }

    /// Percentage saved for a succeeded job.
    pub fn savings_percent(&self) -> Option<f64> {
        let result = self.result_size()?;
        if self.source_size == 0 {
            return None;
        }
        Some((1.0 - result as f64 / self.source_size as f64) * 100.0)
    }

    fn is_running(&self) -> bool {
        self.state == JobState::Running
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    /// Newest batch first; a batch keeps its submission order.
    jobs: Vec<FileJob>,
    /// Never reset, so ids stay unique across clears.
    next_job_id: JobId,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            job_count: self.jobs.len(),
            jobs: self.jobs.iter().map(JobRowView::from_job).collect(),
            stats: self.stats(),
            dirty: self.dirty,
        }
    }

    pub fn jobs(&self) -> &[FileJob] {
        &self.jobs
    }

    pub fn job(&self, job_id: JobId) -> Option<&FileJob> {
        self.jobs.iter().find(|job| job.id == job_id)
    }

    pub fn stats(&self) -> CompressionStats {
        summarize(&self.jobs)
    }

    pub fn has_running_jobs(&self) -> bool {
        self.jobs.iter().any(FileJob::is_running)
    }

    /// Result bytes and suggested name, only for succeeded jobs.
    pub fn download(&self, job_id: JobId) -> Option<Download> {
        let job = self.job(job_id)?;
        let bytes = job.result_bytes()?;
        Some(Download {
            file_name: download_name(job.family, &job.source_name),
            bytes: bytes.to_vec(),
        })
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Creates one job per file and moves each straight to `Running`.
    pub(crate) fn start_jobs(&mut self, files: &[RawFile]) -> Vec<(JobId, Family)> {
        let mut batch = Vec::with_capacity(files.len());
        for file in files {
            self.next_job_id += 1;
            let mut job = FileJob::new(self.next_job_id, file);
            job.state = JobState::Running;
            batch.push(job);
        }
        let started = batch.iter().map(|job| (job.id, job.family)).collect();
        self.jobs.splice(0..0, batch);
        started
    }

    /// Returns true when the visible progress changed.
    pub(crate) fn apply_progress(&mut self, job_id: JobId, percent: u8) -> bool {
        let Some(job) = self.running_job_mut(job_id) else {
            return false;
        };
        let percent = percent.min(100);
        if percent <= job.progress {
            return false;
        }
        job.progress = percent;
        true
    }

    /// Applies the size gate and moves the job to its terminal state. Returns the
    /// failure reason (if any) together with the job's name, or `None` when the
    /// job is unknown or already terminal.
    pub(crate) fn apply_finished(
        &mut self,
        job_id: JobId,
        outcome: crate::ReduceOutcome,
    ) -> Option<(Option<FailureReason>, String)> {
        let job = self.running_job_mut(job_id)?;
        let failure = match outcome {
            crate::ReduceOutcome::Reduced(bytes) => {
                if gate::accept(job.source_size, bytes.len() as u64) {
                    job.progress = 100;
                    job.state = JobState::Succeeded { result: bytes };
                    None
                } else {
                    Some(FailureReason::NoImprovement)
                }
            }
            crate::ReduceOutcome::Faulted { .. } => Some(FailureReason::ReducerFault),
        };
        if let Some(reason) = failure {
            job.state = JobState::Failed { reason };
        }
        Some((failure, job.source_name.clone()))
    }

    pub(crate) fn clear(&mut self) {
        self.jobs.clear();
    }

    fn running_job_mut(&mut self, job_id: JobId) -> Option<&mut FileJob> {
        self.jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .filter(|job| job.is_running())
    }
}
