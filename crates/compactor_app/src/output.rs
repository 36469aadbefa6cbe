use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use compactor_core::{AppViewModel, JobRowView, JobStatus};
use compactor_engine::{AtomicFileWriter, PersistError};
use engine_logging::{engine_info, job_debug};
use serde::Serialize;
use thiserror::Error;

use crate::JobController;

pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Error)]
pub enum OutputError {
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("cannot serialise summary: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_utc: String,
    pub files_count: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_original: u64,
    pub total_compressed: u64,
    pub saved_bytes: u64,
    pub efficiency: f64,
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub declared_type: String,
    pub family: &'static str,
    pub status: &'static str,
    pub source_size: u64,
    pub result_size: Option<u64>,
    pub savings_percent: Option<f64>,
    pub failure: Option<&'static str>,
    pub output: Option<PathBuf>,
}

/// What [`write_results`] put on disk.
#[derive(Debug)]
pub struct OutputReport {
    pub written: Vec<PathBuf>,
    pub summary: PathBuf,
}

/// Writes every succeeded result under its download name, then `summary.json`.
/// Existing results are never overwritten; the summary is replaced.
pub fn write_results(
    dir: &Path,
    controller: &JobController,
    generated: DateTime<Utc>,
) -> Result<OutputReport, OutputError> {
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    let view = controller.snapshot();
    let mut written = Vec::new();
    let mut files = Vec::with_capacity(view.jobs.len());

    // Submission order, so numbered duplicates follow it too.
    let mut rows: Vec<&JobRowView> = view.jobs.iter().collect();
    rows.sort_by_key(|row| row.job_id);
    for row in rows {
        let output = match controller.download(row.job_id) {
            Some(download) => {
                let path = writer.write_new(&download.file_name, &download.bytes)?;
                job_debug!(row.job_id, "wrote {:?}", path);
                written.push(path.clone());
                Some(path)
            }
            None => None,
        };
        files.push(file_summary(row, output));
    }

    let summary = build_summary(&view, files, generated);
    let json = serde_json::to_vec_pretty(&summary)?;
    let summary_path = writer.write(SUMMARY_FILE, &json)?;
    engine_info!(
        "wrote {} results and {:?}",
        written.len(),
        summary_path
    );
    Ok(OutputReport {
        written,
        summary: summary_path,
    })
}

fn build_summary(
    view: &AppViewModel,
    files: Vec<FileSummary>,
    generated: DateTime<Utc>,
) -> RunSummary {
    let stats = &view.stats;
    RunSummary {
        generated_utc: generated.to_rfc3339_opts(SecondsFormat::Secs, true),
        files_count: stats.files_count,
        succeeded: stats.succeeded,
        failed: stats.failed,
        total_original: stats.total_original,
        total_compressed: stats.total_compressed,
        saved_bytes: stats.saved_bytes,
        efficiency: stats.efficiency,
        files,
    }
}

fn file_summary(row: &JobRowView, output: Option<PathBuf>) -> FileSummary {
    FileSummary {
        name: row.name.clone(),
        declared_type: row.declared_type.clone(),
        family: row.family.label(),
        status: status_label(row.status),
        source_size: row.source_size,
        result_size: row.result_size,
        savings_percent: row.savings_percent,
        failure: row.failure.map(|reason| reason.user_message()),
        output,
    }
}

pub fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Idle => "idle",
        JobStatus::Running => "running",
        JobStatus::Succeeded => "succeeded",
        JobStatus::Failed => "failed",
    }
}
