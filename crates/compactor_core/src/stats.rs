use crate::{FileJob, JobStatus};

/// Totals across the job set. Only succeeded jobs contribute to the compressed
/// total, so the saved figure never overstates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CompressionStats {
    pub files_count: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total_original: u64,
    pub total_compressed: u64,
    pub saved_bytes: u64,
    /// Fraction in `[0, 1]`.
    pub efficiency: f64,
}

pub fn summarize<'a>(jobs: impl IntoIterator<Item = &'a FileJob>) -> CompressionStats {
    let mut stats = CompressionStats::default();
    for job in jobs {
        stats.files_count += 1;
        stats.total_original += job.source_size();
        match job.status() {
            JobStatus::Running => stats.running += 1,
            JobStatus::Succeeded => stats.succeeded += 1,
            JobStatus::Failed => stats.failed += 1,
            JobStatus::Idle => {}
        }
        stats.total_compressed += job.result_size().unwrap_or(0);
    }
    stats.saved_bytes = stats.total_original.saturating_sub(stats.total_compressed);
    stats.efficiency = if stats.total_original > 0 {
        stats.saved_bytes as f64 / stats.total_original as f64
    } else {
        0.0
    };
    stats
}
