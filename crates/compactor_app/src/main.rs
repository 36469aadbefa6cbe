use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use compactor_app::output::status_label;
use compactor_app::{logging, mime, write_results, AppConfig, JobController, LogDestination};
use compactor_core::{AppViewModel, JobId, JobRowView, JobStatus, RawFile};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Parser)]
#[command(name = "compactor", version)]
#[command(
    about = "Shrinks files locally and keeps only results that are smaller",
    long_about = None
)]
struct Cli {
    /// Files to compress.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory for results and summary.json [default: ./compacted]
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// RON settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    log: Option<LogDestination>,

    /// Give up waiting for running jobs after this many seconds.
    #[arg(long, default_value = "600")]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(output) = cli.output {
        config.output_dir = output;
    }
    if let Some(log) = cli.log {
        config.log = log;
    }
    logging::initialize(config.log, config.level_filter());

    let files = cli
        .files
        .iter()
        .map(|path| read_input(path))
        .collect::<Result<Vec<_>>>()?;

    let controller =
        JobController::new(&config.engine_settings()).context("cannot start engine")?;
    controller.submit(files);

    let settled = watch(&controller, Duration::from_secs(cli.timeout_secs));

    // Finished results are kept even when the run timed out.
    let report = write_results(&config.output_dir, &controller, Utc::now())
        .with_context(|| format!("cannot write results to {:?}", config.output_dir))?;
    let stats = controller.stats();
    println!(
        "{} files, {} compressed, {} failed: {} -> {} (saved {}, {:.1}%)",
        stats.files_count,
        stats.succeeded,
        stats.failed,
        format_bytes(stats.total_original),
        format_bytes(stats.total_compressed),
        format_bytes(stats.saved_bytes),
        stats.efficiency * 100.0
    );
    println!("summary: {}", report.summary.display());
    if !settled {
        bail!("jobs still running after {}s", cli.timeout_secs);
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<RawFile> {
    let bytes = std::fs::read(path).with_context(|| format!("cannot read {:?}", path))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(RawFile::new(name, mime::guess_mime(path), bytes))
}

/// Prints row changes and notices until the job set settles or `timeout` passes.
fn watch(controller: &JobController, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    let mut shown: HashMap<JobId, (JobStatus, u8)> = HashMap::new();
    loop {
        let settled = controller.wait_until_settled(POLL_INTERVAL);
        let view = controller.snapshot();
        if view.dirty {
            print_changes(&view, &mut shown);
        }
        for notice in controller.take_notices() {
            eprintln!("{}", notice.message);
        }
        if settled {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
    }
}

fn print_changes(view: &AppViewModel, shown: &mut HashMap<JobId, (JobStatus, u8)>) {
    let mut rows: Vec<&JobRowView> = view.jobs.iter().collect();
    rows.sort_by_key(|row| row.job_id);
    for row in rows {
        let current = (row.status, row.progress);
        if shown.insert(row.job_id, current) == Some(current) {
            continue;
        }
        match (row.status, row.result_size) {
            (JobStatus::Succeeded, Some(result_size)) => println!(
                "[{:>3}%] {} ({}) {} -> {} (-{:.0}%)",
                row.progress,
                row.name,
                row.family.label(),
                format_bytes(row.source_size),
                format_bytes(result_size),
                row.savings_percent.unwrap_or(0.0)
            ),
            _ => println!(
                "[{:>3}%] {} ({}) {}",
                row.progress,
                row.name,
                row.family.label(),
                status_label(row.status)
            ),
        }
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
