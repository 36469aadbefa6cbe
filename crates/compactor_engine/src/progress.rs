use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::{EngineEvent, JobId, JobProgress};

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Per-job progress handle passed into a reducer.
///
/// Values are clamped to `0..=100` and only forwarded when they exceed the
/// last forwarded value, so listeners always see a non-decreasing sequence.
pub struct ProgressReporter<'a> {
    job_id: JobId,
    sink: &'a dyn ProgressSink,
    last: AtomicU8,
    started: AtomicBool,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(job_id: JobId, sink: &'a dyn ProgressSink) -> Self {
        Self {
            job_id,
            sink,
            last: AtomicU8::new(0),
            started: AtomicBool::new(false),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let first = !self.started.swap(true, Ordering::AcqRel);
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        if first || percent > previous {
            self.sink.emit(EngineEvent::Progress(JobProgress {
                job_id: self.job_id,
                percent,
            }));
        }
    }

    /// Reports a fraction in `[0, 1]`; out-of-range and NaN values are clamped.
    pub fn report_fraction(&self, fraction: f64) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        self.report((fraction * 100.0).round() as u8);
    }

    /// Last value handed to the sink.
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<u8>>);

    impl ProgressSink for Recorder {
        fn emit(&self, event: EngineEvent) {
            if let EngineEvent::Progress(progress) = event {
                self.0.lock().unwrap().push(progress.percent);
            }
        }
    }

    #[test]
    fn forwards_only_increasing_values() {
        let sink = Recorder::default();
        let reporter = ProgressReporter::new(3, &sink);
        for value in [0, 10, 5, 10, 40, 200, 99] {
            reporter.report(value);
        }
        assert_eq!(*sink.0.lock().unwrap(), vec![0, 10, 40, 100]);
        assert_eq!(reporter.last(), 100);
    }

    #[test]
    fn fractions_are_scaled_and_clamped() {
        let sink = Recorder::default();
        let reporter = ProgressReporter::new(1, &sink);
        reporter.report_fraction(0.254);
        reporter.report_fraction(f64::NAN);
        reporter.report_fraction(3.0);
        assert_eq!(*sink.0.lock().unwrap(), vec![25, 100]);
    }
}
