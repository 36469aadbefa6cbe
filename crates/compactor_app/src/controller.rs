use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use compactor_core::{
    update, AppState, AppViewModel, CompressionStats, Download, Effect, JobId, Msg, Notice,
    RawFile, ReduceOutcome,
};
use compactor_engine::{EngineEvent, EngineEvents, EngineHandle, EngineSettings};
use engine_logging::{engine_debug, engine_info, job_info, job_warn};

#[derive(Default)]
struct SharedState {
    state: AppState,
    notices: Vec<Notice>,
}

struct Shared {
    inner: Mutex<SharedState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one message through `update` with the lock held. Notices are queued
    /// here; every other effect goes back to the caller.
    fn dispatch(&self, msg: Msg) -> Vec<Effect> {
        let remaining = {
            let mut guard = self.lock();
            let state = std::mem::take(&mut guard.state);
            let (state, effects) = update(state, msg);
            guard.state = state;

            let mut remaining = Vec::new();
            for effect in effects {
                match effect {
                    Effect::Notify(notice) => {
                        job_info!(notice.job_id, "{}", notice.message);
                        guard.notices.push(notice);
                    }
                    other => remaining.push(other),
                }
            }
            remaining
        };
        self.changed.notify_all();
        remaining
    }
}

/// Binds the pure job state to the engine. Submission returns as soon as the
/// jobs are dispatched; engine events are applied by a background thread, so
/// reads always see the latest state without polling.
pub struct JobController {
    shared: Arc<Shared>,
    engine: EngineHandle,
}

impl JobController {
    pub fn new(settings: &EngineSettings) -> std::io::Result<Self> {
        Self::with_engine(EngineHandle::new(settings)?)
    }

    pub fn with_engine(engine: EngineHandle) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            inner: Mutex::new(SharedState::default()),
            changed: Condvar::new(),
        });
        spawn_event_loop(shared.clone(), engine.events())?;
        Ok(Self { shared, engine })
    }

    /// Creates one running job per file and hands them to the engine. Ids come
    /// back in input order.
    pub fn submit(&self, files: Vec<RawFile>) -> Vec<JobId> {
        let effects = self.shared.dispatch(Msg::FilesSubmitted(files));
        let mut ids = Vec::with_capacity(effects.len());
        for effect in effects {
            if let Effect::Reduce {
                job_id,
                family,
                file,
            } = effect
            {
                job_info!(job_id, "dispatching {:?} as {}", file.name, family.label());
                self.engine.enqueue(job_id, family, file);
                ids.push(job_id);
            }
        }
        ids
    }

    /// Removes every job. Jobs still running keep going in the engine, but their
    /// results are dropped on arrival.
    pub fn clear_all(&self) {
        self.shared.dispatch(Msg::ClearAllClicked);
        engine_info!("cleared all jobs");
    }

    /// Current read model. `dirty` reports whether anything changed since the
    /// previous snapshot.
    pub fn snapshot(&self) -> AppViewModel {
        let mut guard = self.shared.lock();
        let view = guard.state.view();
        guard.state.consume_dirty();
        view
    }

    pub fn stats(&self) -> CompressionStats {
        self.shared.lock().state.stats()
    }

    pub fn download(&self, job_id: JobId) -> Option<Download> {
        self.shared.lock().state.download(job_id)
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.shared.lock().notices)
    }

    /// Blocks until no job is running or `timeout` elapses. Returns whether the
    /// job set settled.
    pub fn wait_until_settled(&self, timeout: Duration) -> bool {
        let guard = self.shared.lock();
        let (guard, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |shared| shared.state.has_running_jobs())
            .unwrap_or_else(PoisonError::into_inner);
        !guard.state.has_running_jobs()
    }
}

fn spawn_event_loop(shared: Arc<Shared>, events: EngineEvents) -> std::io::Result<()> {
    thread::Builder::new()
        .name("compactor-events".into())
        .spawn(move || {
            while let Some(event) = events.recv() {
                let msg = to_msg(event);
                let leftover = shared.dispatch(msg);
                if !leftover.is_empty() {
                    engine_debug!("ignoring {} effects raised by engine events", leftover.len());
                }
            }
            engine_debug!("engine event stream closed");
        })?;
    Ok(())
}

fn to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Progress(progress) => Msg::JobProgress {
            job_id: progress.job_id,
            percent: progress.percent,
        },
        EngineEvent::JobCompleted { job_id, result } => Msg::JobFinished {
            job_id,
            outcome: match result {
                Ok(bytes) => ReduceOutcome::Reduced(bytes),
                Err(err) => {
                    job_warn!(job_id, "reducer fault: {}", err);
                    ReduceOutcome::Faulted {
                        detail: err.to_string(),
                    }
                }
            },
        },
    }
}
