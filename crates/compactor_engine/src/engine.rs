use std::sync::{mpsc, Arc, Mutex, PoisonError, TryLockError};
use std::thread;
use std::time::Duration;

use compactor_core::Family;
use engine_logging::{job_info, job_warn};

use crate::progress::ChannelProgressSink;
use crate::{
    EngineEvent, EngineSettings, JobId, ProgressReporter, ReduceError, Reducer, ReducerRegistry,
    SourceFile,
};

enum EngineCommand {
    Reduce {
        job_id: JobId,
        family: Family,
        file: SourceFile,
    },
}

/// Runs reducers on a background tokio runtime. Jobs run concurrently; each one
/// reports progress and exactly one completion on the event channel.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    events: EngineEvents,
}

/// Shared receiving end of the engine's event channel. Only one caller blocks
/// in `recv` or `recv_timeout` at a time; `try_recv` never waits for it.
#[derive(Clone)]
pub struct EngineEvents {
    rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineEvents {
    /// Blocks until an event arrives; `None` once the engine is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.lock().recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.lock().recv_timeout(timeout).ok()
    }

    /// Returns `None` without waiting when the queue is empty or another
    /// caller is currently blocked receiving.
    pub fn try_recv(&self) -> Option<EngineEvent> {
        match self.rx.try_lock() {
            Ok(rx) => rx.try_recv().ok(),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().try_recv().ok(),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, mpsc::Receiver<EngineEvent>> {
        self.rx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EngineHandle {
    pub fn new(settings: &EngineSettings) -> std::io::Result<Self> {
        Self::with_registry(ReducerRegistry::standard(settings))
    }

    pub fn with_registry(registry: ReducerRegistry) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("compactor-engine")
            .build()?;

        thread::Builder::new()
            .name("compactor-dispatch".into())
            .spawn(move || {
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::Reduce {
                            job_id,
                            family,
                            file,
                        } => {
                            let reducer = registry.get(family);
                            let event_tx = event_tx.clone();
                            runtime.spawn(run_job(reducer, job_id, family, file, event_tx));
                        }
                    }
                }
            })?;

        Ok(Self {
            cmd_tx,
            events: EngineEvents {
                rx: Arc::new(Mutex::new(event_rx)),
            },
        })
    }

    pub fn enqueue(&self, job_id: JobId, family: Family, file: impl Into<SourceFile>) {
        let _ = self.cmd_tx.send(EngineCommand::Reduce {
            job_id,
            family,
            file: file.into(),
        });
    }

    pub fn events(&self) -> EngineEvents {
        self.events.clone()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.events.try_recv()
    }
}

async fn run_job(
    reducer: Arc<dyn Reducer>,
    job_id: JobId,
    family: Family,
    file: SourceFile,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    job_info!(
        job_id,
        "reducing {:?} ({} bytes) as {}",
        file.name,
        file.size(),
        family.label()
    );
    let progress_tx = event_tx.clone();
    // A panicking reducer surfaces here as a join error instead of a lost job.
    let worker = tokio::spawn(async move {
        let sink = ChannelProgressSink::new(progress_tx);
        let progress = ProgressReporter::new(job_id, &sink);
        reducer.reduce(&file, &progress).await
    });
    let result = worker.await.unwrap_or_else(|err| Err(ReduceError::from(err)));
    match &result {
        Ok(bytes) => job_info!(job_id, "reducer produced {} bytes", bytes.len()),
        Err(err) => job_warn!(job_id, "reducer failed: {}", err),
    }
    let _ = event_tx.send(EngineEvent::JobCompleted { job_id, result });
}
