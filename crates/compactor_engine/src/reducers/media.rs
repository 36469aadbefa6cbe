use std::sync::Arc;

use engine_logging::{job_info, job_warn};

use crate::{
    CodecRuntime, MediaKind, ProgressReporter, ReduceError, Reducer, SimulationSettings, SourceFile,
};

/// Audio and video reducer. Transcodes through the shared codec runtime; when the
/// runtime is unavailable or the transcode fails, it walks the progress bar and
/// hands back the original bytes, which the size gate then rejects.
pub struct MediaReducer {
    kind: MediaKind,
    runtime: Arc<CodecRuntime>,
    simulation: SimulationSettings,
}

impl MediaReducer {
    pub fn new(
        kind: MediaKind,
        runtime: Arc<CodecRuntime>,
        simulation: SimulationSettings,
    ) -> Self {
        Self {
            kind,
            runtime,
            simulation,
        }
    }

    async fn pass_through(&self, file: &SourceFile, progress: &ProgressReporter<'_>) -> Vec<u8> {
        let steps = self.simulation.steps.max(1);
        for step in 0..=steps {
            progress.report((step * 100 / steps) as u8);
            if step < steps {
                tokio::time::sleep(self.simulation.step_delay).await;
            }
        }
        file.bytes.to_vec()
    }
}

#[async_trait::async_trait]
impl Reducer for MediaReducer {
    async fn reduce(
        &self,
        file: &SourceFile,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, ReduceError> {
        let job_id = progress.job_id();
        let transcoder = match self.runtime.transcoder().await {
            Ok(transcoder) => transcoder,
            Err(err) => {
                job_info!(job_id, "{}; passing {:?} through", err, file.name);
                return Ok(self.pass_through(file, progress).await);
            }
        };

        progress.report(0);
        match transcoder.transcode(file, self.kind, progress).await {
            Ok(bytes) => {
                progress.report(100);
                Ok(bytes)
            }
            Err(err) => {
                job_warn!(job_id, "transcode of {:?} failed: {}", file.name, err);
                Ok(self.pass_through(file, progress).await)
            }
        }
    }
}
