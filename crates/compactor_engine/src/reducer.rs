use std::sync::Arc;

use compactor_core::Family;

use crate::reducers::{ArchiveReducer, CodeReducer, ImageReducer, MediaReducer, PdfReducer};
use crate::{CodecRuntime, EngineSettings, MediaKind, ProgressReporter, ReduceError, SourceFile};

/// One size-reduction strategy. Implementations report progress at least once
/// and report 100 before returning `Ok`.
#[async_trait::async_trait]
pub trait Reducer: Send + Sync {
    async fn reduce(
        &self,
        file: &SourceFile,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, ReduceError>;
}

/// Strategy map from family to reducer. Every family always has an entry.
#[derive(Clone)]
pub struct ReducerRegistry {
    image: Arc<dyn Reducer>,
    code: Arc<dyn Reducer>,
    pdf: Arc<dyn Reducer>,
    archive: Arc<dyn Reducer>,
    audio: Arc<dyn Reducer>,
    video: Arc<dyn Reducer>,
}

impl ReducerRegistry {
    /// Standard reducers, with media jobs sharing the process-wide codec runtime.
    pub fn standard(settings: &EngineSettings) -> Self {
        Self::with_codec_runtime(settings, CodecRuntime::shared(&settings.codec))
    }

    pub fn with_codec_runtime(settings: &EngineSettings, runtime: Arc<CodecRuntime>) -> Self {
        Self {
            image: Arc::new(ImageReducer::new(settings.image.clone())),
            code: Arc::new(CodeReducer),
            pdf: Arc::new(PdfReducer),
            archive: Arc::new(ArchiveReducer),
            audio: Arc::new(MediaReducer::new(
                MediaKind::Audio,
                runtime.clone(),
                settings.simulation.clone(),
            )),
            video: Arc::new(MediaReducer::new(
                MediaKind::Video,
                runtime,
                settings.simulation.clone(),
            )),
        }
    }

    /// Replaces the reducer for one family.
    pub fn with_reducer(mut self, family: Family, reducer: Arc<dyn Reducer>) -> Self {
        *self.slot_mut(family) = reducer;
        self
    }

    pub fn get(&self, family: Family) -> Arc<dyn Reducer> {
        match family {
            Family::Image => self.image.clone(),
            Family::Code => self.code.clone(),
            Family::Pdf => self.pdf.clone(),
            Family::Archive => self.archive.clone(),
            Family::Audio => self.audio.clone(),
            Family::Video => self.video.clone(),
        }
    }

    fn slot_mut(&mut self, family: Family) -> &mut Arc<dyn Reducer> {
        match family {
            Family::Image => &mut self.image,
            Family::Code => &mut self.code,
            Family::Pdf => &mut self.pdf,
            Family::Archive => &mut self.archive,
            Family::Audio => &mut self.audio,
            Family::Video => &mut self.video,
        }
    }
}
