//! Shared media codec runtime.
//!
//! The runtime is expensive to acquire (it may have to be downloaded), so it is
//! loaded lazily, at most once, and shared by every media job. Concurrent first
//! users wait on the same in-flight load and all observe its outcome. A failed
//! load is final for the lifetime of the runtime.
mod bundle;
mod ffmpeg;

use std::sync::{Arc, OnceLock};

use engine_logging::{engine_info, engine_warn};
use tokio::sync::OnceCell;

use crate::{CodecSettings, ProgressReporter, SourceFile};

pub use ffmpeg::{FfmpegLoader, FfmpegTranscoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

/// The codec runtime could not be made available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("codec runtime unavailable: {reason}")]
pub struct CodecUnavailable {
    pub reason: String,
}

impl CodecUnavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to start codec: {0}")]
    Spawn(std::io::Error),
    #[error("codec exited with {status}: {log_tail}")]
    Exit { status: String, log_tail: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(
        &self,
        file: &SourceFile,
        kind: MediaKind,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, TranscodeError>;
}

#[async_trait::async_trait]
pub trait CodecLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn Transcoder>, CodecUnavailable>;
}

pub struct CodecRuntime {
    loader: Box<dyn CodecLoader>,
    state: OnceCell<Result<Arc<dyn Transcoder>, CodecUnavailable>>,
}

static SHARED: OnceLock<Arc<CodecRuntime>> = OnceLock::new();

impl CodecRuntime {
    pub fn new(loader: Box<dyn CodecLoader>) -> Self {
        Self {
            loader,
            state: OnceCell::new(),
        }
    }

    /// Process-wide runtime backed by ffmpeg. The first caller's settings win.
    pub fn shared(settings: &CodecSettings) -> Arc<CodecRuntime> {
        SHARED
            .get_or_init(|| {
                Arc::new(CodecRuntime::new(Box::new(FfmpegLoader::new(
                    settings.clone(),
                ))))
            })
            .clone()
    }

    /// Loads on first use; later and concurrent callers share that result.
    pub async fn transcoder(&self) -> Result<Arc<dyn Transcoder>, CodecUnavailable> {
        self.state
            .get_or_init(|| async {
                match self.loader.load().await {
                    Ok(transcoder) => {
                        engine_info!("codec runtime ready");
                        Ok(transcoder)
                    }
                    Err(err) => {
                        engine_warn!("{}; media will pass through unchanged", err);
                        Err(err)
                    }
                }
            })
            .await
            .clone()
    }

    /// Whether a load has completed, successfully or not.
    pub fn is_settled(&self) -> bool {
        self.state.initialized()
    }
}
