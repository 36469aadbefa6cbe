use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, job_debug};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::bundle::{cached_bundle_path, download_bundle};
use super::{CodecLoader, CodecUnavailable, MediaKind, TranscodeError, Transcoder};
use crate::{CodecSettings, ProgressReporter, SourceFile};

const PATH_PROGRAM: &str = "ffmpeg";
const LOG_TAIL_LINES: usize = 12;
/// Progress stays below this until the output has been read back.
const MAX_RUNNING_FRACTION: f64 = 0.99;

/// Resolves a working ffmpeg: explicit path, cached bundle, downloaded bundle,
/// then `PATH`. Each candidate must answer `-version` successfully.
pub struct FfmpegLoader {
    settings: CodecSettings,
}

impl FfmpegLoader {
    pub fn new(settings: CodecSettings) -> Self {
        Self { settings }
    }

    async fn resolve(&self) -> Result<PathBuf, CodecUnavailable> {
        let mut reasons = Vec::new();

        if let Some(path) = &self.settings.ffmpeg_path {
            match probe(path).await {
                Ok(()) => return Ok(path.clone()),
                Err(reason) => reasons.push(reason),
            }
        }

        let cached = cached_bundle_path(&self.settings);
        if cached.is_file() {
            match probe(&cached).await {
                Ok(()) => return Ok(cached),
                Err(reason) => reasons.push(reason),
            }
        }

        if let Some(url) = &self.settings.bundle_url {
            engine_info!("downloading codec bundle from {}", url);
            match download_bundle(&self.settings, url).await {
                Ok(path) => match probe(&path).await {
                    Ok(()) => return Ok(path),
                    Err(reason) => reasons.push(reason),
                },
                Err(err) => reasons.push(err.reason),
            }
        }

        if self.settings.search_path {
            let program = PathBuf::from(PATH_PROGRAM);
            match probe(&program).await {
                Ok(()) => return Ok(program),
                Err(reason) => reasons.push(reason),
            }
        }

        if reasons.is_empty() {
            reasons.push("no ffmpeg source configured".to_string());
        }
        Err(CodecUnavailable::new(reasons.join("; ")))
    }
}

#[async_trait::async_trait]
impl CodecLoader for FfmpegLoader {
    async fn load(&self) -> Result<Arc<dyn Transcoder>, CodecUnavailable> {
        let program = self.resolve().await?;
        engine_info!("using ffmpeg at {:?}", program);
        Ok(Arc::new(FfmpegTranscoder::new(program, &self.settings)))
    }
}

async fn probe(program: &Path) -> Result<(), String> {
    let status = Command::new(program)
        .arg("-version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|err| format!("{}: {err}", program.display()))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{}: -version exited with {status}", program.display()))
    }
}

/// Runs one ffmpeg process per job inside a private temporary directory.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    audio_bitrate_kbps: u32,
    video_crf: u8,
}

impl FfmpegTranscoder {
    pub fn new(program: PathBuf, settings: &CodecSettings) -> Self {
        Self {
            program,
            audio_bitrate_kbps: settings.audio_bitrate_kbps,
            video_crf: settings.video_crf,
        }
    }

    /// Codec arguments for the output; the container always matches the input.
    pub fn codec_arguments(&self, kind: MediaKind, extension: &str) -> Vec<String> {
        let crf = self.video_crf.to_string();
        let args: Vec<String> = match kind {
            MediaKind::Audio => vec!["-b:a".into(), format!("{}k", self.audio_bitrate_kbps)],
            MediaKind::Video if extension == "webm" => vec![
                "-c:v".into(),
                "libvpx-vp9".into(),
                "-crf".into(),
                crf,
                "-b:v".into(),
                "0".into(),
                "-deadline".into(),
                "realtime".into(),
                "-cpu-used".into(),
                "8".into(),
                "-c:a".into(),
                "libopus".into(),
            ],
            MediaKind::Video => vec![
                "-c:v".into(),
                "libx264".into(),
                "-crf".into(),
                crf,
                "-preset".into(),
                "ultrafast".into(),
                "-c:a".into(),
                "aac".into(),
            ],
        };
        args
    }
}

#[async_trait::async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        file: &SourceFile,
        kind: MediaKind,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, TranscodeError> {
        let workdir = tempfile::tempdir()?;
        let extension = match file.extension() {
            ext if !ext.is_empty() => ext,
            _ => default_extension(kind).to_string(),
        };
        let input = workdir.path().join(format!("input.{extension}"));
        let output = workdir.path().join(format!("output.{extension}"));
        tokio::fs::write(&input, &file.bytes).await?;

        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            input.clone().into(),
        ];
        args.extend(self.codec_arguments(kind, &extension).into_iter().map(OsString::from));
        args.extend(["-progress", "pipe:1", "-nostats"].map(OsString::from));
        args.push(output.clone().into());

        job_debug!(progress.job_id(), "ffmpeg {:?}", args);
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(TranscodeError::Spawn)?;

        let duration_us = Arc::new(AtomicU64::new(0));
        let stderr_task = child.stderr.take().map(|stderr| {
            let duration_us = duration_us.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                let mut tail = std::collections::VecDeque::with_capacity(LOG_TAIL_LINES);
                while let Ok(Some(line)) = lines.next_line().await {
                    if let Some(us) = parse_duration_us(&line) {
                        duration_us.store(us, Ordering::Release);
                    }
                    if tail.len() == LOG_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
                Vec::from(tail).join("\n")
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines.next_line().await? {
                let Some(position) = parse_out_time_us(&line) else {
                    continue;
                };
                let total = duration_us.load(Ordering::Acquire);
                if total > 0 {
                    let fraction = (position as f64 / total as f64).min(MAX_RUNNING_FRACTION);
                    progress.report_fraction(fraction);
                }
            }
        }

        let status = child.wait().await?;
        let log_tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        if !status.success() {
            return Err(TranscodeError::Exit {
                status: status.to_string(),
                log_tail,
            });
        }
        engine_debug!("ffmpeg finished for {:?}", file.name);
        Ok(tokio::fs::read(&output).await?)
    }
}

fn default_extension(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "mp3",
        MediaKind::Video => "mp4",
    }
}

/// Parses `Duration: HH:MM:SS.ss` from an ffmpeg log line.
fn parse_duration_us(line: &str) -> Option<u64> {
    let rest = line.trim_start().strip_prefix("Duration:")?.trim_start();
    let stamp = rest.split(',').next()?.trim();
    let mut parts = stamp.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    let total = (hours * 3600.0 + minutes * 60.0 + seconds) * 1_000_000.0;
    (total > 0.0).then_some(total as u64)
}

/// Parses the encoder position from a `-progress` line. Both keys carry microseconds.
fn parse_out_time_us(line: &str) -> Option<u64> {
    let (key, value) = line.split_once('=')?;
    match key.trim() {
        "out_time_us" | "out_time_ms" => value.trim().parse().ok(),
        _ => None,
    }
}
