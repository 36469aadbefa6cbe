use std::io::Write as _;
use std::path::{Path, PathBuf};

use engine_logging::engine_info;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::CodecUnavailable;
use crate::{ensure_output_dir, CodecSettings};

/// Name of the cached runtime inside `cache_dir`.
pub(super) const BUNDLE_FILE_NAME: &str = if cfg!(windows) {
    "ffmpeg.exe"
} else {
    "ffmpeg"
};

pub(super) fn cached_bundle_path(settings: &CodecSettings) -> PathBuf {
    settings.cache_dir.join(BUNDLE_FILE_NAME)
}

/// Streams the runtime from `url` into the cache, enforcing the size limit and
/// the optional checksum before anything lands at the final path.
pub(super) async fn download_bundle(
    settings: &CodecSettings,
    url: &str,
) -> Result<PathBuf, CodecUnavailable> {
    let client = reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.download_timeout)
        .build()
        .map_err(|err| unavailable("http client", err))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| unavailable("download", err))?;
    let status = response.status();
    if !status.is_success() {
        return Err(CodecUnavailable::new(format!("download: http status {status}")));
    }
    if let Some(len) = response.content_length() {
        if len > settings.max_bundle_bytes {
            return Err(too_large(settings.max_bundle_bytes, len));
        }
    }

    let mut hasher = Sha256::new();
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|err| unavailable("download", err))?;
        let next_len = bytes.len() as u64 + chunk.len() as u64;
        if next_len > settings.max_bundle_bytes {
            return Err(too_large(settings.max_bundle_bytes, next_len));
        }
        hasher.update(&chunk);
        bytes.extend_from_slice(&chunk);
    }

    if let Some(expected) = settings.bundle_sha256.as_deref() {
        let actual = to_hex(&hasher.finalize());
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(CodecUnavailable::new(format!(
                "bundle checksum mismatch: expected {expected}, got {actual}"
            )));
        }
    }

    let cache_dir = settings.cache_dir.clone();
    let target = cached_bundle_path(settings);
    let written = tokio::task::spawn_blocking(move || store(&cache_dir, &target, &bytes))
        .await
        .map_err(|err| unavailable("cache write", err))??;
    engine_info!("codec bundle cached at {:?}", written);
    Ok(written)
}

fn store(cache_dir: &Path, target: &Path, bytes: &[u8]) -> Result<PathBuf, CodecUnavailable> {
    ensure_output_dir(cache_dir).map_err(|err| unavailable("cache dir", err))?;
    let mut tmp = NamedTempFile::new_in(cache_dir).map_err(|err| unavailable("cache write", err))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.flush())
        .map_err(|err| unavailable("cache write", err))?;
    mark_executable(tmp.path()).map_err(|err| unavailable("cache write", err))?;
    tmp.persist(target)
        .map_err(|err| unavailable("cache write", err.error))?;
    Ok(target.to_path_buf())
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn unavailable(stage: &str, err: impl std::fmt::Display) -> CodecUnavailable {
    CodecUnavailable::new(format!("{stage}: {err}"))
}

fn too_large(max: u64, actual: u64) -> CodecUnavailable {
    CodecUnavailable::new(format!("bundle too large (max {max}, actual {actual})"))
}

fn to_hex(digest: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
