use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::{ProgressReporter, ReduceError, Reducer, SourceFile};

const DEFLATE_LEVEL: i64 = 9;
const FALLBACK_ENTRY_NAME: &str = "file";

/// Wraps the file in a single-entry zip at maximum deflate level. Incompressible
/// inputs come back larger and are turned away by the size gate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveReducer;

#[async_trait::async_trait]
impl Reducer for ArchiveReducer {
    async fn reduce(
        &self,
        file: &SourceFile,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, ReduceError> {
        progress.report(40);
        let owned = file.clone();
        let zipped = tokio::task::spawn_blocking(move || zip_single(&owned)).await??;
        progress.report(100);
        Ok(zipped)
    }
}

fn zip_single(file: &SourceFile) -> Result<Vec<u8>, ReduceError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(DEFLATE_LEVEL));

    zip.start_file(entry_name(&file.name), options)
        .map_err(|err| ReduceError::Archive(err.to_string()))?;
    zip.write_all(&file.bytes)?;
    let cursor = zip
        .finish()
        .map_err(|err| ReduceError::Archive(err.to_string()))?;
    Ok(cursor.into_inner())
}

/// Base name only; directory parts never end up inside the archive.
fn entry_name(name: &str) -> &str {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if base.is_empty() {
        FALLBACK_ENTRY_NAME
    } else {
        base
    }
}
