use bytes::Bytes;
use lopdf::Document;

use crate::{ProgressReporter, ReduceError, Reducer, SourceFile};

/// Rewrites the document structure: unreferenced objects and empty streams are
/// dropped, object numbers compacted and streams deflated. Embedded images and
/// fonts are left as they are.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfReducer;

#[async_trait::async_trait]
impl Reducer for PdfReducer {
    async fn reduce(
        &self,
        file: &SourceFile,
        progress: &ProgressReporter<'_>,
    ) -> Result<Vec<u8>, ReduceError> {
        progress.report(30);
        let bytes = file.bytes.clone();
        let output =
            tokio::task::spawn_blocking(move || compact(&bytes).and_then(serialize)).await??;
        progress.report(100);
        Ok(output)
    }
}

fn compact(bytes: &Bytes) -> Result<Document, ReduceError> {
    let mut document =
        Document::load_mem(bytes).map_err(|err| ReduceError::Pdf(err.to_string()))?;
    if document.is_encrypted() {
        return Err(ReduceError::Pdf("document is encrypted".to_string()));
    }
    document.prune_objects();
    document.delete_zero_length_streams();
    document.renumber_objects();
    document.compress();
    Ok(document)
}

fn serialize(mut document: Document) -> Result<Vec<u8>, ReduceError> {
    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|err| ReduceError::Pdf(err.to_string()))?;
    Ok(output)
}
