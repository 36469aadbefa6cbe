use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("invalid file name: {0:?}")]
    FileName(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` if needed and checks that files can be created inside it.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    NamedTempFile::new_in(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    Ok(())
}

/// Writes whole files into one directory through a temp file and a rename, so a
/// reader never observes a partially written result.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Writes `{dir}/{filename}`, replacing any existing file.
    pub fn write(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let target = self.target(filename)?;
        self.persist(&target, content)?;
        Ok(target)
    }

    /// Like [`write`](Self::write) but never replaces an existing file: a
    /// taken name gets a ` (n)` suffix before its extension.
    pub fn write_new(&self, filename: &str, content: &[u8]) -> Result<PathBuf, PersistError> {
        let mut target = self.target(filename)?;
        let (stem, extension) = split_name(filename);
        let mut counter = 1;
        while target.exists() {
            target = self.dir.join(format!("{stem} ({counter}){extension}"));
            counter += 1;
        }
        self.persist(&target, content)?;
        Ok(target)
    }

    fn target(&self, filename: &str) -> Result<PathBuf, PersistError> {
        let base = Path::new(filename)
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| *name == filename)
            .ok_or_else(|| PersistError::FileName(filename.to_string()))?;
        Ok(self.dir.join(base))
    }

    fn persist(&self, target: &Path, content: &[u8]) -> Result<(), PersistError> {
        ensure_output_dir(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;
        tmp.persist(target).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }
}

fn split_name(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => filename.split_at(idx),
        _ => (filename, ""),
    }
}
