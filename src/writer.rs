//! Artifact persistence.
//!
//! Output names derive from the input file name: `{stem}_{suffix}.{ext}`
//! with the original extension stripped. Any I/O failure wraps into
//! [`WriterError`], the only error class the pipeline treats as fatal for a
//! file's run.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriterError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize result for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Clone)]
pub struct ResultWriter;

impl ResultWriter {
    pub fn new() -> Self {
        Self
    }

    /// Serializes `value` as pretty-printed JSON into
    /// `{output_dir}/{stem}_{suffix}.json`, creating the directory if
    /// absent.
    pub fn save_structured<T: Serialize>(
        &self,
        value: &T,
        output_dir: &Path,
        base_name: &str,
        suffix: &str,
    ) -> Result<PathBuf, WriterError> {
        let path = artifact_path(output_dir, base_name, suffix, "json");
        let json = serde_json::to_string_pretty(value).map_err(|source| {
            WriterError::Serialize {
                path: path.clone(),
                source,
            }
        })?;
        self.write(&path, &json)?;
        Ok(path)
    }

    /// Writes raw text into `{output_dir}/{stem}_{suffix}.{extension}`,
    /// creating the directory if absent.
    pub fn save_text(
        &self,
        content: &str,
        output_dir: &Path,
        base_name: &str,
        suffix: &str,
        extension: &str,
    ) -> Result<PathBuf, WriterError> {
        let path = artifact_path(output_dir, base_name, suffix, extension);
        self.write(&path, content)?;
        Ok(path)
    }

    fn write(&self, path: &Path, content: &str) -> Result<(), WriterError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| WriterError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, content).map_err(|source| WriterError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn artifact_path(output_dir: &Path, base_name: &str, suffix: &str, extension: &str) -> PathBuf {
    let stem = Path::new(base_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base_name);
    output_dir.join(format!("{stem}_{suffix}.{extension}"))
}
