//! Input discovery and bounded parallel dispatch of file pipelines.
//!
//! One pipeline run per file, at most `max_workers` running at once to
//! respect provider rate limits. Failures are isolated per file: a file
//! whose run fails outright is logged and counted, and the rest of the
//! batch proceeds.

use crate::config::Config;
use crate::models::PipelineOutcome;
use crate::pipeline::FilePipeline;
use futures::stream::{self, StreamExt};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug)]
pub struct FileFailure {
    pub file_name: String,
    pub reason: String,
}

/// Partial result set for one batch: every completed outcome, plus the
/// files whose run failed to produce output.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<PipelineOutcome>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }
}

pub struct BatchRunner {
    pipeline: Arc<FilePipeline>,
    max_workers: usize,
    file_extensions: Vec<String>,
    max_file_size: usize,
}

impl BatchRunner {
    pub fn new(pipeline: Arc<FilePipeline>, config: &Config) -> Self {
        Self {
            pipeline,
            max_workers: config.max_workers.max(1),
            file_extensions: config
                .file_extensions
                .iter()
                .map(|e| e.to_lowercase())
                .collect(),
            max_file_size: config.max_file_size,
        }
    }

    /// Discovers input files and runs the pipeline over each of them with
    /// bounded concurrency. Outcome order follows completion, not
    /// discovery; results are independent.
    pub async fn run(&self, input_dir: &Path, output_dir: &Path) -> anyhow::Result<BatchReport> {
        let files = self.discover_files(input_dir)?;
        if files.is_empty() {
            warn!(input = %input_dir.display(), "no matching input files found");
            return Ok(BatchReport::default());
        }
        info!(count = files.len(), input = %input_dir.display(), "processing input files");

        let results: Vec<Result<PipelineOutcome, FileFailure>> = stream::iter(files)
            .map(|path| {
                let pipeline = Arc::clone(&self.pipeline);
                async move { run_one(&pipeline, &path, output_dir).await }
            })
            .buffer_unordered(self.max_workers)
            .collect()
            .await;

        let mut report = BatchReport::default();
        for result in results {
            match result {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(failure) => {
                    error!(
                        file = %failure.file_name,
                        reason = %failure.reason,
                        "file processing failed"
                    );
                    report.failures.push(failure);
                }
            }
        }

        info!(
            processed = report.outcomes.len(),
            failed = report.failed_count(),
            "batch finished"
        );
        Ok(report)
    }

    fn discover_files(&self, input_dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for result in WalkBuilder::new(input_dir).standard_filters(true).build() {
            let entry = result?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if !self.matches_extension(path) {
                continue;
            }
            let metadata = std::fs::metadata(path)?;
            if metadata.len() > self.max_file_size as u64 {
                warn!(file = %path.display(), size = metadata.len(), "skipping oversized file");
                continue;
            }
            files.push(path.to_path_buf());
        }
        files.sort();
        Ok(files)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        if self.file_extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.file_extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }
}

async fn run_one(
    pipeline: &FilePipeline,
    path: &Path,
    output_dir: &Path,
) -> Result<PipelineOutcome, FileFailure> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string();

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FileFailure {
            file_name: file_name.clone(),
            reason: format!("unreadable input: {e}"),
        })?;

    pipeline
        .process_file(&file_name, &content, output_dir)
        .await
        .map_err(|e| FileFailure {
            file_name,
            reason: e.to_string(),
        })
}
