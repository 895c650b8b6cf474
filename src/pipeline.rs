//! The per-file decision pipeline.
//!
//! Drives the analysis services in a fixed sequence over one file, branching
//! on the detected license type, and persists the artifacts. No single
//! service failure aborts the run: degradations coalesce into safe defaults
//! here, at the call sites, so the failure policy is auditable in one
//! place. Only a writer I/O failure or a record invariant violation is
//! fatal for the file.

use crate::config::AnalysisConfig;
use crate::copyright::CopyrightExtractor;
use crate::functions::{FunctionCounter, SignatureExtractor};
use crate::license::LicenseClassifier;
use crate::llm::LlmGateway;
use crate::models::{
    FileAnalysisRecord, FunctionsArtifact, LicenseType, PipelineOutcome, RecordInvariantError,
};
use crate::safety::{SafetyCache, SafetyChecker};
use crate::translate::CodeTranslator;
use crate::writer::{ResultWriter, WriterError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Writer(#[from] WriterError),
    #[error(transparent)]
    Invariant(#[from] RecordInvariantError),
}

pub struct FilePipeline {
    license: LicenseClassifier,
    copyright: CopyrightExtractor,
    counter: FunctionCounter,
    extractor: SignatureExtractor,
    translator: CodeTranslator,
    safety: Option<SafetyChecker>,
    writer: ResultWriter,
    translation_threshold: usize,
    translation_suffix: String,
    translation_extension: String,
}

impl FilePipeline {
    pub fn new(gateway: Arc<dyn LlmGateway>, analysis: &AnalysisConfig) -> Self {
        Self::with_safety_cache(gateway, analysis, Arc::new(SafetyCache::new()))
    }

    /// Like [`FilePipeline::new`], but sharing a caller-owned safety cache
    /// so parallel batch runs reuse each other's verdicts.
    pub fn with_safety_cache(
        gateway: Arc<dyn LlmGateway>,
        analysis: &AnalysisConfig,
        cache: Arc<SafetyCache>,
    ) -> Self {
        let safety = analysis
            .safety_check
            .then(|| SafetyChecker::new(Arc::clone(&gateway), cache));
        Self {
            license: LicenseClassifier::new(Arc::clone(&gateway)),
            copyright: CopyrightExtractor::new(Arc::clone(&gateway)),
            counter: FunctionCounter::new(Arc::clone(&gateway)),
            extractor: SignatureExtractor::new(Arc::clone(&gateway)),
            translator: CodeTranslator::new(Arc::clone(&gateway), &analysis.target_language),
            safety,
            writer: ResultWriter::new(),
            translation_threshold: analysis.translation_threshold,
            translation_suffix: format!("{}_functions", analysis.target_language),
            translation_extension: analysis.target_extension.clone(),
        }
    }

    /// Runs the full decision sequence for one file and persists its
    /// artifacts. Always writes the `{stem}_analysis.json` artifact, no
    /// matter which branch ran or how far the stages degraded.
    pub async fn process_file(
        &self,
        file_name: &str,
        file_content: &str,
        output_dir: &Path,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut artifacts: Vec<PathBuf> = Vec::new();

        if let Some(safety) = &self.safety {
            let verdict = safety.check(file_content).await;
            if !verdict.is_safe {
                warn!(
                    file = file_name,
                    reason = %verdict.reason,
                    severity = %verdict.severity,
                    "content flagged unsafe, skipping analysis"
                );
                let record = FileAnalysisRecord::new(
                    file_name,
                    "Unknown",
                    "Unknown License",
                    LicenseType::Unknown,
                )
                .finalize()?;
                let path =
                    self.writer
                        .save_structured(&record, output_dir, file_name, "analysis")?;
                artifacts.push(path);
                return Ok(PipelineOutcome { record, artifacts });
            }
        }

        let (license_type, license_name) = match self.license.classify(file_content).await {
            Ok(verdict) => (verdict.license_type, verdict.license_name),
            Err(e) => {
                warn!(file = file_name, error = %e, "license classification failed, defaulting to UNKNOWN");
                (LicenseType::Unknown, "Unknown License".to_string())
            }
        };

        let copyright_holder = match self.copyright.extract(file_content).await {
            Ok(holder) => holder,
            Err(e) => {
                warn!(file = file_name, error = %e, "copyright extraction failed, defaulting to Unknown");
                "Unknown".to_string()
            }
        };

        let mut record =
            FileAnalysisRecord::new(file_name, copyright_holder, license_name, license_type);

        match license_type {
            LicenseType::Permissive => {
                info!(file = file_name, "processing permissive license file");

                match self.counter.count(file_content).await {
                    Ok(count) => record.function_count = Some(count),
                    Err(e) => {
                        warn!(file = file_name, error = %e, "function counting failed")
                    }
                }

                match self.extractor.extract(file_content).await {
                    Ok(functions) => {
                        if !functions.is_empty() {
                            let path = self.writer.save_structured(
                                &FunctionsArtifact {
                                    file_name,
                                    functions: &functions,
                                },
                                output_dir,
                                file_name,
                                "functions",
                            )?;
                            artifacts.push(path);
                        }
                        record.functions = Some(functions);
                    }
                    Err(e) => {
                        warn!(file = file_name, error = %e, "signature extraction failed")
                    }
                }
            }
            LicenseType::Copyleft => {
                info!(file = file_name, "processing copyleft license file");

                // A failed count leaves nothing to branch on; finalize with
                // only license and copyright recorded.
                match self.counter.count(file_content).await {
                    Err(e) => {
                        warn!(file = file_name, error = %e, "function counting failed, skipping copyleft branch")
                    }
                    Ok(count) => {
                        record.function_count = Some(count);

                        if count > self.translation_threshold {
                            info!(
                                file = file_name,
                                count, "extracting function signatures"
                            );
                            // Signatures go to the artifact only: the count
                            // above came from an independent call and the
                            // two may legitimately disagree.
                            match self.extractor.extract(file_content).await {
                                Ok(functions) if !functions.is_empty() => {
                                    let path = self.writer.save_structured(
                                        &FunctionsArtifact {
                                            file_name,
                                            functions: &functions,
                                        },
                                        output_dir,
                                        file_name,
                                        "functions",
                                    )?;
                                    artifacts.push(path);
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    warn!(file = file_name, error = %e, "signature extraction failed")
                                }
                            }
                        } else {
                            info!(
                                file = file_name,
                                count, "rewriting into the translation target"
                            );
                            match self.translator.translate(file_content).await {
                                Ok(code) => {
                                    let path = self.writer.save_text(
                                        &code,
                                        output_dir,
                                        file_name,
                                        &self.translation_suffix,
                                        &self.translation_extension,
                                    )?;
                                    artifacts.push(path);
                                    record.translated_code = Some(code);
                                }
                                Err(e) => {
                                    warn!(file = file_name, error = %e, "translation failed, no artifact written")
                                }
                            }
                        }
                    }
                }
            }
            LicenseType::Proprietary | LicenseType::Unknown => {
                info!(
                    file = file_name,
                    ?license_type,
                    "no extraction for this license type"
                );
            }
        }

        let record = record.finalize()?;
        let path = self
            .writer
            .save_structured(&record, output_dir, file_name, "analysis")?;
        artifacts.push(path);

        Ok(PipelineOutcome { record, artifacts })
    }
}
