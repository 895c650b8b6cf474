use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// License categories the classifier maps files into.
///
/// Adding a new category means adding a variant here; the pipeline branches
/// on this enum with an exhaustive `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LicenseType {
    Permissive,
    Copyleft,
    Proprietary,
    Unknown,
}

impl LicenseType {
    /// Maps a classifier reply onto a variant. Anything unrecognized
    /// classifies as `Unknown` rather than failing.
    pub fn from_label(label: &str) -> Self {
        match label {
            "PERMISSIVE" => LicenseType::Permissive,
            "COPYLEFT" => LicenseType::Copyleft,
            "PROPRIETARY" => LicenseType::Proprietary,
            _ => LicenseType::Unknown,
        }
    }
}

/// One extracted function: its name and how many real parameters it takes
/// (`self`/`cls`-style receivers excluded by the prompt contract).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub name: String,
    pub arg_count: usize,
}

#[derive(Debug, Error)]
#[error("function_count {count} does not match functions list length {len}")]
pub struct RecordInvariantError {
    pub count: usize,
    pub len: usize,
}

/// Accumulated analysis for one input file.
///
/// Created once at pipeline start, mutated as stages complete, then checked
/// and frozen by [`FileAnalysisRecord::finalize`] before it is handed to the
/// writer. Optional fields are omitted from JSON when unset, never emitted
/// as null. `translated_code` is an in-memory carry for callers inspecting
/// the outcome; the translation itself is persisted as a text artifact and
/// never appears in the analysis JSON.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysisRecord {
    pub file_name: String,
    pub copyright_holder: String,
    pub license_name: String,
    pub license_type: LicenseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<FunctionSignature>>,
    #[serde(skip)]
    pub translated_code: Option<String>,
}

impl FileAnalysisRecord {
    pub fn new(
        file_name: impl Into<String>,
        copyright_holder: impl Into<String>,
        license_name: impl Into<String>,
        license_type: LicenseType,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            copyright_holder: copyright_holder.into(),
            license_name: license_name.into(),
            license_type,
            function_count: None,
            functions: None,
            translated_code: None,
        }
    }

    /// Checks the count/list cardinality contract and freezes the record.
    ///
    /// A mismatch is a programming-contract violation, not a recoverable
    /// runtime condition: the pipeline must not attach a signature list it
    /// knows disagrees with the recorded count.
    pub fn finalize(self) -> Result<Self, RecordInvariantError> {
        if let (Some(count), Some(functions)) = (self.function_count, self.functions.as_ref()) {
            if functions.len() != count {
                return Err(RecordInvariantError {
                    count,
                    len: functions.len(),
                });
            }
        }
        Ok(self)
    }
}

/// Shape of the standalone `{stem}_functions.json` artifact.
#[derive(Debug, Serialize)]
pub struct FunctionsArtifact<'a> {
    pub file_name: &'a str,
    pub functions: &'a [FunctionSignature],
}

/// What one pipeline run produced: the finalized record plus every artifact
/// path in write order (analysis JSON last).
#[derive(Debug)]
pub struct PipelineOutcome {
    pub record: FileAnalysisRecord,
    pub artifacts: Vec<PathBuf>,
}
