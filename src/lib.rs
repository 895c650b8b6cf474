pub mod batch;
pub mod config;
pub mod copyright;
pub mod functions;
pub mod license;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod safety;
pub mod translate;
pub mod writer;

pub use batch::{BatchReport, BatchRunner};
pub use config::Config;
pub use copyright::CopyrightExtractor;
pub use functions::{FunctionCounter, SignatureExtractor};
pub use license::{LicenseClassifier, LicenseVerdict};
pub use llm::{build_gateway, AnalysisError, GatewayError, LlmGateway};
pub use models::{
    FileAnalysisRecord, FunctionSignature, LicenseType, PipelineOutcome, RecordInvariantError,
};
pub use pipeline::{FilePipeline, PipelineError};
pub use safety::{SafetyCache, SafetyChecker, SafetyVerdict};
pub use translate::{CodeTranslator, TranslationError};
pub use writer::{ResultWriter, WriterError};
