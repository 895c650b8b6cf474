//! Code translation into the configured target language.
//!
//! Unlike the other services, a translation failure is surfaced to the
//! pipeline as a typed error: the pipeline branches on whether translation
//! produced usable code, and a silent empty default would be
//! indistinguishable from "nothing to translate".

use crate::llm::{AnalysisError, LlmGateway};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("translation failed: {0}")]
pub struct TranslationError(#[from] pub AnalysisError);

pub struct CodeTranslator {
    gateway: Arc<dyn LlmGateway>,
    target_language: String,
}

impl CodeTranslator {
    pub fn new(gateway: Arc<dyn LlmGateway>, target_language: impl Into<String>) -> Self {
        Self {
            gateway,
            target_language: target_language.into(),
        }
    }

    pub async fn translate(&self, file_content: &str) -> Result<String, TranslationError> {
        let system_prompt = format!(
            "You are an expert programmer fluent in {lang}.\n\
             Your task is to convert source code to equivalent {lang} code.\n\
             Produce clean, idiomatic {lang} that captures the same functionality as the original.\n\
             Include appropriate error handling and comments in the {lang} code.\n\
             The {lang} code should be complete, valid, and ready to compile.",
            lang = self.target_language
        );
        let prompt = format!(
            "Please convert the following code to equivalent {lang} code:\n\n\
             ```\n{file_content}\n```\n\n\
             Provide only the {lang} code, without any explanations.",
            lang = self.target_language
        );

        let raw = self
            .gateway
            .complete(&system_prompt, &prompt)
            .await
            .map_err(AnalysisError::from)?;

        let code = strip_fenced_code(&raw);
        if code.trim().is_empty() {
            return Err(TranslationError(AnalysisError::InvalidResponse(
                "empty translation".to_string(),
            )));
        }
        Ok(code.to_string())
    }
}

/// Strips a surrounding markdown fence, including a language tag on the
/// opening line (e.g. ```rust).
fn strip_fenced_code(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.split_once('\n') {
        Some((_tag, body)) => body,
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_fence() {
        let raw = "```rust\nfn main() {}\n```";
        assert_eq!(strip_fenced_code(raw), "fn main() {}");
    }

    #[test]
    fn leaves_bare_code_untouched() {
        assert_eq!(strip_fenced_code("fn main() {}\n"), "fn main() {}");
    }

    #[test]
    fn strips_untagged_fence() {
        let raw = "```\nfn add(a: i32, b: i32) -> i32 { a + b }\n```";
        assert_eq!(
            strip_fenced_code(raw),
            "fn add(a: i32, b: i32) -> i32 { a + b }"
        );
    }
}
