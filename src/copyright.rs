//! Copyright holder extraction, same header-only request shape as the
//! license classifier.

use crate::llm::{strip_code_fences, truncate_chars, AnalysisError, LlmGateway};
use serde::Deserialize;
use std::sync::Arc;

const HEADER_CHARS: usize = 1000;

const SYSTEM_PROMPT: &str = "\
You are an expert in software licensing and copyright law.
Your task is to extract the copyright holder name from code file headers.
Focus only on the copyright information. Be precise and return only the name of the copyright holder.
";

const PROMPT_PREFIX: &str = r#"Analyze the following code file header and extract the copyright holder name.
Respond ONLY with a JSON object with a single field "copyright_holder" which contains the name of the copyright holder.
If no copyright holder is specified, use "Unknown".

Examples:
---
Header:
```
// MIT License
//
// Copyright (c) 2020 John Doe
//
// Permission is hereby granted...
```
Response: {"copyright_holder": "John Doe"}

---
Header:
```
# Copyright 2023 Google LLC
#
# Licensed under the Apache License...

def some_function():
    print('do not look at it')
```
Response: {"copyright_holder": "Google LLC"}

---
Now extract the copyright holder from this file:
```
"#;

pub struct CopyrightExtractor {
    gateway: Arc<dyn LlmGateway>,
}

impl CopyrightExtractor {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    pub async fn extract(&self, file_content: &str) -> Result<String, AnalysisError> {
        let mut prompt = String::from(PROMPT_PREFIX);
        prompt.push_str(truncate_chars(file_content, HEADER_CHARS));
        prompt.push_str("\n```\n");

        let raw = self.gateway.complete(SYSTEM_PROMPT, &prompt).await?;
        parse_response(&raw)
    }
}

#[derive(Deserialize)]
struct CopyrightReply {
    #[serde(default)]
    copyright_holder: Option<String>,
}

fn parse_response(raw: &str) -> Result<String, AnalysisError> {
    let reply: CopyrightReply = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| AnalysisError::InvalidResponse(format!("expected a JSON object: {e}")))?;
    Ok(reply.copyright_holder.unwrap_or_else(|| "Unknown".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_holder() {
        assert_eq!(
            parse_response(r#"{"copyright_holder": "Acme Corp"}"#).unwrap(),
            "Acme Corp"
        );
    }

    #[test]
    fn missing_holder_defaults_to_unknown() {
        assert_eq!(parse_response("{}").unwrap(), "Unknown");
    }

    #[test]
    fn non_json_reply_is_invalid() {
        assert!(parse_response("probably John Doe").is_err());
    }
}
