//! License classification backed by the LLM gateway.
//!
//! One prompt template with few-shot examples pinning the reply shape, one
//! validation step. Only the first [`HEADER_CHARS`] characters of the file
//! are sent; license text lives in the header.

use crate::llm::{strip_code_fences, truncate_chars, AnalysisError, LlmGateway};
use crate::models::LicenseType;
use serde::Deserialize;
use std::sync::Arc;

const HEADER_CHARS: usize = 1000;

const SYSTEM_PROMPT: &str = "\
You are an expert in software licensing and copyright law.
Your task is to analyze code file headers to identify the license type and specific license name.
You will categorize licenses into one of these types:
1. PERMISSIVE - Open source licenses that allow code reuse with minimal restrictions (MIT, Apache, BSD, etc.)
2. COPYLEFT - Open source licenses that require derivative works to be distributed under the same license (GPL, LGPL, etc.)
3. PROPRIETARY - Closed source or custom licenses that restrict code reuse
4. UNKNOWN - If you cannot determine the license type

Be precise and focused in your response. DO NOT provide explanations, just the categorization result.
";

const PROMPT_PREFIX: &str = r#"Analyze the following code file header and determine its license type. Focus only on the license
text and copyright information.
Respond ONLY with a JSON object that has two fields:
1. "license_type": Must be one of "PERMISSIVE", "COPYLEFT", "PROPRIETARY", or "UNKNOWN"
2. "license_name": The specific license name (e.g., "MIT License", "GNU GPL v3", "Proprietary", "Unknown License")

Examples:
---
Header:
```
// MIT License
//
// Copyright (c) 2020 John Doe
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files...
```
Response: {"license_type": "PERMISSIVE", "license_name": "MIT License"}

---
Header:
```
# This program is free software: you can redistribute it and/or modify
# it under the terms of the GNU General Public License as published by
# the Free Software Foundation, either version 3 of the License, or
# (at your option) any later version.
```
Response: {"license_type": "COPYLEFT", "license_name": "GNU GPL v3"}

---
Header:
```
// Copyright (c) 2023 Acme Corp. All rights reserved.
// Proprietary and confidential.
// Unauthorized copying of this file is strictly prohibited.
```
Response: {"license_type": "PROPRIETARY", "license_name": "Proprietary"}

---
Now analyze this header:
```
"#;

/// Validated classifier reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseVerdict {
    pub license_type: LicenseType,
    pub license_name: String,
}

pub struct LicenseClassifier {
    gateway: Arc<dyn LlmGateway>,
}

impl LicenseClassifier {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    pub async fn classify(&self, file_content: &str) -> Result<LicenseVerdict, AnalysisError> {
        let prompt = build_prompt(file_content);
        let raw = self.gateway.complete(SYSTEM_PROMPT, &prompt).await?;
        parse_response(&raw)
    }
}

fn build_prompt(file_content: &str) -> String {
    let mut prompt = String::from(PROMPT_PREFIX);
    prompt.push_str(truncate_chars(file_content, HEADER_CHARS));
    prompt.push_str("\n```\n");
    prompt
}

#[derive(Deserialize)]
struct LicenseReply {
    #[serde(default)]
    license_type: Option<String>,
    #[serde(default)]
    license_name: Option<String>,
}

fn parse_response(raw: &str) -> Result<LicenseVerdict, AnalysisError> {
    let reply: LicenseReply = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| AnalysisError::InvalidResponse(format!("expected a JSON object: {e}")))?;

    let license_type = reply
        .license_type
        .as_deref()
        .map(LicenseType::from_label)
        .unwrap_or(LicenseType::Unknown);
    let license_name = reply
        .license_name
        .unwrap_or_else(|| "Unknown License".to_string());

    Ok(LicenseVerdict {
        license_type,
        license_name,
    })
}
