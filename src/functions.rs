//! Function counting and signature extraction.
//!
//! Both services send the full file content. Unique-name counting (a
//! duplicate definition counts once) is a prompt-level contract the model
//! is asked to honor; nothing here verifies it structurally.

use crate::llm::{strip_code_fences, AnalysisError, LlmGateway};
use crate::models::FunctionSignature;
use serde::Deserialize;
use std::sync::Arc;

const COUNTER_SYSTEM_PROMPT: &str = "\
You are an expert code analyzer specialized in identifying functions in code.
Your task is to count the exact number of UNIQUE function definitions in the provided code.
Focus only on function counting. Be precise and return only the count as a number.
If a function with the same name is defined multiple times, count it only ONCE.
";

const COUNTER_PROMPT_PREFIX: &str = r#"Analyze the following code and count the number of UNIQUE function definitions it contains.
If a function is defined multiple times with the same name, count it only ONCE.
Respond ONLY with a JSON object with a single field "function_count" which contains the integer number of unique functions found.

Examples:
---
Code:
```
def add(a, b):
    return a + b

def subtract(a, b):
    return a - b
```
Response: {"function_count": 2}

---
Code:
```
class Calculator:
    def add(self, a, b):
        return a + b

    def subtract(self, a, b):
        return a - b

def multiply(a, b):
    return a * b
```
Response: {"function_count": 3}

---
Code:
```
import math

# No functions here
x = 10
y = 20
result = x + y
```
Response: {"function_count": 0}

---
Here's an example with duplicate function definitions:
```
def foo():
    print("foo version 1")

def bar():
    print("bar")

def foo():  # This is a duplicate definition of foo
    print("foo version 2")
```
Response: {"function_count": 2}

---
Now count the unique functions in this code:
```
"#;

const EXTRACTOR_SYSTEM_PROMPT: &str = "\
You are an expert code analyzer specialized in identifying functions in code.
Your task is to extract all function names and count the number of arguments for each function.
Include class methods but exclude built-in special methods (like __init__, __str__, etc.) unless explicitly required.
Be precise and focus only on the function extraction task.
";

const EXTRACTOR_PROMPT_PREFIX: &str = r#"Analyze the following code and extract all function names along with the number of arguments each function takes.
Count only real parameters, not self or cls for methods.
Include standalone functions and class methods but exclude built-in special methods (like __init__, __str__, etc.) unless explicitly asked.

Respond ONLY with a JSON array where each element is an object with two fields:
1. "name": The function name as a string
2. "arg_count": The number of arguments as an integer

Examples:
---
Code:
```
def add(a, b):
    return a + b

def subtract(a, b):
    return a - b
```
Response: [{"name": "add", "arg_count": 2}, {"name": "subtract", "arg_count": 2}]

---
Code:
```
class Calculator:
    def __init__(self, initial=0):
        self.value = initial

    def add(self, a, b):
        return a + b

def multiply(a, b):
    return a * b
```
Response: [{"name": "add", "arg_count": 2}, {"name": "multiply", "arg_count": 2}]

---
Now extract the functions from this code:
```
"#;

pub struct FunctionCounter {
    gateway: Arc<dyn LlmGateway>,
}

impl FunctionCounter {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    pub async fn count(&self, file_content: &str) -> Result<usize, AnalysisError> {
        let mut prompt = String::from(COUNTER_PROMPT_PREFIX);
        prompt.push_str(file_content);
        prompt.push_str("\n```\n");

        let raw = self.gateway.complete(COUNTER_SYSTEM_PROMPT, &prompt).await?;
        parse_count_response(&raw)
    }
}

pub struct SignatureExtractor {
    gateway: Arc<dyn LlmGateway>,
}

impl SignatureExtractor {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self { gateway }
    }

    /// Returns signatures in discovery order. A single malformed entry
    /// invalidates the whole reply.
    pub async fn extract(&self, file_content: &str) -> Result<Vec<FunctionSignature>, AnalysisError> {
        let mut prompt = String::from(EXTRACTOR_PROMPT_PREFIX);
        prompt.push_str(file_content);
        prompt.push_str("\n```\n");

        let raw = self
            .gateway
            .complete(EXTRACTOR_SYSTEM_PROMPT, &prompt)
            .await?;
        parse_signatures_response(&raw)
    }
}

#[derive(Deserialize)]
struct CountReply {
    #[serde(default)]
    function_count: Option<i64>,
}

fn parse_count_response(raw: &str) -> Result<usize, AnalysisError> {
    let reply: CountReply = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| AnalysisError::InvalidResponse(format!("expected a JSON object: {e}")))?;
    match reply.function_count {
        Some(n) if n >= 0 => Ok(n as usize),
        Some(n) => Err(AnalysisError::InvalidResponse(format!(
            "negative function count: {n}"
        ))),
        None => Err(AnalysisError::InvalidResponse(
            "missing function_count field".to_string(),
        )),
    }
}

#[derive(Deserialize)]
struct RawSignature {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arg_count: Option<i64>,
}

fn parse_signatures_response(raw: &str) -> Result<Vec<FunctionSignature>, AnalysisError> {
    let entries: Vec<RawSignature> = serde_json::from_str(strip_code_fences(raw))
        .map_err(|e| AnalysisError::InvalidResponse(format!("expected a JSON array: {e}")))?;

    let mut signatures = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = match entry.name {
            Some(name) if !name.is_empty() => name,
            _ => {
                return Err(AnalysisError::InvalidResponse(
                    "function entry with missing or empty name".to_string(),
                ))
            }
        };
        let arg_count = match entry.arg_count {
            Some(n) if n >= 0 => n as usize,
            _ => {
                return Err(AnalysisError::InvalidResponse(format!(
                    "function {name} has a missing or negative arg_count"
                )))
            }
        };
        signatures.push(FunctionSignature { name, arg_count });
    }
    Ok(signatures)
}
