//! Deterministic gateway stub shared by the integration suites.

use async_trait::async_trait;
use license_triage::{GatewayError, LlmGateway};

/// Which analysis service a completion request came from, recognized by the
/// distinctive markers each prompt template carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    License,
    Copyright,
    Count,
    Signatures,
    Translate,
    Safety,
}

pub fn task_of(system_prompt: &str, prompt: &str) -> Task {
    if prompt.contains("\"license_type\"") {
        Task::License
    } else if prompt.contains("\"copyright_holder\"") {
        Task::Copyright
    } else if prompt.contains("\"function_count\"") {
        Task::Count
    } else if prompt.contains("\"arg_count\"") {
        Task::Signatures
    } else if prompt.contains("Provide only the") {
        Task::Translate
    } else if system_prompt.contains("\"is_safe\"") {
        Task::Safety
    } else {
        panic!("unrecognized prompt: {prompt}");
    }
}

type Responder = Box<dyn Fn(Task, &str) -> Result<String, GatewayError> + Send + Sync>;

/// Gateway stub that answers by task kind. The responder also receives the
/// full user prompt for content-sensitive scripting.
pub struct ScriptedGateway {
    responder: Responder,
}

impl ScriptedGateway {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(Task, &str) -> Result<String, GatewayError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
        }
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, GatewayError> {
        (self.responder)(task_of(system_prompt, prompt), prompt)
    }
}

pub fn gateway_down() -> GatewayError {
    GatewayError::Api {
        status: 429,
        message: "rate limited".to_string(),
    }
}
