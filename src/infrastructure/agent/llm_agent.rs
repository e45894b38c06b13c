use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, warn};

use crate::domain::agent::{AgentContext, Generator};
use crate::domain::llm::{LlmProvider, LlmRequest, Message, ToolCall};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct LlmAgentConfig {
    /// Deployment (model) the requests are sent to
    pub deployment: String,
    /// Model round trips that may request tools before an answer is required
    pub max_tool_rounds: usize,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl LlmAgentConfig {
    pub fn new(deployment: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            max_tool_rounds: 5,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }
}

/// Tool-calling agent: asks the model, runs the tools it requests, feeds the
/// results back and repeats until the model answers.
#[derive(Debug)]
pub struct LlmAgent {
    provider: Arc<dyn LlmProvider>,
    config: LlmAgentConfig,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn LlmProvider>, config: LlmAgentConfig) -> Self {
        Self { provider, config }
    }

    fn request(&self, messages: &[Message], context: &AgentContext) -> LlmRequest {
        let mut builder = LlmRequest::builder()
            .messages(messages.to_vec())
            .tools(context.tools().definitions());

        if let Some(temperature) = self.config.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.config.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }

        builder.build()
    }

    /// Tool failures are reported to the model rather than aborting the answer
    async fn run_tool(&self, call: &ToolCall, context: &AgentContext) -> String {
        let Some(tool) = context.tools().get(&call.name) else {
            warn!(tool = %call.name, "Model requested an unknown tool");
            return json!({"error": format!("Unknown tool '{}'", call.name)}).to_string();
        };

        match tool.invoke(call.arguments.clone()).await {
            Ok(result) => result.to_string(),
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Tool call failed");
                json!({"error": e.to_string()}).to_string()
            }
        }
    }
}

#[async_trait]
impl Generator for LlmAgent {
    async fn generate(&self, context: &AgentContext) -> Result<String, DomainError> {
        let mut messages = context.to_messages();

        for round in 0..=self.config.max_tool_rounds {
            let response = self
                .provider
                .chat(&self.config.deployment, self.request(&messages, context))
                .await?;

            if !response.wants_tools() {
                return match response.content() {
                    Some(answer) if !answer.trim().is_empty() => Ok(answer.to_string()),
                    _ => Err(DomainError::provider(
                        self.provider.provider_name(),
                        "Model returned an empty answer",
                    )),
                };
            }

            if round == self.config.max_tool_rounds {
                break;
            }

            let calls = response.tool_calls().to_vec();
            debug!(round, calls = calls.len(), "Model requested tools");
            messages.push(response.message.clone());

            for call in &calls {
                let result = self.run_tool(call, context).await;
                messages.push(Message::tool_result(&call.id, result));
            }
        }

        Err(DomainError::provider(
            self.provider.provider_name(),
            format!(
                "Model kept requesting tools after {} rounds",
                self.config.max_tool_rounds
            ),
        ))
    }
}
