use async_trait::async_trait;

use super::ToolSet;
use crate::domain::llm::Message;
use crate::domain::DomainError;

/// Everything the generation collaborator needs to answer one prompt
#[derive(Debug, Clone)]
pub struct AgentContext {
    instructions: String,
    prior_turns: Vec<Message>,
    input: String,
    tools: ToolSet,
}

impl AgentContext {
    pub fn new(instructions: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            instructions: instructions.into(),
            prior_turns: Vec::new(),
            input: input.into(),
            tools: ToolSet::new(),
        }
    }

    pub fn with_prior_turns(mut self, turns: Vec<Message>) -> Self {
        self.prior_turns = turns;
        self
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    pub fn prior_turns(&self) -> &[Message] {
        &self.prior_turns
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// System instructions, prior turns, then the new user input
    pub fn to_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.prior_turns.len() + 2);
        messages.push(Message::system(&self.instructions));
        messages.extend(self.prior_turns.iter().cloned());
        messages.push(Message::user(&self.input));
        messages
    }
}

/// Generation collaborator: produces the final answer for a context
#[async_trait]
pub trait Generator: Send + Sync + std::fmt::Debug {
    async fn generate(&self, context: &AgentContext) -> Result<String, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Scripted generator for coordinator tests.
    ///
    /// Answers `answer to: <input>` unless configured to fail; can call a tool
    /// first, sleep, or block on a gate until the test releases it.
    #[derive(Debug, Default)]
    pub struct MockGenerator {
        fail_first: usize,
        always_fail: bool,
        delay: Option<Duration>,
        gate: Option<std::sync::Arc<Semaphore>>,
        tool_call: Option<(String, serde_json::Value)>,
        calls: AtomicUsize,
        inputs: Mutex<Vec<String>>,
        prior_turn_counts: Mutex<Vec<usize>>,
    }

    impl MockGenerator {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_first(mut self, attempts: usize) -> Self {
            self.fail_first = attempts;
            self
        }

        pub fn always_failing(mut self) -> Self {
            self.always_fail = true;
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn with_gate(mut self, gate: std::sync::Arc<Semaphore>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub fn calling_tool(mut self, name: impl Into<String>, arguments: serde_json::Value) -> Self {
            self.tool_call = Some((name.into(), arguments));
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn inputs(&self) -> Vec<String> {
            self.inputs.lock().unwrap().clone()
        }

        pub fn prior_turn_counts(&self) -> Vec<usize> {
            self.prior_turn_counts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Generator for MockGenerator {
        async fn generate(&self, context: &AgentContext) -> Result<String, DomainError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().unwrap().push(context.input().to_string());
            self.prior_turn_counts
                .lock()
                .unwrap()
                .push(context.prior_turns().len());

            if let Some(gate) = &self.gate {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|e| DomainError::internal(e.to_string()))?;
                permit.forget();
            }

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.always_fail || call < self.fail_first {
                return Err(DomainError::provider("mock", "generation backend unavailable"));
            }

            if let Some((name, arguments)) = &self.tool_call {
                let tool = context
                    .tools()
                    .get(name)
                    .ok_or_else(|| DomainError::internal(format!("tool '{}' missing", name)))?;
                tool.invoke(arguments.clone()).await?;
            }

            Ok(format!("answer to: {}", context.input()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::MessageRole;

    #[test]
    fn test_to_messages_order() {
        let context = AgentContext::new("be brief", "What is X?").with_prior_turns(vec![
            Message::user("earlier question"),
            Message::assistant("earlier answer"),
        ]);

        let messages = context.to_messages();

        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role.clone()).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User
            ]
        );
        assert_eq!(messages[0].content_text(), Some("be brief"));
        assert_eq!(messages[3].content_text(), Some("What is X?"));
    }
}
