use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::llm::ToolDefinition;
use crate::domain::DomainError;

/// Capability the generation collaborator may invoke while answering
#[async_trait]
pub trait Tool: Send + Sync + std::fmt::Debug {
    fn definition(&self) -> ToolDefinition;

    /// Run the tool with model-supplied arguments; the result is fed back to the model as JSON
    async fn invoke(&self, arguments: Value) -> Result<Value, DomainError>;
}

/// Tools available for one generation
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.definition().name == name)
            .cloned()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echo arguments", serde_json::json!({"type": "object"}))
        }

        async fn invoke(&self, arguments: Value) -> Result<Value, DomainError> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn test_tool_lookup_by_name() {
        let tools = ToolSet::new().with(Arc::new(EchoTool));

        assert_eq!(tools.len(), 1);
        assert!(tools.get("missing").is_none());

        let echo = tools.get("echo").unwrap();
        let result = echo.invoke(serde_json::json!({"x": 1})).await.unwrap();
        assert_eq!(result["x"], 1);
    }

    #[test]
    fn test_definitions() {
        let tools = ToolSet::new().with(Arc::new(EchoTool));
        let defs = tools.definitions();
        assert_eq!(defs[0].name, "echo");
    }
}
