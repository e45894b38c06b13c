use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::http_client::HttpClientTrait;
use crate::domain::{
    DomainError, FinishReason, LlmProvider, LlmRequest, LlmResponse, Message, MessageRole,
    ToolCall, Usage,
};

pub const DEFAULT_API_VERSION: &str = "2024-06-01";

/// Azure OpenAI resource configuration
#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
}

impl AzureOpenAiConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// `{endpoint}/openai/deployments/{deployment}/{operation}?api-version=...`
    pub fn deployment_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.endpoint.trim_end_matches('/'),
            deployment,
            operation,
            self.api_version
        )
    }

    pub fn headers(&self) -> Vec<(&str, &str)> {
        vec![
            ("api-key", self.api_key.as_str()),
            ("Content-Type", "application/json"),
        ]
    }
}

/// Azure OpenAI chat completions provider; `model` is the deployment name
#[derive(Debug)]
pub struct AzureOpenAiProvider<C: HttpClientTrait> {
    client: C,
    config: AzureOpenAiConfig,
}

impl<C: HttpClientTrait> AzureOpenAiProvider<C> {
    pub fn new(client: C, config: AzureOpenAiConfig) -> Self {
        Self { client, config }
    }

    fn build_url(&self, deployment: &str) -> String {
        self.config.deployment_url(deployment, "chat/completions")
    }

    fn build_request(&self, request: &LlmRequest) -> serde_json::Value {
        let messages: Vec<AzureMessage> = request.messages.iter().map(AzureMessage::from_domain).collect();

        let mut body = serde_json::json!({ "messages": messages });

        if request.has_tools() {
            let tools: Vec<serde_json::Value> =
                request.tools.iter().map(|t| t.to_openai_format()).collect();
            body["tools"] = serde_json::json!(tools);
            body["tool_choice"] = serde_json::json!("auto");
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<LlmResponse, DomainError> {
        let response: AzureResponse = serde_json::from_value(json).map_err(|e| {
            DomainError::provider("azure_openai", format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::provider("azure_openai", "No choices in response"))?;

        let content = choice.message.content.unwrap_or_default();
        let message = if choice.message.tool_calls.is_empty() {
            Message::assistant(content)
        } else {
            let calls = choice
                .message
                .tool_calls
                .into_iter()
                .map(AzureToolCall::into_domain)
                .collect();
            Message::assistant_tool_calls(content, calls)
        };

        let mut llm_response = LlmResponse::new(response.id, response.model, message);

        if let Some(reason) = choice.finish_reason {
            llm_response = llm_response.with_finish_reason(parse_finish_reason(&reason));
        }

        if let Some(usage) = response.usage {
            llm_response =
                llm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        Ok(llm_response)
    }
}

#[async_trait]
impl<C: HttpClientTrait> LlmProvider for AzureOpenAiProvider<C> {
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
        let url = self.build_url(model);
        let body = self.build_request(&request);

        let response = self
            .client
            .post_json(&url, self.config.headers(), &body)
            .await?;

        self.parse_response(response)
    }

    fn provider_name(&self) -> &'static str {
        "azure_openai"
    }
}

fn parse_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::Length,
        "content_filter" => FinishReason::ContentFilter,
        "tool_calls" | "function_call" => FinishReason::ToolCalls,
        _ => FinishReason::Stop,
    }
}

// Wire types (OpenAI chat completions shape)

#[derive(Debug, Serialize)]
struct AzureMessage {
    role: &'static str,
    content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<AzureToolCallOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl AzureMessage {
    fn from_domain(message: &Message) -> Self {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::Tool => "tool",
        };

        let tool_calls: Vec<AzureToolCallOut> = message
            .tool_calls()
            .iter()
            .map(AzureToolCallOut::from_domain)
            .collect();

        // assistant turns that only carry tool calls are sent with a null content
        let content = match message.content_text() {
            Some(text) => Some(text.to_string()),
            None if tool_calls.is_empty() => Some(String::new()),
            None => None,
        };

        Self {
            role,
            content,
            tool_calls,
            tool_call_id: message.tool_call_id().map(str::to_string),
        }
    }
}

#[derive(Debug, Serialize)]
struct AzureToolCallOut {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: AzureFunctionOut,
}

#[derive(Debug, Serialize)]
struct AzureFunctionOut {
    name: String,
    arguments: String,
}

impl AzureToolCallOut {
    fn from_domain(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            kind: "function",
            function: AzureFunctionOut {
                name: call.name.clone(),
                arguments: call.arguments.to_string(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct AzureResponse {
    id: String,
    model: String,
    choices: Vec<AzureChoice>,
    usage: Option<AzureUsage>,
}

#[derive(Debug, Deserialize)]
struct AzureChoice {
    message: AzureResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzureResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<AzureToolCall>,
}

#[derive(Debug, Deserialize)]
struct AzureToolCall {
    id: String,
    function: AzureFunction,
}

#[derive(Debug, Deserialize)]
struct AzureFunction {
    name: String,
    arguments: String,
}

impl AzureToolCall {
    /// Arguments arrive as a JSON-encoded string; unparseable text is kept verbatim
    fn into_domain(self) -> ToolCall {
        let arguments = serde_json::from_str(&self.function.arguments)
            .unwrap_or(serde_json::Value::String(self.function.arguments));

        ToolCall::new(self.id, self.function.name, arguments)
    }
}

#[derive(Debug, Deserialize)]
struct AzureUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ToolDefinition;
    use crate::infrastructure::llm::http_client::mock::MockHttpClient;
    use crate::infrastructure::llm::HttpClient;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const URL: &str = "https://myresource.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01";

    fn config() -> AzureOpenAiConfig {
        AzureOpenAiConfig::new("https://myresource.openai.azure.com", "test-api-key")
    }

    #[tokio::test]
    async fn test_azure_openai_chat() {
        let mock_response = serde_json::json!({
            "id": "chatcmpl-123",
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Hello from Azure!"
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 5,
                "total_tokens": 15
            }
        });

        let client = MockHttpClient::new().with_response(URL, mock_response);
        let provider = AzureOpenAiProvider::new(client, config());

        let request = LlmRequest::builder().user("Hello!").build();
        let response = provider.chat("gpt-4o", request).await.unwrap();

        assert_eq!(response.content(), Some("Hello from Azure!"));
        assert_eq!(response.finish_reason, Some(FinishReason::Stop));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_tool_calls_are_parsed() {
        let mock_response = serde_json::json!({
            "id": "chatcmpl-456",
            "model": "gpt-4o",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "search", "arguments": "{\"query\":\"rust\",\"topK\":2}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        let client = MockHttpClient::new().with_response(URL, mock_response);
        let provider = AzureOpenAiProvider::new(client, config());

        let response = provider
            .chat("gpt-4o", LlmRequest::builder().user("q").build())
            .await
            .unwrap();

        assert!(response.wants_tools());
        let call = &response.tool_calls()[0];
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "search");
        assert_eq!(call.arguments["topK"], 2);
    }

    #[test]
    fn test_request_body_with_tools_and_tool_messages() {
        let provider = AzureOpenAiProvider::new(MockHttpClient::new(), config());
        let call = ToolCall::new("call_1", "search", serde_json::json!({"query": "rust"}));

        let request = LlmRequest::builder()
            .system("be brief")
            .user("q")
            .message(Message::assistant_tool_calls("", vec![call]))
            .message(Message::tool_result("call_1", "[]"))
            .tool(ToolDefinition::new("search", "Search", serde_json::json!({"type": "object"})))
            .build();

        let body = provider.build_request(&request);

        assert_eq!(body["tools"][0]["function"]["name"], "search");
        assert_eq!(body["messages"][2]["content"], serde_json::Value::Null);
        assert_eq!(
            body["messages"][2]["tool_calls"][0]["function"]["arguments"],
            "{\"query\":\"rust\"}"
        );
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
    }

    #[tokio::test]
    async fn test_against_http_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4o/chat/completions"))
            .and(query_param("api-version", DEFAULT_API_VERSION))
            .and(header("api-key", "test-api-key"))
            .and(body_partial_json(serde_json::json!({"messages": [{"role": "user", "content": "ping"}]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o",
                "choices": [{"message": {"role": "assistant", "content": "pong"}, "finish_reason": "stop"}]
            })))
            .mount(&server)
            .await;

        let provider = AzureOpenAiProvider::new(
            HttpClient::new(),
            AzureOpenAiConfig::new(server.uri(), "test-api-key"),
        );

        let response = provider
            .chat("gpt-4o", LlmRequest::builder().user("ping").build())
            .await
            .unwrap();

        assert_eq!(response.content(), Some("pong"));
    }

    #[test]
    fn test_url_building() {
        let config = AzureOpenAiConfig::new("https://myresource.openai.azure.com/", "key")
            .with_api_version("2024-02-01");

        assert_eq!(
            config.deployment_url("my-deployment", "embeddings"),
            "https://myresource.openai.azure.com/openai/deployments/my-deployment/embeddings?api-version=2024-02-01"
        );
    }
}
