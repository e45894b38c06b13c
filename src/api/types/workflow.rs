//! Request and response bodies of the workflow endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::conversation::{
    ConversationStatus, HistoryEntry, LatestProgress, Phase, ProgressStep, PromptItem,
    DEFAULT_RESULT_COUNT,
};
use crate::domain::DomainError;
use crate::infrastructure::services::StartedConversation;

/// Version of the serialized history and status records
pub const SCHEMA_VERSION: u32 = 1;

/// Body of `POST /workflows/start`; may be omitted entirely
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartWorkflowRequest {
    #[serde(default, deserialize_with = "optional_id")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
}

/// Accepts `"chat-1"` as well as `42`
fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    }))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartWorkflowResponse {
    pub workflow_id: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub already_running: bool,
}

impl From<StartedConversation> for StartWorkflowResponse {
    fn from(started: StartedConversation) -> Self {
        Self {
            workflow_id: started.workflow_id,
            run_id: started.run_id,
            started_at: started.started_at,
            already_running: started.already_running,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitPromptRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl SubmitPromptRequest {
    pub fn into_item(self) -> Result<PromptItem, DomainError> {
        PromptItem::new(self.prompt, self.top_k.unwrap_or(DEFAULT_RESULT_COUNT))
    }
}

/// Acknowledgement for the prompt and end signals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalResponse {
    pub status: String,
    pub workflow_id: String,
}

impl SignalResponse {
    pub fn prompt_sent(workflow_id: impl Into<String>) -> Self {
        Self {
            status: "prompt_sent".to_string(),
            workflow_id: workflow_id.into(),
        }
    }

    pub fn ended(workflow_id: impl Into<String>) -> Self {
        Self {
            status: "ended".to_string(),
            workflow_id: workflow_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowListResponse {
    pub workflow_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub workflow_id: String,
    pub schema_version: u32,
    pub history: Vec<HistoryEntry>,
}

impl HistoryResponse {
    pub fn new(workflow_id: impl Into<String>, history: Vec<HistoryEntry>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            schema_version: SCHEMA_VERSION,
            history,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub workflow_id: String,
    pub schema_version: u32,
    pub latest_message: Option<HistoryEntry>,
    pub current_state: Vec<ProgressStep>,
}

impl ProgressResponse {
    pub fn new(workflow_id: impl Into<String>, latest: LatestProgress) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            schema_version: SCHEMA_VERSION,
            latest_message: latest.latest_message,
            current_state: latest.current_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub workflow_id: String,
    pub schema_version: u32,
    pub phase: Phase,
    pub running: bool,
    pub queued: usize,
    pub history_len: usize,
    pub latest: LatestProgress,
}

impl StatusResponse {
    pub fn new(workflow_id: impl Into<String>, status: ConversationStatus) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            schema_version: SCHEMA_VERSION,
            phase: status.phase,
            running: status.running,
            queued: status.queued,
            history_len: status.history_len,
            latest: status.latest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_request_accepts_numeric_id() {
        let request: StartWorkflowRequest =
            serde_json::from_str(r#"{"workflow_id": 42}"#).unwrap();
        assert_eq!(request.workflow_id.as_deref(), Some("42"));

        let request: StartWorkflowRequest = serde_json::from_str("{}").unwrap();
        assert!(request.workflow_id.is_none());

        let request: StartWorkflowRequest =
            serde_json::from_str(r#"{"workflow_id": null}"#).unwrap();
        assert!(request.workflow_id.is_none());
    }

    #[test]
    fn test_submit_request_defaults_top_k() {
        let request: SubmitPromptRequest = serde_json::from_str(r#"{"prompt": "What is X?"}"#).unwrap();
        let item = request.into_item().unwrap();

        assert_eq!(item.query(), "What is X?");
        assert_eq!(item.result_count(), DEFAULT_RESULT_COUNT);
    }

    #[test]
    fn test_submit_request_rejects_zero_top_k() {
        let request = SubmitPromptRequest {
            prompt: "What is X?".to_string(),
            top_k: Some(0),
        };

        assert!(matches!(request.into_item(), Err(DomainError::Validation { .. })));
    }

    #[test]
    fn test_history_response_shape() {
        let response = HistoryResponse::new("chat-1", vec![HistoryEntry::user("hi")]);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["schema_version"], 1);
        assert_eq!(json["history"][0]["actor"], "user");
        assert_eq!(json["history"][0]["content"], "hi");
    }
}
