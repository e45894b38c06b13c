//! Wire types of the HTTP API

pub mod error;
pub mod json;
pub mod workflow;

pub use error::{ApiError, ApiErrorResponse, ApiErrorType};
pub use json::Json;
pub use workflow::{
    HistoryResponse, ProgressResponse, SignalResponse, StartWorkflowRequest,
    StartWorkflowResponse, StatusResponse, SubmitPromptRequest, WorkflowListResponse,
    SCHEMA_VERSION,
};
