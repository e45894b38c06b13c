use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::domain::DomainError;

static ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._:-]+$").unwrap());

pub const MAX_ID_LENGTH: usize = 128;

const ID_PREFIX: &str = "qna-workflow-";

/// `qna-workflow-{uuid}`
pub fn generate_conversation_id() -> String {
    format!("{}{}", ID_PREFIX, Uuid::new_v4())
}

pub fn validate_conversation_id(id: &str) -> Result<(), DomainError> {
    if id.is_empty() {
        return Err(DomainError::invalid_id("Workflow ID cannot be empty"));
    }

    if id.len() > MAX_ID_LENGTH {
        return Err(DomainError::invalid_id(format!(
            "Workflow ID exceeds maximum length of {} characters",
            MAX_ID_LENGTH
        )));
    }

    if !ID_PATTERN.is_match(id) {
        return Err(DomainError::invalid_id(format!(
            "Invalid workflow ID '{}': only letters, digits, '.', '_', ':' and '-' are allowed",
            id
        )));
    }

    Ok(())
}
