use serde::{Deserialize, Serialize};

use crate::domain::llm::Message;

/// Who produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    User,
    Agent,
    /// Terminal error recorded in place of an agent answer
    System,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub actor: Actor,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            actor: Actor::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            actor: Actor::Agent,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            actor: Actor::System,
            content: content.into(),
        }
    }

    /// LLM message for replaying this turn as context; system errors are not replayed
    pub fn to_message(&self) -> Option<Message> {
        match self.actor {
            Actor::User => Some(Message::user(&self.content)),
            Actor::Agent => Some(Message::assistant(&self.content)),
            Actor::System => None,
        }
    }
}

/// Append-only log of turns in processing order
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    entries: Vec<HistoryEntry>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        tracing::debug!(
            actor = ?entry.actor,
            content = %truncate(&entry.content, 100),
            "Appending history entry"
        );
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Owned copy; callers cannot reach the internal log through it
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.clone()
    }

    /// Answered user/agent turns as LLM messages, oldest first.
    ///
    /// A user turn whose processing ended in a system error is left out.
    pub fn replayable_messages(&self) -> Vec<Message> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(idx, entry)| {
                let failed = entry.actor == Actor::User
                    && self
                        .entries
                        .get(idx + 1)
                        .is_some_and(|next| next.actor == Actor::System);
                !failed
            })
            .filter_map(|(_, entry)| entry.to_message())
            .collect()
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_snapshot() {
        let mut history = ConversationHistory::new();
        history.append(HistoryEntry::user("What is X?"));

        let mut snapshot = history.snapshot();
        snapshot.push(HistoryEntry::agent("tampered"));

        assert_eq!(history.len(), 1);
        assert_eq!(history.last(), Some(&HistoryEntry::user("What is X?")));
    }

    #[test]
    fn test_actor_serialization() {
        let json = serde_json::to_string(&HistoryEntry::agent("hi")).unwrap();
        assert_eq!(json, r#"{"actor":"agent","content":"hi"}"#);
    }

    #[test]
    fn test_replayable_messages_skip_failed_turns() {
        let mut history = ConversationHistory::new();
        history.append(HistoryEntry::user("q1"));
        history.append(HistoryEntry::system("failed"));
        history.append(HistoryEntry::user("q2"));
        history.append(HistoryEntry::agent("a2"));

        let messages = history.replayable_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content_text(), Some("q2"));
        assert_eq!(messages[1].content_text(), Some("a2"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
