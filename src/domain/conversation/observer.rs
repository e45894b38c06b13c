use std::time::Duration;

/// Hook notified of coordinator events; used to export metrics
pub trait ConversationObserver: Send + Sync + std::fmt::Debug {
    fn on_started(&self, _conversation_id: &str) {}

    fn on_submitted(&self, _conversation_id: &str) {}

    fn on_dropped(&self, _conversation_id: &str) {}

    fn on_completed(&self, _conversation_id: &str, _elapsed: Duration, _attempts: u32) {}

    fn on_failed(&self, _conversation_id: &str, _elapsed: Duration, _attempts: u32) {}

    fn on_closed(&self, _conversation_id: &str) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ConversationObserver for NoopObserver {}
