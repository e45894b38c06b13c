use serde::{Deserialize, Serialize};

/// Lifecycle of a progress sub-step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    /// Just received
    Prompt,
    /// In flight
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStep {
    pub content: String,
    pub state: ProgressState,
}

impl ProgressStep {
    pub fn new(content: impl Into<String>, state: ProgressState) -> Self {
        Self {
            content: content.into(),
            state,
        }
    }
}

/// Sub-steps of the prompt currently being processed; never holds history
#[derive(Debug, Clone, Default)]
pub struct ProgressTracker {
    steps: Vec<ProgressStep>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears previous steps and seeds the tracker with the received prompt
    pub fn reset(&mut self, query: &str) {
        self.steps.clear();
        self.steps
            .push(ProgressStep::new(query, ProgressState::Prompt));
    }

    /// Appends a step and returns its index for later updates
    pub fn push(&mut self, step: ProgressStep) -> usize {
        self.steps.push(step);
        self.steps.len() - 1
    }

    /// Returns false when the index does not exist (the tracker was reset meanwhile)
    pub fn update(&mut self, index: usize, state: ProgressState) -> bool {
        match self.steps.get_mut(index) {
            Some(step) => {
                step.state = state;
                true
            }
            None => false,
        }
    }

    /// Fails every sub-step still `running`, returning how many were closed.
    ///
    /// A step stays `running` when the call that pushed it was cancelled.
    pub fn fail_running(&mut self) -> usize {
        let mut closed = 0;
        for step in self.steps.iter_mut().skip(1) {
            if step.state == ProgressState::Running {
                step.state = ProgressState::Failed;
                closed += 1;
            }
        }
        closed
    }

    /// Marks the seed step; no sub-step is left `running` afterwards
    pub fn finish(&mut self, state: ProgressState) {
        self.fail_running();
        self.update(0, state);
    }

    pub fn steps(&self) -> &[ProgressStep] {
        &self.steps
    }

    pub fn snapshot(&self) -> Vec<ProgressStep> {
        self.steps.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_reflects_only_current_prompt() {
        let mut tracker = ProgressTracker::new();
        tracker.reset("first");
        tracker.push(ProgressStep::new("search: first", ProgressState::Running));

        tracker.reset("second");

        assert_eq!(
            tracker.steps(),
            &[ProgressStep::new("second", ProgressState::Prompt)]
        );
    }

    #[test]
    fn test_update_step_state() {
        let mut tracker = ProgressTracker::new();
        tracker.reset("q");
        let idx = tracker.push(ProgressStep::new("search: q", ProgressState::Running));

        assert!(tracker.update(idx, ProgressState::Done));
        assert!(!tracker.update(42, ProgressState::Done));

        tracker.finish(ProgressState::Done);
        assert!(tracker.steps().iter().all(|s| s.state == ProgressState::Done));
    }

    #[test]
    fn test_finish_fails_abandoned_steps() {
        let mut tracker = ProgressTracker::new();
        tracker.reset("q");
        let done = tracker.push(ProgressStep::new("search: a", ProgressState::Running));
        tracker.update(done, ProgressState::Done);
        tracker.push(ProgressStep::new("search: b", ProgressState::Running));

        tracker.finish(ProgressState::Done);

        assert_eq!(
            tracker.steps(),
            &[
                ProgressStep::new("q", ProgressState::Done),
                ProgressStep::new("search: a", ProgressState::Done),
                ProgressStep::new("search: b", ProgressState::Failed),
            ]
        );
        assert_eq!(tracker.fail_running(), 0);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&ProgressStep::new("q", ProgressState::Prompt)).unwrap();
        assert_eq!(json, r#"{"content":"q","state":"prompt"}"#);
    }
}
