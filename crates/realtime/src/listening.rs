//! Continuous listening.
//!
//! Capture that ends on its own is restarted, unless the user stopped it or
//! the agent is mid-response. In the latter case the restart waits until the
//! conversation is back in `Listening`.

use crate::status::ConversationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListeningAction {
    Restart,
    Defer,
    Ignore,
}

#[derive(Debug, Default)]
pub struct ListeningPolicy {
    stopped: bool,
    restart_pending: bool,
}

impl ListeningPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user stopped capture; it must not come back on its own.
    pub fn stop(&mut self) {
        self.stopped = true;
        self.restart_pending = false;
    }

    pub fn is_restart_pending(&self) -> bool {
        self.restart_pending
    }

    pub fn capture_ended(&mut self, status: ConversationStatus) -> ListeningAction {
        if self.stopped || status.is_terminal() || status == ConversationStatus::Idle {
            return ListeningAction::Ignore;
        }
        if status.response_in_progress() {
            self.restart_pending = true;
            return ListeningAction::Defer;
        }
        ListeningAction::Restart
    }

    pub fn status_changed(&mut self, status: ConversationStatus) -> ListeningAction {
        if self.restart_pending && !self.stopped && status == ConversationStatus::Listening {
            self.restart_pending = false;
            return ListeningAction::Restart;
        }
        if status.is_terminal() {
            self.restart_pending = false;
        }
        ListeningAction::Ignore
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConversationStatus::*;

    #[test]
    fn test_restarts_immediately_while_listening() {
        let mut policy = ListeningPolicy::new();
        assert_eq!(policy.capture_ended(Listening), ListeningAction::Restart);
        assert_eq!(policy.capture_ended(Connected), ListeningAction::Restart);
    }

    #[test]
    fn test_defers_during_response_then_restarts() {
        let mut policy = ListeningPolicy::new();
        assert_eq!(policy.capture_ended(Speaking), ListeningAction::Defer);
        assert!(policy.is_restart_pending());
        assert_eq!(policy.status_changed(Processing), ListeningAction::Ignore);
        assert_eq!(policy.status_changed(Listening), ListeningAction::Restart);
        assert_eq!(policy.status_changed(Listening), ListeningAction::Ignore);
    }

    #[test]
    fn test_explicit_stop_wins() {
        let mut policy = ListeningPolicy::new();
        assert_eq!(policy.capture_ended(Processing), ListeningAction::Defer);
        policy.stop();
        assert_eq!(policy.status_changed(Listening), ListeningAction::Ignore);
        assert_eq!(policy.capture_ended(Listening), ListeningAction::Ignore);
    }

    #[test]
    fn test_terminal_states_never_restart() {
        let mut policy = ListeningPolicy::new();
        assert_eq!(policy.capture_ended(Error), ListeningAction::Ignore);
        assert_eq!(policy.capture_ended(Disconnected), ListeningAction::Ignore);
    }
}
