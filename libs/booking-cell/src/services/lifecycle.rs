use tracing::{debug, warn};

use crate::models::{BookingError, SessionStatus};

/// Outcome of a requested status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition is allowed and should be written.
    Apply,
    /// The session is already in the requested status; nothing to write.
    /// Re-asserting a terminal status twice must not double-process it.
    NoOp,
}

/// Session status state machine: `scheduled` may move to any terminal
/// status; terminal statuses never move again.
pub struct SessionLifecycleService;

impl SessionLifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions(&self, current: &SessionStatus) -> Vec<SessionStatus> {
        match current {
            SessionStatus::Scheduled => vec![
                SessionStatus::Completed,
                SessionStatus::Cancelled,
                SessionStatus::NoShow,
            ],
            // Terminal states - no transitions allowed
            SessionStatus::Completed => vec![],
            SessionStatus::Cancelled => vec![],
            SessionStatus::NoShow => vec![],
        }
    }

    pub fn validate_transition(
        &self,
        current: &SessionStatus,
        requested: &SessionStatus,
    ) -> Result<TransitionOutcome, BookingError> {
        debug!("Validating status transition from {} to {}", current, requested);

        if current == requested {
            return Ok(TransitionOutcome::NoOp);
        }

        if !self.valid_transitions(current).contains(requested) {
            warn!("Invalid status transition attempted: {} -> {}", current, requested);
            return Err(BookingError::InvalidStatusTransition(*current));
        }

        Ok(TransitionOutcome::Apply)
    }
}

impl Default for SessionLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn scheduled_reaches_every_terminal_status() {
        let lifecycle = SessionLifecycleService::new();
        for target in [SessionStatus::Completed, SessionStatus::Cancelled, SessionStatus::NoShow] {
            assert_matches!(
                lifecycle.validate_transition(&SessionStatus::Scheduled, &target),
                Ok(TransitionOutcome::Apply)
            );
        }
    }

    #[test]
    fn terminal_statuses_do_not_move() {
        let lifecycle = SessionLifecycleService::new();
        for current in [SessionStatus::Completed, SessionStatus::Cancelled, SessionStatus::NoShow] {
            for target in [SessionStatus::Scheduled, SessionStatus::Completed, SessionStatus::Cancelled, SessionStatus::NoShow] {
                if current == target {
                    continue;
                }
                assert_matches!(
                    lifecycle.validate_transition(&current, &target),
                    Err(BookingError::InvalidStatusTransition(_))
                );
            }
        }
    }

    #[test]
    fn repeating_a_terminal_status_is_a_noop() {
        let lifecycle = SessionLifecycleService::new();
        assert_matches!(
            lifecycle.validate_transition(&SessionStatus::NoShow, &SessionStatus::NoShow),
            Ok(TransitionOutcome::NoOp)
        );
        assert_matches!(
            lifecycle.validate_transition(&SessionStatus::Cancelled, &SessionStatus::Cancelled),
            Ok(TransitionOutcome::NoOp)
        );
    }

    #[test]
    fn scheduled_to_scheduled_is_a_noop() {
        let lifecycle = SessionLifecycleService::new();
        assert_matches!(
            lifecycle.validate_transition(&SessionStatus::Scheduled, &SessionStatus::Scheduled),
            Ok(TransitionOutcome::NoOp)
        );
    }
}
