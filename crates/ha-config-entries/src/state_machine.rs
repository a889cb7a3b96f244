//! Config Entry State Machine
//!
//! ```text
//! NotLoaded → SetupInProgress → Loaded
//!                            ↘ SetupError → SetupInProgress (retry)
//!
//! Loaded/SetupError → UnloadInProgress → NotLoaded
//!                                      ↘ FailedUnload (terminal)
//! ```

use crate::entry::ConfigEntryState;
use thiserror::Error;

/// Error when an invalid state transition is attempted
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
pub struct InvalidTransition {
    pub from: ConfigEntryState,
    pub to: ConfigEntryState,
    pub reason: &'static str,
}

impl ConfigEntryState {
    /// Attempt a transition to a new state.
    pub fn try_transition(
        self,
        to: ConfigEntryState,
    ) -> Result<ConfigEntryState, InvalidTransition> {
        use ConfigEntryState::*;

        let reason = match (self, to) {
            (NotLoaded, SetupInProgress)
            | (SetupInProgress, Loaded)
            | (SetupInProgress, SetupError)
            | (SetupError, SetupInProgress)
            | (SetupError, UnloadInProgress)
            | (Loaded, UnloadInProgress)
            | (UnloadInProgress, NotLoaded)
            | (UnloadInProgress, FailedUnload) => return Ok(to),

            (FailedUnload, _) => "FailedUnload is terminal - entry cannot recover",
            (NotLoaded, _) => "Entry must go through SetupInProgress first",
            (Loaded, SetupInProgress) => "Already loaded - unload first before re-setup",
            (Loaded, _) => "Loaded entries must go through UnloadInProgress",
            (SetupInProgress, _) => "Setup in progress - must finish as Loaded or SetupError",
            (UnloadInProgress, _) => "Unload in progress - must finish as NotLoaded or FailedUnload",
            (SetupError, _) => "Failed setup can only be retried or unloaded",
        };

        Err(InvalidTransition {
            from: self,
            to,
            reason,
        })
    }

    /// Check if a transition is valid without performing it
    pub fn can_transition_to(self, to: ConfigEntryState) -> bool {
        self.try_transition(to).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConfigEntryState::*;

    #[test]
    fn test_setup_and_unload_path() {
        let state = NotLoaded
            .try_transition(SetupInProgress)
            .and_then(|s| s.try_transition(Loaded))
            .and_then(|s| s.try_transition(UnloadInProgress))
            .and_then(|s| s.try_transition(NotLoaded))
            .unwrap();
        assert_eq!(state, NotLoaded);
    }

    #[test]
    fn test_setup_error_can_retry_or_unload() {
        assert!(SetupError.can_transition_to(SetupInProgress));
        assert!(SetupError.can_transition_to(UnloadInProgress));
        assert!(!SetupError.can_transition_to(Loaded));
    }

    #[test]
    fn test_shortcuts_rejected() {
        let err = NotLoaded.try_transition(Loaded).unwrap_err();
        assert_eq!(err.from, NotLoaded);
        assert_eq!(err.to, Loaded);

        assert!(!Loaded.can_transition_to(NotLoaded));
        assert!(!Loaded.can_transition_to(SetupInProgress));
        assert!(!SetupInProgress.can_transition_to(NotLoaded));
        assert!(!UnloadInProgress.can_transition_to(Loaded));
    }

    #[test]
    fn test_failed_unload_is_terminal() {
        for to in [NotLoaded, SetupInProgress, Loaded, SetupError, UnloadInProgress] {
            let err = FailedUnload.try_transition(to).unwrap_err();
            assert!(err.reason.contains("terminal"));
        }
    }

    #[test]
    fn test_error_display() {
        let msg = NotLoaded.try_transition(Loaded).unwrap_err().to_string();
        assert!(msg.contains("NotLoaded"));
        assert!(msg.contains("SetupInProgress first"));
    }
}
