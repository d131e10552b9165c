//! Session lifecycle state machine.
//!
//! An explicit finite state machine for the session lifecycle, so
//! transitions are validated instead of derived implicitly from storage
//! checks. `Unresolved` holds until the first startup resolution completes;
//! `RefreshDeferred` is the transient-failure edge that returns to
//! `Authenticated` with the stale token intact, while `RefreshRejected` is
//! the authoritative edge that ends the session.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Generates the `session_machine` module with State, Input, and the
// StateMachine type alias.
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Unresolved)

    Unresolved => {
        Restore => Restoring,
        LoginAttempt => LoggingIn
    },
    Restoring => {
        RestoredValid => Authenticated,
        RestoreNeedsRefresh => Refreshing,
        RestoreEmpty => Unauthenticated
    },
    Unauthenticated => {
        LoginAttempt => LoggingIn
    },
    LoggingIn => {
        LoginSucceeded => Authenticated,
        LoginFailed => Unauthenticated
    },
    Authenticated => {
        AccessExpired => Refreshing,
        SessionLapsed => Unauthenticated,
        LogoutRequested => LoggingOut
    },
    Refreshing => {
        RefreshSucceeded => Authenticated,
        RefreshDeferred => Authenticated,
        RefreshRejected => Unauthenticated
    },
    LoggingOut => {
        LogoutComplete => Unauthenticated
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Simplified lifecycle phase for status reporting.
///
/// This is a diagnostic view of the machine; gating decisions use the
/// published `SessionState`, which also carries the session payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Startup resolution has not run yet.
    Unresolved,
    /// Reading and validating the stored session.
    Restoring,
    /// A login request is in flight.
    LoggingIn,
    /// A live session backs API calls.
    Authenticated,
    /// A token refresh is in flight.
    Refreshing,
    /// A logout (revoke plus clear) is in flight.
    LoggingOut,
    /// No session; a fresh login is required.
    Unauthenticated,
}

impl SessionPhase {
    /// Returns true for in-progress phases that resolve on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionPhase::Restoring
                | SessionPhase::LoggingIn
                | SessionPhase::Refreshing
                | SessionPhase::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionPhase {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unresolved => SessionPhase::Unresolved,
            SessionMachineState::Restoring => SessionPhase::Restoring,
            SessionMachineState::LoggingIn => SessionPhase::LoggingIn,
            SessionMachineState::Authenticated => SessionPhase::Authenticated,
            SessionMachineState::Refreshing => SessionPhase::Refreshing,
            SessionMachineState::LoggingOut => SessionPhase::LoggingOut,
            SessionMachineState::Unauthenticated => SessionPhase::Unauthenticated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_unresolved() {
        let machine = SessionMachine::new();
        assert_eq!(*machine.state(), SessionMachineState::Unresolved);
    }

    #[test]
    fn restore_with_valid_tokens() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::Restore).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Restoring);

        machine.consume(&SessionInput::RestoredValid).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn restore_through_refresh() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::Restore).unwrap();
        machine.consume(&SessionInput::RestoreNeedsRefresh).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Refreshing);

        machine.consume(&SessionInput::RefreshSucceeded).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn restore_with_no_session() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::Restore).unwrap();
        machine.consume(&SessionInput::RestoreEmpty).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn login_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::Restore).unwrap();
        machine.consume(&SessionInput::RestoreEmpty).unwrap();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingIn);

        machine.consume(&SessionInput::LoginSucceeded).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn login_failure_returns_to_unauthenticated() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginFailed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn transient_refresh_failure_stays_authenticated() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginSucceeded).unwrap();
        machine.consume(&SessionInput::AccessExpired).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Refreshing);

        machine.consume(&SessionInput::RefreshDeferred).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Authenticated);
    }

    #[test]
    fn rejected_refresh_ends_the_session() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginSucceeded).unwrap();
        machine.consume(&SessionInput::AccessExpired).unwrap();
        machine.consume(&SessionInput::RefreshRejected).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn lapsed_refresh_token_ends_the_session_without_refreshing() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginSucceeded).unwrap();
        machine.consume(&SessionInput::SessionLapsed).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn logout_flow() {
        let mut machine = SessionMachine::new();

        machine.consume(&SessionInput::LoginAttempt).unwrap();
        machine.consume(&SessionInput::LoginSucceeded).unwrap();

        machine.consume(&SessionInput::LogoutRequested).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::LoggingOut);

        machine.consume(&SessionInput::LogoutComplete).unwrap();
        assert_eq!(*machine.state(), SessionMachineState::Unauthenticated);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut machine = SessionMachine::new();

        // Cannot log out before resolving.
        assert!(machine.consume(&SessionInput::LogoutRequested).is_err());

        // Cannot claim a refresh outcome without a refresh in flight.
        assert!(machine.consume(&SessionInput::RefreshSucceeded).is_err());

        // Cannot re-resolve once resolution has finished.
        machine.consume(&SessionInput::Restore).unwrap();
        machine.consume(&SessionInput::RestoreEmpty).unwrap();
        assert!(machine.consume(&SessionInput::Restore).is_err());
    }

    #[test]
    fn phase_conversion_covers_all_states() {
        assert_eq!(
            SessionPhase::from(&SessionMachineState::Unresolved),
            SessionPhase::Unresolved
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::Restoring),
            SessionPhase::Restoring
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::LoggingIn),
            SessionPhase::LoggingIn
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::Authenticated),
            SessionPhase::Authenticated
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::Refreshing),
            SessionPhase::Refreshing
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::LoggingOut),
            SessionPhase::LoggingOut
        );
        assert_eq!(
            SessionPhase::from(&SessionMachineState::Unauthenticated),
            SessionPhase::Unauthenticated
        );
    }

    #[test]
    fn transient_phases() {
        assert!(!SessionPhase::Unresolved.is_transient());
        assert!(SessionPhase::Restoring.is_transient());
        assert!(SessionPhase::LoggingIn.is_transient());
        assert!(!SessionPhase::Authenticated.is_transient());
        assert!(SessionPhase::Refreshing.is_transient());
        assert!(SessionPhase::LoggingOut.is_transient());
        assert!(!SessionPhase::Unauthenticated.is_transient());
    }
}
