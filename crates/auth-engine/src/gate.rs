//! Presentation-layer guard over the session state stream.

use crate::session::SessionState;
use tokio::sync::watch;

/// Gate for protected surfaces.
///
/// Wraps the manager's state stream; consumers show protected content only
/// while the state is `Authenticated` and treat anything else as a redirect
/// to login. The gate never touches storage or the network itself.
pub struct AuthGate {
    rx: watch::Receiver<SessionState>,
}

impl AuthGate {
    /// Create a gate over a subscription from the session manager.
    pub fn new(rx: watch::Receiver<SessionState>) -> Self {
        Self { rx }
    }

    /// Latest observed state.
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// True only while a live session is published.
    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }

    /// Wait until startup resolution has produced a definite state.
    ///
    /// Returns immediately when the state is already past `Unresolved`.
    pub async fn wait_until_resolved(&mut self) -> SessionState {
        loop {
            let state = self.rx.borrow_and_update().clone();
            if !matches!(state, SessionState::Unresolved) {
                return state;
            }
            if self.rx.changed().await.is_err() {
                // Manager dropped; report whatever was last published.
                return self.rx.borrow().clone();
            }
        }
    }

    /// Wait for the next published state change.
    pub async fn changed(&mut self) -> SessionState {
        let _ = self.rx.changed().await;
        self.rx.borrow_and_update().clone()
    }
}
