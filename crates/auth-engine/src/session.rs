//! Session management with automatic token refresh.
//!
//! `SessionManager` owns the in-memory session, mirrors it to the session
//! store, and publishes every state change on a watch channel so consumers
//! always observe a consistent state/token pair. Refreshes are serialized
//! behind an async gate: however many callers race on an expired access
//! token, the server sees one refresh request.

use crate::api::{AuthApi, Identity, LoginOutcome, NewUser, Profile, RefreshOutcome, RevokeOutcome, Token};
use crate::session_fsm::{SessionInput, SessionMachine, SessionPhase};
use crate::{AuthError, AuthResult};
use liftlog_core::Clock;
use liftlog_storage::{PersistedSession, PersistedToken, SessionStore};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// The in-memory record of a logged-in identity and its token pair.
///
/// If a session exists, both tokens are structurally present, expired or
/// not; a session missing a token is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Who is logged in, from the access token's subject at login time.
    pub identity: Identity,
    /// Short-lived bearer credential for API calls.
    pub access_token: Token,
    /// Longer-lived credential used solely to mint new access tokens.
    pub refresh_token: Token,
}

/// Externally observable session state, published on the watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Startup resolution has not completed yet.
    Unresolved,
    /// A live session backs API calls.
    Authenticated(Session),
    /// No session; a fresh login is required.
    Unauthenticated,
}

impl SessionState {
    /// True only when a live session is present.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

impl From<&Session> for PersistedSession {
    fn from(session: &Session) -> Self {
        PersistedSession {
            username: session.identity.username.clone(),
            access_token: PersistedToken {
                value: session.access_token.value.clone(),
                expires_at: session.access_token.expires_at,
            },
            refresh_token: PersistedToken {
                value: session.refresh_token.value.clone(),
                expires_at: session.refresh_token.expires_at,
            },
        }
    }
}

impl From<PersistedSession> for Session {
    fn from(persisted: PersistedSession) -> Self {
        Session {
            identity: Identity {
                username: persisted.username,
            },
            access_token: Token {
                value: persisted.access_token.value,
                expires_at: persisted.access_token.expires_at,
            },
            refresh_token: Token {
                value: persisted.refresh_token.value,
                expires_at: persisted.refresh_token.expires_at,
            },
        }
    }
}

/// Session manager: owns the session, its persistence, and the refresh
/// decision procedure.
///
/// Constructed once at process start with an injected clock, store, and
/// network adapter, then shared by reference; there are no ambient globals.
pub struct SessionManager {
    store: SessionStore,
    api: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    machine: Mutex<SessionMachine>,
    session: Mutex<Option<Session>>,
    state_tx: watch::Sender<SessionState>,
    /// Serializes cold-path refreshes so concurrent callers share one
    /// network attempt.
    refresh_gate: tokio::sync::Mutex<()>,
    /// Seconds before nominal expiry at which a token already counts as
    /// expired. Zero unless configured.
    expiry_leeway: i64,
}

impl SessionManager {
    /// Create a new session manager.
    pub fn new(store: SessionStore, api: Arc<dyn AuthApi>, clock: Arc<dyn Clock>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Unresolved);
        Self {
            store,
            api,
            clock,
            machine: Mutex::new(SessionMachine::new()),
            session: Mutex::new(None),
            state_tx,
            refresh_gate: tokio::sync::Mutex::new(()),
            expiry_leeway: 0,
        }
    }

    /// Treat tokens as expired `leeway` seconds before their nominal
    /// expiry. Defaults to zero.
    pub fn with_expiry_leeway(mut self, leeway: i64) -> Self {
        self.expiry_leeway = leeway;
        self
    }

    /// Latest published state.
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Current diagnostic lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from(self.machine.lock().unwrap().state())
    }

    /// Apply an input to the state machine, logging the phase change.
    fn transition(&self, input: &SessionInput) -> AuthResult<()> {
        let mut machine = self.machine.lock().unwrap();
        let before = SessionPhase::from(machine.state());
        machine.consume(input).map_err(|_| {
            AuthError::InvalidTransition(format!("cannot apply {:?} in phase {:?}", input, before))
        })?;
        let after = SessionPhase::from(machine.state());
        drop(machine);

        if before != after {
            debug!(from = ?before, to = ?after, "Session phase transition");
        }
        Ok(())
    }

    /// Publish `next` unless it equals the current state, so consumers only
    /// wake on real changes.
    fn publish(&self, next: SessionState) {
        self.state_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }

    /// Swap in a session and publish it as one atomic update.
    fn install_session(&self, session: Session) {
        let mut guard = self.session.lock().unwrap();
        *guard = Some(session.clone());
        self.publish(SessionState::Authenticated(session));
    }

    /// Drop the in-memory session and publish `Unauthenticated`.
    fn drop_session(&self) {
        let mut guard = self.session.lock().unwrap();
        *guard = None;
        self.publish(SessionState::Unauthenticated);
    }

    /// Clear persisted session state, logging rather than failing: a local
    /// logout must always complete.
    fn clear_store(&self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear session storage");
        }
    }

    /// Resolve the persisted session at startup.
    ///
    /// Publishes the first definite state: `Authenticated` when the stored
    /// session is usable (refreshing the access token if needed),
    /// `Unauthenticated` otherwise. Corrupt or partial storage reads as no
    /// session.
    pub async fn resolve(&self) -> AuthResult<SessionState> {
        self.transition(&SessionInput::Restore)?;

        let persisted = match self.store.load() {
            Ok(p) => p,
            Err(err) => {
                warn!(error = %err, "Session storage unreadable, starting logged out");
                None
            }
        };

        let Some(persisted) = persisted else {
            info!("No stored session found");
            self.transition(&SessionInput::RestoreEmpty)?;
            self.drop_session();
            return Ok(self.state());
        };

        let session = Session::from(persisted);
        let now = self.clock.now();

        if session.refresh_token.is_expired(now, self.expiry_leeway) {
            info!(
                username = %session.identity.username,
                "Stored refresh token expired, clearing session"
            );
            self.clear_store();
            self.transition(&SessionInput::RestoreEmpty)?;
            self.drop_session();
            return Ok(self.state());
        }

        if !session.access_token.is_expired(now, self.expiry_leeway) {
            info!(
                username = %session.identity.username,
                "Restored session with valid access token"
            );
            self.transition(&SessionInput::RestoredValid)?;
            self.install_session(session);
            return Ok(self.state());
        }

        info!(
            username = %session.identity.username,
            "Restored session needs a refresh"
        );
        self.transition(&SessionInput::RestoreNeedsRefresh)?;

        match self.api.refresh(&session.refresh_token.value).await {
            RefreshOutcome::Refreshed(token) => {
                let refreshed = Session {
                    access_token: token,
                    ..session
                };
                if let Err(err) = self.store.save(&PersistedSession::from(&refreshed)) {
                    warn!(error = %err, "Failed to persist refreshed session");
                }
                self.transition(&SessionInput::RefreshSucceeded)?;
                self.install_session(refreshed);
                info!("Session refreshed during startup");
            }
            RefreshOutcome::Invalid => {
                warn!("Server rejected the stored refresh token, clearing session");
                self.clear_store();
                self.transition(&SessionInput::RefreshRejected)?;
                self.drop_session();
            }
            RefreshOutcome::Transient { detail } => {
                // Keep the stale session: the next token request retries.
                warn!(
                    detail = %detail,
                    "Startup refresh hit a transient failure, keeping stored session"
                );
                self.transition(&SessionInput::RefreshDeferred)?;
                self.install_session(session);
            }
        }

        Ok(self.state())
    }

    /// Log in with username and password.
    ///
    /// On success the session is persisted and `Authenticated` published.
    /// A credential rejection carries the server's detail message and leaves
    /// the published state unchanged; so does a transient failure.
    pub async fn login(&self, username: &str, password: &str) -> AuthResult<Session> {
        self.transition(&SessionInput::LoginAttempt)?;

        match self.api.login(username, password).await {
            LoginOutcome::Success {
                identity,
                access_token,
                refresh_token,
            } => {
                let session = Session {
                    identity,
                    access_token,
                    refresh_token,
                };
                if let Err(err) = self.store.save(&PersistedSession::from(&session)) {
                    let _ = self.transition(&SessionInput::LoginFailed);
                    return Err(err.into());
                }
                self.transition(&SessionInput::LoginSucceeded)?;
                self.install_session(session.clone());
                info!(username = %session.identity.username, "Login successful");
                Ok(session)
            }
            LoginOutcome::InvalidCredentials { detail } => {
                warn!(detail = %detail, "Login rejected");
                self.transition(&SessionInput::LoginFailed)?;
                self.drop_session();
                Err(AuthError::InvalidCredentials(detail))
            }
            LoginOutcome::Transient { detail } => {
                warn!(detail = %detail, "Login failed with a transient error");
                self.transition(&SessionInput::LoginFailed)?;
                self.drop_session();
                Err(AuthError::Transient(detail))
            }
        }
    }

    /// Get a currently valid access token, refreshing transparently when
    /// needed.
    ///
    /// The hot path (unexpired token) returns without suspending. The cold
    /// path performs at most one refresh across any number of concurrent
    /// callers: the first caller holds the gate for the network round trip
    /// and everyone queued behind it re-reads the outcome.
    pub async fn get_valid_access_token(&self) -> AuthResult<String> {
        let now = self.clock.now();
        {
            let session = self.session.lock().unwrap();
            match session.as_ref() {
                None => return Err(AuthError::NotAuthenticated),
                Some(s) if !s.access_token.is_expired(now, self.expiry_leeway) => {
                    return Ok(s.access_token.value.clone());
                }
                Some(_) => {}
            }
        }

        let _gate = self.refresh_gate.lock().await;

        // Re-examine under the gate: an earlier caller may already have
        // refreshed, or ended the session.
        let now = self.clock.now();
        let stale = {
            let session = self.session.lock().unwrap();
            match session.as_ref() {
                None => return Err(AuthError::NotAuthenticated),
                Some(s) if !s.access_token.is_expired(now, self.expiry_leeway) => {
                    return Ok(s.access_token.value.clone());
                }
                Some(s) => s.clone(),
            }
        };

        if stale.refresh_token.is_expired(now, self.expiry_leeway) {
            info!("Refresh token expired, session is over");
            self.clear_store();
            self.transition(&SessionInput::SessionLapsed)?;
            self.drop_session();
            return Err(AuthError::SessionExpired);
        }

        debug!("Access token expired, refreshing");
        self.transition(&SessionInput::AccessExpired)?;

        match self.api.refresh(&stale.refresh_token.value).await {
            RefreshOutcome::Refreshed(token) => {
                let refreshed = Session {
                    access_token: token,
                    ..stale
                };
                if let Err(err) = self.store.save(&PersistedSession::from(&refreshed)) {
                    warn!(error = %err, "Failed to persist refreshed session");
                }
                self.transition(&SessionInput::RefreshSucceeded)?;
                let value = refreshed.access_token.value.clone();
                self.install_session(refreshed);
                info!("Access token refreshed");
                Ok(value)
            }
            RefreshOutcome::Invalid => {
                warn!("Server rejected the refresh token, clearing session");
                self.clear_store();
                self.transition(&SessionInput::RefreshRejected)?;
                self.drop_session();
                Err(AuthError::SessionExpired)
            }
            RefreshOutcome::Transient { detail } => {
                debug!(detail = %detail, "Refresh hit a transient failure, keeping session");
                self.transition(&SessionInput::RefreshDeferred)?;
                Err(AuthError::Transient(detail))
            }
        }
    }

    /// Log out locally, revoking the refresh token best-effort.
    ///
    /// Never fails: revoke and storage errors are logged, and the local
    /// session is cleared regardless.
    pub async fn logout(&self) {
        let session = self.session.lock().unwrap().clone();

        if let Some(session) = session {
            let _ = self.transition(&SessionInput::LogoutRequested);
            match self.api.revoke(&session.refresh_token.value).await {
                RevokeOutcome::Revoked => debug!("Refresh token revoked"),
                RevokeOutcome::Transient { detail } => {
                    warn!(
                        detail = %detail,
                        "Failed to revoke refresh token, continuing local logout"
                    );
                }
            }
            let _ = self.transition(&SessionInput::LogoutComplete);
        }

        self.clear_store();
        self.drop_session();
        info!("Logged out");
    }

    /// Delete the account on the server, then clear the local session.
    ///
    /// The local session is cleared and `Unauthenticated` published no
    /// matter what the server answered, so the client never sits in an
    /// authenticated-but-deleted limbo; the server error, if any, is
    /// returned for display.
    pub async fn delete_account(&self) -> AuthResult<()> {
        let access_token = self.get_valid_access_token().await?;

        let result = self.api.delete_account(&access_token).await;
        if let Err(err) = &result {
            warn!(error = %err, "Account deletion request failed, clearing local session anyway");
        }

        let refresh_value = self
            .session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.refresh_token.value.clone());

        let _ = self.transition(&SessionInput::LogoutRequested);
        if let Some(refresh_value) = refresh_value {
            if let RevokeOutcome::Transient { detail } = self.api.revoke(&refresh_value).await {
                debug!(detail = %detail, "Revoke after account deletion failed");
            }
        }
        let _ = self.transition(&SessionInput::LogoutComplete);

        self.clear_store();
        self.drop_session();
        info!("Account deletion completed locally");

        result
    }

    /// Fetch profile metadata for the logged-in user.
    pub async fn profile(&self) -> AuthResult<Profile> {
        let access_token = self.get_valid_access_token().await?;
        self.api.fetch_profile(&access_token).await
    }

    /// Create a new account. No session side effects.
    pub async fn register(&self, new_user: &NewUser) -> AuthResult<String> {
        self.api.register(new_user).await
    }
}
