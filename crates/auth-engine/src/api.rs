//! Network adapter contract for the auth endpoints.
//!
//! Every operation returns a discriminated outcome; implementations never
//! propagate raw transport errors across this boundary. The split between
//! authoritative rejections and transient failures is the load-bearing part
//! of this contract: collapsing the two either locks users out on a flaky
//! network or leaves zombie sessions that never re-authenticate.

use crate::AuthResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A bearer token plus its expiry in epoch seconds.
///
/// Immutable once issued; expiry is authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Raw token value sent as the bearer credential.
    pub value: String,
    /// Expiry in seconds since the Unix epoch.
    pub expires_at: i64,
}

impl Token {
    /// True when the token is unusable at `now`, treating it as expired
    /// `leeway` seconds early.
    pub fn is_expired(&self, now: i64, leeway: i64) -> bool {
        self.expires_at <= now + leeway
    }
}

/// The logged-in identity, taken from the access token's subject at login
/// and never re-derived afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Username the tokens were issued to.
    pub username: String,
}

/// Profile metadata returned by the service.
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    /// Username of the account.
    pub username: String,
    /// Email address, when set.
    #[serde(default)]
    pub email: Option<String>,
    /// Full display name, when set.
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Payload for account registration.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub full_name: String,
}

/// Outcome of a login attempt.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Credentials accepted; both tokens issued.
    Success {
        identity: Identity,
        access_token: Token,
        refresh_token: Token,
    },
    /// Authoritative credential rejection with the server's detail message.
    InvalidCredentials { detail: String },
    /// Network or server hiccup; safe to retry.
    Transient { detail: String },
}

/// Outcome of a token refresh.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// A new access token was minted; the refresh token is unchanged.
    Refreshed(Token),
    /// The refresh token is unknown or expired server-side. Authoritative:
    /// the session is over.
    Invalid,
    /// Network or server hiccup; the session is still presumed alive.
    Transient { detail: String },
}

/// Outcome of a refresh-token revocation. Advisory: local logout proceeds
/// either way.
#[derive(Debug, Clone)]
pub enum RevokeOutcome {
    /// The server dropped the token (or never knew it).
    Revoked,
    /// The server could not be reached; the token may outlive the session.
    Transient { detail: String },
}

/// The network operations the session core needs.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a token pair.
    async fn login(&self, username: &str, password: &str) -> LoginOutcome;

    /// Mint a new access token from a refresh token.
    async fn refresh(&self, refresh_token: &str) -> RefreshOutcome;

    /// Revoke a refresh token server-side.
    async fn revoke(&self, refresh_token: &str) -> RevokeOutcome;

    /// Delete the account the access token belongs to.
    async fn delete_account(&self, access_token: &str) -> AuthResult<()>;

    /// Fetch profile metadata for the access token's user.
    async fn fetch_profile(&self, access_token: &str) -> AuthResult<Profile>;

    /// Create a new account; returns the created username.
    async fn register(&self, new_user: &NewUser) -> AuthResult<String>;
}
