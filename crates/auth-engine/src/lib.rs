//! Authentication session engine for the LiftLog client.
//!
//! This crate owns the client's logged-in identity:
//! - Establishing a session at login and persisting it
//! - Refreshing the access token on demand, with at most one refresh in
//!   flight at a time
//! - Revoking the session at logout or account deletion
//! - Publishing a session state stream that consumers gate protected
//!   surfaces on

mod api;
mod claims;
mod error;
mod gate;
mod http;
mod session;
mod session_fsm;

pub use api::{
    AuthApi, Identity, LoginOutcome, NewUser, Profile, RefreshOutcome, RevokeOutcome, Token,
};
pub use claims::{decode_claims, TokenClaims};
pub use error::{AuthError, AuthResult};
pub use gate::AuthGate;
pub use http::HttpAuthClient;
pub use session::{Session, SessionManager, SessionState};
pub use session_fsm::session_machine;
pub use session_fsm::{SessionInput, SessionMachine, SessionMachineState, SessionPhase};
