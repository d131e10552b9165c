//! Unverified JWT claims decoding.
//!
//! The client never validates signatures; it only reads the subject and
//! expiry claims the server embeds in each token it issues.

use crate::{AuthError, AuthResult};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Claims the client reads from a token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    /// Subject: the username this token was issued to.
    pub sub: String,
    /// Expiry in seconds since the Unix epoch.
    pub exp: i64,
}

/// Decode the payload segment of a JWT without verifying the signature.
pub fn decode_claims(token: &str) -> AuthResult<TokenClaims> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_signature)) =
        (segments.next(), segments.next(), segments.next())
    else {
        return Err(AuthError::MalformedToken(
            "expected three dot-separated segments".to_string(),
        ));
    };
    if segments.next().is_some() {
        return Err(AuthError::MalformedToken(
            "too many segments".to_string(),
        ));
    }

    let raw = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::MalformedToken(e.to_string()))?;

    serde_json::from_slice(&raw).map_err(|e| AuthError::MalformedToken(e.to_string()))
}
