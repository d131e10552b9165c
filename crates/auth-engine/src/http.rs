//! HTTP implementation of the auth endpoints.

use crate::api::{
    AuthApi, Identity, LoginOutcome, NewUser, Profile, RefreshOutcome, RevokeOutcome, Token,
};
use crate::claims::decode_claims;
use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// HTTP client for the workout service's user endpoints.
#[derive(Clone)]
pub struct HttpAuthClient {
    http_client: reqwest::Client,
    base_url: String,
}

/// Error envelope the service returns on every non-2xx response.
#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: String,
}

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Wire body for refresh and revoke calls.
#[derive(Debug, Serialize)]
struct RefreshTokenBody {
    refresh_token: String,
    token_type: String,
}

impl RefreshTokenBody {
    fn bearer(refresh_token: &str) -> Self {
        Self {
            refresh_token: refresh_token.to_string(),
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UsernameResponse {
    username: String,
}

impl HttpAuthClient {
    /// Create a new client for the service at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL for a path under `/users`.
    fn users_url(&self, path: &str) -> String {
        format!("{}/users{}", self.base_url, path)
    }
}

/// Pull the `detail` message out of an error response, falling back to the
/// status line when the envelope does not parse.
async fn read_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorDetail>().await {
        Ok(body) => body.detail,
        Err(_) => format!("HTTP {}", status),
    }
}

/// Build a `Token` from a raw JWT by decoding its expiry claim.
fn token_from_jwt(value: String) -> AuthResult<Token> {
    let claims = decode_claims(&value)?;
    Ok(Token {
        value,
        expires_at: claims.exp,
    })
}

#[async_trait]
impl AuthApi for HttpAuthClient {
    async fn login(&self, username: &str, password: &str) -> LoginOutcome {
        let url = self.users_url("/token");
        debug!(url = %url, username = %username, "Attempting login");

        let response = match self
            .http_client
            .post(&url)
            .form(&[("username", username), ("password", password)])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return LoginOutcome::Transient {
                    detail: e.to_string(),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = read_detail(response).await;
            warn!(status = %status, detail = %detail, "Login rejected");
            let credential_rejection = status == StatusCode::BAD_REQUEST
                || status == StatusCode::UNAUTHORIZED
                || status == StatusCode::NOT_FOUND;
            return if credential_rejection {
                LoginOutcome::InvalidCredentials { detail }
            } else {
                LoginOutcome::Transient { detail }
            };
        }

        let data: TokenPairResponse = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                return LoginOutcome::Transient {
                    detail: e.to_string(),
                }
            }
        };

        // The subject claim of the access token names the identity.
        let access_claims = match decode_claims(&data.access_token) {
            Ok(c) => c,
            Err(e) => {
                return LoginOutcome::Transient {
                    detail: e.to_string(),
                }
            }
        };
        let refresh_token = match token_from_jwt(data.refresh_token) {
            Ok(t) => t,
            Err(e) => {
                return LoginOutcome::Transient {
                    detail: e.to_string(),
                }
            }
        };

        debug!(username = %access_claims.sub, "Login accepted");

        LoginOutcome::Success {
            identity: Identity {
                username: access_claims.sub,
            },
            access_token: Token {
                value: data.access_token,
                expires_at: access_claims.exp,
            },
            refresh_token,
        }
    }

    async fn refresh(&self, refresh_token: &str) -> RefreshOutcome {
        let url = self.users_url("/refresh");
        debug!(url = %url, "Refreshing access token");

        let response = match self
            .http_client
            .post(&url)
            .json(&RefreshTokenBody::bearer(refresh_token))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return RefreshOutcome::Transient {
                    detail: e.to_string(),
                }
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!("Refresh token unknown to the server");
            return RefreshOutcome::Invalid;
        }
        if !status.is_success() {
            let detail = read_detail(response).await;
            warn!(status = %status, detail = %detail, "Refresh failed");
            return RefreshOutcome::Transient { detail };
        }

        let data: AccessTokenResponse = match response.json().await {
            Ok(d) => d,
            Err(e) => {
                return RefreshOutcome::Transient {
                    detail: e.to_string(),
                }
            }
        };

        match token_from_jwt(data.access_token) {
            Ok(token) => RefreshOutcome::Refreshed(token),
            Err(e) => RefreshOutcome::Transient {
                detail: e.to_string(),
            },
        }
    }

    async fn revoke(&self, refresh_token: &str) -> RevokeOutcome {
        let url = self.users_url("/refresh");
        debug!(url = %url, "Revoking refresh token");

        let response = match self
            .http_client
            .delete(&url)
            .json(&RefreshTokenBody::bearer(refresh_token))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                return RevokeOutcome::Transient {
                    detail: e.to_string(),
                }
            }
        };

        let status = response.status();
        // A token the server no longer knows is as revoked as it gets.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return RevokeOutcome::Revoked;
        }

        let detail = read_detail(response).await;
        warn!(status = %status, detail = %detail, "Revoke failed");
        RevokeOutcome::Transient { detail }
    }

    async fn delete_account(&self, access_token: &str) -> AuthResult<()> {
        let url = self.users_url("/me");
        debug!(url = %url, "Deleting account");

        let response = self
            .http_client
            .delete(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| AuthError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = read_detail(response).await;
        warn!(status = %status, detail = %detail, "Account deletion rejected");
        if status == StatusCode::UNAUTHORIZED {
            Err(AuthError::SessionExpired)
        } else if status.is_server_error() {
            Err(AuthError::Transient(detail))
        } else {
            Err(AuthError::Rejected(detail))
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> AuthResult<Profile> {
        let url = self.users_url("/me");
        debug!(url = %url, "Fetching profile");

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| AuthError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Profile>()
                .await
                .map_err(|e| AuthError::Transient(e.to_string()));
        }

        let detail = read_detail(response).await;
        warn!(status = %status, detail = %detail, "Profile fetch rejected");
        if status == StatusCode::UNAUTHORIZED {
            Err(AuthError::SessionExpired)
        } else if status.is_server_error() {
            Err(AuthError::Transient(detail))
        } else {
            Err(AuthError::Rejected(detail))
        }
    }

    async fn register(&self, new_user: &NewUser) -> AuthResult<String> {
        let url = self.users_url("");
        debug!(url = %url, username = %new_user.username, "Registering account");

        let response = self
            .http_client
            .post(&url)
            .json(new_user)
            .send()
            .await
            .map_err(|e| AuthError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let data: UsernameResponse = response
                .json()
                .await
                .map_err(|e| AuthError::Transient(e.to_string()))?;
            return Ok(data.username);
        }

        let detail = read_detail(response).await;
        warn!(status = %status, detail = %detail, "Registration rejected");
        if status.is_server_error() {
            Err(AuthError::Transient(detail))
        } else {
            Err(AuthError::Rejected(detail))
        }
    }
}
