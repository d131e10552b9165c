//! High-level API for the persisted session.

use crate::{KeyValueStorage, StorageError, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};

/// A bearer token with its expiry in epoch seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedToken {
    /// Raw token value.
    pub value: String,
    /// Expiry in seconds since the Unix epoch.
    pub expires_at: i64,
}

/// The persisted session record: identity plus both tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSession {
    /// Username of the logged-in identity.
    pub username: String,
    /// Short-lived bearer credential for API calls.
    pub access_token: PersistedToken,
    /// Longer-lived credential used to mint new access tokens.
    pub refresh_token: PersistedToken,
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    username: String,
}

/// Typed facade over the raw key-value storage, owning the auth keys.
///
/// Only this type writes the session keys; everything else reads session
/// state through the session manager.
pub struct SessionStore {
    storage: Box<dyn KeyValueStorage>,
}

impl SessionStore {
    /// Create a session store over the given storage backend.
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Load the persisted session.
    ///
    /// A missing or malformed record under any of the three keys reads as no
    /// session, so startup resolves deterministically instead of failing on
    /// corrupt storage.
    pub fn load(&self) -> StorageResult<Option<PersistedSession>> {
        let user = self.storage.get(StorageKeys::USER)?;
        let access = self.storage.get(StorageKeys::ACCESS_TOKEN)?;
        let refresh = self.storage.get(StorageKeys::REFRESH_TOKEN)?;

        let (Some(user), Some(access), Some(refresh)) = (user, access, refresh) else {
            return Ok(None);
        };

        let Some(user) = decode_record::<UserRecord>(StorageKeys::USER, &user) else {
            return Ok(None);
        };
        let Some(access_token) =
            decode_record::<PersistedToken>(StorageKeys::ACCESS_TOKEN, &access)
        else {
            return Ok(None);
        };
        let Some(refresh_token) =
            decode_record::<PersistedToken>(StorageKeys::REFRESH_TOKEN, &refresh)
        else {
            return Ok(None);
        };

        Ok(Some(PersistedSession {
            username: user.username,
            access_token,
            refresh_token,
        }))
    }

    /// Persist the session under the three well-known keys.
    pub fn save(&self, session: &PersistedSession) -> StorageResult<()> {
        let user = encode_record(&UserRecord {
            username: session.username.clone(),
        })?;
        let access = encode_record(&session.access_token)?;
        let refresh = encode_record(&session.refresh_token)?;

        self.storage.set(StorageKeys::USER, &user)?;
        self.storage.set(StorageKeys::ACCESS_TOKEN, &access)?;
        self.storage.set(StorageKeys::REFRESH_TOKEN, &refresh)?;
        Ok(())
    }

    /// Remove all session keys.
    pub fn clear(&self) -> StorageResult<()> {
        let _ = self.storage.delete(StorageKeys::USER);
        let _ = self.storage.delete(StorageKeys::ACCESS_TOKEN);
        let _ = self.storage.delete(StorageKeys::REFRESH_TOKEN);
        Ok(())
    }
}

fn encode_record<T: Serialize>(record: &T) -> StorageResult<String> {
    serde_json::to_string(record).map_err(|e| StorageError::Encoding(e.to_string()))
}

fn decode_record<T: for<'de> Deserialize<'de>>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(record) => Some(record),
        Err(err) => {
            tracing::debug!(key = %key, error = %err, "Malformed stored record, treating as absent");
            None
        }
    }
}
