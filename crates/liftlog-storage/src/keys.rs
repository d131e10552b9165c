//! Storage key constants.

/// Storage keys used by the client
pub struct StorageKeys;

impl StorageKeys {
    /// Logged-in identity record (JSON)
    pub const USER: &'static str = "user";

    /// Access token record: value plus expiry (JSON)
    pub const ACCESS_TOKEN: &'static str = "access_token";

    /// Refresh token record: value plus expiry (JSON)
    pub const REFRESH_TOKEN: &'static str = "refresh_token";
}
