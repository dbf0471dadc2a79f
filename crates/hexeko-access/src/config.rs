//! Invitation service configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the invitation lifecycle and its token cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InvitationConfig {
    /// Days between invitation and expiry (default: 7).
    pub expiry_days: u32,
    /// Token-lookup cache TTL in seconds (default: 300). `0` disables
    /// the cache entirely.
    pub token_cache_ttl_secs: u64,
    /// Maximum number of cached token lookups (default: 10_000).
    pub token_cache_max_entries: u64,
    /// Attempts at inserting an invitee when the generated token collides
    /// with an existing one (default: 3).
    pub token_retry_attempts: u32,
    pub default_locale: String,
    pub default_currency: String,
    pub default_timezone: String,
}

impl Default for InvitationConfig {
    fn default() -> Self {
        Self {
            expiry_days: 7,
            token_cache_ttl_secs: 300,
            token_cache_max_entries: 10_000,
            token_retry_attempts: 3,
            default_locale: "fr-FR".into(),
            default_currency: "EUR".into(),
            default_timezone: "Europe/Paris".into(),
        }
    }
}
