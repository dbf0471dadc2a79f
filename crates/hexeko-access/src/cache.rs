//! In-memory cache for invitation token lookups.
//!
//! Uses a `moka` async cache in front of the user repository. Only
//! successful lookups are cached: an unknown token always falls through
//! to the database, so a token that starts resolving (new invitation) is
//! visible immediately.
//!
//! Entries are keyed `invitation:token:{token}` and must be invalidated
//! after any mutation of the user the token resolves to.

use std::time::Duration;

use hexeko_core::models::user::User;
use moka::future::Cache;

use crate::config::InvitationConfig;

/// Cache key for a token lookup.
pub fn cache_key(token: &str) -> String {
    format!("invitation:token:{token}")
}

/// Token → invited user cache.
///
/// A zero TTL in the configuration disables caching: every call then
/// behaves as a miss and inserts are dropped.
#[derive(Clone)]
pub struct InvitationTokenCache {
    cache: Option<Cache<String, User>>,
}

impl InvitationTokenCache {
    pub fn new(config: &InvitationConfig) -> Self {
        let cache = (config.token_cache_ttl_secs > 0).then(|| {
            Cache::builder()
                .max_capacity(config.token_cache_max_entries)
                .time_to_live(Duration::from_secs(config.token_cache_ttl_secs))
                .build()
        });

        Self { cache }
    }

    pub async fn get(&self, token: &str) -> Option<User> {
        match &self.cache {
            Some(cache) => cache.get(&cache_key(token)).await,
            None => None,
        }
    }

    pub async fn insert(&self, token: &str, user: User) {
        if let Some(cache) = &self.cache {
            cache.insert(cache_key(token), user).await;
        }
    }

    pub async fn invalidate(&self, token: &str) {
        if let Some(cache) = &self.cache {
            cache.invalidate(&cache_key(token)).await;
        }
    }

    /// Drop every entry (after a batch mutation that does not report which
    /// tokens it touched).
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }
}
