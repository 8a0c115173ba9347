//! Bearer-token cache shared across service instances
//!
//! Tokens are keyed per (bank, covenant-or-agency, beneficiary document) so
//! independent credentials never collide. Concurrent callers that miss the
//! cache may race to authenticate; both tokens are valid, so no lock is
//! held across the token request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

/// Pluggable token store with TTL semantics
#[async_trait]
pub trait TokenCache: Send + Sync {
    /// Token for `key`, if present and not expired
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a token under `key` for `ttl`
    async fn put(&self, key: &str, token: String, ttl: Duration);
}

/// Cache key for a bank token: hex SHA-256 over the bank tag, the
/// covenant/agency scope and the beneficiary document.
pub fn token_key(bank: &str, scope: &str, document: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"boleto-");
    hasher.update(bank.as_bytes());
    hasher.update(scope.as_bytes());
    hasher.update(document.as_bytes());
    hex::encode(hasher.finalize())
}

/// In-memory map with per-entry expiry; the default backend
#[derive(Default)]
pub struct InMemoryTokenCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryTokenCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenCache for InMemoryTokenCache {
    async fn get(&self, key: &str) -> Option<String> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((token, expires_at)) if *expires_at > Instant::now() => {
                    return Some(token.clone())
                }
                Some(_) => {}
                None => return None,
            }
        }
        // expired: evict lazily
        let mut entries = self.entries.write().await;
        if let Some((_, expires_at)) = entries.get(key) {
            if *expires_at <= Instant::now() {
                entries.remove(key);
            }
        }
        None
    }

    async fn put(&self, key: &str, token: String, ttl: Duration) {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), (token, Instant::now() + ttl));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get_within_ttl() {
        let cache = InMemoryTokenCache::new();
        cache
            .put("k", "tok-1".to_string(), Duration::from_secs(60))
            .await;
        assert_eq!(cache.get("k").await.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted() {
        let cache = InMemoryTokenCache::new();
        cache
            .put("k", "tok-1".to_string(), Duration::from_millis(0))
            .await;
        assert_eq!(cache.get("k").await, None);
        // evicted, not just hidden
        assert!(cache.entries.read().await.is_empty());
    }

    #[test]
    fn test_token_key_is_stable_and_scoped() {
        let a = token_key("bradesco", "3861", "68542653101838");
        assert_eq!(a, token_key("bradesco", "3861", "68542653101838"));
        assert_ne!(a, token_key("bradesco", "3862", "68542653101838"));
        assert_ne!(a, token_key("santander", "3861", "68542653101838"));
    }
}
