//! Access tokens for Firestore requests.
//!
//! Service-account tokens are cached and refreshed a minute before expiry.
//! Refreshes are serialized behind a write lock so concurrent callers wait
//! for a single round-trip. The emulator accepts a fixed bearer token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use gcp_auth::TokenProvider;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{FirestoreError, FirestoreResult};

/// Refresh this long before the token expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// TTL assumed when the provider reports an unusable expiry.
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// OAuth scope for Firestore access.
pub const FIRESTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

/// Bearer token the Firestore emulator treats as an admin credential.
pub const EMULATOR_TOKEN: &str = "owner";

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Cache around a `gcp_auth` provider.
pub struct TokenCache {
    auth: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(auth: Arc<dyn TokenProvider>) -> Self {
        Self {
            auth,
            cache: RwLock::new(None),
        }
    }

    /// Drop the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Return a fresh token, refreshing at most once across concurrent callers.
    pub async fn get_token(&self) -> FirestoreResult<String> {
        if let Some(cached) = self.cache.read().await.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref() {
            if cached.is_fresh() {
                return Ok(cached.access_token.clone());
            }
        }

        match self.auth.token(&[FIRESTORE_SCOPE]).await {
            Ok(token) => {
                let now = Utc::now();
                let expires_at = match (token.expires_at() - now).to_std() {
                    Ok(ttl) => Instant::now() + ttl,
                    Err(_) if token.expires_at() <= now => Instant::now(),
                    Err(_) => Instant::now() + TOKEN_DEFAULT_TTL,
                };
                let access_token = token.as_str().to_string();
                *cache = Some(CachedToken {
                    access_token: access_token.clone(),
                    expires_at,
                });
                debug!("Refreshed Firestore access token");
                Ok(access_token)
            }
            Err(e) => match cache.as_ref() {
                Some(cached) if cached.is_usable() => {
                    warn!("Token refresh failed, reusing current token: {}", e);
                    Ok(cached.access_token.clone())
                }
                _ => Err(FirestoreError::auth_error(format!(
                    "Failed to obtain auth token: {}",
                    e
                ))),
            },
        }
    }
}

/// Where request credentials come from.
pub enum TokenSource {
    /// Local emulator, no OAuth.
    Emulator,
    /// Service account with cached tokens.
    ServiceAccount(TokenCache),
}

impl TokenSource {
    pub async fn token(&self) -> FirestoreResult<String> {
        match self {
            TokenSource::Emulator => Ok(EMULATOR_TOKEN.to_string()),
            TokenSource::ServiceAccount(cache) => cache.get_token().await,
        }
    }

    /// Drop the cached token. Returns false when there is nothing to refresh.
    pub async fn invalidate(&self) -> bool {
        match self {
            TokenSource::Emulator => false,
            TokenSource::ServiceAccount(cache) => {
                cache.invalidate().await;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emulator_token_is_static() {
        let source = TokenSource::Emulator;
        assert_eq!(source.token().await.unwrap(), EMULATOR_TOKEN);
        assert!(!source.invalidate().await);
    }

    #[test]
    fn test_firestore_scope() {
        assert!(FIRESTORE_SCOPE.contains("datastore"));
    }
}
