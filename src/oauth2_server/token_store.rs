// ABOUTME: Process-local store for issued bearer tokens
// ABOUTME: DashMap keyed by access token with lazy expiry eviction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 Mealtime

use dashmap::DashMap;

use crate::oauth2_server::models::Token;

/// In-memory bearer token store.
///
/// Tokens never touch the database; a restart revokes everything
/// outstanding and clients simply re-run the grant. Expired entries are
/// evicted lazily on lookup and in bulk by [`Self::purge_expired`].
#[derive(Default)]
pub struct TokenStore {
    tokens: DashMap<String, Token>,
}

impl TokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly issued token.
    pub fn save(&self, token: Token) {
        self.tokens.insert(token.access_token.clone(), token);
    }

    /// Look up a token by its access-token string, evicting it if expired.
    #[must_use]
    pub fn get_valid(&self, access_token: &str) -> Option<Token> {
        let expired = match self.tokens.get(access_token) {
            Some(entry) => entry.is_expired(),
            None => return None,
        };
        if expired {
            self.tokens.remove(access_token);
            return None;
        }
        self.tokens.get(access_token).map(|entry| entry.clone())
    }

    /// Drop every expired token.
    pub fn purge_expired(&self) {
        self.tokens.retain(|_, token| !token.is_expired());
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn token(access_token: &str, ttl_seconds: i64) -> Token {
        Token {
            access_token: access_token.to_owned(),
            client_id: "client".to_owned(),
            scopes: vec!["household".to_owned()],
            expires_at: Utc::now() + Duration::seconds(ttl_seconds),
        }
    }

    #[test]
    fn test_save_and_lookup() {
        let store = TokenStore::new();
        store.save(token("live", 3600));

        assert!(store.get_valid("live").is_some());
        assert!(store.get_valid("unknown").is_none());
    }

    #[test]
    fn test_expired_tokens_are_evicted_on_lookup() {
        let store = TokenStore::new();
        store.save(token("stale", -1));

        assert!(store.get_valid("stale").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let store = TokenStore::new();
        store.save(token("live", 3600));
        store.save(token("stale", -1));

        store.purge_expired();
        assert_eq!(store.len(), 1);
        assert!(store.get_valid("live").is_some());
    }
}
