// External key-value collaborator for OAuth state: handshake secrets while
// the exchange is in flight, access tokens afterwards. Backed stores
// (database, session service) implement the trait; the shipped
// implementation is in-memory.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn put(&self, key: &str, value: String);
    async fn get(&self, key: &str) -> Option<String>;
    /// Removes and returns the value. Handshake secrets are single-use.
    async fn take(&self, key: &str) -> Option<String>;
}

pub type SharedTokenStore = std::sync::Arc<dyn TokenStore>;

/// Storage key for the request-token secret. The provider echoes the request
/// token back on the callback, so the token itself is the lookup key.
pub fn request_secret_key(token: &str) -> String {
    format!("reqsecret:{token}")
}

/// Storage key for a user's long-lived access token (serialized JSON).
pub fn access_token_key(user: &str) -> String {
    format!("access:{user}")
}

#[derive(Default)]
pub struct MemoryTokenStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn put(&self, key: &str, value: String) {
        self.entries.write().await.insert(key.to_string(), value);
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    async fn take(&self, key: &str) -> Option<String> {
        self.entries.write().await.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_take_round_trip() {
        let store = MemoryTokenStore::new();
        store.put("reqsecret:abc", "shhh".to_string()).await;
        assert_eq!(store.get("reqsecret:abc").await.as_deref(), Some("shhh"));
        assert_eq!(store.take("reqsecret:abc").await.as_deref(), Some("shhh"));
        assert_eq!(store.take("reqsecret:abc").await, None);
        assert_eq!(store.get("missing").await, None);
    }
}
