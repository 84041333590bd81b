//! In-process key-value store.
//!
//! Backs both storage tiers with concurrent maps. Used by tests and as a
//! default when no durable backend is configured.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use super::KeyValueStore;

/// A [`KeyValueStore`] holding both tiers in process memory.
///
/// "Long-term" values survive only as long as the process; the async contract
/// is kept so callers are indifferent to the backend.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    short_term: DashMap<String, Value>,
    long_term: DashMap<String, Value>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    fn set_short_term(&self, key: &str, value: Value) {
        self.short_term.insert(key.to_string(), value);
    }

    fn get_short_term(&self, key: &str) -> Option<Value> {
        self.short_term.get(key).map(|v| v.clone())
    }

    fn clear_short_term(&self) {
        self.short_term.clear();
    }

    async fn set_long_term(&self, key: &str, value: Value) -> Result<(), anyhow::Error> {
        self.long_term.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_long_term(&self, key: &str) -> Result<Option<Value>, anyhow::Error> {
        Ok(self.long_term.get(key).map(|v| v.clone()))
    }

    async fn delete_long_term(&self, key: &str) -> Result<(), anyhow::Error> {
        self.long_term.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_term_round_trip() {
        let store = InMemoryStore::new();
        store.set_short_term("k", json!({"a": 1}));
        assert_eq!(store.get_short_term("k"), Some(json!({"a": 1})));
        store.clear_short_term();
        assert_eq!(store.get_short_term("k"), None);
    }

    #[tokio::test]
    async fn long_term_round_trip_and_delete() {
        let store = InMemoryStore::new();
        store.set_long_term("user1", json!({"affinity_score": 3})).await.unwrap();
        assert_eq!(
            store.get_long_term("user1").await.unwrap(),
            Some(json!({"affinity_score": 3}))
        );
        store.delete_long_term("user1").await.unwrap();
        assert_eq!(store.get_long_term("user1").await.unwrap(), None);
        // deleting again is a no-op
        store.delete_long_term("user1").await.unwrap();
    }
}
