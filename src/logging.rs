//! Interaction logging contract and store-backed implementation.
//!
//! Each interaction turn is recorded per user; records may carry an opaque
//! embedding attached by an external embedder. The knowledge store's
//! personality-evolution heuristic reads these records back.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::memory::KeyValueStore;

/// One logged interaction turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub user_id: String,
    pub platform: String,
    pub input: String,
    pub response: String,
    /// Opaque embedding attached by an external embedder, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Long-term key holding a user's interaction log.
pub fn interactions_key(user_id: &str) -> String {
    format!("interactions_{user_id}")
}

/// Records each interaction. Consumed by the agent, which awaits completion
/// before emitting its post-action event.
#[async_trait]
pub trait InteractionLogger: Send + Sync {
    async fn log_interaction(
        &self,
        user_id: &str,
        platform: &str,
        input: &str,
        response: &str,
    ) -> Result<(), anyhow::Error>;
}

/// [`InteractionLogger`] appending records to the long-term store under
/// `interactions_<userId>`.
pub struct StoreInteractionLogger {
    store: Arc<dyn KeyValueStore>,
}

impl StoreInteractionLogger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl InteractionLogger for StoreInteractionLogger {
    async fn log_interaction(
        &self,
        user_id: &str,
        platform: &str,
        input: &str,
        response: &str,
    ) -> Result<(), anyhow::Error> {
        let key = interactions_key(user_id);
        let record = InteractionRecord {
            user_id: user_id.to_string(),
            platform: platform.to_string(),
            input: input.to_string(),
            response: response.to_string(),
            embedding: None,
            timestamp: Utc::now(),
        };

        let mut records: Vec<InteractionRecord> = match self.store.get_long_term(&key).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        records.push(record);
        self.store.set_long_term(&key, json!(records)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;

    #[tokio::test]
    async fn appends_records_per_user() {
        let store = Arc::new(InMemoryStore::new());
        let logger = StoreInteractionLogger::new(store.clone());

        logger.log_interaction("u1", "discord", "hi", "hey!").await.unwrap();
        logger.log_interaction("u1", "discord", "bye", "later!").await.unwrap();
        logger.log_interaction("u2", "x", "yo", "hello!").await.unwrap();

        let u1: Vec<InteractionRecord> = serde_json::from_value(
            store.get_long_term(&interactions_key("u1")).await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(u1.len(), 2);
        assert_eq!(u1[0].input, "hi");
        assert_eq!(u1[1].response, "later!");

        let u2: Vec<InteractionRecord> = serde_json::from_value(
            store.get_long_term(&interactions_key("u2")).await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(u2.len(), 1);
    }
}
