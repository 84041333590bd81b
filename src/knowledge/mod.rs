//! Append-only, keyed fact log built on the key-value store.
//!
//! Facts are stored under composite keys `knowledge_<logicalKey>`; a
//! secondary index list under `knowledge_keys` tracks every composite key in
//! use, enabling full enumeration and bulk deletion. Entries are append-only
//! until an explicit clear. The store also derives personality-evolution
//! suggestions from the canonical user's interaction log.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Tone;
use crate::logging::{interactions_key, InteractionRecord};
use crate::memory::KeyValueStore;

/// Prefix of every composite knowledge key.
pub const KNOWLEDGE_PREFIX: &str = "knowledge_";

/// Long-term key of the composite-key index.
pub const KNOWLEDGE_INDEX_KEY: &str = "knowledge_keys";

/// The single user whose interaction log drives personality evolution.
pub const CANONICAL_EVOLUTION_USER: &str = "user1";

const POSITIVE_KEYWORDS: [&str; 3] = ["love", "great", "awesome"];
const NEGATIVE_KEYWORDS: [&str; 3] = ["hate", "bad", "sucks"];

/// One timestamped fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Tone/humor/catchphrase fields suggested by the evolution heuristic.
/// `None` fields leave the live persona untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalityUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catchphrase: Option<String>,
}

/// Keyed fact log with evolution heuristics.
#[derive(Clone)]
pub struct KnowledgeStore {
    store: Arc<dyn KeyValueStore>,
}

impl KnowledgeStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn composite_key(key: &str) -> String {
        format!("{KNOWLEDGE_PREFIX}{key}")
    }

    async fn read_entries(&self, composite_key: &str) -> Result<Vec<KnowledgeEntry>, anyhow::Error> {
        match self.store.get_long_term(composite_key).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn read_index(&self) -> Result<Vec<String>, anyhow::Error> {
        match self.store.get_long_term(KNOWLEDGE_INDEX_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Append a fact under the given logical key.
    ///
    /// Registers the composite key in the global index the first time it is
    /// written.
    pub async fn add_knowledge(&self, key: &str, text: &str) -> Result<(), anyhow::Error> {
        let composite = Self::composite_key(key);

        let mut entries = self.read_entries(&composite).await?;
        entries.push(KnowledgeEntry {
            text: text.to_string(),
            timestamp: Utc::now(),
        });
        self.store.set_long_term(&composite, json!(entries)).await?;

        let mut index = self.read_index().await?;
        if !index.iter().any(|k| k == &composite) {
            index.push(composite);
            self.store.set_long_term(KNOWLEDGE_INDEX_KEY, json!(index)).await?;
        }
        Ok(())
    }

    /// All texts stored under the given logical key, oldest first.
    pub async fn get_knowledge_by_key(&self, key: &str) -> Result<Vec<String>, anyhow::Error> {
        let entries = self.read_entries(&Self::composite_key(key)).await?;
        Ok(entries.into_iter().map(|e| e.text).collect())
    }

    /// Every stored text, concatenated in index order.
    pub async fn get_knowledge(&self) -> Result<Vec<String>, anyhow::Error> {
        let mut all = Vec::new();
        for composite in self.read_index().await? {
            let entries = self.read_entries(&composite).await?;
            all.extend(entries.into_iter().map(|e| e.text));
        }
        Ok(all)
    }

    /// Delete every indexed key's log, then the index itself. Irreversible.
    pub async fn clear_knowledge(&self) -> Result<(), anyhow::Error> {
        for composite in self.read_index().await? {
            self.store.delete_long_term(&composite).await?;
        }
        self.store.delete_long_term(KNOWLEDGE_INDEX_KEY).await
    }

    /// Suggest a personality shift from the canonical user's interaction log.
    ///
    /// Counts positive vs negative keyword occurrences across stored inputs.
    /// A clearly positive history suggests a friendly tone, a clearly
    /// negative one a sassy tone, anything in between a plain casual reset.
    pub async fn evolve_personality(&self) -> Result<PersonalityUpdate, anyhow::Error> {
        let key = interactions_key(CANONICAL_EVOLUTION_USER);
        let interactions: Vec<InteractionRecord> = match self.store.get_long_term(&key).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };

        let mut positive = 0usize;
        let mut negative = 0usize;
        for record in &interactions {
            let input = record.input.to_lowercase();
            if POSITIVE_KEYWORDS.iter().any(|k| input.contains(k)) {
                positive += 1;
            }
            if NEGATIVE_KEYWORDS.iter().any(|k| input.contains(k)) {
                negative += 1;
            }
        }

        let update = if positive >= negative + 2 {
            PersonalityUpdate {
                tone: Some(Tone::Friendly),
                catchphrase: Some("You're all awesome!".to_string()),
                ..Default::default()
            }
        } else if negative > positive + 2 {
            PersonalityUpdate {
                tone: Some(Tone::Sassy),
                catchphrase: Some("Deal with it!".to_string()),
                ..Default::default()
            }
        } else {
            PersonalityUpdate {
                tone: Some(Tone::Casual),
                ..Default::default()
            }
        };
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{InteractionLogger, StoreInteractionLogger};
    use crate::memory::InMemoryStore;

    fn knowledge() -> (Arc<InMemoryStore>, KnowledgeStore) {
        let store = Arc::new(InMemoryStore::new());
        (store.clone(), KnowledgeStore::new(store))
    }

    #[tokio::test]
    async fn round_trip_and_clear() {
        let (_store, knowledge) = knowledge();
        knowledge.add_knowledge("k", "v").await.unwrap();
        assert_eq!(knowledge.get_knowledge_by_key("k").await.unwrap(), vec!["v"]);

        knowledge.clear_knowledge().await.unwrap();
        assert!(knowledge.get_knowledge_by_key("k").await.unwrap().is_empty());
        assert!(knowledge.get_knowledge().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn entries_are_append_only_and_ordered() {
        let (_store, knowledge) = knowledge();
        knowledge.add_knowledge("u1_tech", "first").await.unwrap();
        knowledge.add_knowledge("u1_tech", "second").await.unwrap();
        assert_eq!(
            knowledge.get_knowledge_by_key("u1_tech").await.unwrap(),
            vec!["first", "second"]
        );
    }

    #[tokio::test]
    async fn index_reflects_keys_written_since_last_clear() {
        let (store, knowledge) = knowledge();
        knowledge.add_knowledge("a", "1").await.unwrap();
        knowledge.add_knowledge("b", "2").await.unwrap();
        knowledge.add_knowledge("a", "3").await.unwrap();

        let index: Vec<String> = serde_json::from_value(
            store.get_long_term(KNOWLEDGE_INDEX_KEY).await.unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(index, vec!["knowledge_a", "knowledge_b"]);

        // get_knowledge concatenates in index order.
        assert_eq!(knowledge.get_knowledge().await.unwrap(), vec!["1", "3", "2"]);

        knowledge.clear_knowledge().await.unwrap();
        assert!(store.get_long_term(KNOWLEDGE_INDEX_KEY).await.unwrap().is_none());
    }

    async fn log_inputs(store: Arc<InMemoryStore>, inputs: &[&str]) {
        let logger = StoreInteractionLogger::new(store);
        for input in inputs {
            logger
                .log_interaction(CANONICAL_EVOLUTION_USER, "test", input, "ok")
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn positive_history_turns_friendly() {
        let (store, knowledge) = knowledge();
        log_inputs(store, &["this is great", "love it", "so awesome"]).await;
        let update = knowledge.evolve_personality().await.unwrap();
        assert_eq!(update.tone, Some(Tone::Friendly));
        assert_eq!(update.catchphrase.as_deref(), Some("You're all awesome!"));
    }

    #[tokio::test]
    async fn negative_history_turns_sassy() {
        let (store, knowledge) = knowledge();
        log_inputs(store, &["this sucks", "hate it", "bad bot", "really bad"]).await;
        let update = knowledge.evolve_personality().await.unwrap();
        assert_eq!(update.tone, Some(Tone::Sassy));
        assert_eq!(update.catchphrase.as_deref(), Some("Deal with it!"));
    }

    #[tokio::test]
    async fn mixed_or_empty_history_resets_to_casual() {
        let (_store, knowledge) = knowledge();
        let update = knowledge.evolve_personality().await.unwrap();
        assert_eq!(update.tone, Some(Tone::Casual));
        assert!(update.catchphrase.is_none());
    }
}
