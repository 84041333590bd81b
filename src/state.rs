//! Derived persona state.
//!
//! Mood, talkativeness, and topic openness are total functions of the persona
//! configuration; affinity is classified from a per-user score persisted in
//! the long-term store. `update_states` is the single mutation point for that
//! score. The explicit `set_*` methods are the operator mutation surface for
//! the shared config.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::{Formality, SharedPersona, Tone};
use crate::memory::KeyValueStore;

/// Score at or above which a user is classified as loved.
pub const LOVE_THRESHOLD: i64 = 5;
/// Score at or below which a user is classified as hated.
pub const HATE_THRESHOLD: i64 = -5;

/// Per-user sentiment classification derived from the accumulated score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Affinity {
    Love,
    Neutral,
    Hate,
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Love => write!(f, "love"),
            Self::Neutral => write!(f, "neutral"),
            Self::Hate => write!(f, "hate"),
        }
    }
}

/// Classify a raw affinity score against the fixed thresholds.
pub fn classify_affinity(score: i64) -> Affinity {
    if score >= LOVE_THRESHOLD {
        Affinity::Love
    } else if score <= HATE_THRESHOLD {
        Affinity::Hate
    } else {
        Affinity::Neutral
    }
}

/// Persona-wide disposition derived purely from the configured tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Neutral,
    Grumpy,
}

/// Per-user persisted record, stored under the user id key.
///
/// Mutated additively, never reset except by explicit memory deletion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AffinityRecord {
    #[serde(default)]
    pub affinity_score: i64,
    #[serde(default)]
    pub last_input: String,
}

/// Identity triple surfaced to reply composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub bio: String,
    pub mission: String,
}

/// Derives mood, affinity, and topic openness from persona configuration plus
/// the per-user persisted score.
#[derive(Clone)]
pub struct StateManager {
    store: Arc<dyn KeyValueStore>,
    config: SharedPersona,
}

impl StateManager {
    pub fn new(store: Arc<dyn KeyValueStore>, config: SharedPersona) -> Self {
        Self { store, config }
    }

    async fn read_record(&self, user_id: &str) -> Result<AffinityRecord, anyhow::Error> {
        match self.store.get_long_term(user_id).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(AffinityRecord::default()),
        }
    }

    /// Classify the stored score for a user (absent record counts as zero).
    pub async fn get_user_affinity(&self, user_id: &str) -> Result<Affinity, anyhow::Error> {
        let record = self.read_record(user_id).await?;
        Ok(classify_affinity(record.affinity_score))
    }

    /// Mood as a total function of the configured tone.
    pub fn get_mood(&self) -> Mood {
        match self.config.read().personality.tone {
            Tone::Friendly => Mood::Happy,
            Tone::Sassy => Mood::Grumpy,
            Tone::Casual | Tone::Formal => Mood::Neutral,
        }
    }

    /// Whether the persona volunteers extra content.
    pub fn is_talkative(&self) -> bool {
        let config = self.config.read();
        config.personality.humor || config.personality.formality == Formality::Casual
    }

    /// Exact case-insensitive membership test against configured topics.
    pub fn is_open_to_topic(&self, topic: &str) -> bool {
        let needle = topic.to_lowercase();
        self.config
            .read()
            .personality
            .preferences
            .topics
            .iter()
            .any(|t| t.to_lowercase() == needle)
    }

    /// Fold one input into the user's persisted record.
    ///
    /// The score moves +1 for a "love" mention and -1 for a "hate" mention;
    /// both checks are independent, so an input containing both nets to zero.
    /// The raw input is stored as `last_input`.
    pub async fn update_states(&self, input: &str, user_id: &str) -> Result<(), anyhow::Error> {
        let mut record = self.read_record(user_id).await?;
        let lowered = input.to_lowercase();
        if lowered.contains("love") {
            record.affinity_score += 1;
        }
        if lowered.contains("hate") {
            record.affinity_score -= 1;
        }
        record.last_input = input.to_string();
        self.store.set_long_term(user_id, json!(record)).await
    }

    /// Name/bio/mission triple, read-only.
    pub fn get_identity(&self) -> Identity {
        let config = self.config.read();
        Identity {
            name: config.name.clone(),
            bio: config.bio.clone(),
            mission: config.mission.clone(),
        }
    }

    // Operator mutation surface. Typed setters instead of any
    // implementation-reaching into the shared config.

    pub fn set_tone(&self, tone: Tone) {
        self.config.write().personality.tone = tone;
    }

    pub fn set_humor(&self, humor: bool) {
        self.config.write().personality.humor = humor;
    }

    pub fn set_topics(&self, topics: Vec<String>) {
        self.config.write().personality.preferences.topics = topics;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PersonaConfig;
    use crate::memory::InMemoryStore;

    fn manager_with_tone(tone: Tone) -> StateManager {
        let config = PersonaConfig {
            name: "Zeek".to_string(),
            id: "agent-zeek".to_string(),
            bio: "bio".to_string(),
            mission: "mission".to_string(),
            ..Default::default()
        };
        let shared = config.shared();
        shared.write().personality.tone = tone;
        StateManager::new(Arc::new(InMemoryStore::new()), shared)
    }

    #[test]
    fn affinity_thresholds_are_exact() {
        for (score, expected) in [
            (-6, Affinity::Hate),
            (-5, Affinity::Hate),
            (-4, Affinity::Neutral),
            (0, Affinity::Neutral),
            (4, Affinity::Neutral),
            (5, Affinity::Love),
            (6, Affinity::Love),
        ] {
            assert_eq!(classify_affinity(score), expected, "score {score}");
        }
    }

    #[test]
    fn mood_is_total_over_tones() {
        assert_eq!(manager_with_tone(Tone::Friendly).get_mood(), Mood::Happy);
        assert_eq!(manager_with_tone(Tone::Sassy).get_mood(), Mood::Grumpy);
        assert_eq!(manager_with_tone(Tone::Casual).get_mood(), Mood::Neutral);
        assert_eq!(manager_with_tone(Tone::Formal).get_mood(), Mood::Neutral);
    }

    #[test]
    fn talkative_from_humor_or_casual_formality() {
        let manager = manager_with_tone(Tone::Formal);
        manager.config.write().personality.formality = Formality::Formal;
        assert!(!manager.is_talkative());

        manager.set_humor(true);
        assert!(manager.is_talkative());

        manager.set_humor(false);
        manager.config.write().personality.formality = Formality::Casual;
        assert!(manager.is_talkative());
    }

    #[test]
    fn topic_openness_is_case_insensitive_exact_membership() {
        let manager = manager_with_tone(Tone::Casual);
        manager.set_topics(vec!["tech".to_string(), "Space".to_string()]);
        assert!(manager.is_open_to_topic("TECH"));
        assert!(manager.is_open_to_topic("space"));
        assert!(!manager.is_open_to_topic("technology"));
    }

    #[tokio::test]
    async fn opposite_mentions_cancel_out() {
        let manager = manager_with_tone(Tone::Casual);
        manager.update_states("I love this", "u1").await.unwrap();
        manager.update_states("I hate that", "u1").await.unwrap();

        let record = manager.read_record("u1").await.unwrap();
        assert_eq!(record.affinity_score, 0);
        assert_eq!(record.last_input, "I hate that");
    }

    #[tokio::test]
    async fn both_keywords_in_one_input_net_zero() {
        let manager = manager_with_tone(Tone::Casual);
        manager.update_states("love to hate this", "u1").await.unwrap();
        let record = manager.read_record("u1").await.unwrap();
        assert_eq!(record.affinity_score, 0);
    }

    #[tokio::test]
    async fn affinity_accumulates_to_love() {
        let manager = manager_with_tone(Tone::Casual);
        for _ in 0..5 {
            manager.update_states("love it", "u1").await.unwrap();
        }
        assert_eq!(manager.get_user_affinity("u1").await.unwrap(), Affinity::Love);
        assert_eq!(manager.get_user_affinity("stranger").await.unwrap(), Affinity::Neutral);
    }

    #[test]
    fn identity_reads_config_fields() {
        let manager = manager_with_tone(Tone::Casual);
        let identity = manager.get_identity();
        assert_eq!(identity.name, "Zeek");
        assert_eq!(identity.bio, "bio");
        assert_eq!(identity.mission, "mission");
    }
}
