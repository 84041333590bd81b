//! Agent runtime: one persona bound to its collaborators.
//!
//! An [`Agent`] wraps a shared persona config together with the knowledge
//! store, state manager, interaction logger, and event hub. Its lifecycle is
//! Uninitialized → Running → Stopped; the identity is bound exactly once, at
//! `start`, and every interaction or evolution method fails with
//! [`PuppetError::NotRunning`] until then. Pure getters stay available
//! regardless of run state.

pub mod factory;

pub use factory::AgentFactory;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rand::seq::SliceRandom;
use serde_json::Value;

use crate::config::{PersonaConfig, SharedPersona, Tone};
use crate::errors::{PuppetError, Result};
use crate::events::{
    ActionData, Decision, EventHub, EventKind, EventPayload, ACTION_EVOLVE,
    ACTION_HANDLE_INTERACTION,
};
use crate::knowledge::KnowledgeStore;
use crate::logging::InteractionLogger;
use crate::memory::KeyValueStore;
use crate::state::{Affinity, Mood, StateManager};

/// Reply returned when the agent's own pre-action hook cancels a turn.
pub const CANCELED_REPLY: &str = "Action canceled.";

/// Fallback line of [`Agent::seeded_response`].
pub const SEEDED_FALLBACK: &str = "I'm not sure about that, but I'm always learning!";

/// One running persona.
pub struct Agent {
    config: SharedPersona,
    knowledge: KnowledgeStore,
    state: StateManager,
    logger: Arc<dyn InteractionLogger>,
    store: Arc<dyn KeyValueStore>,
    hub: Arc<EventHub>,
    agent_id: RwLock<String>,
    running: AtomicBool,
}

impl Agent {
    /// Bind a persona to its collaborators. The agent stays uninitialized
    /// until [`start`](Self::start).
    pub fn new(
        config: SharedPersona,
        knowledge: KnowledgeStore,
        state: StateManager,
        logger: Arc<dyn InteractionLogger>,
        store: Arc<dyn KeyValueStore>,
        hub: Arc<EventHub>,
    ) -> Self {
        Self {
            config,
            knowledge,
            state,
            logger,
            store,
            hub,
            agent_id: RwLock::new(String::new()),
            running: AtomicBool::new(false),
        }
    }

    /// The event hub this agent announces its actions on.
    pub fn event_hub(&self) -> Arc<EventHub> {
        self.hub.clone()
    }

    /// The bound identity, `None` before the first `start`.
    pub fn id(&self) -> Option<String> {
        let id = self.agent_id.read();
        if id.is_empty() {
            None
        } else {
            Some(id.clone())
        }
    }

    /// Whether the agent currently serves interactions.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the identity and mark the agent running. Idempotent; the identity
    /// binds on the first call only and is immutable thereafter. A blank id
    /// is rejected so a running agent always has a non-empty identity.
    pub fn start(&self, agent_id: &str) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        {
            let mut bound = self.agent_id.write();
            if bound.is_empty() {
                if agent_id.trim().is_empty() {
                    return Err(PuppetError::ConfigInvalid {
                        message: "agent id must not be empty".to_string(),
                    });
                }
                *bound = agent_id.to_string();
            }
        }
        self.log_identity();
        self.running.store(true, Ordering::SeqCst);
        log::info!("agent {} started", self.agent_id.read());
        Ok(())
    }

    /// Mark the agent stopped. Idempotent.
    pub fn stop(&self) {
        if !self.is_running() {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        log::info!("agent {} stopped", self.agent_id.read());
    }

    fn log_identity(&self) {
        let config = self.config.read();
        log::info!("initializing persona: {}", config.name);
        log::info!("description: {}", config.description);
        log::info!("mission: {}", config.mission);
        log::info!("vision: {}", config.vision);
        log::debug!("socials: {:?}", config.contact.socials);
        log::debug!("wallets: {:?}", config.wallets);
    }

    fn ensure_running(&self) -> Result<()> {
        if !self.is_running() {
            return Err(PuppetError::NotRunning {
                agent: self.config.read().name.clone(),
            });
        }
        Ok(())
    }

    fn bound_id(&self) -> String {
        self.agent_id.read().clone()
    }

    /// Handle one inbound message and compose the reply.
    ///
    /// The turn is announced on the hub before and after execution; a cancel
    /// decision short-circuits, an override substitutes input/user/platform.
    /// Affinity is folded in exactly once per turn, at the top.
    pub async fn handle_interaction(
        &self,
        user_id: &str,
        platform: &str,
        input: &str,
    ) -> Result<String> {
        self.ensure_running()?;
        let agent_id = self.bound_id();

        let pre = EventPayload::new(
            &agent_id,
            ACTION_HANDLE_INTERACTION,
            ActionData::interaction(input, user_id, platform),
        );
        let (input_f, user_f, platform_f) = match self.hub.emit(EventKind::PreAction, pre).await? {
            Decision::Cancel => return Ok(CANCELED_REPLY.to_string()),
            Decision::Override(data) => (
                data.input.unwrap_or_else(|| input.to_string()),
                if data.user_id.is_empty() {
                    user_id.to_string()
                } else {
                    data.user_id
                },
                if data.platform.is_empty() {
                    platform.to_string()
                } else {
                    data.platform
                },
            ),
            Decision::Allow => (input.to_string(), user_id.to_string(), platform.to_string()),
        };

        // Single mutation point for affinity.
        self.state.update_states(&input_f, &user_f).await?;
        let affinity = self.state.get_user_affinity(&user_f).await?;
        let mood = self.state.get_mood();
        let talkative = self.state.is_talkative();
        let identity = self.state.get_identity();

        let mut response = format!("Hey {user_f} ({platform_f}), I'm {}! ", identity.name);
        let catchphrase = self.config.read().personality.catchphrase.clone();
        if let Some(catchphrase) = catchphrase {
            response.push_str(&catchphrase);
            response.push(' ');
        }

        match mood {
            Mood::Happy => response.push_str("Feeling awesome today! "),
            Mood::Grumpy => response.push_str("Kinda off my game today... "),
            Mood::Neutral => {}
        }

        match affinity {
            Affinity::Love => response.push_str("You're my fave! "),
            Affinity::Hate => response.push_str("Let's keep this quick... "),
            Affinity::Neutral => {}
        }

        // At most one topic triggers per call.
        let topics = self.config.read().personality.preferences.topics.clone();
        let lowered = input_f.to_lowercase();
        for topic in topics {
            if lowered.contains(&topic.to_lowercase()) && self.state.is_open_to_topic(&topic) {
                response.push_str(&format!("Love chatting about {topic}! "));
                self.knowledge
                    .add_knowledge(
                        &format!("{user_f}_{topic}"),
                        &format!("User {user_f} likes {topic}"),
                    )
                    .await?;
                break;
            }
        }

        if !talkative {
            response = format!("{} That's all for now.", response.trim_end());
        } else if let Some(fact) = self.pick_fun_fact(&user_f).await? {
            response.push_str(&format!("Fun fact: {fact} "));
        }

        // The raw input is what gets logged, not the override.
        self.logger
            .log_interaction(&user_f, &platform_f, input, &response)
            .await?;

        let mut post_data = ActionData::interaction(input_f, user_f, platform_f);
        post_data.response = Some(response.clone());
        let post = EventPayload::new(&agent_id, ACTION_HANDLE_INTERACTION, post_data);
        self.hub.emit(EventKind::PostAction, post).await?;

        Ok(response)
    }

    /// A fun fact for a talkative persona: a uniformly-random entry from the
    /// user's tech knowledge when any exists, else the first entry of the
    /// full knowledge set, else nothing.
    async fn pick_fun_fact(&self, user_id: &str) -> Result<Option<String>> {
        let user_facts = self
            .knowledge
            .get_knowledge_by_key(&format!("{user_id}_tech"))
            .await?;
        if let Some(fact) = user_facts.choose(&mut rand::thread_rng()) {
            return Ok(Some(fact.clone()));
        }
        let all = self.knowledge.get_knowledge().await?;
        Ok(all.into_iter().next())
    }

    /// Apply a personality-evolution suggestion to the live config.
    ///
    /// Mutates the in-memory persona only, never the registry snapshot. A
    /// cancel decision on the pre-action hook aborts without mutation; an
    /// override supplies the tone/humor/catchphrase updates directly,
    /// bypassing the knowledge heuristic.
    pub async fn evolve(&self) -> Result<()> {
        self.ensure_running()?;
        let agent_id = self.bound_id();

        let pre = EventPayload::new(&agent_id, ACTION_EVOLVE, ActionData::default());
        let update = match self.hub.emit(EventKind::PreAction, pre).await? {
            Decision::Cancel => {
                log::info!("evolution canceled for agent {agent_id}");
                return Ok(());
            }
            Decision::Override(data) => {
                let fields: Value = Value::Object(data.extra.into_iter().collect());
                serde_json::from_value(fields).map_err(anyhow::Error::from)?
            }
            Decision::Allow => self.knowledge.evolve_personality().await?,
        };
        {
            let mut config = self.config.write();
            if let Some(tone) = update.tone {
                config.personality.tone = tone;
            }
            if let Some(humor) = update.humor {
                config.personality.humor = humor;
            }
            if let Some(ref catchphrase) = update.catchphrase {
                config.personality.catchphrase = Some(catchphrase.clone());
            }
        }
        log::info!("agent {agent_id} evolved: {update:?}");

        let mut post_data = ActionData::default();
        if let Ok(Value::Object(map)) = serde_json::to_value(&update) {
            post_data.extra = map.into_iter().collect();
        }
        self.hub
            .emit(EventKind::PostAction, EventPayload::new(&agent_id, ACTION_EVOLVE, post_data))
            .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Operator controls
    // ------------------------------------------------------------------

    /// Force a mood by mapping it back onto the configured tone.
    pub fn set_mood(&self, mood: Mood) {
        let tone = match mood {
            Mood::Happy => Tone::Friendly,
            Mood::Neutral => Tone::Casual,
            Mood::Grumpy => Tone::Sassy,
        };
        self.state.set_tone(tone);
    }

    /// Toggle talkativeness via the humor flag.
    pub fn set_talkative(&self, talkative: bool) {
        self.state.set_humor(talkative);
    }

    /// Replace the set of open topics.
    pub fn set_open_topics(&self, topics: Vec<String>) {
        self.state.set_topics(topics);
    }

    // ------------------------------------------------------------------
    // Knowledge and memory passthroughs
    // ------------------------------------------------------------------

    pub async fn add_knowledge(&self, key: &str, text: &str) -> Result<()> {
        Ok(self.knowledge.add_knowledge(key, text).await?)
    }

    pub async fn get_knowledge_by_key(&self, key: &str) -> Result<Vec<String>> {
        Ok(self.knowledge.get_knowledge_by_key(key).await?)
    }

    pub async fn get_knowledge(&self) -> Result<Vec<String>> {
        Ok(self.knowledge.get_knowledge().await?)
    }

    pub async fn clear_knowledge(&self) -> Result<()> {
        Ok(self.knowledge.clear_knowledge().await?)
    }

    /// Delete a user's long-term affinity record.
    pub async fn delete_memory(&self, user_id: &str) -> Result<()> {
        Ok(self.store.delete_long_term(user_id).await?)
    }

    // ------------------------------------------------------------------
    // Pure getters, available regardless of run state
    // ------------------------------------------------------------------

    /// First seed fact that appears in the input, else a fixed fallback.
    pub fn seeded_response(&self, input: &str) -> String {
        let lowered = input.to_lowercase();
        self.config
            .read()
            .knowledge
            .data
            .iter()
            .find(|entry| lowered.contains(&entry.to_lowercase()))
            .cloned()
            .unwrap_or_else(|| SEEDED_FALLBACK.to_string())
    }

    /// Snapshot of the live persona configuration.
    pub fn character_info(&self) -> PersonaConfig {
        self.config.read().clone()
    }
}
