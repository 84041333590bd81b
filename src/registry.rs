//! Durable catalog of agent identities.
//!
//! The registry is the source of truth that gates activation: the
//! orchestrator refuses to start an agent whose id has no record here. The
//! core only reads records; creation and mutation belong to the external
//! management surface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::PersonaConfig;
use crate::errors::{PuppetError, Result};
use crate::memory::KeyValueStore;

const REGISTRY_PREFIX: &str = "registry_";
const REGISTRY_INDEX_KEY: &str = "registry_ids";

/// Durable record of one registered agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub agent_id: String,
    /// Full config snapshot at registration time.
    pub config: PersonaConfig,
    pub creator_user_id: String,
    pub created_at: DateTime<Utc>,
}

/// Registry contract consumed by the orchestrator.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Register a new agent, returning its assigned id.
    async fn create_agent(&self, config: PersonaConfig, creator_user_id: &str) -> Result<String>;

    /// Fetch a record, `None` when unregistered.
    async fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>>;

    /// Every registered record, in registration order.
    async fn get_all_agents(&self) -> Result<Vec<AgentRecord>>;

    /// Replace the config snapshot of an existing record.
    async fn update_agent(&self, agent_id: &str, config: PersonaConfig) -> Result<()>;

    /// Remove a record.
    async fn delete_agent(&self, agent_id: &str) -> Result<()>;
}

/// [`AgentRegistry`] persisted through the long-term key-value store, one
/// record per `registry_<agentId>` key plus an id index.
pub struct StoreAgentRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl StoreAgentRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn record_key(agent_id: &str) -> String {
        format!("{REGISTRY_PREFIX}{agent_id}")
    }

    async fn read_index(&self) -> Result<Vec<String>> {
        match self.store.get_long_term(REGISTRY_INDEX_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value).map_err(anyhow::Error::from)?),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl AgentRegistry for StoreAgentRegistry {
    async fn create_agent(&self, config: PersonaConfig, creator_user_id: &str) -> Result<String> {
        let agent_id = if config.id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            config.id.clone()
        };
        let mut config = config;
        config.id = agent_id.clone();

        let record = AgentRecord {
            agent_id: agent_id.clone(),
            config,
            creator_user_id: creator_user_id.to_string(),
            created_at: Utc::now(),
        };
        self.store
            .set_long_term(&Self::record_key(&agent_id), json!(record))
            .await?;

        let mut index = self.read_index().await?;
        if !index.iter().any(|id| id == &agent_id) {
            index.push(agent_id.clone());
            self.store.set_long_term(REGISTRY_INDEX_KEY, json!(index)).await?;
        }

        log::info!("registered agent {agent_id} (creator {creator_user_id})");
        Ok(agent_id)
    }

    async fn get_agent(&self, agent_id: &str) -> Result<Option<AgentRecord>> {
        match self.store.get_long_term(&Self::record_key(agent_id)).await? {
            Some(value) => Ok(Some(
                serde_json::from_value(value).map_err(anyhow::Error::from)?,
            )),
            None => Ok(None),
        }
    }

    async fn get_all_agents(&self) -> Result<Vec<AgentRecord>> {
        let mut records = Vec::new();
        for agent_id in self.read_index().await? {
            if let Some(record) = self.get_agent(&agent_id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn update_agent(&self, agent_id: &str, config: PersonaConfig) -> Result<()> {
        let mut record = self
            .get_agent(agent_id)
            .await?
            .ok_or_else(|| PuppetError::NotFound {
                agent_id: agent_id.to_string(),
            })?;
        record.config = config;
        record.config.id = agent_id.to_string();
        self.store
            .set_long_term(&Self::record_key(agent_id), json!(record))
            .await?;
        Ok(())
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<()> {
        if self.get_agent(agent_id).await?.is_none() {
            return Err(PuppetError::NotFound {
                agent_id: agent_id.to_string(),
            });
        }
        self.store.delete_long_term(&Self::record_key(agent_id)).await?;
        let index: Vec<String> = self
            .read_index()
            .await?
            .into_iter()
            .filter(|id| id != agent_id)
            .collect();
        self.store.set_long_term(REGISTRY_INDEX_KEY, json!(index)).await?;
        Ok(())
    }
}
