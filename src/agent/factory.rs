//! Wires a persona configuration to a full agent runtime.

use std::path::Path;
use std::sync::Arc;

use crate::config::PersonaConfig;
use crate::errors::Result;
use crate::events::EventHub;
use crate::knowledge::KnowledgeStore;
use crate::logging::StoreInteractionLogger;
use crate::memory::KeyValueStore;
use crate::state::StateManager;

use super::Agent;

/// Builds agents with their collaborators wired to a shared store and hub.
pub struct AgentFactory;

impl AgentFactory {
    /// Build an agent from an already validated persona configuration.
    pub fn from_config(
        config: PersonaConfig,
        store: Arc<dyn KeyValueStore>,
        hub: Arc<EventHub>,
    ) -> Agent {
        let shared = config.shared();
        let knowledge = KnowledgeStore::new(store.clone());
        let state = StateManager::new(store.clone(), shared.clone());
        let logger = Arc::new(StoreInteractionLogger::new(store.clone()));
        Agent::new(shared, knowledge, state, logger, store, hub)
    }

    /// Load, validate, and wire a persona from a JSON config file.
    pub fn from_file(
        path: impl AsRef<Path>,
        store: Arc<dyn KeyValueStore>,
        hub: Arc<EventHub>,
    ) -> Result<Agent> {
        let config = PersonaConfig::from_file(path)?;
        Ok(Self::from_config(config, store, hub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use std::io::Write;

    #[test]
    fn from_file_builds_uninitialized_agent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"name": "Luna", "id": "agent-luna", "personality": {{"tone": "sassy"}}}}"#
        )
        .unwrap();

        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let hub = Arc::new(EventHub::new());
        let agent = AgentFactory::from_file(file.path(), store, hub).unwrap();
        assert!(agent.id().is_none());
        assert_eq!(agent.character_info().name, "Luna");
    }

    #[test]
    fn from_file_rejects_missing_id() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "NoId"}}"#).unwrap();

        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryStore::new());
        let hub = Arc::new(EventHub::new());
        assert!(AgentFactory::from_file(file.path(), store, hub).is_err());
    }
}
