//! PuppetOS interactive console binary.
//!
//! Boots the orchestration core with the SQLite-backed store, registers and
//! starts one agent from a persona file, then drops into a stdin loop where
//! every line is routed as an interaction. Type `stop` to quit.
//!
//! # Environment Variables
//!
//! - `PUPPETOS_CHARACTER` — path to a persona JSON file (optional; a built-in
//!   demo persona is used when unset)
//! - `PUPPETOS_DB` — SQLite database path (default: `./data/puppetos_memory.db`)
//! - `RUST_LOG` — log filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin console
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use puppetos::agent::AgentFactory;
use puppetos::config::PersonaConfig;
use puppetos::console::run_console;
use puppetos::errors::Result;
use puppetos::events::EventHub;
use puppetos::memory::{KeyValueStore, SqliteStore};
use puppetos::orchestrator::Orchestrator;
use puppetos::registry::{AgentRegistry, StoreAgentRegistry};

fn demo_persona() -> PersonaConfig {
    let mut config = PersonaConfig {
        name: "Zeek".to_string(),
        id: "agent-zeek".to_string(),
        bio: "A playful tech enthusiast.".to_string(),
        mission: "Chat about tech and keep things fun.".to_string(),
        ..Default::default()
    };
    config.personality.humor = true;
    config.personality.preferences.topics = vec!["tech".to_string(), "space".to_string()];
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("PuppetOS console v{}", puppetos::VERSION);

    let db_path = std::env::var("PUPPETOS_DB").ok().map(PathBuf::from);
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(db_path)?);
    let hub = Arc::new(EventHub::new());
    let registry = Arc::new(StoreAgentRegistry::new(store.clone()));
    let orchestrator = Arc::new(Orchestrator::new(hub.clone(), registry.clone()));

    let config = match std::env::var("PUPPETOS_CHARACTER") {
        Ok(path) => PersonaConfig::from_file(&path)?,
        Err(_) => demo_persona(),
    };
    config.validate()?;

    if registry.get_agent(&config.id).await?.is_none() {
        registry.create_agent(config.clone(), "console").await?;
    }
    let agent = Arc::new(AgentFactory::from_config(config, store, hub));
    let agent_id = orchestrator.start_agent(agent).await?;
    log::info!("agent {agent_id} is up");

    run_console(orchestrator).await
}
