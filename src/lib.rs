//! # PuppetOS Core
//!
//! Orchestration core for persona-driven conversational agents.
//!
//! Every agent action passes through an interception bus ([`events::EventHub`])
//! where policy code ([`rules::ControlRule`]) can veto or rewrite it before and
//! after execution. Persona behavior (mood, affinity, topic openness) is
//! derived by the [`state::StateManager`] from static configuration plus
//! per-user persisted scores, and the [`knowledge::KnowledgeStore`] feeds
//! retrieval and personality-evolution heuristics back into the agent.
//!
//! The web transport, platform adapters, plugin discovery, and any LLM text
//! generation live outside this crate; they consume the [`orchestrator`]
//! surface and the storage contracts in [`memory`] and [`registry`].

pub mod agent;
pub mod config;
pub mod console;
pub mod errors;
pub mod events;
pub mod knowledge;
pub mod logging;
pub mod memory;
pub mod orchestrator;
pub mod registry;
pub mod rules;
pub mod state;

pub use agent::Agent;
pub use config::PersonaConfig;
pub use errors::{PuppetError, Result};
pub use events::{ActionData, Decision, EventHub, EventKind, EventPayload};
pub use knowledge::KnowledgeStore;
pub use orchestrator::Orchestrator;
pub use rules::ControlRule;
pub use state::StateManager;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
