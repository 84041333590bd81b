//! Error types for the PuppetOS core.

use thiserror::Error;

/// Errors surfaced by the orchestration core.
#[derive(Debug, Error)]
pub enum PuppetError {
    /// An interaction or evolution method was called before `start`.
    #[error("agent {agent} is not running")]
    NotRunning { agent: String },

    /// Unknown agent id at a registry or orchestrator lookup.
    #[error("agent not found: {agent_id}")]
    NotFound { agent_id: String },

    /// Malformed or missing persona configuration at load time.
    #[error("invalid persona configuration: {message}")]
    ConfigInvalid { message: String },

    /// A persona references a rule-set id absent from the catalog.
    #[error("unknown rule set: {rule_id}")]
    UnknownRule { rule_id: String },

    /// An event handler panicked before the emission settled.
    #[error("event handler failed: {message}")]
    HandlerFailure { message: String },

    /// I/O failure (config files, console input).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Underlying storage backend error.
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PuppetError>;
