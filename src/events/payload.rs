//! Event payload and decision types.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Action name of a routed interaction.
pub const ACTION_HANDLE_INTERACTION: &str = "handleInteraction";
/// Action name of a personality evolution attempt.
pub const ACTION_EVOLVE: &str = "evolve";

/// The three events mediating agent actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Emitted before an action executes; the effective decision gates it.
    PreAction,
    /// Emitted after an action completes. Decisions are ignored.
    PostAction,
    /// Emitted when an action fails.
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreAction => write!(f, "preAction"),
            Self::PostAction => write!(f, "postAction"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Emission priority. Informational only; the hub does not reorder handlers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// The mutable data bag carried by an event.
///
/// Rules match on this and overrides replace it; empty fields fall back to
/// the originals when an override is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    /// The inbound message text, when the action carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub platform: String,
    /// The composed reply, present on post-action emissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// Failure description, present on error emissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Any further fields carried by the emission (evolution updates and the
    /// like). Kept untyped; rules may still match on it.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ActionData {
    /// Build the data bag for an inbound interaction.
    pub fn interaction(input: impl Into<String>, user_id: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            input: Some(input.into()),
            user_id: user_id.into(),
            platform: platform.into(),
            ..Default::default()
        }
    }
}

/// One event emission. Constructed per emission, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventPayload {
    pub agent_id: String,
    /// Name of the intercepted action, for example `"handleInteraction"`.
    pub action: String,
    pub data: ActionData,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub priority: Priority,
}

impl EventPayload {
    /// Create a payload stamped with the current time and medium priority.
    pub fn new(agent_id: impl Into<String>, action: impl Into<String>, data: ActionData) -> Self {
        Self {
            agent_id: agent_id.into(),
            action: action.into(),
            data,
            timestamp: Utc::now(),
            priority: Priority::Medium,
        }
    }

    /// Override the priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// The effective outcome of an emission or a single handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Let the action proceed unchanged.
    Allow,
    /// Veto the action.
    Cancel,
    /// Let the action proceed with replacement data.
    Override(ActionData),
}

impl Decision {
    /// Whether this decision permits the action.
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}
