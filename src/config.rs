//! Persona configuration.
//!
//! A [`PersonaConfig`] is the static descriptor of one agent: identity,
//! personality, contact/wallet metadata (opaque to the core), knowledge seed
//! facts, settings, and optional rule-set identifiers. It is loaded from JSON
//! and validated eagerly; a malformed file never produces a partially
//! constructed agent. After load it is mutated only through the explicit
//! operator surface on [`crate::state::StateManager`] and by
//! [`crate::agent::Agent::evolve`].

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::errors::{PuppetError, Result};

/// Persona configuration shared between an agent and its state manager.
pub type SharedPersona = Arc<RwLock<PersonaConfig>>;

/// Configured speaking tone of a persona.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    /// Warm and upbeat.
    Friendly,
    /// Snarky and short-fused.
    Sassy,
    /// Stiff and businesslike.
    Formal,
    /// Relaxed.
    #[default]
    Casual,
}

/// Configured formality level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Formality {
    #[default]
    Casual,
    Formal,
}

/// Social media handles. Opaque to the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Socials {
    #[serde(default)]
    pub twitter: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub linkedin: String,
}

/// Contact metadata. Opaque to the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub socials: Socials,
}

/// Wallet addresses. Opaque to the core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Wallets {
    #[serde(default)]
    pub solana: String,
    #[serde(default)]
    pub ethereum: String,
    #[serde(default)]
    pub bitcoin: String,
}

/// Seed facts shipped with the persona, consulted by
/// [`crate::agent::Agent::seeded_response`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeSeed {
    /// Seed kind label (for example `"static"`).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// The seed facts themselves.
    #[serde(default)]
    pub data: Vec<String>,
}

/// Topic and language preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Topics the persona is open to, lowercase.
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// Personality block of a persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Personality {
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub humor: bool,
    #[serde(default)]
    pub formality: Formality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catchphrase: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
}

/// Operational settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Maximum number of memory entries considered per interaction.
    #[serde(default = "default_max_memory_context")]
    pub max_memory_context: usize,
    /// Platforms the persona is allowed to speak on.
    #[serde(default)]
    pub platforms: Vec<String>,
}

fn default_max_memory_context() -> usize {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_memory_context: default_max_memory_context(),
            platforms: Vec::new(),
        }
    }
}

/// Static descriptor of one conversational persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersonaConfig {
    pub name: String,
    /// Registered agent identity. Must exist in the agent registry before the
    /// orchestrator will activate this persona.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub vision: String,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub wallets: Wallets,
    #[serde(default)]
    pub knowledge: KnowledgeSeed,
    #[serde(default)]
    pub personality: Personality,
    #[serde(default)]
    pub settings: Settings,
    /// Rule-set identifiers resolved against the static catalog at activation.
    #[serde(rename = "ruleIds", default, skip_serializing_if = "Option::is_none")]
    pub rule_ids: Option<Vec<String>>,
}

impl PersonaConfig {
    /// Load and validate a persona configuration from a JSON file.
    ///
    /// Fails fast with [`PuppetError::ConfigInvalid`] on any parse or
    /// validation error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| PuppetError::ConfigInvalid {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: PersonaConfig =
            serde_json::from_str(&raw).map_err(|e| PuppetError::ConfigInvalid {
                message: format!("cannot parse {}: {e}", path.display()),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate required fields.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PuppetError::ConfigInvalid {
                message: "persona name must not be empty".to_string(),
            });
        }
        if self.id.trim().is_empty() {
            return Err(PuppetError::ConfigInvalid {
                message: "persona id must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Wrap the config for sharing between an agent and its state manager.
    pub fn shared(self) -> SharedPersona {
        Arc::new(RwLock::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_full_persona_json() {
        let raw = r#"{
            "name": "Zeek",
            "id": "agent-zeek",
            "description": "A tech influencer",
            "bio": "Loves all things tech",
            "mission": "Spread the word",
            "vision": "A connected world",
            "contact": {
                "email": "zeek@example.com",
                "website": "https://example.com",
                "socials": {"twitter": "@zeek", "github": "zeek", "linkedin": "zeek"}
            },
            "wallets": {"solana": "s", "ethereum": "e", "bitcoin": "b"},
            "knowledge": {"type": "static", "data": ["rust", "tokio"]},
            "personality": {
                "tone": "friendly",
                "humor": true,
                "formality": "casual",
                "catchphrase": "Stay curious!",
                "preferences": {"topics": ["tech"], "languages": ["en"]}
            },
            "settings": {"max_memory_context": 5, "platforms": ["discord"]},
            "ruleIds": ["helloBlock"]
        }"#;
        let config: PersonaConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.name, "Zeek");
        assert_eq!(config.personality.tone, Tone::Friendly);
        assert_eq!(config.personality.preferences.topics, vec!["tech"]);
        assert_eq!(config.rule_ids, Some(vec!["helloBlock".to_string()]));
        config.validate().unwrap();
    }

    #[test]
    fn missing_name_fails_validation() {
        let config = PersonaConfig {
            id: "x".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(PuppetError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn malformed_file_fails_fast() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            PersonaConfig::from_file(file.path()),
            Err(PuppetError::ConfigInvalid { .. })
        ));
    }
}
