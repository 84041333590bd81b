//! Owns the running agents and applies control rules to the event bus.
//!
//! The orchestrator holds the set of active agent runtimes, keeps per-agent
//! rule lists plus one reserved global bucket, and routes inbound messages.
//! Its rule evaluator is subscribed to the shared hub's pre-action event at
//! construction: per-agent rules are checked first, then global rules, both
//! in registration order, and the first matching predicate wins. Activation
//! is gated by the external agent registry.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::agent::Agent;
use crate::errors::{PuppetError, Result};
use crate::events::{
    ActionData, Decision, EventHub, EventKind, EventPayload, Priority, ACTION_HANDLE_INTERACTION,
};
use crate::registry::AgentRegistry;
use crate::rules::{first_match, resolve_rule_set, ControlRule};

/// Reserved rules bucket applied to every agent.
pub const GLOBAL_RULES_KEY: &str = "global";

/// Reply returned when a rule cancels a routed message.
pub const CANCELED_BY_ORCHESTRATOR: &str = "Action canceled by orchestrator.";

/// Reply returned when the agent fails while handling a routed message.
pub const INTERACTION_FAILED: &str = "Error processing interaction.";

/// Coordinates agents, rules, and the event bus.
pub struct Orchestrator {
    /// Running agents in insertion order; the earliest is the default route.
    agents: RwLock<Vec<(String, Arc<Agent>)>>,
    /// Per-agent rule lists, keyed by agent id, plus [`GLOBAL_RULES_KEY`].
    rules: Arc<DashMap<String, Vec<ControlRule>>>,
    hub: Arc<EventHub>,
    registry: Arc<dyn AgentRegistry>,
}

impl Orchestrator {
    /// Create an orchestrator and subscribe its rule evaluator to the hub.
    pub fn new(hub: Arc<EventHub>, registry: Arc<dyn AgentRegistry>) -> Self {
        let rules: Arc<DashMap<String, Vec<ControlRule>>> = Arc::new(DashMap::new());

        let eval_rules = rules.clone();
        hub.subscribe(EventKind::PreAction, move |payload: EventPayload| {
            let rules = eval_rules.clone();
            async move {
                let agent_rules: Vec<ControlRule> = rules
                    .get(&payload.agent_id)
                    .map(|r| r.value().clone())
                    .unwrap_or_default();
                if let Some(decision) = first_match(&agent_rules, &payload.action, &payload.data)
                {
                    return decision;
                }
                let global_rules: Vec<ControlRule> = rules
                    .get(GLOBAL_RULES_KEY)
                    .map(|r| r.value().clone())
                    .unwrap_or_default();
                first_match(&global_rules, &payload.action, &payload.data)
                    .unwrap_or(Decision::Allow)
            }
        });

        log::info!("orchestrator initialized");
        Self {
            agents: RwLock::new(Vec::new()),
            rules,
            hub,
            registry,
        }
    }

    /// Activate an agent.
    ///
    /// The agent's configured identity must already exist in the registry,
    /// and every rule-set id its persona references must resolve against the
    /// static catalog; otherwise activation fails and the agent is never
    /// added to the running set.
    pub async fn start_agent(&self, agent: Arc<Agent>) -> Result<String> {
        let config = agent.character_info();
        let agent_id = config.id.clone();
        if agent_id.trim().is_empty() {
            return Err(PuppetError::ConfigInvalid {
                message: "agent has no configured identity".to_string(),
            });
        }

        if self.registry.get_agent(&agent_id).await?.is_none() {
            log::warn!("activation refused: agent {agent_id} is not registered");
            return Err(PuppetError::NotFound { agent_id });
        }

        let mut resolved = Vec::new();
        for rule_id in config.rule_ids.unwrap_or_default() {
            match resolve_rule_set(&rule_id) {
                Some(rule) => resolved.push(rule),
                None => return Err(PuppetError::UnknownRule { rule_id }),
            }
        }

        agent.start(&agent_id)?;
        self.rules.insert(agent_id.clone(), resolved);
        self.agents.write().push((agent_id.clone(), agent));
        log::info!("started agent {agent_id}");
        Ok(agent_id)
    }

    /// Deactivate an agent. An unknown id is a logged no-op.
    pub fn stop_agent(&self, agent_id: &str) {
        let removed = {
            let mut agents = self.agents.write();
            match agents.iter().position(|(id, _)| id == agent_id) {
                Some(index) => Some(agents.remove(index).1),
                None => None,
            }
        };
        match removed {
            Some(agent) => {
                agent.stop();
                self.rules.remove(agent_id);
                log::info!("stopped agent {agent_id}");
            }
            None => log::warn!("stop requested for unknown agent {agent_id}"),
        }
    }

    /// Append a rule to one agent's list. No de-duplication.
    pub fn add_agent_rule(&self, agent_id: &str, rule: ControlRule) {
        self.rules.entry(agent_id.to_string()).or_default().push(rule);
    }

    /// Append a rule applied to every agent. No de-duplication.
    pub fn add_global_rule(&self, rule: ControlRule) {
        self.rules
            .entry(GLOBAL_RULES_KEY.to_string())
            .or_default()
            .push(rule);
    }

    /// Route an inbound message to an agent.
    ///
    /// With no explicit id, the earliest-started running agent handles the
    /// message. The pre-action emission gates the turn; post-action and
    /// error emissions are fire-and-forget side channels whose completion the
    /// caller never awaits.
    pub async fn route_message(
        &self,
        message: &str,
        user_id: &str,
        platform: &str,
        agent_id: Option<&str>,
    ) -> Result<String> {
        let (agent_id, agent) = {
            let agents = self.agents.read();
            match agent_id {
                Some(id) => agents
                    .iter()
                    .find(|(aid, _)| aid == id)
                    .map(|(aid, a)| (aid.clone(), a.clone()))
                    .ok_or_else(|| PuppetError::NotFound {
                        agent_id: id.to_string(),
                    })?,
                None => agents
                    .first()
                    .map(|(aid, a)| (aid.clone(), a.clone()))
                    .ok_or_else(|| PuppetError::NotFound {
                        agent_id: "<no agents running>".to_string(),
                    })?,
            }
        };

        let pre = EventPayload::new(
            &agent_id,
            ACTION_HANDLE_INTERACTION,
            ActionData::interaction(message, user_id, platform),
        );
        let (input, user, platform) = match self.hub.emit(EventKind::PreAction, pre).await? {
            Decision::Cancel => return Ok(CANCELED_BY_ORCHESTRATOR.to_string()),
            Decision::Override(data) => (
                data.input.unwrap_or_else(|| message.to_string()),
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
            Decision::Allow => (message.to_string(), user_id.to_string(), platform.to_string()),
        };

        match agent.handle_interaction(&user, &platform, &input).await {
            Ok(response) => {
                let mut data = ActionData::interaction(input, user, platform);
                data.response = Some(response.clone());
                self.emit_detached(EventKind::PostAction, &agent_id, data, Priority::Medium);
                Ok(response)
            }
            Err(e) => {
                log::error!("agent {agent_id} failed to handle interaction: {e}");
                let mut data = ActionData::interaction(input, user, platform);
                data.error = Some(e.to_string());
                self.emit_detached(EventKind::Error, &agent_id, data, Priority::High);
                Ok(INTERACTION_FAILED.to_string())
            }
        }
    }

    /// Emit a best-effort side-channel event without awaiting its outcome.
    fn emit_detached(
        &self,
        kind: EventKind,
        agent_id: &str,
        data: ActionData,
        priority: Priority,
    ) {
        let hub = self.hub.clone();
        let payload =
            EventPayload::new(agent_id, ACTION_HANDLE_INTERACTION, data).with_priority(priority);
        tokio::spawn(async move {
            if let Err(e) = hub.emit(kind, payload).await {
                log::warn!("side-channel {kind} emission failed: {e}");
            }
        });
    }

    /// Look up a running agent.
    pub fn get_agent(&self, agent_id: &str) -> Option<Arc<Agent>> {
        self.agents
            .read()
            .iter()
            .find(|(id, _)| id == agent_id)
            .map(|(_, agent)| agent.clone())
    }

    /// Ids of all running agents, earliest first.
    pub fn agent_ids(&self) -> Vec<String> {
        self.agents.read().iter().map(|(id, _)| id.clone()).collect()
    }
}
