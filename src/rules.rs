//! Control rules: ordered policy matching over event payloads.
//!
//! A [`ControlRule`] names the action it intercepts, a predicate over the
//! action's data bag, and a result. Results are a closed variant set built
//! from typed input only; the core never evaluates externally supplied
//! executable text. Rules are immutable once registered and evaluated in
//! registration order, first match wins.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::events::{ActionData, Decision};

/// Predicate over the data bag of an intercepted action.
pub type RulePredicate = Arc<dyn Fn(&ActionData) -> bool + Send + Sync>;

/// Pure function computing a decision from the data bag.
pub type RuleFn = Arc<dyn Fn(&ActionData) -> Decision + Send + Sync>;

/// Outcome of a matched rule.
#[derive(Clone)]
pub enum RuleResult {
    /// Let the action proceed.
    Allow,
    /// Veto the action.
    Cancel,
    /// Replace the outbound data with a fixed payload.
    Override(ActionData),
    /// Compute the decision from the matched data.
    Computed(RuleFn),
}

impl fmt::Debug for RuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "Allow"),
            Self::Cancel => write!(f, "Cancel"),
            Self::Override(data) => write!(f, "Override({data:?})"),
            Self::Computed(_) => write!(f, "Computed(<fn>)"),
        }
    }
}

/// A named policy matching one action.
#[derive(Clone)]
pub struct ControlRule {
    /// Action name this rule intercepts, for example `"handleInteraction"`.
    pub action: String,
    condition: RulePredicate,
    result: RuleResult,
}

impl fmt::Debug for ControlRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlRule")
            .field("action", &self.action)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}

impl ControlRule {
    /// Build a rule from a typed predicate and result.
    pub fn new(
        action: impl Into<String>,
        condition: impl Fn(&ActionData) -> bool + Send + Sync + 'static,
        result: RuleResult,
    ) -> Self {
        Self {
            action: action.into(),
            condition: Arc::new(condition),
            result,
        }
    }

    /// Whether this rule intercepts the given action with the given data.
    pub fn matches(&self, action: &str, data: &ActionData) -> bool {
        self.action == action && (self.condition)(data)
    }

    /// Resolve this rule's decision for the matched data.
    pub fn decide(&self, data: &ActionData) -> Decision {
        match &self.result {
            RuleResult::Allow => Decision::Allow,
            RuleResult::Cancel => Decision::Cancel,
            RuleResult::Override(replacement) => Decision::Override(replacement.clone()),
            RuleResult::Computed(f) => f(data),
        }
    }
}

/// Evaluate an ordered rule list against one action.
///
/// Returns the decision of the first rule whose predicate matches, or `None`
/// when nothing matches; callers default the absence of a match to allow.
pub fn first_match(rules: &[ControlRule], action: &str, data: &ActionData) -> Option<Decision> {
    rules
        .iter()
        .find(|rule| rule.matches(action, data))
        .map(|rule| rule.decide(data))
}

fn lowercased_input(data: &ActionData) -> String {
    data.input.as_deref().unwrap_or_default().to_lowercase()
}

fn boost_rule(keyword: &'static str, replacement: &'static str) -> ControlRule {
    ControlRule::new(
        "handleInteraction",
        move |data| lowercased_input(data).contains(keyword),
        RuleResult::Computed(Arc::new(move |data| {
            Decision::Override(ActionData {
                input: Some(replacement.to_string()),
                user_id: data.user_id.clone(),
                platform: data.platform.clone(),
                ..Default::default()
            })
        })),
    )
}

/// Static catalog of named rule sets referenced by persona `ruleIds`.
pub static RULE_CATALOG: Lazy<HashMap<&'static str, ControlRule>> = Lazy::new(|| {
    let mut catalog = HashMap::new();
    catalog.insert(
        "helloBlock",
        ControlRule::new(
            "handleInteraction",
            |data| lowercased_input(data) == "hello",
            RuleResult::Cancel,
        ),
    );
    catalog.insert("codeBoost", boost_rule("code", "Coding is my jam!"));
    catalog.insert(
        "byeBlock",
        ControlRule::new(
            "handleInteraction",
            |data| lowercased_input(data) == "bye",
            RuleResult::Cancel,
        ),
    );
    catalog.insert("spaceBoost", boost_rule("space", "Space is out of this world!"));
    catalog
});

/// Look up a rule set by catalog identifier.
pub fn resolve_rule_set(rule_id: &str) -> Option<ControlRule> {
    RULE_CATALOG.get(rule_id).cloned()
}
