//! Typed publish/subscribe bus with a soft-real-time grace period.
//!
//! Handlers for one emission run as concurrent tasks racing a fixed timer.
//! When every handler finishes inside the grace period, the effective
//! decision is the first non-allow result in handler *registration* order
//! (not completion order). When the timer wins, the decision is
//! unconditionally allow and late handler results are discarded: interception
//! must never block the system indefinitely, so timeout means permit.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::errors::{PuppetError, Result};

use super::payload::{Decision, EventKind, EventPayload};

/// How long an emission waits for its handlers before defaulting to allow.
pub const GRACE_PERIOD: Duration = Duration::from_millis(100);

/// A subscribed policy handler.
pub type EventHandler = Arc<dyn Fn(EventPayload) -> BoxFuture<'static, Decision> + Send + Sync>;

/// The interception bus.
///
/// Constructed once at process start and shared by reference between the
/// orchestrator and each agent; there is deliberately no global singleton.
#[derive(Default)]
pub struct EventHub {
    handlers: RwLock<HashMap<EventKind, Vec<EventHandler>>>,
}

impl EventHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for the given event kind.
    ///
    /// Handlers are invoked on every emission of that kind, in registration
    /// order for tie-breaking purposes.
    pub fn subscribe<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(EventPayload) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Decision> + Send + 'static,
    {
        let wrapped: EventHandler = Arc::new(move |payload| Box::pin(handler(payload)));
        self.handlers.write().entry(kind).or_default().push(wrapped);
    }

    /// Number of handlers registered for an event kind.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Emit an event and return the effective decision.
    ///
    /// All handlers are spawned as independent tasks. If they all complete
    /// within [`GRACE_PERIOD`], the first non-allow result in registration
    /// order wins; otherwise the emission resolves to [`Decision::Allow`] and
    /// still-running handlers are left to finish on their own, their results
    /// dropped. A handler panic that surfaces before the grace period elapses
    /// is reported as [`PuppetError::HandlerFailure`].
    pub async fn emit(&self, kind: EventKind, payload: EventPayload) -> Result<Decision> {
        log::debug!(
            "event {kind}: agent={} action={}",
            payload.agent_id,
            payload.action
        );

        let handlers: Vec<EventHandler> = self
            .handlers
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        if handlers.is_empty() {
            return Ok(Decision::Allow);
        }

        // Registration order is preserved by join_all's result ordering.
        let tasks: Vec<_> = handlers
            .into_iter()
            .map(|handler| tokio::spawn(handler(payload.clone())))
            .collect();

        tokio::select! {
            results = futures::future::join_all(tasks) => {
                for result in results {
                    match result {
                        Ok(Decision::Allow) => continue,
                        Ok(decision) => return Ok(decision),
                        Err(e) => {
                            return Err(PuppetError::HandlerFailure {
                                message: e.to_string(),
                            })
                        }
                    }
                }
                Ok(Decision::Allow)
            }
            _ = tokio::time::sleep(GRACE_PERIOD) => {
                // Dropping the join handles detaches the tasks; whatever they
                // return later is orphaned by contract.
                log::warn!(
                    "event {kind}: grace period elapsed, defaulting to allow (agent={})",
                    payload.agent_id
                );
                Ok(Decision::Allow)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::payload::ActionData;

    fn payload() -> EventPayload {
        EventPayload::new(
            "agent-1",
            "handleInteraction",
            ActionData::interaction("hi", "u1", "test"),
        )
    }

    #[tokio::test]
    async fn zero_handlers_allows() {
        let hub = EventHub::new();
        let decision = hub.emit(EventKind::PreAction, payload()).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn first_cancel_wins_over_later_allows() {
        let hub = EventHub::new();
        hub.subscribe(EventKind::PreAction, |_| async { Decision::Cancel });
        hub.subscribe(EventKind::PreAction, |_| async { Decision::Allow });
        let decision = hub.emit(EventKind::PreAction, payload()).await.unwrap();
        assert_eq!(decision, Decision::Cancel);
    }

    #[tokio::test]
    async fn registration_order_breaks_ties_not_completion_order() {
        let hub = EventHub::new();
        // Registered first, completes last: still wins.
        hub.subscribe(EventKind::PreAction, |_| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Decision::Cancel
        });
        hub.subscribe(EventKind::PreAction, |data| async move {
            Decision::Override(data.data)
        });
        let decision = hub.emit(EventKind::PreAction, payload()).await.unwrap();
        assert_eq!(decision, Decision::Cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_handler_defaults_to_allow() {
        let hub = EventHub::new();
        hub.subscribe(EventKind::PreAction, |_| async {
            // Never resolves inside the grace period.
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Decision::Cancel
        });
        let decision = hub.emit(EventKind::PreAction, payload()).await.unwrap();
        assert_eq!(decision, Decision::Allow);
    }

    #[tokio::test]
    async fn override_carries_replacement_data() {
        let hub = EventHub::new();
        hub.subscribe(EventKind::PreAction, |_| async {
            Decision::Override(ActionData::interaction("rewritten", "u1", "test"))
        });
        let decision = hub.emit(EventKind::PreAction, payload()).await.unwrap();
        match decision {
            Decision::Override(data) => assert_eq!(data.input.as_deref(), Some("rewritten")),
            other => panic!("expected override, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn panicking_handler_reports_failure() {
        let hub = EventHub::new();
        hub.subscribe(EventKind::PreAction, |_| async { panic!("boom") });
        let err = hub.emit(EventKind::PreAction, payload()).await.unwrap_err();
        assert!(matches!(err, PuppetError::HandlerFailure { .. }));
    }
}
