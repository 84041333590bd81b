//! Event interception bus.
//!
//! Agent actions are announced on an [`EventHub`] before and after they
//! execute; subscribed policy handlers can allow, cancel, or rewrite them.

pub mod event_hub;
pub mod payload;

pub use event_hub::{EventHub, GRACE_PERIOD};
pub use payload::{
    ActionData, Decision, EventKind, EventPayload, Priority, ACTION_EVOLVE,
    ACTION_HANDLE_INTERACTION,
};
