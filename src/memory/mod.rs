//! Key-value storage contracts and backends.
//!
//! The core never persists data itself; it consumes an abstract store with a
//! synchronous, process-local short-term side and an asynchronous, durable
//! long-term side. Values are opaque structured data serialized by the store.

pub mod in_memory;
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use serde_json::Value;

/// Abstract short-term and long-term key-value storage.
///
/// All storage backends consumed by the core must implement this trait.
/// Short-term operations are synchronous and process-local; long-term
/// operations are asynchronous suspension points.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store a transient value in process-local memory.
    fn set_short_term(&self, key: &str, value: Value);

    /// Fetch a transient value, if present.
    fn get_short_term(&self, key: &str) -> Option<Value>;

    /// Drop all transient values.
    fn clear_short_term(&self);

    /// Durably store a value under the given key, replacing any previous one.
    async fn set_long_term(&self, key: &str, value: Value) -> Result<(), anyhow::Error>;

    /// Fetch a durable value, if present.
    async fn get_long_term(&self, key: &str) -> Result<Option<Value>, anyhow::Error>;

    /// Delete a durable value. Deleting an absent key is not an error.
    async fn delete_long_term(&self, key: &str) -> Result<(), anyhow::Error>;
}
