//! Key-value store contract consumed by the routing core.
//!
//! The routing core does not talk to a database directly; it reads and
//! writes entities through the [`Store`] trait, which models the small
//! surface a redis-like backend offers: scalar values, hash field maps,
//! membership sets, and ordered lists. Secondary indexes are realized as
//! membership sets maintained by writers. [`memory::MemoryStore`] is the
//! in-repo reference implementation, used by tests and small deployments.

pub mod error;
pub mod memory;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use error::Result;
use std::collections::{BTreeSet, HashMap};

pub use error::StoreError;
pub use memory::MemoryStore;

/// Persistence backend for the routing core.
///
/// Implementations must be safe to share across tasks (`Send + Sync`);
/// the router accesses the store concurrently from independent per-check
/// routing cycles.
///
/// Atomicity is per key only. Callers must not assume multi-key
/// transactions or relational joins; the routing core is written so that
/// every invariant it needs survives that restriction.
///
/// # Errors
///
/// Every operation may fail with [`StoreError::Unavailable`] when the
/// backend is unreachable or times out. Implementations must not block
/// indefinitely.
#[async_trait]
pub trait Store: Send + Sync {
    /// Reads a scalar value. `None` if the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a scalar value, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Deletes a key of any kind (scalar, hash, set, or list). Returns
    /// whether anything was deleted.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Reads one field of a hash. `None` if the key or field is absent.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Writes one field of a hash, creating the hash if needed.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()>;

    /// Removes one field of a hash. Returns whether the field existed.
    async fn hash_remove(&self, key: &str, field: &str) -> Result<bool>;

    /// Reads all fields of a hash. Empty map if the key is absent.
    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Adds a member to a set. Returns whether it was newly added.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool>;

    /// Removes a member from a set. Returns whether it was present.
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Membership test. Absent keys are empty sets.
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool>;

    /// Reads all members of a set. Empty set if the key is absent.
    async fn set_members(&self, key: &str) -> Result<BTreeSet<String>>;

    /// Appends a value to an ordered list, creating the list if needed.
    async fn list_push(&self, key: &str, value: &str) -> Result<()>;

    /// Removes the first occurrence of a value from a list. Returns
    /// whether it was present.
    async fn list_remove(&self, key: &str, value: &str) -> Result<bool>;

    /// Reads a list in insertion order. Empty if the key is absent.
    async fn list_all(&self, key: &str) -> Result<Vec<String>>;
}
