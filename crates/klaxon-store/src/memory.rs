use crate::error::{Result, StoreError};
use crate::Store;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, RwLock};

#[derive(Default)]
struct Tables {
    scalars: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, BTreeSet<String>>,
    lists: HashMap<String, Vec<String>>,
}

/// Thread-safe in-memory [`Store`] implementation.
///
/// One keyspace across all value kinds, redis-style: [`Store::delete`]
/// removes a key regardless of which kind it holds.
///
/// Tests can simulate an unreachable backend with [`MemoryStore::fail_after`];
/// once the allowance is exhausted every operation returns
/// [`StoreError::Unavailable`] until [`MemoryStore::clear_failure`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    // None = healthy; Some(n) = n more operations succeed, then all fail
    fail_after: Mutex<Option<u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `ops` more operations to succeed, then fail every operation
    /// with [`StoreError::Unavailable`].
    pub fn fail_after(&self, ops: u64) {
        *self.fail_after.lock().unwrap() = Some(ops);
    }

    /// Return to healthy operation.
    pub fn clear_failure(&self) {
        *self.fail_after.lock().unwrap() = None;
    }

    fn check_available(&self) -> Result<()> {
        let mut fail = self.fail_after.lock().unwrap();
        match fail.as_mut() {
            None => Ok(()),
            Some(0) => Err(StoreError::Unavailable(
                "simulated backend outage".to_string(),
            )),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.tables.read().unwrap().scalars.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_available()?;
        self.tables
            .write()
            .unwrap()
            .scalars
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.check_available()?;
        let mut tables = self.tables.write().unwrap();
        let removed = tables.scalars.remove(key).is_some()
            | tables.hashes.remove(key).is_some()
            | tables.sets.remove(key).is_some()
            | tables.lists.remove(key).is_some();
        Ok(removed)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .unwrap()
            .hashes
            .get(key)
            .and_then(|h| h.get(field))
            .cloned())
    }

    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.check_available()?;
        self.tables
            .write()
            .unwrap()
            .hashes
            .entry(key.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hash_remove(&self, key: &str, field: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .tables
            .write()
            .unwrap()
            .hashes
            .get_mut(key)
            .is_some_and(|h| h.remove(field).is_some()))
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .unwrap()
            .hashes
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .tables
            .write()
            .unwrap()
            .sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .tables
            .write()
            .unwrap()
            .sets
            .get_mut(key)
            .is_some_and(|s| s.remove(member)))
    }

    async fn set_contains(&self, key: &str, member: &str) -> Result<bool> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .unwrap()
            .sets
            .get(key)
            .is_some_and(|s| s.contains(member)))
    }

    async fn set_members(&self, key: &str) -> Result<BTreeSet<String>> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .unwrap()
            .sets
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_push(&self, key: &str, value: &str) -> Result<()> {
        self.check_available()?;
        self.tables
            .write()
            .unwrap()
            .lists
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
        Ok(())
    }

    async fn list_remove(&self, key: &str, value: &str) -> Result<bool> {
        self.check_available()?;
        let mut tables = self.tables.write().unwrap();
        if let Some(list) = tables.lists.get_mut(key) {
            if let Some(pos) = list.iter().position(|v| v == value) {
                list.remove(pos);
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn list_all(&self, key: &str) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self
            .tables
            .read()
            .unwrap()
            .lists
            .get(key)
            .cloned()
            .unwrap_or_default())
    }
}
