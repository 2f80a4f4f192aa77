//! In-memory store implementation.

use crate::error::{SessionError, SessionResult};
use crate::store::Store;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

/// A stored value and the last time its expiry clock was reset.
///
/// Expiry is measured on the monotonic clock; the wall-clock time is kept
/// for introspection only.
#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    touched_at: Instant,
    last_touched: DateTime<Utc>,
}

impl MemoryEntry {
    fn new(value: Vec<u8>) -> Self {
        Self {
            value,
            touched_at: Instant::now(),
            last_touched: Utc::now(),
        }
    }

    fn touch(&mut self) {
        self.touched_at = Instant::now();
        self.last_touched = Utc::now();
    }

    fn idle_time(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.touched_at)
    }
}

/// Thread-safe in-memory store, suitable for tests or single-instance
/// deployments.
///
/// Reads (`get`, `exists`) share a read lock; every mutation takes the write
/// lock. Expiry is emulated with a per-entry timestamp, so the engine runs a
/// periodic purge for this backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    /// When the entry for `id` last had its expiry clock reset.
    pub async fn last_touched(&self, id: &str) -> Option<DateTime<Utc>> {
        self.data.read().await.get(id).map(|e| e.last_touched)
    }

    /// How long the entry for `id` has been idle.
    pub async fn idle_time(&self, id: &str) -> Option<Duration> {
        let now = Instant::now();
        self.data.read().await.get(id).map(|e| e.idle_time(now))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn start(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn stop(&self) -> SessionResult<()> {
        Ok(())
    }

    async fn exists(&self, id: &str) -> SessionResult<bool> {
        Ok(self.data.read().await.contains_key(id))
    }

    async fn get(&self, id: &str) -> SessionResult<Vec<u8>> {
        self.data
            .read()
            .await
            .get(id)
            .map(|e| e.value.clone())
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    async fn set(&self, id: &str, value: Vec<u8>) -> SessionResult<()> {
        trace!(key = %id, size = value.len(), "Storing entry");
        self.data
            .write()
            .await
            .insert(id.to_string(), MemoryEntry::new(value));
        Ok(())
    }

    async fn delete(&self, id: &str) -> SessionResult<()> {
        self.data.write().await.remove(id);
        Ok(())
    }

    async fn touch(&self, id: &str) -> SessionResult<()> {
        let mut data = self.data.write().await;
        let entry = data
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        entry.touch();
        Ok(())
    }

    async fn purge(&self, max_age: Duration) -> SessionResult<usize> {
        let now = Instant::now();
        let mut data = self.data.write().await;
        let before = data.len();
        data.retain(|_, entry| entry.idle_time(now) <= max_age);
        let removed = before - data.len();

        if removed > 0 {
            debug!(removed, remaining = data.len(), "Purged expired memory entries");
        }
        Ok(removed)
    }

    fn requires_purge(&self) -> bool {
        true
    }
}
