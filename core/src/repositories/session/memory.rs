//! In-process session adapter for single-node deployments and tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::context::CallContext;

use super::adapter::{AdapterError, SessionAdapter};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    /// `None` when the ttl reaches past what the clock can represent
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// Session adapter keeping records in a process-local map
///
/// Expired records are dropped lazily on read and on [`purge_expired`].
///
/// [`purge_expired`]: MemorySessionAdapter::purge_expired
#[derive(Debug, Clone, Default)]
pub struct MemorySessionAdapter {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
}

impl MemorySessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drops every expired record and returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}

#[async_trait]
impl SessionAdapter for MemorySessionAdapter {
    async fn put(
        &self,
        _ctx: &CallContext,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<(), AdapterError> {
        let entry = Entry {
            value: value.to_string(),
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get(&self, _ctx: &CallContext, key: &str) -> Result<Option<String>, AdapterError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.is_live(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: drop it unless a concurrent put already replaced it
        let mut entries = self.entries.write().await;
        if entries.get(key).map_or(false, |entry| !entry.is_live(now)) {
            entries.remove(key);
        }
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn delete(&self, _ctx: &CallContext, key: &str) -> Result<(), AdapterError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
