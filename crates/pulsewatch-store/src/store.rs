//! StatusStore — single-writer status map with snapshot reads.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tracing::debug;

use pulsewatch_core::TargetRegistry;

use crate::error::{StoreError, StoreResult};
use crate::types::StatusRecord;

struct Shared {
    /// target_id → slot index. Fixed at construction.
    index: HashMap<String, usize>,
    /// One record per target, in registry order.
    records: RwLock<Vec<Arc<StatusRecord>>>,
    started_at: DateTime<Utc>,
}

impl Shared {
    fn list(&self) -> StoreResult<Vec<StatusRecord>> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.iter().map(|r| StatusRecord::clone(r)).collect())
    }

    fn get(&self, target_id: &str) -> StoreResult<Option<StatusRecord>> {
        let Some(&slot) = self.index.get(target_id) else {
            return Ok(None);
        };
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.get(slot).map(|r| StatusRecord::clone(r)))
    }
}

/// The writable status store. Owned by the poller; not `Clone`.
pub struct StatusStore {
    shared: Arc<Shared>,
}

/// Read-only handle onto a [`StatusStore`].
#[derive(Clone)]
pub struct StatusReader {
    shared: Arc<Shared>,
}

impl StatusStore {
    /// Create a store with a pending `unknown` record for every target.
    pub fn new(registry: &TargetRegistry, started_at: DateTime<Utc>) -> Self {
        let mut index = HashMap::with_capacity(registry.len());
        let mut records = Vec::with_capacity(registry.len());
        for (slot, target) in registry.iter().enumerate() {
            index.insert(target.id.clone(), slot);
            records.push(Arc::new(StatusRecord::pending(target, started_at)));
        }
        debug!(targets = records.len(), "status store initialized");

        Self {
            shared: Arc::new(Shared {
                index,
                records: RwLock::new(records),
                started_at,
            }),
        }
    }

    pub fn reader(&self) -> StatusReader {
        StatusReader {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Replace a target's record, returning the one it superseded.
    pub fn replace(&self, record: StatusRecord) -> StoreResult<StatusRecord> {
        let slot = *self
            .shared
            .index
            .get(&record.target_id)
            .ok_or_else(|| StoreError::UnknownTarget(record.target_id.clone()))?;

        let new = Arc::new(record);
        let previous = {
            let mut records = self.shared.records.write().map_err(|_| StoreError::Poisoned)?;
            std::mem::replace(&mut records[slot], new)
        };
        Ok(Arc::unwrap_or_clone(previous))
    }

    pub fn get(&self, target_id: &str) -> StoreResult<Option<StatusRecord>> {
        self.shared.get(target_id)
    }

    pub fn list(&self) -> StoreResult<Vec<StatusRecord>> {
        self.shared.list()
    }
}

impl StatusReader {
    /// All records in registry order.
    pub fn list(&self) -> StoreResult<Vec<StatusRecord>> {
        self.shared.list()
    }

    pub fn get(&self, target_id: &str) -> StoreResult<Option<StatusRecord>> {
        self.shared.get(target_id)
    }

    pub fn len(&self) -> usize {
        self.shared.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.index.is_empty()
    }

    /// When the store was created (process start).
    pub fn started_at(&self) -> DateTime<Utc> {
        self.shared.started_at
    }
}
