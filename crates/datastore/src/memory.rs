use async_trait::async_trait;
use domain::PlaybackRecord;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::{ResumeCacheStore, StoreError, prepare_batch};

/// In-memory implementation of the ResumeCacheStore trait
///
/// Each batch is applied under a single write lock, so readers see either
/// the whole batch or none of it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<String, PlaybackRecord>>>,
}

impl InMemoryStore {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records, bypassing validation
    pub fn seeded(records: impl IntoIterator<Item = PlaybackRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect();
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }
}

fn poisoned<T>(operation: &'static str, err: PoisonError<T>) -> StoreError {
    StoreError::persistence(operation, err.to_string())
}

#[async_trait]
impl ResumeCacheStore for InMemoryStore {
    async fn upsert(&self, records: Vec<PlaybackRecord>) -> Result<(), StoreError> {
        let batch = prepare_batch(records)?;
        let mut stored = self.records.write().map_err(|e| poisoned("upsert", e))?;

        for record in batch {
            match stored.get_mut(&record.id) {
                Some(existing) => existing.update_from(record),
                None => {
                    stored.insert(record.id.clone(), record);
                }
            }
        }
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<PlaybackRecord>, StoreError> {
        let stored = self.records.read().map_err(|e| poisoned("get_all", e))?;
        let mut records: Vec<PlaybackRecord> = stored.values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<PlaybackRecord>, StoreError> {
        let stored = self.records.read().map_err(|e| poisoned("get", e))?;
        Ok(stored.get(id).cloned())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut stored = self.records.write().map_err(|e| poisoned("clear", e))?;
        let removed = stored.len();
        stored.clear();
        tracing::info!(removed, "Cleared resume cache");
        Ok(())
    }
}
