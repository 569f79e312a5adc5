use datastore::{ResumeCacheStore, StoreError};
use domain::{PlaybackProgress, PlaybackRecord};
use std::cmp::Reverse;
use std::sync::Arc;

/// Derives the "continue watching" row from the resume cache
///
/// Holds no state of its own; every call reads through the store.
#[derive(Clone)]
pub struct ContinueWatching {
    store: Arc<dyn ResumeCacheStore>,
}

impl ContinueWatching {
    pub fn new(store: Arc<dyn ResumeCacheStore>) -> Self {
        Self { store }
    }

    /// Records that were started but not finished, in store order
    ///
    /// A failed read is returned as is, never as an empty row.
    pub async fn select(&self) -> Result<Vec<PlaybackRecord>, StoreError> {
        let records = self.store.get_all().await?;
        let total = records.len();
        let selected = filter_in_progress(records);
        tracing::debug!(total, selected = selected.len(), "Selected continue watching records");
        Ok(selected)
    }

    /// Same selection, most recently played first
    pub async fn select_most_recent(&self) -> Result<Vec<PlaybackRecord>, StoreError> {
        let mut selected = self.select().await?;
        sort_most_recent_first(&mut selected);
        Ok(selected)
    }
}

/// Keep only records that are partially watched
pub fn filter_in_progress(records: Vec<PlaybackRecord>) -> Vec<PlaybackRecord> {
    records
        .into_iter()
        .filter(|record| record.progress() == PlaybackProgress::InProgress)
        .collect()
}

/// Order by last played date, newest first; undated records go last
pub fn sort_most_recent_first(records: &mut [PlaybackRecord]) {
    records.sort_by_key(|record| Reverse(record.last_played_date));
}
