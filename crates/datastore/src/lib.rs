use async_trait::async_trait;
use domain::PlaybackRecord;

mod error;
mod memory;
mod sqlite;

pub use error::StoreError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Store trait for playback progress records
/// This allows switching between different storage backends (in-memory, SQLite)
/// and injecting test doubles wherever a store is needed.
#[async_trait]
pub trait ResumeCacheStore: Send + Sync {
    /// Insert or update a batch of records keyed by id
    ///
    /// The batch is applied atomically. Live records are skipped, and a
    /// batch holding an invalid record writes nothing.
    async fn upsert(&self, records: Vec<PlaybackRecord>) -> Result<(), StoreError>;

    /// Get every cached record
    async fn get_all(&self) -> Result<Vec<PlaybackRecord>, StoreError>;

    /// Get the record for a video, `None` when it was never cached
    async fn get(&self, id: &str) -> Result<Option<PlaybackRecord>, StoreError>;

    /// Delete every record
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Validate a batch and drop the live records it carries
fn prepare_batch(records: Vec<PlaybackRecord>) -> Result<Vec<PlaybackRecord>, StoreError> {
    for record in &records {
        if record.id.is_empty() {
            return Err(StoreError::invalid("record id must not be empty"));
        }
        for (field, value) in [("resume time", record.resume_time), ("length", record.length)] {
            if let Some(seconds) = value {
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(StoreError::invalid(format!(
                        "{field} of '{}' must be a non-negative number of seconds, got {seconds}",
                        record.id
                    )));
                }
            }
        }
    }

    let total = records.len();
    let batch: Vec<PlaybackRecord> = records
        .into_iter()
        .filter(|record| !record.is_live_video)
        .collect();
    if batch.len() < total {
        tracing::debug!(skipped = total - batch.len(), "Skipping live videos in upsert batch");
    }
    Ok(batch)
}
