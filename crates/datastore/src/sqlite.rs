use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::PlaybackRecord;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{ResumeCacheStore, StoreError, prepare_batch};

/// SQLite-backed implementation of the ResumeCacheStore trait
///
/// Batches run inside one transaction and are serialized through
/// `write_lock`, so two upserts never interleave.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

#[derive(Debug, sqlx::FromRow)]
struct PlaybackRecordRow {
    id: String,
    title: Option<String>,
    description: Option<String>,
    image_url: Option<String>,
    publish_date: Option<String>,
    credit: Option<String>,
    is_live_video: bool,
    resume_time: Option<f64>,
    length: Option<f64>,
    last_played_date: Option<DateTime<Utc>>,
}

impl From<PlaybackRecordRow> for PlaybackRecord {
    fn from(row: PlaybackRecordRow) -> Self {
        PlaybackRecord {
            id: row.id,
            title: row.title,
            description: row.description,
            image_url: row.image_url,
            publish_date: row.publish_date,
            credit: row.credit,
            is_live_video: row.is_live_video,
            resume_time: row.resume_time,
            length: row.length,
            last_played_date: row.last_played_date,
        }
    }
}

const SELECT_RECORDS: &str = r#"
    SELECT id, title, description, image_url, publish_date, credit,
           is_live_video, resume_time, length, last_played_date
    FROM playback_records
"#;

const UPSERT_RECORD: &str = r#"
    INSERT INTO playback_records (
        id, title, description, image_url, publish_date, credit,
        is_live_video, resume_time, length, last_played_date
    )
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(id) DO UPDATE SET
        title = excluded.title,
        description = excluded.description,
        image_url = excluded.image_url,
        publish_date = excluded.publish_date,
        credit = excluded.credit,
        is_live_video = excluded.is_live_video,
        resume_time = COALESCE(excluded.resume_time, playback_records.resume_time),
        length = COALESCE(excluded.length, playback_records.length),
        last_played_date = excluded.last_played_date
"#;

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and apply migrations
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::persistence("connect", e))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::persistence("connect", e))?;

        info!("Database connected: {}", url);

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// Wrap an existing pool; the caller is responsible for migrations
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::persistence("migrate", e))?;
        debug!("Database migrations completed");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ResumeCacheStore for SqliteStore {
    async fn upsert(&self, records: Vec<PlaybackRecord>) -> Result<(), StoreError> {
        let batch = prepare_batch(records)?;
        if batch.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::persistence("upsert", e))?;

        for record in &batch {
            sqlx::query(UPSERT_RECORD)
                .bind(&record.id)
                .bind(&record.title)
                .bind(&record.description)
                .bind(&record.image_url)
                .bind(&record.publish_date)
                .bind(&record.credit)
                .bind(record.is_live_video)
                .bind(record.resume_time)
                .bind(record.length)
                .bind(record.last_played_date)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::persistence("upsert", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::persistence("upsert", e))?;
        debug!(records = batch.len(), "Committed upsert batch");
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<PlaybackRecord>, StoreError> {
        let rows: Vec<PlaybackRecordRow> =
            sqlx::query_as(&format!("{SELECT_RECORDS} ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::persistence("get_all", e))?;
        Ok(rows.into_iter().map(PlaybackRecord::from).collect())
    }

    async fn get(&self, id: &str) -> Result<Option<PlaybackRecord>, StoreError> {
        let row: Option<PlaybackRecordRow> =
            sqlx::query_as(&format!("{SELECT_RECORDS} WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::persistence("get", e))?;
        Ok(row.map(PlaybackRecord::from))
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::persistence("clear", e))?;

        let removed = sqlx::query("DELETE FROM playback_records")
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::persistence("clear", e))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| StoreError::persistence("clear", e))?;
        info!(removed, "Cleared resume cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    async fn setup_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("resume.db");
        let db_url = format!("sqlite://{}", db_path.display());

        let store = SqliteStore::connect(&db_url, 5).await.unwrap();
        (store, temp_dir)
    }

    fn paused(id: &str, resume_time: f64, length: f64) -> PlaybackRecord {
        PlaybackRecord {
            title: Some(format!("Title of {id}")),
            credit: Some("Newsroom".to_string()),
            resume_time: Some(resume_time),
            length: Some(length),
            last_played_date: Some(Utc.with_ymd_and_hms(2023, 1, 1, 12, 0, 0).unwrap()),
            ..PlaybackRecord::new(id)
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips_every_field() {
        let (store, _temp_dir) = setup_store().await;
        let mut record = paused("vod-1", 42.5, 300.0);
        record.description = Some("Morning briefing".to_string());
        record.image_url = Some("https://img.example/vod-1.jpg".to_string());
        record.publish_date = Some("January 1, 2023".to_string());

        store.upsert(vec![record.clone()]).await.unwrap();
        assert_eq!(store.get("vod-1").await.unwrap(), Some(record));
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_updates_in_place() {
        let (store, _temp_dir) = setup_store().await;
        store.upsert(vec![paused("vod-1", 10.0, 300.0)]).await.unwrap();

        let mut newer = paused("vod-1", 200.0, 300.0);
        newer.title = Some("Renamed".to_string());
        newer.last_played_date = Some(Utc.with_ymd_and_hms(2023, 1, 2, 12, 0, 0).unwrap());
        store.upsert(vec![newer.clone()]).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all, vec![newer]);
    }

    #[tokio::test]
    async fn missing_progress_keeps_the_stored_values() {
        let (store, _temp_dir) = setup_store().await;
        store.upsert(vec![paused("vod-1", 10.0, 300.0)]).await.unwrap();

        let mut metadata_only = PlaybackRecord::new("vod-1");
        metadata_only.title = Some("Updated".to_string());
        store.upsert(vec![metadata_only]).await.unwrap();

        let stored = store.get("vod-1").await.unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Updated"));
        assert_eq!(stored.resume_time, Some(10.0));
        assert_eq!(stored.length, Some(300.0));
    }

    #[tokio::test]
    async fn failing_batch_is_rolled_back() {
        let (store, _temp_dir) = setup_store().await;
        store.upsert(vec![paused("vod-1", 10.0, 300.0)]).await.unwrap();

        sqlx::query(
            r#"
            CREATE TRIGGER reject_poison BEFORE INSERT ON playback_records
            WHEN NEW.id = 'poison'
            BEGIN
                SELECT RAISE(ABORT, 'poisoned record');
            END
            "#,
        )
        .execute(store.pool())
        .await
        .unwrap();

        let result = store
            .upsert(vec![
                paused("vod-1", 99.0, 300.0),
                paused("vod-2", 5.0, 60.0),
                paused("poison", 1.0, 2.0),
            ])
            .await;

        assert!(result.unwrap_err().is_persistence());
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].resume_time, Some(10.0));
    }

    #[tokio::test]
    async fn live_records_are_skipped() {
        let (store, _temp_dir) = setup_store().await;
        let mut live = paused("live-1", 30.0, 120.0);
        live.is_live_video = true;

        store.upsert(vec![live, paused("vod-1", 1.0, 2.0)]).await.unwrap();
        assert_eq!(store.get("live-1").await.unwrap(), None);
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_empties_the_table() {
        let (store, _temp_dir) = setup_store().await;
        store
            .upsert(vec![paused("a", 1.0, 10.0), paused("b", 2.0, 10.0)])
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn records_survive_reopening_the_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_url = format!("sqlite://{}", temp_dir.path().join("resume.db").display());

        let store = SqliteStore::connect(&db_url, 1).await.unwrap();
        store.upsert(vec![paused("vod-1", 75.0, 300.0)]).await.unwrap();
        store.close().await;

        let reopened = SqliteStore::connect(&db_url, 1).await.unwrap();
        let stored = reopened.get("vod-1").await.unwrap().unwrap();
        assert_eq!(stored.resume_time, Some(75.0));
    }

    #[tokio::test]
    async fn unreadable_table_reports_persistence_failure() {
        let (store, _temp_dir) = setup_store().await;
        sqlx::query("DROP TABLE playback_records")
            .execute(store.pool())
            .await
            .unwrap();

        let err = store.get_all().await.unwrap_err();
        assert!(matches!(err, StoreError::Persistence { operation: "get_all", .. }));
    }

    fn full_write(
        id: &str,
        title: &str,
        credit: &str,
        resume_time: f64,
        length: f64,
        day: u32,
    ) -> PlaybackRecord {
        PlaybackRecord {
            title: Some(title.to_string()),
            credit: Some(credit.to_string()),
            resume_time: Some(resume_time),
            length: Some(length),
            last_played_date: Some(Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap()),
            ..PlaybackRecord::new(id)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reads_during_concurrent_writes_see_whole_records() {
        let (store, _temp_dir) = setup_store().await;
        let first = full_write("vod-1", "First cut", "Newsroom", 30.0, 120.0, 1);
        let second = full_write("vod-1", "Second cut", "Sports desk", 75.5, 3600.0, 2);
        store.upsert(vec![first.clone()]).await.unwrap();

        let mut writers = Vec::new();
        for n in 0..4 {
            let store = store.clone();
            let (first, second) = (first.clone(), second.clone());
            writers.push(tokio::spawn(async move {
                for step in 0..25 {
                    let rec = if (n + step) % 2 == 0 {
                        first.clone()
                    } else {
                        second.clone()
                    };
                    store.upsert(vec![rec]).await.unwrap();
                }
            }));
        }

        let reader = {
            let store = store.clone();
            let (first, second) = (first.clone(), second.clone());
            tokio::spawn(async move {
                for _ in 0..100 {
                    let seen = store.get("vod-1").await.unwrap().unwrap();
                    assert!(seen == first || seen == second, "torn read: {seen:?}");
                }
            })
        };

        for writer in writers {
            writer.await.unwrap();
        }
        reader.await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0] == first || all[0] == second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_batches_are_applied_one_at_a_time() {
        let (store, _temp_dir) = setup_store().await;
        let batch_for = |writer: u32| -> Vec<PlaybackRecord> {
            (0..5)
                .map(|slot| {
                    full_write(
                        &format!("batch-{slot}"),
                        &format!("Writer {writer}"),
                        &format!("Desk {writer}"),
                        f64::from(writer * 10 + 1),
                        f64::from(writer * 10 + 600),
                        writer + 1,
                    )
                })
                .collect()
        };

        let mut writers = Vec::new();
        for writer in 0..8 {
            let store = store.clone();
            let batch = batch_for(writer);
            writers.push(tokio::spawn(async move {
                for _ in 0..5 {
                    store.upsert(batch.clone()).await.unwrap();
                }
            }));
        }
        for handle in writers {
            handle.await.unwrap();
        }

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 5);

        let last_title = all[0].title.clone();
        for rec in &all {
            let writer = rec
                .title
                .as_deref()
                .and_then(|title| title.strip_prefix("Writer "))
                .and_then(|n| n.parse::<u32>().ok())
                .unwrap();
            let expected = batch_for(writer)
                .into_iter()
                .find(|candidate| candidate.id == rec.id)
                .unwrap();
            assert_eq!(rec, &expected);
            // The last committed batch overwrote every slot.
            assert_eq!(rec.title, last_title);
        }
    }
}
