//! Durable track records (L2).
//!
//! Rows carry their own expiry. Reads filter on it so an expired row behaves
//! as a miss even before [`TrackStore::evict_expired`] physically removes it.

use crate::errors::AppError;
use crate::models::TrackRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite};

#[async_trait]
pub trait TrackStore: Send + Sync {
    /// Insert or replace the record with the same content id.
    async fn upsert(&self, record: &TrackRecord) -> Result<(), AppError>;

    /// Unexpired record for `content_id`, if any.
    async fn find(&self, content_id: &str) -> Result<Option<TrackRecord>, AppError>;

    /// Point an existing record at its prefetched successor.
    ///
    /// Returns `false` when no live record exists.
    async fn set_successor(&self, content_id: &str, next_content_id: &str)
        -> Result<bool, AppError>;

    /// Delete expired rows; returns how many were removed.
    async fn evict_expired(&self) -> Result<u64, AppError>;
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TrackRow {
    content_id: String,
    catalog_id: Option<String>,
    title: String,
    artists_json: String,
    album: String,
    genre: String,
    catalog_genres_json: String,
    duration: i64,
    thumbnail: String,
    album_cover: String,
    audio_url: String,
    audio_format: Option<String>,
    expires_at: i64,
    next_content_id: Option<String>,
}

impl TryFrom<TrackRow> for TrackRecord {
    type Error = AppError;

    fn try_from(row: TrackRow) -> Result<Self, Self::Error> {
        Ok(TrackRecord {
            artists: serde_json::from_str(&row.artists_json)?,
            catalog_genres: serde_json::from_str(&row.catalog_genres_json)?,
            expires_at: DateTime::from_timestamp(row.expires_at, 0).unwrap_or_else(Utc::now),
            content_id: row.content_id,
            catalog_id: row.catalog_id,
            title: row.title,
            album: row.album,
            genre: row.genre,
            duration: row.duration.max(0) as u32,
            thumbnail: row.thumbnail,
            album_cover: row.album_cover,
            audio_url: row.audio_url,
            audio_format: row.audio_format,
            next_content_id: row.next_content_id,
        })
    }
}

/// Track store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteTrackStore {
    pool: Pool<Sqlite>,
}

impl SqliteTrackStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrackStore for SqliteTrackStore {
    async fn upsert(&self, record: &TrackRecord) -> Result<(), AppError> {
        let now = Utc::now().timestamp();
        let artists_json = serde_json::to_string(&record.artists)?;
        let genres_json = serde_json::to_string(&record.catalog_genres)?;

        sqlx::query(
            r#"
            INSERT INTO tracks (
                content_id, catalog_id, title, artists_json, album, genre,
                catalog_genres_json, duration, thumbnail, album_cover, audio_url,
                audio_format, expires_at, next_content_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(content_id) DO UPDATE SET
                catalog_id = excluded.catalog_id,
                title = excluded.title,
                artists_json = excluded.artists_json,
                album = excluded.album,
                genre = excluded.genre,
                catalog_genres_json = excluded.catalog_genres_json,
                duration = excluded.duration,
                thumbnail = excluded.thumbnail,
                album_cover = excluded.album_cover,
                audio_url = excluded.audio_url,
                audio_format = excluded.audio_format,
                expires_at = excluded.expires_at,
                next_content_id = excluded.next_content_id,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&record.content_id)
        .bind(&record.catalog_id)
        .bind(&record.title)
        .bind(&artists_json)
        .bind(&record.album)
        .bind(&record.genre)
        .bind(&genres_json)
        .bind(record.duration as i64)
        .bind(&record.thumbnail)
        .bind(&record.album_cover)
        .bind(&record.audio_url)
        .bind(&record.audio_format)
        .bind(record.expires_at.timestamp())
        .bind(&record.next_content_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        log::debug!(
            "Persisted track '{}' (expires {})",
            record.content_id,
            record.expires_at
        );
        Ok(())
    }

    async fn find(&self, content_id: &str) -> Result<Option<TrackRecord>, AppError> {
        let row: Option<TrackRow> = sqlx::query_as(
            r#"
            SELECT content_id, catalog_id, title, artists_json, album, genre,
                   catalog_genres_json, duration, thumbnail, album_cover, audio_url,
                   audio_format, expires_at, next_content_id
            FROM tracks
            WHERE content_id = ? AND expires_at > ?
            "#,
        )
        .bind(content_id)
        .bind(Utc::now().timestamp())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TrackRecord::try_from).transpose()
    }

    async fn set_successor(
        &self,
        content_id: &str,
        next_content_id: &str,
    ) -> Result<bool, AppError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query(
            "UPDATE tracks SET next_content_id = ?, updated_at = ? WHERE content_id = ? AND expires_at > ?",
        )
        .bind(next_content_id)
        .bind(now)
        .bind(content_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let updated = result.rows_affected() > 0;
        if !updated {
            log::debug!(
                "No live record for '{}', successor link not stored",
                content_id
            );
        }
        Ok(updated)
    }

    async fn evict_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now().timestamp();
        let result = sqlx::query("DELETE FROM tracks WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;

        let count = result.rows_affected();
        if count > 0 {
            log::info!("Evicted {} expired track records", count);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DatabaseManager;
    use crate::models::{expiry_from_now, ResolvedAudio, TrackHints};
    use chrono::Duration;

    async fn store() -> SqliteTrackStore {
        let db = DatabaseManager::new("sqlite::memory:").await.unwrap();
        SqliteTrackStore::new(db.pool)
    }

    fn record(id: &str, url: &str) -> TrackRecord {
        let hints = TrackHints {
            title: Some("Song".to_string()),
            album: Some("Album".to_string()),
            artists: vec!["A".to_string(), "B".to_string()],
            ..Default::default()
        };
        TrackRecord::from_hints(
            id,
            &hints,
            ResolvedAudio {
                url: url.to_string(),
                format: "251".to_string(),
            },
            vec!["indie rock".to_string()],
            std::time::Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_upsert_then_find() {
        let store = store().await;
        let rec = record("abc123", "https://a.googlevideo.com/1");
        store.upsert(&rec).await.unwrap();

        let found = store.find("abc123").await.unwrap().unwrap();
        assert_eq!(found.title, "Song");
        assert_eq!(found.artists, vec!["A", "B"]);
        assert_eq!(found.catalog_genres, vec!["indie rock"]);
        assert_eq!(found.audio_format.as_deref(), Some("251"));
        assert_eq!(found.expires_at.timestamp(), rec.expires_at.timestamp());

        assert!(store.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_updates_in_place() {
        let store = store().await;
        store
            .upsert(&record("abc123", "https://placeholder.mp3"))
            .await
            .unwrap();
        store
            .upsert(&record("abc123", "https://b.googlevideo.com/2"))
            .await
            .unwrap();

        let found = store.find("abc123").await.unwrap().unwrap();
        assert_eq!(found.audio_url, "https://b.googlevideo.com/2");

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tracks")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_expired_record_is_a_miss_and_gets_evicted() {
        let store = store().await;
        let mut rec = record("old", "https://a.googlevideo.com/1");
        rec.expires_at = Utc::now() - Duration::seconds(5);
        store.upsert(&rec).await.unwrap();
        store
            .upsert(&record("fresh", "https://a.googlevideo.com/2"))
            .await
            .unwrap();

        assert!(store.find("old").await.unwrap().is_none());
        assert!(!store.set_successor("old", "next").await.unwrap());

        assert_eq!(store.evict_expired().await.unwrap(), 1);
        assert_eq!(store.evict_expired().await.unwrap(), 0);
        assert!(store.find("fresh").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_set_successor() {
        let store = store().await;
        let mut rec = record("abc123", "https://a.googlevideo.com/1");
        rec.expires_at = expiry_from_now(std::time::Duration::from_secs(60));
        store.upsert(&rec).await.unwrap();

        assert!(store.set_successor("abc123", "next42").await.unwrap());
        let found = store.find("abc123").await.unwrap().unwrap();
        assert_eq!(found.next_content_id.as_deref(), Some("next42"));

        assert!(!store.set_successor("missing", "next42").await.unwrap());
    }
}
