//! Content-addressed archive of raw feed snapshots.
//!
//! Each snapshot is gzip-compressed and keyed by the SHA-256 of the
//! compressed bytes. Re-ingesting an unchanged feed is a no-op, which is
//! what keeps the catalog from growing while upstream data is unchanged.

pub mod codec;
pub mod filter;

use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{FeedError, Result};
pub use filter::{LIST_DEFAULTS, ListDefaults, ListFilter, ListQuery};

const CREATE_RAW_TABLE: &str = "CREATE TABLE IF NOT EXISTS raw (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    route_group TEXT NOT NULL,
    data BLOB NOT NULL,
    data_hash TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
)";

const CREATE_CREATED_AT_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS raw_created_at_idx ON raw (created_at)";

/// Result of a single [`SnapshotStore::ingest`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestOutcome {
    /// Row holding this content; the pre-existing row when `inserted` is false.
    pub id: i64,
    pub inserted: bool,
    pub content_hash: String,
}

/// Catalog entry returned by [`SnapshotStore::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotMeta {
    pub id: i64,
    pub route_group: String,
    #[serde(serialize_with = "http_date")]
    pub created_at: DateTime<Utc>,
    /// Compressed size.
    pub size_bytes: i64,
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: i64,
    route_group: String,
    created_at: i64,
    size_bytes: i64,
}

impl From<SnapshotRow> for SnapshotMeta {
    fn from(row: SnapshotRow) -> Self {
        SnapshotMeta {
            id: row.id,
            route_group: row.route_group,
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap_or_default(),
            size_bytes: row.size_bytes,
        }
    }
}

/// Single snapshot returned by [`SnapshotStore::get`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotDetail {
    #[serde(flatten)]
    pub meta: SnapshotMeta,
    pub data_hash: String,
    /// Base64 of the stored gzip bytes, only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_b64: Option<String>,
}

#[derive(sqlx::FromRow)]
struct DetailRow {
    #[sqlx(flatten)]
    meta: SnapshotRow,
    data_hash: String,
    data: Option<Vec<u8>>,
}

fn http_date<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(&value.format("%a, %d %b %Y %H:%M:%S GMT"))
}

#[derive(Clone)]
pub struct SnapshotStore {
    pool: SqlitePool,
}

impl SnapshotStore {
    /// Opens (creating if needed) the database at `url` and ensures the schema.
    #[tracing::instrument]
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        info!("Snapshot store connected");
        Self::with_pool(pool).await
    }

    /// A private in-memory database. The pool is pinned to one connection
    /// that never expires, since each SQLite memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_RAW_TABLE).execute(&pool).await?;
        sqlx::query(CREATE_CREATED_AT_INDEX).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Compresses and stores `raw_bytes` unless identical content is
    /// already archived.
    pub async fn ingest(&self, route_group: &str, raw_bytes: &[u8]) -> Result<IngestOutcome> {
        self.ingest_at(route_group, raw_bytes, Utc::now()).await
    }

    /// [`ingest`](Self::ingest) with an explicit creation time.
    #[tracing::instrument(skip(self, raw_bytes), fields(raw_len = raw_bytes.len()))]
    pub async fn ingest_at(
        &self,
        route_group: &str,
        raw_bytes: &[u8],
        created_at: DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let compressed = codec::compress(raw_bytes).map_err(FeedError::Compress)?;
        let content_hash = codec::content_hash(&compressed);

        let mut tx = self.pool.begin().await?;

        let new_id: Option<i64> = sqlx::query_scalar(
            "INSERT INTO raw (route_group, data, data_hash, created_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (data_hash) DO NOTHING
             RETURNING id",
        )
        .bind(route_group)
        .bind(compressed.as_slice())
        .bind(content_hash.as_str())
        .bind(created_at.timestamp())
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match new_id {
            Some(id) => IngestOutcome {
                id,
                inserted: true,
                content_hash,
            },
            None => {
                let id: i64 = sqlx::query_scalar("SELECT id FROM raw WHERE data_hash = ?")
                    .bind(content_hash.as_str())
                    .fetch_one(&mut *tx)
                    .await?;
                IngestOutcome {
                    id,
                    inserted: false,
                    content_hash,
                }
            }
        };

        tx.commit().await?;

        info!(
            id = outcome.id,
            inserted = outcome.inserted,
            compressed_len = compressed.len(),
            hash = %outcome.content_hash,
            "Snapshot ingested"
        );
        Ok(outcome)
    }

    /// Catalog entry of snapshot `id`, optionally with its compressed bytes.
    pub async fn get(&self, id: i64, include_data: bool) -> Result<SnapshotDetail> {
        let row: Option<DetailRow> = sqlx::query_as(
            "SELECT id, route_group, created_at, length(data) AS size_bytes, data_hash,
                    CASE WHEN ? THEN data END AS data
             FROM raw WHERE id = ?",
        )
        .bind(include_data)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(FeedError::NotFound(id))?;
        Ok(SnapshotDetail {
            meta: row.meta.into(),
            data_hash: row.data_hash,
            data_b64: row.data.map(|data| BASE64.encode(data)),
        })
    }

    /// The stored gzip bytes of snapshot `id`.
    pub async fn get_compressed(&self, id: i64) -> Result<Vec<u8>> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT data FROM raw WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(FeedError::NotFound(id))
    }

    /// The original feed bytes of snapshot `id`.
    pub async fn get_decompressed(&self, id: i64) -> Result<Vec<u8>> {
        let compressed = self.get_compressed(id).await?;
        codec::decompress(&compressed)
            .map_err(|e| FeedError::Decode(format!("snapshot {id} failed to decompress: {e}")))
    }

    /// Catalog page matching `filter`, newest first.
    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<SnapshotMeta>> {
        self.list_on(filter, Utc::now().date_naive()).await
    }

    /// [`list`](Self::list) with an explicit "today" for date defaulting.
    pub async fn list_on(&self, filter: &ListFilter, today: NaiveDate) -> Result<Vec<SnapshotMeta>> {
        let query = filter.resolve(today);
        debug!(?query, "Listing snapshots");

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, route_group, created_at, length(data) AS size_bytes FROM raw WHERE 1 = 1",
        );

        if !query.route_groups.is_empty() {
            qb.push(" AND route_group IN (");
            let mut groups = qb.separated(", ");
            for group in &query.route_groups {
                groups.push_bind(group.clone());
            }
            groups.push_unseparated(")");
        }
        if let Some(start) = query.start {
            qb.push(" AND created_at >= ")
                .push_bind(start.and_utc().timestamp());
        }
        if let Some(end) = query.end {
            qb.push(" AND created_at <= ")
                .push_bind(end.and_utc().timestamp());
        }

        qb.push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(i64::from(query.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(query.offset));

        let rows: Vec<SnapshotRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(SnapshotMeta::from).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM raw")
            .fetch_one(&self.pool)
            .await?)
    }
}
