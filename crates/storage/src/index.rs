//! Persistent similarity index over embedded chunks.
//!
//! One SQLite database per index directory; several named collections may
//! share it. Search is an exact cosine scan over the collection.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parentkb_core::ChunkMetadata;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use crate::error::IndexError;
use crate::record::{
    cosine_similarity, decode_vector, encode_vector, record_id, IndexHit, IndexStamp, SourceCount,
};

/// Database file name inside the index directory.
pub const DB_FILE: &str = "index.sqlite3";

pub struct VectorIndex {
    pool: SqlitePool,
    collection: String,
    path: PathBuf,
}

impl VectorIndex {
    /// Open (or create) the index stored under `dir`.
    pub async fn open(dir: impl AsRef<Path>, collection: &str) -> Result<Self, IndexError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(DB_FILE);

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await?;

        let index = Self {
            pool,
            collection: collection.to_string(),
            path,
        };
        index.init_schema().await?;
        info!(path = %index.path.display(), collection, "vector index opened");
        Ok(index)
    }

    async fn init_schema(&self) -> Result<(), IndexError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                source TEXT NOT NULL,
                page INTEGER,
                chunk_index INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                text TEXT NOT NULL,
                vector BLOB NOT NULL,
                PRIMARY KEY (collection, id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_records_source ON records(collection, source)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS collection_meta (
                collection TEXT PRIMARY KEY,
                schema_version INTEGER NOT NULL,
                embedding_model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                built_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upsert one record per text. Returns the number of records written.
    ///
    /// Ids come from [`record_id`], so re-inserting the same logical chunk
    /// replaces it.
    pub async fn insert(
        &self,
        texts: &[String],
        vectors: &[Vec<f32>],
        metadatas: &[ChunkMetadata],
    ) -> Result<usize, IndexError> {
        if texts.is_empty() {
            return Ok(0);
        }
        if texts.len() != vectors.len() || texts.len() != metadatas.len() {
            return Err(IndexError::LengthMismatch {
                texts: texts.len(),
                vectors: vectors.len(),
                metadatas: metadatas.len(),
            });
        }

        let expected = match self.stamp().await? {
            Some(stamp) => stamp.dimensions,
            None => vectors[0].len(),
        };
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(IndexError::DimensionMismatch {
                expected,
                actual: bad.len(),
            });
        }

        let mut tx = self.pool.begin().await?;
        for ((text, vector), meta) in texts.iter().zip(vectors).zip(metadatas) {
            sqlx::query(
                "INSERT OR REPLACE INTO records
                    (collection, id, source, page, chunk_index, total_chunks, text, vector)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&self.collection)
            .bind(record_id(meta))
            .bind(&meta.source)
            .bind(meta.page.map(i64::from))
            .bind(i64::from(meta.chunk_index))
            .bind(i64::from(meta.total_chunks))
            .bind(text)
            .bind(encode_vector(vector))
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        debug!(collection = %self.collection, count = texts.len(), "inserted records");
        Ok(texts.len())
    }

    /// Up to `top_k` records closest to `vector`, nearest first.
    ///
    /// `vector` must have the collection's dimensionality (the stamp's, or the
    /// stored vectors' when there is no stamp). A stored vector that cannot be
    /// decoded or has another length fails the whole query with
    /// [`IndexError::Corrupt`].
    pub async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexHit>, IndexError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut expected = self.stamp().await?.map(|s| s.dimensions);
        if let Some(dims) = expected {
            check_query_dimensions(dims, vector)?;
        }

        let rows = sqlx::query(
            "SELECT id, source, page, chunk_index, total_chunks, text, vector
             FROM records WHERE collection = ?1",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        let mut hits = Vec::with_capacity(rows.len());
        for row in &rows {
            let hit = row_to_hit(row)?;
            let blob: Vec<u8> = row.try_get("vector")?;
            let stored = decode_vector(&blob).ok_or_else(|| IndexError::Corrupt {
                id: hit.id.clone(),
                reason: format!("vector blob of {} bytes is not a list of f32", blob.len()),
            })?;

            let dims = match expected {
                Some(dims) => dims,
                None => {
                    check_query_dimensions(stored.len(), vector)?;
                    *expected.insert(stored.len())
                }
            };
            if stored.len() != dims {
                return Err(IndexError::Corrupt {
                    id: hit.id,
                    reason: format!("stored vector has {} dimensions, index has {dims}", stored.len()),
                });
            }

            let similarity = cosine_similarity(vector, &stored).ok_or_else(|| IndexError::Corrupt {
                id: hit.id.clone(),
                reason: "empty vector".to_string(),
            })?;
            hits.push(IndexHit {
                distance: Some(1.0 - similarity),
                ..hit
            });
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Remove every record of `source`. Returns how many were removed (0 is fine).
    pub async fn delete_by_source(&self, source: &str) -> Result<u64, IndexError> {
        let result = sqlx::query("DELETE FROM records WHERE collection = ?1 AND source = ?2")
            .bind(&self.collection)
            .bind(source)
            .execute(&self.pool)
            .await?;
        debug!(source, removed = result.rows_affected(), "deleted records by source");
        Ok(result.rows_affected())
    }

    /// Remove every record and the stamp of this collection.
    pub async fn delete_all(&self) -> Result<u64, IndexError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM records WHERE collection = ?1")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM collection_meta WHERE collection = ?1")
            .bind(&self.collection)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        info!(collection = %self.collection, removed = result.rows_affected(), "cleared collection");
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<usize, IndexError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?1")
            .bind(&self.collection)
            .fetch_one(&self.pool)
            .await?;
        Ok(n as usize)
    }

    pub async fn count_by_source(&self, source: &str) -> Result<usize, IndexError> {
        let n: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM records WHERE collection = ?1 AND source = ?2",
        )
        .bind(&self.collection)
        .bind(source)
        .fetch_one(&self.pool)
        .await?;
        Ok(n as usize)
    }

    /// Record counts per source, ordered by source name.
    pub async fn sources(&self) -> Result<Vec<SourceCount>, IndexError> {
        let rows = sqlx::query(
            "SELECT source, COUNT(*) AS n FROM records
             WHERE collection = ?1 GROUP BY source ORDER BY source",
        )
        .bind(&self.collection)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<SourceCount, IndexError> {
                let n: i64 = row.try_get("n")?;
                Ok(SourceCount {
                    source: row.try_get("source")?,
                    chunks: n as usize,
                })
            })
            .collect()
    }

    pub async fn stamp(&self) -> Result<Option<IndexStamp>, IndexError> {
        let row = sqlx::query(
            "SELECT schema_version, embedding_model, dimensions, built_at
             FROM collection_meta WHERE collection = ?1",
        )
        .bind(&self.collection)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let schema_version: i64 = row.try_get("schema_version")?;
        let dimensions: i64 = row.try_get("dimensions")?;
        let built_at: DateTime<Utc> = row.try_get("built_at")?;
        Ok(Some(IndexStamp {
            schema_version: schema_version as u32,
            embedding_model: row.try_get("embedding_model")?,
            dimensions: dimensions as usize,
            built_at,
        }))
    }

    pub async fn write_stamp(&self, stamp: &IndexStamp) -> Result<(), IndexError> {
        sqlx::query(
            "INSERT OR REPLACE INTO collection_meta
                (collection, schema_version, embedding_model, dimensions, built_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&self.collection)
        .bind(i64::from(stamp.schema_version))
        .bind(&stamp.embedding_model)
        .bind(stamp.dimensions as i64)
        .bind(stamp.built_at)
        .execute(&self.pool)
        .await?;
        debug!(
            collection = %self.collection,
            model = %stamp.embedding_model,
            dimensions = stamp.dimensions,
            "wrote index stamp"
        );
        Ok(())
    }

    /// Flush and close all connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn check_query_dimensions(expected: usize, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != expected {
        return Err(IndexError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

fn row_to_hit(row: &sqlx::sqlite::SqliteRow) -> Result<IndexHit, IndexError> {
    let id: String = row.try_get("id")?;
    let page: Option<i64> = row.try_get("page")?;
    let chunk_index: i64 = row.try_get("chunk_index")?;
    let total_chunks: i64 = row.try_get("total_chunks")?;

    let to_u32 = |field: &str, v: i64| {
        u32::try_from(v).map_err(|_| IndexError::Corrupt {
            id: id.clone(),
            reason: format!("{field} out of range: {v}"),
        })
    };

    let metadata = ChunkMetadata {
        source: row.try_get("source")?,
        page: page.map(|p| to_u32("page", p)).transpose()?,
        chunk_index: to_u32("chunk_index", chunk_index)?,
        total_chunks: to_u32("total_chunks", total_chunks)?,
    };
    Ok(IndexHit {
        text: row.try_get("text")?,
        metadata,
        distance: None,
        id,
    })
}
