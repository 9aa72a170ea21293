use async_trait::async_trait;
use linkbox_core::registry::Result;
use linkbox_core::{OwnerId, Registry, SaveOutcome, ShortCode, StorageError, UrlRecord};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Connection, Row};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Idempotent schema applied by [`PostgresRegistry::connect`].
pub const SCHEMA: &str = include_str!("../ddl/postgres/urls.sql");

/// Maximum number of codes updated by one delete statement.
pub const DELETE_CHUNK_SIZE: usize = 100;

const PRIMARY_KEY_CONSTRAINT: &str = "urls_pkey";

/// Attempts of the insert-or-fetch statement before giving up. A retry is
/// only needed when a concurrent insert of the same pair commits between
/// our conflict check and our read.
const SAVE_ATTEMPTS: usize = 3;

const INSERT_OR_FETCH: &str = r#"
    WITH inserted AS (
        INSERT INTO urls (short_url, original_url, user_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (original_url, user_id) DO NOTHING
        RETURNING short_url
    )
    SELECT short_url, TRUE AS is_new FROM inserted
    UNION ALL
    SELECT short_url, FALSE AS is_new
    FROM urls
    WHERE original_url = $2 AND user_id = $3
    LIMIT 1
"#;

/// PostgreSQL implementation of the [`Registry`] trait.
///
/// Dedup is enforced by the `(original_url, user_id)` unique constraint, so
/// no in-process locking is needed. Soft delete is the `is_deleted` column.
///
/// Deletes are fanned out in chunks of [`DELETE_CHUNK_SIZE`] running
/// concurrently. Chunks that succeeded stay applied when another one fails.
#[derive(Debug, Clone)]
pub struct PostgresRegistry {
    pool: PgPool,
}

impl PostgresRegistry {
    /// Creates a registry from an existing connection pool.
    ///
    /// The schema is expected to exist already.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool, checks the connection and applies [`SCHEMA`].
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;

        info!("connected to postgres registry");
        Ok(Self::new(pool))
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

/// Classifies an insert failure, telling a taken code apart from an
/// already registered (url, owner) pair.
fn map_insert_error(err: sqlx::Error, code: &ShortCode) -> StorageError {
    let violated = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| db.constraint().map(str::to_owned));

    match violated {
        Some(Some(constraint)) if constraint == PRIMARY_KEY_CONSTRAINT => {
            StorageError::CodeTaken(code.to_string())
        }
        Some(_) => StorageError::Conflict(code.to_string()),
        None => map_sqlx_error(err),
    }
}

fn parse_owner(user_id: String) -> Result<OwnerId> {
    OwnerId::new(user_id).map_err(|e| StorageError::InvalidData(e.to_string()))
}

#[async_trait]
impl Registry for PostgresRegistry {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        let row = sqlx::query(
            r#"
            SELECT original_url, user_id, is_deleted
            FROM urls
            WHERE short_url = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
        let user_id: String = row.try_get("user_id").map_err(map_sqlx_error)?;
        let deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;

        Ok(Some(UrlRecord {
            original_url,
            owner: parse_owner(user_id)?,
            deleted,
        }))
    }

    async fn save(
        &self,
        code: &ShortCode,
        original_url: &str,
        owner: &OwnerId,
    ) -> Result<SaveOutcome> {
        for attempt in 1..=SAVE_ATTEMPTS {
            let row = sqlx::query(INSERT_OR_FETCH)
                .bind(code.as_str())
                .bind(original_url)
                .bind(owner.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_insert_error(e, code))?;

            let Some(row) = row else {
                debug!(code = %code, attempt, "insert-or-fetch raced a concurrent insert");
                continue;
            };

            let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;
            let is_new: bool = row.try_get("is_new").map_err(map_sqlx_error)?;
            let stored = ShortCode::new_unchecked(short_url);

            return Ok(if is_new {
                SaveOutcome::Created(stored)
            } else {
                SaveOutcome::Existing(stored)
            });
        }

        Err(StorageError::Query(format!(
            "insert-or-fetch for {code} returned no row after {SAVE_ATTEMPTS} attempts"
        )))
    }

    async fn batch_save(&self, items: &[(ShortCode, String)], owner: &OwnerId) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for (code, original_url) in items {
            sqlx::query(
                r#"
                INSERT INTO urls (short_url, original_url, user_id)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(code.as_str())
            .bind(original_url)
            .bind(owner.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, code))?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(count = items.len(), owner = %owner, "saved url batch");
        Ok(())
    }

    async fn owner_urls(&self, owner: &OwnerId) -> Result<BTreeMap<ShortCode, String>> {
        let rows = sqlx::query(
            r#"
            SELECT short_url, original_url
            FROM urls
            WHERE user_id = $1
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;
                let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
                Ok((ShortCode::new_unchecked(short_url), original_url))
            })
            .collect()
    }

    async fn delete(&self, codes: &[ShortCode], owner: &OwnerId) -> Result<()> {
        if codes.is_empty() {
            return Ok(());
        }

        let mut chunks = JoinSet::new();
        for chunk in codes.chunks(DELETE_CHUNK_SIZE) {
            let pool = self.pool.clone();
            let chunk: Vec<String> = chunk.iter().map(|c| c.as_str().to_owned()).collect();
            let owner = owner.as_str().to_owned();

            chunks.spawn(async move {
                sqlx::query(
                    r#"
                    UPDATE urls
                    SET is_deleted = TRUE
                    WHERE short_url = ANY($1)
                      AND user_id = $2
                      AND NOT is_deleted
                    "#,
                )
                .bind(chunk)
                .bind(owner)
                .execute(&pool)
                .await
                .map(|result| result.rows_affected())
                .map_err(map_sqlx_error)
            });
        }

        let mut first_error = None;
        let mut changed = 0;
        while let Some(joined) = chunks.join_next().await {
            let outcome = joined
                .map_err(|e| StorageError::Query(format!("delete chunk task failed: {e}")))
                .and_then(|result| result);

            match outcome {
                Ok(rows) => changed += rows,
                Err(err) => {
                    warn!(error = %err, owner = %owner, "delete chunk failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        debug!(requested = codes.len(), changed, owner = %owner, "marked urls deleted");
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn ping(&self, timeout: Duration) -> Result<()> {
        let check = async {
            let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
            conn.ping().await.map_err(map_sqlx_error)
        };

        tokio::time::timeout(timeout, check)
            .await
            .map_err(|_| StorageError::Timeout(format!("ping exceeded {timeout:?}")))?
    }

    async fn close(&self) -> Result<()> {
        if !self.pool.is_closed() {
            self.pool.close().await;
            info!("closed postgres registry");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_timeout_maps_to_timeout() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StorageError::Timeout(_)
        ));
    }

    #[test]
    fn closed_pool_maps_to_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
    }

    #[test]
    fn missing_row_maps_to_invalid_data() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StorageError::InvalidData(_)
        ));
    }

    #[test]
    fn non_database_insert_error_falls_through() {
        let code = ShortCode::new_unchecked("ghi");
        assert!(matches!(
            map_insert_error(sqlx::Error::PoolClosed, &code),
            StorageError::Unavailable(_)
        ));
    }

    #[test]
    fn schema_declares_named_constraints() {
        assert!(SCHEMA.contains(PRIMARY_KEY_CONSTRAINT));
        assert!(SCHEMA.contains("UNIQUE (original_url, user_id)"));
    }
}
