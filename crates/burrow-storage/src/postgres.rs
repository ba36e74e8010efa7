use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{
    DeleteRequest, LinkId, LinkRecord, LinkStore, ShortCode, Stats, StorageError, StoredLink,
};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::debug;

const SCHEMA: &str = include_str!("../ddl/postgres/short_links.sql");

/// PostgreSQL implementation of the storage contract.
///
/// The `short_links` table carries a unique constraint on `orig_url`:
/// [`LinkStore::add`] reports an already stored URL as
/// [`StoredLink::Existing`] instead of failing. Batch writes and batch
/// deletes each run in one transaction and leave no partial effect on error.
///
/// Anonymous owners (`""`) are stored as `NULL`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store from an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_links` table and its indexes if they are missing.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn owner_to_db(owner_id: &str) -> Option<&str> {
    (!owner_id.is_empty()).then_some(owner_id)
}

fn row_to_record(row: &PgRow) -> Result<LinkRecord> {
    let uuid: String = row.try_get("uuid").map_err(map_sqlx_error)?;
    let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;
    let orig_url: String = row.try_get("orig_url").map_err(map_sqlx_error)?;
    let user_id: Option<String> = row.try_get("user_id").map_err(map_sqlx_error)?;
    let is_deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;

    Ok(LinkRecord {
        id: LinkId::new(uuid),
        short_code: ShortCode::new_unchecked(short_url),
        original_url: orig_url,
        owner_id: user_id.unwrap_or_default(),
        is_deleted,
    })
}

fn count_to_usize(value: i64, column: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|e| StorageError::InvalidData(format!("invalid {column} count '{value}': {e}")))
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

#[async_trait]
impl LinkStore for PostgresStore {
    async fn add(&self, record: LinkRecord) -> Result<StoredLink> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row = sqlx::query(
            r#"
            INSERT INTO short_links (uuid, short_url, orig_url, user_id, is_deleted)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (orig_url) DO UPDATE
            SET orig_url = short_links.orig_url
            RETURNING short_links.short_url
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.short_code.as_str())
        .bind(record.original_url.as_str())
        .bind(owner_to_db(&record.owner_id))
        .bind(record.is_deleted)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let short_url: String = row.try_get("short_url").map_err(map_sqlx_error)?;
        if short_url == record.short_code.as_str() {
            Ok(StoredLink::Inserted(record))
        } else {
            debug!(url = %record.original_url, existing = %short_url, "original url already stored");
            Ok(StoredLink::Existing(ShortCode::new_unchecked(short_url)))
        }
    }

    async fn add_batch(&self, records: Vec<LinkRecord>) -> Result<Vec<LinkRecord>> {
        // Dropping an uncommitted transaction rolls it back.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for record in &records {
            sqlx::query(
                r#"
                INSERT INTO short_links (uuid, short_url, orig_url, user_id, is_deleted)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(record.id.as_str())
            .bind(record.short_code.as_str())
            .bind(record.original_url.as_str())
            .bind(owner_to_db(&record.owner_id))
            .bind(record.is_deleted)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(records)
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT uuid, short_url, orig_url, user_id, is_deleted
            FROM short_links
            WHERE short_url = $1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT uuid, short_url, orig_url, user_id, is_deleted
            FROM short_links
            WHERE user_id IS NOT DISTINCT FROM $1
            "#,
        )
        .bind(owner_to_db(owner_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_record).collect()
    }

    async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for request in requests {
            sqlx::query(
                r#"
                UPDATE short_links
                SET is_deleted = TRUE
                WHERE is_deleted = FALSE
                  AND short_url = $1
                  AND user_id IS NOT DISTINCT FROM $2
                "#,
            )
            .bind(request.short_code.as_str())
            .bind(owner_to_db(&request.owner_id))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn stats(&self) -> Result<Stats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS urls, COUNT(DISTINCT COALESCE(user_id, '')) AS users
            FROM short_links
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let urls: i64 = row.try_get("urls").map_err(map_sqlx_error)?;
        let users: i64 = row.try_get("users").map_err(map_sqlx_error)?;

        Ok(Stats::new(
            count_to_usize(urls, "urls")?,
            count_to_usize(users, "users")?,
        ))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
