use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::config::SqliteConfig;
use super::{BatchOp, ScanOptions, StoreError};

const SCHEMA_SQL: &str = r#"CREATE TABLE IF NOT EXISTS "kv_entries" (
    "key" TEXT PRIMARY KEY NOT NULL,
    "value" TEXT NOT NULL
) WITHOUT ROWID"#;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open(config: &SqliteConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", config.path.display());
        let options = SqliteConnectOptions::from_str(&db_url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(config.busy_timeout);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database. A single connection keeps every query on the same database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(SCHEMA_SQL).execute(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> =
            sqlx::query_scalar(r#"SELECT "value" FROM "kv_entries" WHERE "key" = ?1"#)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    pub async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO "kv_entries" ("key", "value") VALUES (?1, ?2)
               ON CONFLICT ("key") DO UPDATE SET "value" = excluded."value""#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query(r#"DELETE FROM "kv_entries" WHERE "key" = ?1"#)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    sqlx::query(
                        r#"INSERT INTO "kv_entries" ("key", "value") VALUES (?1, ?2)
                           ON CONFLICT ("key") DO UPDATE SET "value" = excluded."value""#,
                    )
                    .bind(key)
                    .bind(value)
                    .execute(&mut *tx)
                    .await?;
                }
                BatchOp::Delete { key } => {
                    sqlx::query(r#"DELETE FROM "kv_entries" WHERE "key" = ?1"#)
                        .bind(key)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn scan_prefix(
        &self,
        prefix: &str,
        options: ScanOptions,
    ) -> Result<Vec<(String, String)>, StoreError> {
        // SQLite treats a negative LIMIT as unbounded.
        let limit = options
            .limit
            .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
            .unwrap_or(-1);
        let sql = if options.reverse {
            r#"SELECT "key", "value" FROM "kv_entries"
               WHERE substr("key", 1, length(?1)) = ?1
               ORDER BY "key" DESC LIMIT ?2"#
        } else {
            r#"SELECT "key", "value" FROM "kv_entries"
               WHERE substr("key", 1, length(?1)) = ?1
               ORDER BY "key" ASC LIMIT ?2"#
        };

        let rows = sqlx::query(sql)
            .bind(prefix)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let key: String = row.try_get("key")?;
            let value: String = row.try_get("value")?;
            out.push((key, value));
        }
        Ok(out)
    }
}
