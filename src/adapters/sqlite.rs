use crate::domain::ports::{CounterStore, IdempotencyStore};
use crate::utils::error::{ImportError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

const CREATE_PROCESSED_RECORDS: &str = r#"
CREATE TABLE IF NOT EXISTS processed_records (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    client_hash TEXT NOT NULL,
    transaction_id TEXT NOT NULL,
    processed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    UNIQUE (client_hash, transaction_id)
)
"#;

const CREATE_COUNTERS: &str = r#"
CREATE TABLE IF NOT EXISTS counters (
    name TEXT NOT NULL PRIMARY KEY,
    value INTEGER NOT NULL
)
"#;

/// Counters and processed records persisted in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Opens (creating if needed) the database at `url` and ensures both tables exist.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        // All access happens under the pipeline lock. The single connection is never
        // recycled, a reconnect would drop a `sqlite::memory:` database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.init_schema().await?;
        Ok(ledger)
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_PROCESSED_RECORDS)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_COUNTERS).execute(&self.pool).await?;
        tracing::debug!("Ledger schema ready");
        Ok(())
    }
}

#[async_trait]
impl CounterStore for SqliteLedger {
    async fn get(&self, name: &str) -> Result<i64> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT value FROM counters WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((value,)) => Ok(value),
            None => {
                self.set(name, 0).await?;
                Ok(0)
            }
        }
    }

    async fn set(&self, name: &str, value: i64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO counters (name, value) VALUES (?, ?)")
            .bind(name)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl IdempotencyStore for SqliteLedger {
    async fn exists(&self, fingerprint: &str, transaction_id: &str) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM processed_records WHERE client_hash = ? AND transaction_id = ?)",
        )
        .bind(fingerprint)
        .bind(transaction_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(&self, fingerprint: &str, transaction_id: &str) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO processed_records (client_hash, transaction_id) VALUES (?, ?)",
        )
        .bind(fingerprint)
        .bind(transaction_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(ImportError::AlreadyRecorded {
                    fingerprint: fingerprint.to_string(),
                    transaction_id: transaction_id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }
}
