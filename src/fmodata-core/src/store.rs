use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::Path;

use crate::models::{NewUsageLog, RawJson, UsageLog};

/// RequestLog is the storage contract the service's request logging relies on
#[async_trait::async_trait]
pub trait RequestLog: Send + Sync {
    /// Insert one entry, returning its id
    async fn record(&self, entry: &NewUsageLog) -> Result<i64>;

    /// Entries with `from <= created_at <= to`, oldest first
    async fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<UsageLog>>;

    async fn ping(&self) -> Result<()>;
}

/// SQLite-backed request log
#[derive(Clone)]
pub struct SqliteLogStore {
    pool: SqlitePool,
}

impl SqliteLogStore {
    /// Open (creating if needed) the log database at `path`
    pub async fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .context("Failed to create log directory")?;
            }
        }

        let pool = SqlitePool::connect(&format!("sqlite://{}?mode=rwc", path))
            .await
            .context("Failed to connect to request log database")?;

        Self::with_pool(pool).await
    }

    /// Private in-memory database; a single connection keeps it alive
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS request_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                status INTEGER,
                method TEXT,
                error TEXT,
                endpoint TEXT,
                created_at DATETIME,
                response TEXT,
                request TEXT
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_request_logs_created_at
            ON request_logs(created_at)
            "#,
        )
        .execute(&pool)
        .await?;

        tracing::debug!("Request log store ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl RequestLog for SqliteLogStore {
    async fn record(&self, entry: &NewUsageLog) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO request_logs (status, method, error, endpoint, created_at, response, request)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.status)
        .bind(&entry.method)
        .bind(&entry.error)
        .bind(&entry.endpoint)
        .bind(entry.created_at)
        .bind(entry.response.as_str())
        .bind(entry.request.as_str())
        .execute(&self.pool)
        .await
        .context("Failed to insert request log")?;

        Ok(result.last_insert_rowid())
    }

    async fn range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<UsageLog>> {
        let rows = sqlx::query(
            r#"
            SELECT id, status, method, error, endpoint, created_at, response, request
            FROM request_logs
            WHERE created_at >= ? AND created_at <= ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query request logs")?;

        let logs = rows
            .iter()
            .map(|row| {
                let method: Option<String> = row.get("method");
                let error: Option<String> = row.get("error");
                let endpoint: Option<String> = row.get("endpoint");
                let response: Option<String> = row.get("response");
                let request: Option<String> = row.get("request");

                UsageLog {
                    id: row.get("id"),
                    status: row.get::<Option<i32>, _>("status").unwrap_or_default(),
                    method: method.unwrap_or_default(),
                    error: error.unwrap_or_default(),
                    endpoint: endpoint.unwrap_or_default(),
                    created_at: row.get("created_at"),
                    response: RawJson(response.unwrap_or_default()),
                    request: RawJson(request.unwrap_or_default()),
                }
            })
            .collect();

        Ok(logs)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(status: i32, endpoint: &str, at: DateTime<Utc>) -> NewUsageLog {
        NewUsageLog {
            status,
            method: "GET".to_string(),
            error: String::new(),
            endpoint: endpoint.to_string(),
            created_at: at,
            response: RawJson::from(r#"{"result":"ok"}"#),
            request: RawJson::from("{}"),
        }
    }

    #[tokio::test]
    async fn test_record_and_range() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        let now = Utc::now();

        store.record(&entry(200, "/ping/a", now)).await.unwrap();
        store
            .record(&entry(404, "/ping/notfound", now + Duration::seconds(1)))
            .await
            .unwrap();
        store
            .record(&entry(200, "/old", now - Duration::days(3)))
            .await
            .unwrap();

        let logs = store
            .range(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].endpoint, "/ping/a");
        assert_eq!(logs[1].status, 404);
        assert_eq!(logs[0].response.as_str(), r#"{"result":"ok"}"#);
    }

    #[tokio::test]
    async fn test_range_empty() {
        let store = SqliteLogStore::in_memory().await.unwrap();
        let now = Utc::now();
        let logs = store.range(now - Duration::days(1), now).await.unwrap();
        assert!(logs.is_empty());
    }

    #[tokio::test]
    async fn test_open_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("requests.db");
        let store = SqliteLogStore::open(path.to_str().unwrap()).await.unwrap();

        store.ping().await.unwrap();
        let id = store.record(&entry(201, "/pong", Utc::now())).await.unwrap();
        assert!(id > 0);
        assert!(path.exists());
    }
}
