use {async_trait::async_trait, sqlx::SqlitePool};

use ferrybot_relay::{AuditLog, Error, Result};

/// Append-only record of raw inbound updates, keyed by the platform update
/// id. Long polling can redeliver an update after a crash, so duplicate ids
/// are ignored rather than rejected.
pub struct SqliteAuditLog {
    pool: SqlitePool,
}

impl SqliteAuditLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the audit table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS message_updates (
                id         INTEGER PRIMARY KEY,
                payload    TEXT    NOT NULL,
                created_at INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await
        .map_err(|e| Error::store("create message_updates table", e))?;
        Ok(())
    }
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
    async fn record(&self, update_id: i64, payload: &serde_json::Value) -> Result<()> {
        let body = payload.to_string();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        sqlx::query(
            "INSERT OR IGNORE INTO message_updates (id, payload, created_at) VALUES (?, ?, ?)",
        )
        .bind(update_id)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::store("record inbound update", e))?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn test_log() -> (SqlitePool, SqliteAuditLog) {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        SqliteAuditLog::init(&pool).await.unwrap();
        (pool.clone(), SqliteAuditLog::new(pool))
    }

    #[tokio::test]
    async fn records_raw_updates() {
        let (pool, log) = test_log().await;
        log.record(1, &serde_json::json!({"message": {"text": "hi"}}))
            .await
            .unwrap();

        let (payload,): (String,) =
            sqlx::query_as("SELECT payload FROM message_updates WHERE id = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(payload.contains("\"hi\""));
    }

    #[tokio::test]
    async fn redelivered_update_is_ignored() {
        let (pool, log) = test_log().await;
        log.record(1, &serde_json::json!({"attempt": 1}))
            .await
            .unwrap();
        log.record(1, &serde_json::json!({"attempt": 2}))
            .await
            .unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM message_updates")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let (payload,): (String,) =
            sqlx::query_as("SELECT payload FROM message_updates WHERE id = 1")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(payload.contains("\"attempt\":1"));
    }
}
