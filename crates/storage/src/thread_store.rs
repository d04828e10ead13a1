use {async_trait::async_trait, sqlx::SqlitePool};

use ferrybot_relay::{Error, Result, ThreadMapping, ThreadStore};

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct MappingRow {
    user_id: i64,
    thread_id: i64,
}

impl From<MappingRow> for ThreadMapping {
    fn from(r: MappingRow) -> Self {
        Self {
            user_id: r.user_id,
            thread_id: r.thread_id,
        }
    }
}

/// SQLite-backed thread mapping store.
///
/// The PRIMARY KEY on `user_id` is the durable half of the "one thread per
/// user" invariant; the registry lock is the in-process half.
pub struct SqliteThreadStore {
    pool: SqlitePool,
}

impl SqliteThreadStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the mapping table schema.
    pub async fn init(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS user_threads (
                user_id   INTEGER PRIMARY KEY,
                thread_id INTEGER NOT NULL
            )"#,
        )
        .execute(pool)
        .await
        .map_err(|e| Error::store("create user_threads table", e))?;
        Ok(())
    }
}

#[async_trait]
impl ThreadStore for SqliteThreadStore {
    async fn insert(&self, mapping: ThreadMapping) -> Result<()> {
        let result = sqlx::query("INSERT INTO user_threads (user_id, thread_id) VALUES (?, ?)")
            .bind(mapping.user_id)
            .bind(mapping.thread_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::store("insert thread mapping", e))?;

        if result.rows_affected() != 1 {
            return Err(Error::NotInserted);
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ThreadMapping>> {
        let rows = sqlx::query_as::<_, MappingRow>("SELECT user_id, thread_id FROM user_threads")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::store("list thread mappings", e))?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
