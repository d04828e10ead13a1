//! SQLite persistence for the relay: thread mappings and the raw update
//! audit log.

pub mod audit_log;
pub mod thread_store;

pub use {audit_log::SqliteAuditLog, thread_store::SqliteThreadStore};

/// Create all tables. Idempotent; called once at startup.
pub async fn init_schema(pool: &sqlx::SqlitePool) -> ferrybot_relay::Result<()> {
    SqliteThreadStore::init(pool).await?;
    SqliteAuditLog::init(pool).await?;
    Ok(())
}
