use async_trait::async_trait;

use crate::Result;

/// Append-only record of every raw inbound update, keyed by the
/// platform-assigned update id.
///
/// Best-effort: callers log a failure at warn level and move on, they never
/// propagate it into message handling.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn record(&self, update_id: i64, payload: &serde_json::Value) -> Result<()>;
}
