use {async_trait::async_trait, serde::Serialize};

use crate::Result;

/// Platform-assigned identifier of an end-user. Immutable once assigned.
pub type UserId = i64;

/// Identifier of a conversation thread (forum topic) inside the staff group.
/// Immutable once created, 1:1 with exactly one [`UserId`].
pub type ThreadId = i64;

/// The persisted unit: one user, one thread. Created exactly once per user;
/// never updated or deleted in normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreadMapping {
    pub user_id: UserId,
    pub thread_id: ThreadId,
}

/// Durable storage for user↔thread mappings.
///
/// The registry is the only caller; it serializes access, so implementations
/// only need to guarantee atomicity of a single insert.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Persist one mapping. Fails (including on zero rows affected) without
    /// partial effects.
    async fn insert(&self, mapping: ThreadMapping) -> Result<()>;

    /// Load every persisted mapping. Order is irrelevant.
    async fn list_all(&self) -> Result<Vec<ThreadMapping>>;
}
