use std::{collections::HashMap, sync::Arc};

use {tokio::sync::Mutex, tracing::debug};

use crate::{
    Result,
    error::Error,
    mapping::{ThreadId, ThreadMapping, ThreadStore, UserId},
};

/// Single source of truth for user↔thread resolution.
///
/// An in-memory bidirectional cache over a [`ThreadStore`], hydrated lazily by
/// the first operation that observes an empty cache. One exclusive async lock
/// covers every operation for its full duration, including the store
/// round-trip; registry traffic is bounded by the active conversation count,
/// not message volume.
pub struct ThreadRegistry {
    store: Arc<dyn ThreadStore>,
    /// Forward map user → thread. The inverse direction is a linear scan.
    cache: Mutex<HashMap<UserId, ThreadId>>,
}

impl ThreadRegistry {
    pub fn new(store: Arc<dyn ThreadStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve the thread an end-user's messages are relayed into.
    pub async fn thread_for_user(&self, user_id: UserId) -> Result<ThreadId> {
        let mut cache = self.cache.lock().await;
        self.hydrate_if_empty(&mut cache).await?;
        cache
            .get(&user_id)
            .copied()
            .ok_or(Error::MappingNotFound { user_id })
    }

    /// Resolve the end-user a staff reply in `thread_id` is addressed to.
    pub async fn user_for_thread(&self, thread_id: ThreadId) -> Result<UserId> {
        let mut cache = self.cache.lock().await;
        self.hydrate_if_empty(&mut cache).await?;
        cache
            .iter()
            .find_map(|(user, thread)| (*thread == thread_id).then_some(*user))
            .ok_or(Error::ThreadOwnerNotFound { thread_id })
    }

    /// Persist a new mapping, then make it visible to concurrent resolves.
    ///
    /// A user that already has a thread is rejected with
    /// [`Error::MappingExists`]; the cache and store are left untouched, as
    /// they are on any persistence failure.
    pub async fn record(&self, user_id: UserId, thread_id: ThreadId) -> Result<()> {
        let mut cache = self.cache.lock().await;
        // Hydrate before the duplicate check so a cold-start record cannot
        // mask persisted mappings from later lookups.
        self.hydrate_if_empty(&mut cache).await?;

        if cache.contains_key(&user_id) {
            return Err(Error::MappingExists { user_id });
        }

        self.store
            .insert(ThreadMapping { user_id, thread_id })
            .await?;
        cache.insert(user_id, thread_id);
        debug!(user_id, thread_id, "recorded new thread mapping");
        Ok(())
    }

    /// Full reload from the store when the cache is empty at call time.
    /// Runs under the caller's lock, so concurrent cold lookups cannot both
    /// reload; store errors propagate to the caller.
    async fn hydrate_if_empty(&self, cache: &mut HashMap<UserId, ThreadId>) -> Result<()> {
        if !cache.is_empty() {
            return Ok(());
        }
        let mappings = self.store.list_all().await?;
        debug!(count = mappings.len(), "hydrated thread mapping cache");
        cache.extend(mappings.into_iter().map(|m| (m.user_id, m.thread_id)));
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;

    /// In-memory store that counts `list_all` calls and can be told to fail.
    #[derive(Default)]
    struct MemoryStore {
        rows: std::sync::Mutex<Vec<ThreadMapping>>,
        list_calls: AtomicUsize,
        fail_inserts: AtomicBool,
    }

    impl MemoryStore {
        fn with_rows(rows: Vec<ThreadMapping>) -> Self {
            Self {
                rows: std::sync::Mutex::new(rows),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ThreadStore for MemoryStore {
        async fn insert(&self, mapping: ThreadMapping) -> Result<()> {
            if self.fail_inserts.load(Ordering::SeqCst) {
                return Err(Error::NotInserted);
            }
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|m| m.user_id == mapping.user_id) {
                return Err(Error::NotInserted);
            }
            rows.push(mapping);
            Ok(())
        }

        async fn list_all(&self) -> Result<Vec<ThreadMapping>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    fn registry_with(rows: Vec<ThreadMapping>) -> (Arc<MemoryStore>, ThreadRegistry) {
        let store = Arc::new(MemoryStore::with_rows(rows));
        let registry = ThreadRegistry::new(Arc::clone(&store) as Arc<dyn ThreadStore>);
        (store, registry)
    }

    #[tokio::test]
    async fn record_then_resolve_both_directions() {
        let (_, registry) = registry_with(vec![]);
        registry.record(7, 42).await.unwrap();
        assert_eq!(registry.thread_for_user(7).await.unwrap(), 42);
        assert_eq!(registry.user_for_thread(42).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn unknown_user_and_thread_are_not_found() {
        let (_, registry) = registry_with(vec![ThreadMapping {
            user_id: 1,
            thread_id: 10,
        }]);
        assert!(matches!(
            registry.thread_for_user(99).await,
            Err(Error::MappingNotFound { user_id: 99 })
        ));
        assert!(matches!(
            registry.user_for_thread(99).await,
            Err(Error::ThreadOwnerNotFound { thread_id: 99 })
        ));
    }

    #[tokio::test]
    async fn cold_cache_hydrates_exactly_once() {
        let rows = vec![
            ThreadMapping {
                user_id: 1,
                thread_id: 10,
            },
            ThreadMapping {
                user_id: 2,
                thread_id: 20,
            },
        ];
        let (store, registry) = registry_with(rows);

        assert_eq!(registry.thread_for_user(1).await.unwrap(), 10);
        assert_eq!(registry.thread_for_user(2).await.unwrap(), 20);
        assert_eq!(registry.user_for_thread(10).await.unwrap(), 1);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_cold_lookups_reload_once() {
        let (store, registry) = registry_with(vec![ThreadMapping {
            user_id: 1,
            thread_id: 10,
        }]);
        let registry = Arc::new(registry);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&registry);
                tokio::spawn(async move { r.thread_for_user(1).await })
            })
            .collect();
        for t in tasks {
            assert_eq!(t.await.unwrap().unwrap(), 10);
        }
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_record_is_rejected_and_harmless() {
        let (_, registry) = registry_with(vec![]);
        registry.record(7, 42).await.unwrap();
        registry.record(8, 43).await.unwrap();

        assert!(matches!(
            registry.record(7, 99).await,
            Err(Error::MappingExists { user_id: 7 })
        ));
        // Other users' entries are untouched, as is the loser's original row.
        assert_eq!(registry.thread_for_user(7).await.unwrap(), 42);
        assert_eq!(registry.thread_for_user(8).await.unwrap(), 43);
    }

    #[tokio::test]
    async fn concurrent_records_for_same_user_persist_one_row() {
        let (store, registry) = registry_with(vec![]);
        let registry = Arc::new(registry);

        let a = {
            let r = Arc::clone(&registry);
            tokio::spawn(async move { r.record(7, 42).await })
        };
        let b = {
            let r = Arc::clone(&registry);
            tokio::spawn(async move { r.record(7, 43).await })
        };
        let results = [a.await.unwrap(), b.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(store.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_insert_leaves_cache_untouched() {
        let (store, registry) = registry_with(vec![]);
        // Prime the cache so the failed record below is not masked by the
        // empty-cache hydration path.
        registry.record(1, 10).await.unwrap();

        store.fail_inserts.store(true, Ordering::SeqCst);
        assert!(matches!(
            registry.record(7, 42).await,
            Err(Error::NotInserted)
        ));
        store.fail_inserts.store(false, Ordering::SeqCst);

        assert!(registry.thread_for_user(7).await.is_err());
        assert_eq!(registry.thread_for_user(1).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn cold_record_hydrates_before_duplicate_check() {
        // User 1 is persisted but not yet cached; a second creation ack for
        // it must be rejected, not recorded over.
        let (store, registry) = registry_with(vec![ThreadMapping {
            user_id: 1,
            thread_id: 10,
        }]);
        assert!(matches!(
            registry.record(1, 99).await,
            Err(Error::MappingExists { user_id: 1 })
        ));
        assert_eq!(store.rows.lock().unwrap().len(), 1);
        assert_eq!(registry.thread_for_user(1).await.unwrap(), 10);
    }
}
