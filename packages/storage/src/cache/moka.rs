use async_trait::async_trait;
use moka::future::{Cache as MokaInner, CacheBuilder};
use std::time::Duration;
use tracing::debug;

use super::BaseCache;
use crate::StorageResult;

/// Moka-based in-memory cache implementation.
///
/// Entries live until they are deleted, evicted for capacity, or (when a TTL
/// is configured) expire.
pub struct MokaCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Logical cache name for debugging
    name: String,
    inner: MokaInner<String, V>,
}

impl<V> MokaCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, max_capacity: Option<u64>, ttl: Option<Duration>) -> Self {
        let mut builder = CacheBuilder::default();
        if let Some(max_capacity) = max_capacity {
            builder = builder.max_capacity(max_capacity);
        }
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            name: name.into(),
            inner: builder.build(),
        }
    }

    /// Unbounded cache without expiry
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self::new(name, None, None)
    }
}

#[async_trait]
impl<V> BaseCache for MokaCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    type Value = V;

    #[inline]
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> StorageResult<Option<Self::Value>> {
        let value = self.inner.get(key).await;
        debug!(cache = %self.name, key, hit = value.is_some(), "cache get");
        Ok(value)
    }

    async fn set(&self, key: &str, value: Self::Value) -> StorageResult<()> {
        self.inner.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let existed = self.inner.remove(key).await.is_some();
        debug!(cache = %self.name, key, existed, "cache delete");
        Ok(existed)
    }

    async fn delete_all(&self) -> StorageResult<()> {
        self.inner.invalidate_all();
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.inner.contains_key(key))
    }
}
