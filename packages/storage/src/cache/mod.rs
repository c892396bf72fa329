// ABOUTME: Cache capability consumed by the settings resolver
// ABOUTME: Async key/value trait plus the moka-backed in-process implementation

mod moka;

use async_trait::async_trait;

use crate::StorageResult;

pub use self::moka::MokaCache;

/// Base cache trait that defines the operations the settings layer relies on
#[async_trait]
pub trait BaseCache: Send + Sync + 'static {
    /// Associated value type that can be cached
    type Value: Clone + Send + Sync + 'static;

    /// Get cache name
    fn name(&self) -> &str;

    /// Get value by key; `None` is a miss
    async fn get(&self, key: &str) -> StorageResult<Option<Self::Value>>;

    /// Set value with the cache's default expiry
    async fn set(&self, key: &str, value: Self::Value) -> StorageResult<()>;

    /// Delete a key, returning whether it was present
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Drop every entry
    async fn delete_all(&self) -> StorageResult<()>;

    /// Check whether a key is present
    async fn exists(&self, key: &str) -> StorageResult<bool>;
}
