use crate::utils::error::Result;
use async_trait::async_trait;

/// Blob storage the import documents are published to.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
    async fn delete_file(&self, path: &str) -> Result<()>;
}

/// Named integer registers used to mint client and pass codes.
///
/// There is no increment primitive: callers read, add, and write back while
/// holding the pipeline lock.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Current value, persisting 0 when the register does not exist yet.
    async fn get(&self, name: &str) -> Result<i64>;
    /// Overwrites the register.
    async fn set(&self, name: &str, value: i64) -> Result<()>;
}

/// Set of (client fingerprint, transaction id) pairs already imported.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn exists(&self, fingerprint: &str, transaction_id: &str) -> Result<bool>;
    /// Fails with `ImportError::AlreadyRecorded` when the pair is present.
    async fn insert(&self, fingerprint: &str, transaction_id: &str) -> Result<()>;
}
