// Adapters layer: concrete implementations for external systems (blob storage, ledgers).

pub mod local;
pub mod memory;
#[cfg(feature = "s3")]
pub mod s3;
pub mod sqlite;

pub use local::LocalStorage;
pub use memory::MemoryLedger;
#[cfg(feature = "s3")]
pub use s3::{S3Settings, S3Storage};
pub use sqlite::SqliteLedger;
