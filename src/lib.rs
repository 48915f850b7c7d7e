pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;
pub mod utils;

pub use adapters::{LocalStorage, MemoryLedger, SqliteLedger};
#[cfg(feature = "s3")]
pub use adapters::{S3Settings, S3Storage};
pub use config::{settings::ImportSettings, BackendConfig, ServerConfig};
pub use crate::core::pipeline::{ImportOutcome, ImportPipeline, ImportSummary};
pub use utils::error::{ImportError, Result};
