pub mod allocator;
pub mod backfill;
pub mod builder;
pub mod csv_export;
pub mod fingerprint;
pub mod pipeline;
pub mod sanitizer;

pub use crate::domain::model::{SanitizedTransaction, Transaction};
pub use crate::domain::ports::{CounterStore, IdempotencyStore, Storage};
pub use crate::utils::error::Result;
