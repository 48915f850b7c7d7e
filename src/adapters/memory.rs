use crate::domain::ports::{CounterStore, IdempotencyStore};
use crate::utils::error::{ImportError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-process counters and processed-record set. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    counters: Mutex<HashMap<String, i64>>,
    processed: Mutex<HashSet<(String, String)>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.lock().map(|set| set.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> ImportError {
    ImportError::StorageError {
        message: "memory ledger lock poisoned".to_string(),
    }
}

#[async_trait]
impl CounterStore for MemoryLedger {
    async fn get(&self, name: &str) -> Result<i64> {
        let mut counters = self.counters.lock().map_err(poisoned)?;
        Ok(*counters.entry(name.to_string()).or_insert(0))
    }

    async fn set(&self, name: &str, value: i64) -> Result<()> {
        let mut counters = self.counters.lock().map_err(poisoned)?;
        counters.insert(name.to_string(), value);
        Ok(())
    }
}

#[async_trait]
impl IdempotencyStore for MemoryLedger {
    async fn exists(&self, fingerprint: &str, transaction_id: &str) -> Result<bool> {
        let processed = self.processed.lock().map_err(poisoned)?;
        Ok(processed.contains(&(fingerprint.to_string(), transaction_id.to_string())))
    }

    async fn insert(&self, fingerprint: &str, transaction_id: &str) -> Result<()> {
        let mut processed = self.processed.lock().map_err(poisoned)?;
        if !processed.insert((fingerprint.to_string(), transaction_id.to_string())) {
            return Err(ImportError::AlreadyRecorded {
                fingerprint: fingerprint.to_string(),
                transaction_id: transaction_id.to_string(),
            });
        }
        Ok(())
    }
}
