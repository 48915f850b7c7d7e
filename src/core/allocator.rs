use crate::domain::ports::CounterStore;
use crate::utils::error::Result;
use std::sync::Arc;

pub const CLIENT_COUNTER: &str = "client";
pub const PASS_COUNTER: &str = "pass";

/// Codes handed out for one transaction, not yet committed to the counter store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub client_number: i64,
    /// Pass numbers, one per plate, consecutive and increasing.
    pub pass_numbers: Vec<i64>,
}

impl Allocation {
    pub fn last_pass_number(&self) -> Option<i64> {
        self.pass_numbers.last().copied()
    }
}

/// Reads and writes the `client` and `pass` counters.
///
/// Only correct while the caller holds the pipeline lock between `allocate`
/// and `commit`.
#[derive(Clone)]
pub struct SequenceAllocator {
    store: Arc<dyn CounterStore>,
}

impl SequenceAllocator {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Current stored value of a counter, initializing it to 0 on first read.
    pub async fn next(&self, counter: &str) -> Result<i64> {
        self.store.get(counter).await
    }

    /// Overwrites the counter with `value`.
    pub async fn commit(&self, counter: &str, value: i64) -> Result<()> {
        self.store.set(counter, value).await
    }

    /// Reserves one client number and `plate_count` pass numbers without committing.
    pub async fn allocate(&self, plate_count: usize) -> Result<Allocation> {
        let client_number = self.next(CLIENT_COUNTER).await? + 1;
        let pass_start = self.next(PASS_COUNTER).await?;
        let pass_numbers = (1..=plate_count as i64).map(|i| pass_start + i).collect();

        Ok(Allocation {
            client_number,
            pass_numbers,
        })
    }
}
