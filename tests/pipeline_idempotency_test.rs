use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use truckflow_importer::core::allocator::{CLIENT_COUNTER, PASS_COUNTER};
use truckflow_importer::domain::ports::{CounterStore, IdempotencyStore, Storage};
use truckflow_importer::{
    ImportError, ImportOutcome, ImportPipeline, ImportSettings, MemoryLedger, Result,
};

#[derive(Clone, Default)]
struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    writes: Arc<Mutex<usize>>,
}

impl MockStorage {
    fn get_json(&self, path: &str) -> Option<serde_json::Value> {
        let files = self.files.lock().unwrap();
        files
            .get(path)
            .map(|bytes| serde_json::from_slice(bytes).unwrap())
    }

    fn write_count(&self) -> usize {
        *self.writes.lock().unwrap()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), data.to_vec());
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }
}

/// Ledger whose processed-record insert always fails.
struct BrokenRecordLedger {
    inner: MemoryLedger,
}

#[async_trait]
impl CounterStore for BrokenRecordLedger {
    async fn get(&self, name: &str) -> Result<i64> {
        self.inner.get(name).await
    }

    async fn set(&self, name: &str, value: i64) -> Result<()> {
        self.inner.set(name, value).await
    }
}

#[async_trait]
impl IdempotencyStore for BrokenRecordLedger {
    async fn exists(&self, fingerprint: &str, transaction_id: &str) -> Result<bool> {
        self.inner.exists(fingerprint, transaction_id).await
    }

    async fn insert(&self, _fingerprint: &str, _transaction_id: &str) -> Result<()> {
        Err(ImportError::StorageError {
            message: "processed_records unavailable".to_string(),
        })
    }
}

fn payload(uuid: &str, email: &str, status: &str, quantity: u32, plates: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "transaction": {
            "uuid": uuid,
            "time": "2025-01-27 22:08:58",
            "status": status,
            "invoice": {
                "products": [{"name": "Badge Ajoverts", "price": 2000, "quantity": quantity}],
                "custom_fields": [
                    {"type": "text", "name": "Numéros de plaques (séparés par des virgules)", "value": plates},
                    {"type": "radio", "name": "Type de client:", "value": "particulier"}
                ]
            },
            "contact": {"firstname": " Foo", "lastname": "Bar ", "email": email}
        }
    }))
    .unwrap()
}

fn setup() -> (ImportPipeline, MockStorage, Arc<MemoryLedger>) {
    let storage = MockStorage::default();
    let ledger = Arc::new(MemoryLedger::new());
    let pipeline = ImportPipeline::new(
        Arc::new(storage.clone()),
        ledger.clone(),
        ledger.clone(),
        ImportSettings::default(),
    );
    (pipeline, storage, ledger)
}

#[tokio::test]
async fn test_duplicate_delivery_is_noop() {
    let (pipeline, storage, ledger) = setup();
    let body = payload("tx-1", "some@email.ch", "confirmed", 2, "JU1, JU2");

    let first = pipeline.process_payload(&body).await.unwrap();
    assert!(matches!(first, ImportOutcome::Imported(_)));
    assert_eq!(storage.write_count(), 2);

    let second = pipeline.process_payload(&body).await.unwrap();
    assert_eq!(
        second,
        ImportOutcome::Duplicate {
            transaction_id: "tx-1".to_string()
        }
    );
    assert_eq!(storage.write_count(), 2);
    assert_eq!(ledger.get(CLIENT_COUNTER).await.unwrap(), 1);
    assert_eq!(ledger.get(PASS_COUNTER).await.unwrap(), 2);
}

#[tokio::test]
async fn test_same_transaction_id_other_client_is_imported() {
    let (pipeline, _storage, ledger) = setup();

    pipeline
        .process_payload(&payload("tx-1", "a@email.ch", "confirmed", 1, "JU1"))
        .await
        .unwrap();
    let outcome = pipeline
        .process_payload(&payload("tx-1", "b@email.ch", "confirmed", 1, "JU2"))
        .await
        .unwrap();

    assert!(matches!(outcome, ImportOutcome::Imported(_)));
    assert_eq!(ledger.processed_count(), 2);
}

#[tokio::test]
async fn test_counters_track_transactions_and_plates() {
    let (pipeline, storage, ledger) = setup();
    ledger.set(CLIENT_COUNTER, 41).await.unwrap();
    ledger.set(PASS_COUNTER, 100).await.unwrap();

    let quantities = [1u32, 3, 2, 1];
    for (i, quantity) in quantities.iter().enumerate() {
        let plates = (0..*quantity)
            .map(|p| format!("VD{}{}", i, p))
            .collect::<Vec<_>>()
            .join(",");
        let body = payload(&format!("tx-{}", i), "some@email.ch", "confirmed", *quantity, &plates);
        pipeline.process_payload(&body).await.unwrap();
    }

    let total_plates: i64 = quantities.iter().map(|q| *q as i64).sum();
    assert_eq!(ledger.get(CLIENT_COUNTER).await.unwrap(), 41 + quantities.len() as i64);
    assert_eq!(ledger.get(PASS_COUNTER).await.unwrap(), 100 + total_plates);

    let passes = storage.get_json("importer/pass_import_00043.json").unwrap();
    let codes: Vec<&str> = passes["Items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["ParkCode"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["NEW00102", "NEW00103", "NEW00104"]);
    assert_eq!(passes["Items"][0]["TiersCode"], "00043");
    assert_eq!(passes["culture"], "fr");

    let tiers = storage.get_json("importer/tiers_import_00043.json").unwrap();
    assert_eq!(tiers["Items"][0]["Label"], "Foo Bar");
    assert_eq!(tiers["version"], "1.50");
}

#[tokio::test]
async fn test_wrong_product_has_no_side_effects() {
    let (pipeline, storage, ledger) = setup();
    let body = String::from_utf8(payload("tx-1", "some@email.ch", "confirmed", 1, "JU1"))
        .unwrap()
        .replace("Badge Ajoverts", "Abonnement annuel");

    let err = pipeline.process_payload(body.as_bytes()).await.unwrap_err();

    assert!(matches!(err, ImportError::ValidationError { .. }));
    assert_eq!(storage.write_count(), 0);
    assert_eq!(ledger.processed_count(), 0);
    assert_eq!(ledger.get(CLIENT_COUNTER).await.unwrap(), 0);
}

#[tokio::test]
async fn test_cancelled_transaction_is_ignored() {
    let (pipeline, storage, ledger) = setup();

    let outcome = pipeline
        .process_payload(&payload("tx-1", "some@email.ch", "cancelled", 1, "JU1"))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        ImportOutcome::Ignored {
            transaction_id: "tx-1".to_string(),
            status: "cancelled".to_string()
        }
    );
    assert_eq!(storage.write_count(), 0);
    assert_eq!(ledger.processed_count(), 0);
    assert_eq!(ledger.get(PASS_COUNTER).await.unwrap(), 0);

    // a later confirmation of the same transaction still imports
    let outcome = pipeline
        .process_payload(&payload("tx-1", "some@email.ch", "confirmed", 1, "JU1"))
        .await
        .unwrap();
    assert!(matches!(outcome, ImportOutcome::Imported(_)));
}

#[tokio::test]
async fn test_bookkeeping_failure_still_reports_import() {
    let storage = MockStorage::default();
    let ledger = Arc::new(BrokenRecordLedger {
        inner: MemoryLedger::new(),
    });
    let pipeline = ImportPipeline::new(
        Arc::new(storage.clone()),
        ledger.clone(),
        ledger.clone(),
        ImportSettings::default(),
    );

    let outcome = pipeline
        .process_payload(&payload("tx-1", "some@email.ch", "confirmed", 1, "JU1"))
        .await
        .unwrap();

    match outcome {
        ImportOutcome::Imported(summary) => assert!(!summary.bookkeeping_complete),
        other => panic!("expected import, got {:?}", other),
    }
    assert_eq!(storage.write_count(), 2);
    assert_eq!(ledger.get(CLIENT_COUNTER).await.unwrap(), 1);
}

#[tokio::test]
async fn test_concurrent_deliveries_get_distinct_codes() {
    let (pipeline, storage, ledger) = setup();
    let pipeline = Arc::new(pipeline);

    let mut handles = Vec::new();
    for i in 0..16 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let body = payload(&format!("tx-{}", i), "some@email.ch", "confirmed", 2, "JU1,JU2");
            pipeline.process_payload(&body).await
        }));
    }
    // same transaction delivered twice at the same time
    for _ in 0..2 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            let body = payload("tx-dup", "dup@email.ch", "confirmed", 1, "JU9");
            pipeline.process_payload(&body).await
        }));
    }

    let mut client_codes = HashSet::new();
    let mut park_codes = HashSet::new();
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ImportOutcome::Imported(summary) => {
                assert!(client_codes.insert(summary.client_code));
                for code in summary.park_codes {
                    assert!(park_codes.insert(code));
                }
            }
            ImportOutcome::Duplicate { .. } => duplicates += 1,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    assert_eq!(client_codes.len(), 17);
    assert_eq!(park_codes.len(), 33);
    assert_eq!(duplicates, 1);
    assert_eq!(storage.write_count(), 34);
    assert_eq!(ledger.get(CLIENT_COUNTER).await.unwrap(), 17);
    assert_eq!(ledger.get(PASS_COUNTER).await.unwrap(), 33);
}
