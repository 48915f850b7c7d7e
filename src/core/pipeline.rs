//! Webhook import pipeline.
//!
//! One delivery goes through `Received → Parsed → Validated → DedupChecked →
//! Allocated → Published → Recorded`, or stops early. Every delivery runs inside a
//! single process-wide async lock: counter allocation is read-modify-write against
//! the store, and the dedup check must see the record written by the previous run.

use crate::config::settings::ImportSettings;
use crate::core::allocator::{SequenceAllocator, CLIENT_COUNTER, PASS_COUNTER};
use crate::core::builder::DocumentBuilder;
use crate::core::fingerprint::client_fingerprint;
use crate::core::sanitizer::FieldSanitizer;
use crate::domain::model::{SanitizedTransaction, Transaction, WebhookPayload};
use crate::domain::ports::{CounterStore, IdempotencyStore, Storage};
use crate::utils::error::{ImportError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Parsed,
    Validated,
    DedupChecked,
    Allocated,
    Published,
    Recorded,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Parsed => "parsed",
            PipelineStage::Validated => "validated",
            PipelineStage::DedupChecked => "dedup_checked",
            PipelineStage::Allocated => "allocated",
            PipelineStage::Published => "published",
            PipelineStage::Recorded => "recorded",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub transaction_id: String,
    pub client_code: String,
    pub label: String,
    pub park_codes: Vec<String>,
    pub tiers_key: String,
    pub pass_key: String,
    /// False when counters or the processed record could not be written after publishing.
    pub bookkeeping_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported(ImportSummary),
    /// Already imported earlier; nothing was done.
    Duplicate { transaction_id: String },
    /// Status other than `confirmed`; acknowledged without side effects.
    Ignored {
        transaction_id: String,
        status: String,
    },
}

pub struct ImportPipeline {
    sanitizer: FieldSanitizer,
    builder: DocumentBuilder,
    allocator: SequenceAllocator,
    processed: Arc<dyn IdempotencyStore>,
    storage: Arc<dyn Storage>,
    settings: ImportSettings,
    lock: Mutex<()>,
}

impl ImportPipeline {
    pub fn new(
        storage: Arc<dyn Storage>,
        counters: Arc<dyn CounterStore>,
        processed: Arc<dyn IdempotencyStore>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            sanitizer: FieldSanitizer::new(settings.product_label.clone()),
            builder: DocumentBuilder::new(settings.clone()),
            allocator: SequenceAllocator::new(counters),
            processed,
            storage,
            settings,
            lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ImportSettings {
        &self.settings
    }

    /// Writes then removes a probe object so a misconfigured bucket fails at startup.
    pub async fn probe_storage(&self) -> Result<()> {
        let key = self.settings.probe_key();
        let data = format!("probe {}", chrono::Utc::now().to_rfc3339());
        self.storage.write_file(&key, data.as_bytes()).await?;
        self.storage.delete_file(&key).await?;
        Ok(())
    }

    /// Decodes a raw webhook body and imports the transaction it carries.
    pub async fn process_payload(&self, body: &[u8]) -> Result<ImportOutcome> {
        let _guard = self.lock.lock().await;
        tracing::debug!(stage = %PipelineStage::Received, bytes = body.len(), "Webhook received");

        let payload: WebhookPayload =
            serde_json::from_slice(body).map_err(|e| ImportError::MalformedPayload {
                message: e.to_string(),
            })?;

        self.run(payload.transaction).await
    }

    pub async fn process_transaction(&self, transaction: Transaction) -> Result<ImportOutcome> {
        let _guard = self.lock.lock().await;
        self.run(transaction).await
    }

    /// Sanitizes without touching any store.
    pub fn preview(&self, transaction: Transaction) -> Result<SanitizedTransaction> {
        self.sanitizer.sanitize(transaction)
    }

    async fn run(&self, transaction: Transaction) -> Result<ImportOutcome> {
        let transaction_id = transaction.uuid.clone();
        tracing::debug!(stage = %PipelineStage::Parsed, transaction = %transaction_id);

        let sanitized = self.sanitizer.sanitize(transaction).inspect_err(|e| {
            tracing::warn!(transaction = %transaction_id, error = %e, "Rejected transaction");
        })?;
        for issue in &sanitized.issues {
            tracing::warn!(transaction = %transaction_id, ?issue, "Transaction needs review");
        }

        if !sanitized.is_confirmed() {
            let status = sanitized.transaction.status.clone();
            tracing::info!(transaction = %transaction_id, status = %status, "Skipping uncompleted transaction");
            return Ok(ImportOutcome::Ignored {
                transaction_id,
                status,
            });
        }
        tracing::debug!(stage = %PipelineStage::Validated, transaction = %transaction_id);

        let fingerprint = client_fingerprint(&sanitized.transaction.contact.email);
        if self.processed.exists(&fingerprint, &transaction_id).await? {
            tracing::info!(transaction = %transaction_id, "Skipping already processed transaction");
            return Ok(ImportOutcome::Duplicate { transaction_id });
        }
        tracing::debug!(stage = %PipelineStage::DedupChecked, transaction = %transaction_id, client = %fingerprint);

        let allocation = self.allocator.allocate(sanitized.plates.len()).await?;
        let documents = self.builder.build(&sanitized, &allocation);
        let client_code = documents.client_code().to_string();
        tracing::debug!(stage = %PipelineStage::Allocated, transaction = %transaction_id, code = %client_code);

        // Both documents must be stored before any counter moves. A failed pass upload
        // leaves an orphan tiers document that the next delivery overwrites, because
        // it is handed the same client code again.
        let tiers_key = self.settings.tiers_key(&client_code);
        let pass_key = self.settings.pass_key(&client_code);
        self.publish(&tiers_key, &serde_json::to_vec(&documents.tiers)?)
            .await?;
        self.publish(&pass_key, &serde_json::to_vec(&documents.passes)?)
            .await?;
        tracing::debug!(stage = %PipelineStage::Published, transaction = %transaction_id, code = %client_code);

        let mut bookkeeping_complete = true;
        if let Err(e) = self
            .allocator
            .commit(CLIENT_COUNTER, allocation.client_number)
            .await
        {
            tracing::error!(transaction = %transaction_id, error = %e, "Unable to commit client counter");
            bookkeeping_complete = false;
        }
        if let Some(last_pass) = allocation.last_pass_number() {
            if let Err(e) = self.allocator.commit(PASS_COUNTER, last_pass).await {
                tracing::error!(transaction = %transaction_id, error = %e, "Unable to commit pass counter");
                bookkeeping_complete = false;
            }
        }
        if let Err(e) = self.processed.insert(&fingerprint, &transaction_id).await {
            tracing::error!(transaction = %transaction_id, error = %e, code = %client_code, "Unable to record processed transaction");
            bookkeeping_complete = false;
        }

        let label = documents
            .tiers
            .items
            .first()
            .map(|t| t.label.clone())
            .unwrap_or_default();
        tracing::info!(
            stage = %PipelineStage::Recorded,
            transaction = %transaction_id,
            code = %client_code,
            label = %label,
            passes = documents.passes.items.len(),
            "✅ Successfully imported a new tier"
        );

        Ok(ImportOutcome::Imported(ImportSummary {
            transaction_id,
            client_code,
            label,
            park_codes: documents
                .passes
                .items
                .iter()
                .map(|p| p.park_code.clone())
                .collect(),
            tiers_key,
            pass_key,
            bookkeeping_complete,
        }))
    }

    async fn publish(&self, key: &str, data: &[u8]) -> Result<()> {
        self.storage.write_file(key, data).await.inspect_err(|e| {
            tracing::error!(object = %key, error = %e, "Unable to put json file on storage");
        })
    }
}
