//! Replays a transaction export through the import pipeline.
//!
//! Export rows are keyed on the export's `#` column. Webhook deliveries are keyed on
//! the transaction uuid, which the export does not carry, so a transaction already
//! imported by webhook is imported again when it is backfilled. Rerunning the same
//! export is a no-op.

use crate::core::csv_export::ExportRecord;
use crate::core::pipeline::{ImportOutcome, ImportPipeline};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BackfillStats {
    pub imported: usize,
    pub duplicate: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl BackfillStats {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }
}

/// Imports every record in order. A failing record is counted and logged, it never
/// stops the run.
pub async fn run_backfill(pipeline: &ImportPipeline, records: Vec<ExportRecord>) -> BackfillStats {
    let mut stats = BackfillStats::default();
    let product_label = pipeline.settings().product_label.clone();

    for record in records {
        let label = record.label();
        let outcome = match record.row {
            Ok(row) => match row.into_transaction(&product_label) {
                Ok(transaction) => pipeline.process_transaction(transaction).await,
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok(ImportOutcome::Imported(summary)) => {
                tracing::info!(
                    "✅ {} -> {} ({})",
                    label,
                    summary.client_code,
                    summary.park_codes.join(", ")
                );
                stats.imported += 1;
            }
            Ok(ImportOutcome::Duplicate { .. }) => stats.duplicate += 1,
            Ok(ImportOutcome::Ignored { .. }) => stats.ignored += 1,
            Err(e) => {
                tracing::error!("❌ {} failed: {} ({:?})", label, e, e.category());
                stats.failed += 1;
            }
        }
    }

    stats
}
