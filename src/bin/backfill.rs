use clap::Parser;
use std::fs::File;
use std::path::PathBuf;
use truckflow_importer::core::backfill::run_backfill;
use truckflow_importer::core::csv_export::{parse_export, ExportRecord};
use truckflow_importer::utils::{logger, validation::Validate};
use truckflow_importer::{BackendConfig, ImportPipeline};

#[derive(Parser)]
#[command(name = "backfill")]
#[command(about = "Imports transactions from a payment provider CSV export")]
struct Args {
    /// Path to the `;`-separated transaction export
    #[arg(short, long)]
    csv: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Dry run - show derived plates without publishing anything
    #[arg(long)]
    dry_run: bool,

    #[command(flatten)]
    backend: BackendConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting CSV backfill");
    tracing::info!("📁 Loading export from: {}", args.csv.display());

    if let Err(e) = args.backend.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let records = match File::open(&args.csv).map_err(Into::into).and_then(parse_export) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("❌ Failed to read export '{}': {}", args.csv.display(), e);
            eprintln!("💡 Make sure the file is the provider's ';'-separated CSV export");
            std::process::exit(1);
        }
    };
    tracing::info!("Loaded {} rows", records.len());

    let pipeline = args.backend.build_pipeline().await?;

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&pipeline, records);
        return Ok(());
    }

    pipeline.probe_storage().await?;

    tracing::warn!(
        "⚠️ Export rows are keyed on their '#' id: transactions already imported by webhook will be imported again"
    );
    let stats = run_backfill(&pipeline, records).await;
    tracing::info!(
        "✅ Backfill finished: {} imported, {} duplicate, {} ignored, {} failed",
        stats.imported,
        stats.duplicate,
        stats.ignored,
        stats.failed
    );

    if stats.has_failures() {
        std::process::exit(2);
    }
    Ok(())
}

fn perform_dry_run(pipeline: &ImportPipeline, records: Vec<ExportRecord>) {
    let product_label = pipeline.settings().product_label.clone();

    println!("🔍 Dry Run Analysis:");
    for record in records {
        let row_id = record.label();
        match record
            .row
            .and_then(|row| row.into_transaction(&product_label))
            .and_then(|tx| pipeline.preview(tx))
        {
            Ok(sanitized) => {
                let marker = if sanitized.is_confirmed() { "✅" } else { "⏭️" };
                println!(
                    "  {} {} [{}] {}",
                    marker,
                    row_id,
                    sanitized.transaction.status,
                    sanitized.plates.join(", ")
                );
                for issue in &sanitized.issues {
                    println!("      ⚠️ {:?}", issue);
                }
            }
            Err(e) => println!("  ❌ {} {}", row_id, e),
        }
    }
}
