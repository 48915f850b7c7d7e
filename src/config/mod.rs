pub mod settings;

use crate::adapters::{LocalStorage, MemoryLedger, SqliteLedger};
use crate::core::pipeline::ImportPipeline;
use crate::domain::ports::{CounterStore, IdempotencyStore, Storage};
use crate::utils::error::{ImportError, Result};
use crate::utils::validation::{
    validate_path, validate_required_field, validate_s3_bucket_name, validate_url, Validate,
};
use clap::{Args, Parser};
use settings::ImportSettings;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// `DATABASE_URL` value selecting the in-process ledger.
pub const MEMORY_LEDGER_URL: &str = "memory";

/// Storage and ledger options shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct BackendConfig {
    /// S3-compatible endpoint, e.g. a MinIO URL
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    #[arg(long, env = "S3_REGION", default_value = "us-east-1")]
    pub s3_region: String,

    /// Bucket receiving the import documents; local files are written when unset
    #[arg(long, env = "S3_BUCKET")]
    pub s3_bucket: Option<String>,

    #[arg(long, env = "S3_ACCESS_KEY_ID")]
    pub s3_access_key_id: Option<String>,

    #[arg(long, env = "S3_SECRET_ACCESS_KEY", hide_env_values = true)]
    pub s3_secret_access_key: Option<String>,

    #[arg(long, env = "OUTPUT_PATH", default_value = "./output")]
    pub output_path: String,

    /// SQLite URL for counters and processed records, or `memory`
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://importer.db")]
    pub database_url: String,

    /// TOML file overriding document constants
    #[arg(long, env = "IMPORT_SETTINGS")]
    pub import_settings: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "truckflow-importer")]
#[command(about = "Imports badge purchases from payment webhooks into TruckFlow")]
pub struct ServerConfig {
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:9000")]
    pub listen_addr: SocketAddr,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "LOG_JSON", help = "Emit JSON log lines")]
    pub log_json: bool,

    #[command(flatten)]
    pub backend: BackendConfig,
}

impl BackendConfig {
    pub fn load_settings(&self) -> Result<ImportSettings> {
        let settings = match &self.import_settings {
            Some(path) => ImportSettings::from_file(path)?,
            None => ImportSettings::default(),
        };
        settings.validate()?;
        Ok(settings)
    }

    async fn storage(&self) -> Result<Arc<dyn Storage>> {
        match &self.s3_bucket {
            Some(bucket) => self.s3_storage(bucket).await,
            None => {
                tracing::info!("📁 Writing import documents to {}", self.output_path);
                Ok(Arc::new(LocalStorage::new(&self.output_path)))
            }
        }
    }

    #[cfg(feature = "s3")]
    async fn s3_storage(&self, bucket: &str) -> Result<Arc<dyn Storage>> {
        use crate::adapters::{S3Settings, S3Storage};

        tracing::info!("🪣 Writing import documents to bucket {}", bucket);
        let storage = S3Storage::connect(&S3Settings {
            endpoint: self.s3_endpoint.clone(),
            region: self.s3_region.clone(),
            bucket: bucket.to_string(),
            access_key_id: self.s3_access_key_id.clone(),
            secret_access_key: self.s3_secret_access_key.clone(),
        })
        .await;
        Ok(Arc::new(storage))
    }

    #[cfg(not(feature = "s3"))]
    async fn s3_storage(&self, _bucket: &str) -> Result<Arc<dyn Storage>> {
        Err(ImportError::ConfigError {
            message: "S3_BUCKET is set but this build has no `s3` feature".to_string(),
        })
    }

    /// Connects storage and ledger and assembles the import pipeline.
    pub async fn build_pipeline(&self) -> Result<ImportPipeline> {
        let settings = self.load_settings()?;
        let storage = self.storage().await?;

        let (counters, processed): (Arc<dyn CounterStore>, Arc<dyn IdempotencyStore>) =
            if self.database_url == MEMORY_LEDGER_URL {
                tracing::warn!("Using in-memory ledger, counters reset on restart");
                let ledger = Arc::new(MemoryLedger::new());
                (ledger.clone(), ledger)
            } else {
                let ledger = Arc::new(SqliteLedger::connect(&self.database_url).await?);
                tracing::info!("Database successfully initialized");
                (ledger.clone(), ledger)
            };

        Ok(ImportPipeline::new(storage, counters, processed, settings))
    }
}

impl Validate for BackendConfig {
    fn validate(&self) -> Result<()> {
        if let Some(bucket) = &self.s3_bucket {
            validate_s3_bucket_name("s3_bucket", bucket)?;
            if let Some(endpoint) = &self.s3_endpoint {
                validate_url("s3_endpoint", endpoint)?;
            }
            if self.s3_access_key_id.is_some() || self.s3_secret_access_key.is_some() {
                validate_required_field("s3_access_key_id", &self.s3_access_key_id)?;
                validate_required_field("s3_secret_access_key", &self.s3_secret_access_key)?;
            }
        } else {
            validate_path("output_path", &self.output_path)?;
        }

        if self.database_url.trim().is_empty() {
            return Err(ImportError::MissingConfigError {
                field: "database_url".to_string(),
            });
        }
        Ok(())
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        self.backend.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ServerConfig {
        let mut argv = vec!["truckflow-importer"];
        argv.extend_from_slice(args);
        ServerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--database-url", "memory", "--output-path", "./out"]);
        assert_eq!(config.listen_addr.port(), 9000);
        assert_eq!(config.backend.database_url, "memory");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bucket_requires_complete_credentials() {
        let config = parse(&[
            "--s3-bucket",
            "truckflow-import",
            "--s3-endpoint",
            "https://minio.example.com",
            "--s3-access-key-id",
            "key",
        ]);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ImportError::MissingConfigError { .. }));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = parse(&["--s3-bucket", "truckflow-import", "--s3-endpoint", "minio:9000"]);
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_build_pipeline_with_local_backends() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = parse(&[
            "--database-url",
            "sqlite::memory:",
            "--output-path",
            temp_dir.path().to_str().unwrap(),
        ]);

        let pipeline = config.backend.build_pipeline().await.unwrap();
        pipeline.probe_storage().await.unwrap();
        assert_eq!(pipeline.settings().product_label, "Badge Ajoverts");
    }
}
