use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed payload: {message}")]
    MalformedPayload { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Transaction {transaction_id} already recorded for client {fingerprint}")]
    AlreadyRecorded {
        fingerprint: String,
        transaction_id: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid configuration value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad input from the caller. Never retried.
    Client,
    /// Store or blob storage failure. The sender is expected to redeliver.
    Dependency,
    Configuration,
    Internal,
}

impl ImportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ImportError::MalformedPayload { .. } | ImportError::ValidationError { .. } => {
                ErrorCategory::Client
            }
            ImportError::StorageError { .. }
            | ImportError::DatabaseError(_)
            | ImportError::AlreadyRecorded { .. }
            | ImportError::IoError(_) => ErrorCategory::Dependency,
            ImportError::ConfigError { .. }
            | ImportError::MissingConfigError { .. }
            | ImportError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            ImportError::CsvError(_) | ImportError::SerializationError(_) => {
                ErrorCategory::Internal
            }
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ImportError::ValidationError {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
