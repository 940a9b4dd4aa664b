use rate_registry::error::RegistryError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Observation at {observed_at} precedes last update at {last_updated}")]
    ClockSkew { observed_at: i64, last_updated: i64 },

    #[error("Signer is not the registry owner")]
    Unauthorized,

    #[error("Registry rejected stale timestamp")]
    StaleTimestamp,

    #[error("Registry rejected future timestamp")]
    FutureTimestamp,

    #[error("Registry rejected update: {0}")]
    Rejected(String),

    #[error("Price feed unavailable: {0}")]
    FeedUnavailable(String),

    #[error("Solana RPC error: {0}")]
    RpcError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<RegistryError> for SyncError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::Unauthorized => SyncError::Unauthorized,
            RegistryError::StaleTimestamp => SyncError::StaleTimestamp,
            RegistryError::FutureTimestamp => SyncError::FutureTimestamp,
            RegistryError::DivisionByZero => SyncError::DivisionByZero(e.to_string()),
            RegistryError::Overflow => SyncError::Overflow(e.to_string()),
            other => SyncError::Rejected(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
