//! Error types for the register client

use thiserror::Error;

/// Result type for register operations
pub type Result<T> = std::result::Result<T, RegisterError>;

/// Register client errors
///
/// A "not found" page is deliberately absent: it ends pagination and is
/// logged rather than raised.
#[derive(Error, Debug)]
pub enum RegisterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed TSV payload: {0}")]
    Tsv(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("Invalid locator: {0}")]
    InvalidLocator(String),

    #[error("Cache error: {0}")]
    Cache(String),
}
