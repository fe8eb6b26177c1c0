//! Error taxonomy shared by the collaborator trait and the migration driver.
//!
//! Remote failures are typed so callers can tell a missing object from a rejected
//! payload. Partial failures during appends, resolution and reattachment are *not*
//! errors: they are recorded as values in the respective reports.

use thiserror::Error;

/// Failure of a single remote call against the Notion API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("object not found: {0}")]
    ObjectNotFound(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("rate limited")]
    RateLimited,
    #[error("HTTP {status} ({code}): {message}")]
    Http {
        status: u16,
        code: String,
        message: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Maps a Notion error body (`code` + `message`) onto the typed variants.
    pub fn from_response(status: u16, code: &str, message: &str) -> Self {
        match code {
            "object_not_found" => ApiError::ObjectNotFound(message.to_string()),
            "validation_error" => ApiError::Validation(message.to_string()),
            "rate_limited" => ApiError::RateLimited,
            _ => ApiError::Http {
                status,
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{field} must be at least 1")]
    ZeroLimit { field: &'static str },
    #[error("{field} must not be empty")]
    Missing { field: &'static str },
}

/// Fatal failures of a document or of the whole migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("failed to query source database {database_id}: {source}")]
    SourceQuery {
        database_id: String,
        #[source]
        source: ApiError,
    },
    #[error("failed to fetch source blocks under {block_id}: {source}")]
    FetchSource {
        block_id: String,
        #[source]
        source: ApiError,
    },
    #[error("failed to create target page: {0}")]
    CreatePage(#[source] ApiError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
