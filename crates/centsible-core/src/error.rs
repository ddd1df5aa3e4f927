//! Error types for the analytics core

use thiserror::Error;

/// The error kinds distinguished by the facade and by C6's failure model.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Search capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("Search capability quota exceeded: {0}")]
    CapabilityQuota(String),

    #[error("Failed to parse search capability output: {0}")]
    ParseError(String),

    #[error("Another writer won the upsert for {0}")]
    PersistConflict(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Streaming consumer fell behind and the pipeline was aborted")]
    ConsumerSlow,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The error kind name as used in §7 and in job logs / SSE `error` events.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::BadRequest(_) => "bad_request",
            Error::NotFound(_) => "not_found",
            Error::StoreUnavailable(_) | Error::Database(_) | Error::Pool(_) => {
                "store_unavailable"
            }
            Error::CapabilityUnavailable(_) | Error::Http(_) => "capability_unavailable",
            Error::CapabilityQuota(_) => "capability_quota",
            Error::ParseError(_) | Error::Json(_) => "parse_error",
            Error::PersistConflict(_) => "persist_conflict",
            Error::Timeout(_) => "timeout",
            Error::Cancelled => "cancelled",
            Error::ConsumerSlow => "consumer_slow",
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => "internal",
        }
    }

    /// Whether this error kind is retried inside C6 before giving up (§4.6.5).
    /// C3/C4/C5 never retry; they fail fast and bubble this straight to the caller.
    pub fn is_retryable_in_weekly_suggester(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::Database(_) | Error::Pool(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
