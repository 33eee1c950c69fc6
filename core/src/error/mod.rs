//! Error taxonomy for the purge engine.
//!
//! Every fallible operation in this crate returns [`PurgeError`]. Variants map
//! directly onto the error-handling policy table: each carries enough context
//! (repository, digest, status code) for a caller to decide whether to retry,
//! skip, or abort.

use thiserror::Error;


/// Main error type for purge engine operations.
#[derive(Error, Debug)]
pub enum PurgeError {
    /// Transient network failure (connection, timeout, DNS). Retryable.
    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// 401/403 from the registry. Not retryable; aborts the current pool.
    #[error("unauthorized (status: {status_code:?}): {message}")]
    Unauthorized {
        message: String,
        status_code: Option<u16>,
    },

    /// 404 from a GET or DELETE. Callers treat this as benign per the error policy table.
    #[error("{resource_type} not found: {name}")]
    NotFound { resource_type: String, name: String },

    /// 429 from the registry. Retryable, honoring `retry_after` if present.
    #[error("rate limited: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    /// 5xx from the registry. Retryable.
    #[error("server error (status: {status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Retry budget exhausted after repeated transient/429/5xx failures.
    #[error("retries exhausted after {attempts} attempts: {message}")]
    Transient { message: String, attempts: u32 },

    /// A filter's regex half failed to compile.
    #[error("regex compile error: {0}")]
    RegexCompile(String),

    /// A regex match exceeded its configured timeout. Indicates a pathological filter.
    #[error("regex match timed out after {0:?}")]
    RegexTimeout(std::time::Duration),

    /// A raw filter string could not be split into a non-empty repo/tag pair.
    #[error("invalid filter {0:?}: {1}")]
    InvalidFilter(String, String),

    /// An `ago` duration string did not parse.
    #[error("invalid age duration {0:?}: {1}")]
    InvalidAgo(String, String),

    /// A manifest body could not be parsed (corruption or unknown schema).
    #[error("malformed manifest body for {digest}: {message}")]
    BadManifestJson { digest: String, message: String },

    /// A manifest/tag was locked (`delete_enabled`/`write_enabled` false) and
    /// `include_locked` was not set. Callers count this as skipped, not failed.
    #[error("{resource_type} {name} is locked")]
    Locked { resource_type: String, name: String },

    /// An executor pool was cancelled; wraps the first underlying error that
    /// triggered the cancellation (never the cancellation itself).
    #[error("pool cancelled: {0}")]
    PoolCancelled(#[source] Box<PurgeError>),

    /// Configuration failed to load or deserialize.
    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A value failed basic structural validation (malformed header, etc).
    #[error("validation error: {0}")]
    Validation(String),
}

impl PurgeError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// True for errors the executor's retry decorator should retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::RateLimit { .. } | Self::Server { .. }
        )
    }

    /// The `Retry-After` hint in seconds, if this is a rate-limit error that carried one.
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// True for a 404, which callers treat as benign rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Result type alias for purge engine operations.
pub type Result<T> = std::result::Result<T, PurgeError>;
