//! Unified Error Type System
//!
//! Centralized error types for the entire application, with classification
//! used by the provider chain to decide between retrying the same provider
//! and falling over to the next one.
//!
//! Transport and remote-reported errors never leave the AI layer: services
//! convert them into static fallback payloads. Storage and validation errors
//! do surface, as HTTP statuses in the route layer.

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Categories
// =============================================================================

/// Categories for retry and fallback routing in the provider chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rate limited - wait then retry same provider
    RateLimit,
    /// Authentication failed - fail over immediately, don't retry
    Auth,
    /// Network/connectivity issues - retry with backoff
    Network,
    /// Provider unavailable - fall over to next
    Unavailable,
    /// Invalid request - don't retry
    BadRequest,
    /// Remote answered but the payload was unusable
    ParseError,
    /// Temporary server issues - retry same provider
    Transient,
    /// Unknown error - conservative single retry
    Unknown,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimit => write!(f, "RATE_LIMIT"),
            Self::Auth => write!(f, "AUTH"),
            Self::Network => write!(f, "NETWORK"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::ParseError => write!(f, "PARSE_ERROR"),
            Self::Transient => write!(f, "TRANSIENT"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl ErrorCategory {
    /// Whether the same provider is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Transient | Self::ParseError
        )
    }

    /// Whether the chain should move on to the next provider without retries.
    pub fn should_fall_over(&self) -> bool {
        matches!(self, Self::Auth | Self::Unavailable | Self::BadRequest)
    }

    /// Recommended delay before retrying this category.
    pub fn recommended_delay(&self) -> Duration {
        match self {
            Self::RateLimit => Duration::from_secs(10),
            Self::Network => Duration::from_secs(2),
            Self::Transient => Duration::from_secs(1),
            Self::ParseError => Duration::from_millis(500),
            _ => Duration::from_millis(250),
        }
    }
}

// =============================================================================
// Provider Error
// =============================================================================

/// Error from a remote AI provider, carrying the category and provenance.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub category: ErrorCategory,
    pub message: String,
    pub provider: String,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.provider, self.category, self.message)
    }
}

impl std::error::Error for ProviderError {}

impl ProviderError {
    pub fn new(
        category: ErrorCategory,
        message: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            provider: provider.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.category.is_retryable()
    }

    pub fn should_fall_over(&self) -> bool {
        self.category.should_fall_over()
    }
}

// =============================================================================
// Error Classifier
// =============================================================================

/// Maps raw provider failures onto [`ErrorCategory`] values.
pub struct ErrorClassifier;

impl ErrorClassifier {
    /// Classify a transport-level error from reqwest.
    pub fn classify_transport(err: &reqwest::Error, provider: &str) -> ProviderError {
        let category = if err.is_timeout() || err.is_connect() {
            ErrorCategory::Network
        } else if err.is_decode() {
            ErrorCategory::ParseError
        } else {
            ErrorCategory::Unknown
        };
        ProviderError::new(category, err.to_string(), provider)
    }

    /// Classify an HTTP status code from a provider response.
    pub fn classify_status(status: u16, message: &str, provider: &str) -> ProviderError {
        let category = match status {
            429 => ErrorCategory::RateLimit,
            401 | 403 => ErrorCategory::Auth,
            400 | 413 | 422 => ErrorCategory::BadRequest,
            404 => ErrorCategory::Unavailable,
            500 | 502 | 503 | 504 => ErrorCategory::Transient,
            _ => ErrorCategory::Unknown,
        };
        ProviderError::new(category, message, provider)
    }

    /// Classify a non-zero status code reported inside a 200 gateway body.
    /// Treated like a transport failure per the error-handling design.
    pub fn classify_gateway_code(code: i64, message: &str, provider: &str) -> ProviderError {
        ProviderError::new(
            ErrorCategory::Transient,
            format!("gateway code {code}: {message}"),
            provider,
        )
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum LingoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Structured provider error with category
    #[error("Provider error: {0}")]
    Provider(ProviderError),

    /// Credential misconfiguration detected at construction time
    #[error("Credentials missing for {0}")]
    CredentialsMissing(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    /// Request validation failure (surfaces as HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// Missing row (surfaces as HTTP 404)
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Word '{0}' already exists in the vocabulary book")]
    DuplicateWord(String),
}

impl From<ProviderError> for LingoError {
    fn from(err: ProviderError) -> Self {
        LingoError::Provider(err)
    }
}

pub type Result<T> = std::result::Result<T, LingoError>;

impl LingoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

/// Context extension trait for adding context to storage errors.
pub trait ResultExt<T> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| LingoError::Storage(format!("{}: {}", context.into(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::RateLimit.to_string(), "RATE_LIMIT");
        assert_eq!(ErrorCategory::Auth.to_string(), "AUTH");
    }

    #[test]
    fn test_category_retryable() {
        assert!(ErrorCategory::RateLimit.is_retryable());
        assert!(ErrorCategory::Network.is_retryable());
        assert!(ErrorCategory::Transient.is_retryable());
        assert!(!ErrorCategory::Auth.is_retryable());
        assert!(!ErrorCategory::BadRequest.is_retryable());
    }

    #[test]
    fn test_category_fall_over() {
        assert!(ErrorCategory::Auth.should_fall_over());
        assert!(ErrorCategory::Unavailable.should_fall_over());
        assert!(!ErrorCategory::Network.should_fall_over());
    }

    #[test]
    fn test_classify_status() {
        let rate = ErrorClassifier::classify_status(429, "slow down", "zhipu");
        assert_eq!(rate.category, ErrorCategory::RateLimit);

        let auth = ErrorClassifier::classify_status(401, "bad key", "zhipu");
        assert_eq!(auth.category, ErrorCategory::Auth);
        assert!(auth.should_fall_over());

        let server = ErrorClassifier::classify_status(503, "unavailable", "vivo");
        assert_eq!(server.category, ErrorCategory::Transient);
        assert!(server.is_retryable());
    }

    #[test]
    fn test_classify_gateway_code() {
        let err = ErrorClassifier::classify_gateway_code(1007, "content filtered", "vivo");
        assert_eq!(err.category, ErrorCategory::Transient);
        assert!(err.to_string().contains("1007"));
        assert!(err.to_string().contains("vivo"));
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new(ErrorCategory::Network, "connection refused", "zhipu");
        assert_eq!(err.to_string(), "[zhipu:NETWORK] connection refused");
    }
}
