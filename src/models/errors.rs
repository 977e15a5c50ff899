//! Centralized error handling.
//!
//! Every failure class carries a unique string code so production logs can be
//! grepped by code. Error codes follow the pattern CATEGORY_SPECIFIC_ERROR:
//! - SRC_xxx: data-source errors (recovered locally by the aggregator)
//! - RPC_xxx: ledger-read provider errors
//! - ADDR_xxx: input validation errors
//! - GEN_xxx: summary-generation errors
//! - LIMIT_xxx: rate limiting

use std::fmt;

/// Application-wide error type for the analysis pipeline
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Data-source errors
    /// One aggregated source is unavailable (network, timeout, non-2xx)
    SourceUnavailable,
    /// Source returned a payload that could not be parsed
    SourceInvalidResponse,

    // Provider errors
    /// Every rotation candidate failed for one logical read
    ProviderExhausted,
    /// No provider endpoints configured
    ProviderNoEndpoints,
    /// Provider request timed out
    ProviderTimeout,

    // Input errors
    /// Address failed validation (wrong length, non-hex characters)
    InvalidAddress,

    // Summary generation
    /// Generative summary failed; template fallback was used
    GenerationFailed,

    // Rate limiting
    /// Caller identity exceeded its per-window query quota
    RateLimited,

    // Generic
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SourceUnavailable => "SRC_UNAVAILABLE",
            Self::SourceInvalidResponse => "SRC_INVALID_RESPONSE",
            Self::ProviderExhausted => "RPC_PROVIDER_EXHAUSTED",
            Self::ProviderNoEndpoints => "RPC_NO_ENDPOINTS",
            Self::ProviderTimeout => "RPC_TIMEOUT",
            Self::InvalidAddress => "ADDR_INVALID",
            Self::GenerationFailed => "GEN_FAILED",
            Self::RateLimited => "LIMIT_EXCEEDED",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Whether a retry has any chance of succeeding
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable
                | Self::ProviderTimeout
                | Self::ProviderExhausted
                | Self::RateLimited
        )
    }

    /// User-facing message. Callers always receive either a complete report
    /// or one of these, never a half-built report.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidAddress => "Invalid address. Expected 0x followed by 40 hex characters.",
            Self::RateLimited => "Too many requests. Please wait a moment and try again.",
            _ => "Analysis failed, please try again.",
        }
    }
}

// Convenience constructors

impl AppError {
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidAddress, msg)
    }

    pub fn provider_exhausted(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ProviderExhausted, msg)
    }

    pub fn no_endpoints() -> Self {
        Self::new(ErrorCode::ProviderNoEndpoints, "No provider endpoints configured")
    }

    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SourceUnavailable, msg)
    }

    pub fn rate_limited(identity: &str) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            format!("Query limit exceeded for identity {}", identity),
        )
    }

    pub fn generation_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::GenerationFailed, msg)
    }
}

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// Conversions from common error types

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ProviderTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::SourceUnavailable, "Connection failed")
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::SourceInvalidResponse, "JSON parse error", err)
    }
}
