//! Error types for configuration, file loading and generation.

use crate::model::ImageField;
use std::time::Duration;

/// Errors surfaced to the user of a generation session.
///
/// Every provider failure collapses into [`PixlyError::Generation`]; the
/// wrapped [`ProviderError`] is kept for diagnosis only.
#[derive(Debug, thiserror::Error)]
pub enum PixlyError {
    /// A required setting (the provider credential) is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A local file could not be turned into an image reference.
    #[error("failed to read {field}: {reason}")]
    FileRead {
        /// The configuration field the file was meant for.
        field: ImageField,
        /// What went wrong.
        reason: String,
    },

    /// The generation call failed.
    #[error("generation failed: {0}")]
    Generation(#[from] ProviderError),

    /// A string-keyed field edit could not be parsed.
    #[error("invalid value for {field}: {reason}")]
    InvalidField {
        /// The field name as given.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// I/O error (e.g., saving a result).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PixlyError {
    /// Returns the underlying provider error for a failed generation.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Generation(e) => Some(e),
            _ => None,
        }
    }
}

/// Detailed failure reported by the image-generation provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// API key missing or invalid.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limit or quota exceeded.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// The call did not finish in time.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Content was blocked by safety filters.
    #[error("content blocked: {0}")]
    ContentBlocked(String),

    /// Billing is not enabled for the credential.
    #[error("billing error: {0}")]
    Billing(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The configuration has no product image.
    #[error("product image is required")]
    MissingProductImage,

    /// Network or HTTP error.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failed to decode base64 image data.
    #[error("failed to decode: {0}")]
    Decode(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response parsed but did not contain an image.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl ProviderError {
    /// Returns true if this error is likely transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_)
        )
    }

    /// Returns the suggested retry delay, if available.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            Self::Timeout(_) => Some(Duration::from_secs(1)),
            Self::Network(_) => Some(Duration::from_secs(2)),
            _ => None,
        }
    }

    /// HTTP status associated with the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited { .. } => Some(429),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for pixly operations.
pub type Result<T> = std::result::Result<T, PixlyError>;

/// Maximum length of a provider error body kept in an error message.
const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Trims a provider error body and masks anything that looks like an API key.
pub(crate) fn sanitize_error_message(text: &str) -> String {
    let masked: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            let bare = word.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-');
            if bare.starts_with("AIza") && bare.len() >= 30 {
                word.replace(bare, "[REDACTED]")
            } else {
                word.to_string()
            }
        })
        .collect();
    let joined = masked.join(" ");

    if joined.chars().count() > MAX_ERROR_MESSAGE_LEN {
        let truncated: String = joined.chars().take(MAX_ERROR_MESSAGE_LEN).collect();
        format!("{truncated}...")
    } else {
        joined
    }
}

/// Reads a `Retry-After` header given in seconds.
pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}
