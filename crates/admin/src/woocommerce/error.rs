//! WooCommerce REST API error types.

use thiserror::Error;

/// Errors that can occur when calling the WooCommerce REST API.
#[derive(Debug, Error)]
pub enum WooCommerceError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Rate limited by the store.
    #[error("Rate limited")]
    RateLimited { retry_after: Option<u64> },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Authentication failed (wrong consumer key or secret).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Failed to parse response or build a request.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WooCommerceError {
    /// Transient failures worth another attempt: 429, any 5xx, a timeout or
    /// a connection failure.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::NotFound(_) | Self::Unauthorized(_) | Self::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(WooCommerceError::RateLimited { retry_after: None }.is_retryable());
        assert!(
            WooCommerceError::Api {
                status: 503,
                message: "busy".into()
            }
            .is_retryable()
        );
        assert!(
            !WooCommerceError::Api {
                status: 400,
                message: "bad".into()
            }
            .is_retryable()
        );
        assert!(!WooCommerceError::Unauthorized("key".into()).is_retryable());
        assert!(!WooCommerceError::NotFound("order 1".into()).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = WooCommerceError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "API error: 500 - boom");
    }
}
