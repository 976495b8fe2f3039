//! Error types for the PRIZM lookup service.
//!
//! This module provides the error hierarchy using `thiserror`. Boundaries
//! (validator, cache store, collaborator) return typed outcomes; nothing
//! here is meant to escape the orchestrator as a raw fault.

use thiserror::Error;

/// Result type alias using `PrizmError`.
pub type Result<T> = std::result::Result<T, PrizmError>;

/// Main error type for all lookup operations.
#[derive(Debug, Error)]
pub enum PrizmError {
    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Input failed postal-code canonicalization.
    #[error("Invalid postal code '{0}': expected 6 characters alternating letter/digit")]
    InvalidPostalCode(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // LOOKUP ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The external source has no segment for a well-formed code.
    #[error("No segment assigned for postal code {0}")]
    SegmentNotFound(String),

    /// Scraping failed partway: the page loaded but the expected structure
    /// was not found.
    #[error("Scrape failed for {code}: {reason}")]
    Scrape {
        /// Canonical postal code being fetched.
        code: String,
        /// What went wrong on the page.
        reason: String,
    },

    /// A bounded fetch did not resolve in time.
    #[error("Lookup timed out after {seconds}s")]
    Timeout {
        /// The bound that expired.
        seconds: u64,
    },

    /// The WebDriver session could not be established or was lost.
    /// The only condition that aborts an in-flight batch.
    #[error("Lookup backend unavailable: {0}")]
    Infrastructure(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Cache storage fault. Absorbed at the store boundary; callers of the
    /// store observe a miss or a false write result instead.
    #[error("Cache storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrizmError {
    /// Returns true if this error should be cached with the short TTL and
    /// retried after it expires.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PrizmError::Scrape { .. }
                | PrizmError::Timeout { .. }
                | PrizmError::Infrastructure(_)
        )
    }

    /// Returns true if this error is a stable verdict about the input
    /// rather than a fault (cacheable with the long TTL).
    pub fn is_validation(&self) -> bool {
        matches!(self, PrizmError::InvalidPostalCode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrizmError::Scrape {
            code: "V8A 2P4".into(),
            reason: "segment panel missing".into(),
        };
        assert!(err.to_string().contains("V8A 2P4"));
        assert!(err.to_string().contains("segment panel missing"));
    }

    #[test]
    fn test_error_classification() {
        assert!(PrizmError::Timeout { seconds: 60 }.is_transient());
        assert!(PrizmError::Infrastructure("no session".into()).is_transient());
        assert!(!PrizmError::InvalidPostalCode("12345".into()).is_transient());

        assert!(PrizmError::InvalidPostalCode("12345".into()).is_validation());
        assert!(!PrizmError::Storage("disk full".into()).is_validation());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_result: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("not json");
        let result: Result<serde_json::Value> = json_result.map_err(PrizmError::from);
        assert!(matches!(result, Err(PrizmError::Json(_))));
    }
}
