//! Service-wide constants.
//!
//! Retention periods follow the source data's volatility: segment
//! assignments for a postal code change rarely, so confirmed results
//! (including confirmed negatives) are kept for months, while transient
//! fetch failures are kept just long enough to avoid hammering the site.

// ═══════════════════════════════════════════════════════════════════════════════
// POSTAL CODE FORMAT
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of a Canadian postal code with the space removed ("A1A1A1").
pub const POSTAL_CODE_COMPACT_LEN: usize = 6;

/// Length of the canonical form with the separating space ("A1A 1A1").
pub const POSTAL_CODE_CANONICAL_LEN: usize = 7;

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE RETENTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Retention for durable results: successes, confirmed not-found, and
/// invalid-format verdicts. Roughly one quarter.
pub const DURABLE_TTL_DAYS: i64 = 90;

/// Retention for transient failures (timeouts, structural mismatches),
/// short so they are retried soon.
pub const TRANSIENT_TTL_DAYS: i64 = 7;

// ═══════════════════════════════════════════════════════════════════════════════
// LOOKUP LIMITS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum number of postal codes accepted in one batch request.
pub const MAX_BATCH_CODES: usize = 50;

/// Default upper bound on a single collaborator fetch, in seconds.
/// A fetch that has not resolved by then is reported as transient.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durable_outlives_transient() {
        assert!(DURABLE_TTL_DAYS > TRANSIENT_TTL_DAYS);
        assert!(TRANSIENT_TTL_DAYS > 0);
    }

    #[test]
    fn test_canonical_len_is_compact_plus_space() {
        assert_eq!(POSTAL_CODE_CANONICAL_LEN, POSTAL_CODE_COMPACT_LEN + 1);
    }
}
