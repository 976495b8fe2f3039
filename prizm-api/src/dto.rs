//! DTOs for API requests and responses.
//!
//! [`LookupResponse::from`] is the one place a [`LookupResult`] becomes
//! wire JSON; every endpoint that reports a lookup goes through it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use prizm_cache::CacheStats;
use prizm_core::{LookupResult, LookupStatus, Origin};

/// Wire envelope for one lookup.
#[derive(Debug, Serialize, Deserialize)]
pub struct LookupResponse {
    /// The cache key the lookup resolved to.
    pub postal_code: String,
    /// The PRIZM segment number, when one was found.
    pub prizm_code: Option<String>,
    /// Average household income, as displayed by the site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub household_income: Option<String>,
    /// Residency and home type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub residency_home_type: Option<String>,
    /// Segment description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_description: Option<String>,
    /// Terminal lookup status.
    pub status: LookupStatus,
    /// Whether the result was served from the cache.
    pub from_cache: bool,
    /// When the payload was cached, for cache-served results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    /// Detail for non-success statuses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<LookupResult> for LookupResponse {
    fn from(result: LookupResult) -> Self {
        let segment = result.payload.segment;
        let (income, residency, description) = match &segment {
            Some(s) => (
                s.household_income.clone(),
                s.residency_home_type.clone(),
                s.segment_description.clone(),
            ),
            None => (None, None, None),
        };

        Self {
            postal_code: result.key,
            prizm_code: segment.map(|s| s.segment_number),
            household_income: income,
            residency_home_type: residency,
            segment_description: description,
            status: result.status,
            from_cache: result.origin == Origin::Cache,
            cached_at: result.cached_at,
            message: result.payload.message,
        }
    }
}

/// Request body for batch lookups.
#[derive(Debug, Deserialize, Serialize)]
pub struct BatchLookupRequest {
    /// Raw postal-code strings, looked up in order.
    pub postal_codes: Vec<String>,
}

/// Response for batch lookups.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchLookupResponse {
    /// Per-code results, in request order.
    pub results: Vec<LookupResponse>,
    /// Number of codes processed.
    pub total: usize,
    /// Results with status `success`.
    pub successful: usize,
    /// Results with any other status.
    pub failed: usize,
}

impl BatchLookupResponse {
    /// Builds the envelope, tallying successes.
    pub fn new(results: Vec<LookupResponse>) -> Self {
        let total = results.len();
        let successful = results
            .iter()
            .filter(|r| r.status == LookupStatus::Success)
            .count();
        Self {
            results,
            total,
            successful,
            failed: total - successful,
        }
    }
}

/// Response for cache diagnostics.
#[derive(Debug, Serialize)]
pub struct CacheStatsResponse {
    /// The store's snapshot.
    #[serde(flatten)]
    pub stats: CacheStats,
}

/// Response for a sweep.
#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponse {
    /// How many expired rows were removed.
    pub removed: u64,
}

/// Response for a clear.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    /// Whether the clear landed.
    pub cleared: bool,
}

/// Response for a single-key cache check.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheCheckResponse {
    /// The normalized key that was checked.
    pub postal_code: String,
    /// Whether a live entry exists.
    pub cached: bool,
    /// The cached status, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LookupStatus>,
    /// Write time of the entry, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    /// Expiry time of the entry, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Response for a single-key cache delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheDeleteResponse {
    /// The normalized key that was deleted.
    pub postal_code: String,
    /// Whether an entry existed.
    pub deleted: bool,
}

/// Response for the health probe.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process is serving.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the first health probe.
    pub uptime_seconds: u64,
    /// Live entries in the cache.
    pub cache_entries: u64,
}
