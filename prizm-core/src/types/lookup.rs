//! Lookup outcome types.
//!
//! [`LookupPayload`] is the unit the cache persists: the last known verdict
//! for a key, failures included. Caching failures is deliberate: durable
//! verdicts (invalid format, no segment assigned) stick for months, while
//! transient failures are retried once their short retention lapses.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::segment::SegmentRecord;

/// Terminal status of a lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupStatus {
    /// A segment record was found.
    Success,
    /// The input is not a well-formed Canadian postal code.
    InvalidFormat,
    /// The code is well-formed but the source has no segment for it.
    NotFound,
    /// The fetch failed for an ambiguous reason (timeout, page mismatch,
    /// session fault); worth retrying later.
    TransientError,
}

impl LookupStatus {
    /// Returns true for verdicts that are stable facts about the key and
    /// are retained with the long TTL.
    pub fn is_durable(&self) -> bool {
        !matches!(self, LookupStatus::TransientError)
    }
}

impl fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LookupStatus::Success => "success",
            LookupStatus::InvalidFormat => "invalid_format",
            LookupStatus::NotFound => "not_found",
            LookupStatus::TransientError => "transient_error",
        };
        f.write_str(s)
    }
}

/// Where a lookup result came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Served from the cache store.
    Cache,
    /// Produced by a fresh collaborator fetch (or fresh validation).
    Fresh,
}

/// Outcome of one collaborator fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The source returned a full record.
    Found(SegmentRecord),
    /// The source definitively shows no segment for this code.
    NotAssigned,
    /// The page did not yield a verdict (structure mismatch, partial load).
    Failed(String),
}

/// The unit persisted per cache key: the last known verdict for that key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupPayload {
    /// The key this payload was stored under (canonical code, or the
    /// normalized raw string for invalid inputs).
    pub postal_code: String,
    /// Terminal status of the lookup that produced this payload.
    pub status: LookupStatus,
    /// The record, present exactly when `status` is `Success`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<SegmentRecord>,
    /// Human-readable detail for non-success verdicts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LookupPayload {
    /// Builds a success payload.
    pub fn success(postal_code: impl Into<String>, segment: SegmentRecord) -> Self {
        Self {
            postal_code: postal_code.into(),
            status: LookupStatus::Success,
            segment: Some(segment),
            message: None,
        }
    }

    /// Builds an invalid-format payload for a raw input's normalized key.
    pub fn invalid_format(key: impl Into<String>) -> Self {
        Self {
            postal_code: key.into(),
            status: LookupStatus::InvalidFormat,
            segment: None,
            message: Some(
                "Invalid postal code format. Canadian postal codes are 6 characters \
                 alternating letter/digit."
                    .into(),
            ),
        }
    }

    /// Builds a not-found payload (a stable negative result).
    pub fn not_found(postal_code: impl Into<String>) -> Self {
        Self {
            postal_code: postal_code.into(),
            status: LookupStatus::NotFound,
            segment: None,
            message: Some("No PRIZM segment is assigned to this postal code.".into()),
        }
    }

    /// Builds a transient-error payload.
    pub fn transient(postal_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            postal_code: postal_code.into(),
            status: LookupStatus::TransientError,
            segment: None,
            message: Some(message.into()),
        }
    }

    /// Checks the status/segment pairing invariant.
    pub fn validate(&self) -> bool {
        match self.status {
            LookupStatus::Success => self.segment.is_some(),
            _ => self.segment.is_none(),
        }
    }

    /// The segment number, when this payload carries one.
    pub fn segment_number(&self) -> Option<&str> {
        self.segment.as_ref().map(|s| s.segment_number.as_str())
    }
}

/// The orchestrator's uniform result envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LookupResult {
    /// The cache key the lookup resolved to.
    pub key: String,
    /// Terminal status.
    pub status: LookupStatus,
    /// Whether the payload was served from cache or freshly produced.
    pub origin: Origin,
    /// The full payload.
    pub payload: LookupPayload,
    /// When the payload was cached, for cache-served results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
}

impl LookupResult {
    /// Wraps a freshly produced payload.
    pub fn fresh(payload: LookupPayload) -> Self {
        Self {
            key: payload.postal_code.clone(),
            status: payload.status,
            origin: Origin::Fresh,
            payload,
            cached_at: None,
        }
    }

    /// Wraps a cache-served payload.
    pub fn from_cache(payload: LookupPayload, cached_at: DateTime<Utc>) -> Self {
        Self {
            key: payload.postal_code.clone(),
            status: payload.status,
            origin: Origin::Cache,
            payload,
            cached_at: Some(cached_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&LookupStatus::InvalidFormat).unwrap(),
            "\"invalid_format\""
        );
        assert_eq!(
            serde_json::to_string(&LookupStatus::NotFound).unwrap(),
            "\"not_found\""
        );
    }

    #[test]
    fn test_status_durability() {
        assert!(LookupStatus::Success.is_durable());
        assert!(LookupStatus::InvalidFormat.is_durable());
        assert!(LookupStatus::NotFound.is_durable());
        assert!(!LookupStatus::TransientError.is_durable());
    }

    #[test]
    fn test_payload_constructors_validate() {
        let ok = LookupPayload::success("V8A 2P4", SegmentRecord::new("62"));
        assert!(ok.validate());
        assert_eq!(ok.segment_number(), Some("62"));

        assert!(LookupPayload::invalid_format("12345").validate());
        assert!(LookupPayload::not_found("Z9Z 9Z9").validate());
        assert!(LookupPayload::transient("V8A 2P4", "timeout").validate());
    }

    #[test]
    fn test_payload_json_roundtrip() {
        let payload = LookupPayload::success("V8A 2P4", SegmentRecord::new("62"));
        let json = serde_json::to_string(&payload).unwrap();
        let back: LookupPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_result_envelopes() {
        let payload = LookupPayload::not_found("Z9Z 9Z9");

        let fresh = LookupResult::fresh(payload.clone());
        assert_eq!(fresh.origin, Origin::Fresh);
        assert_eq!(fresh.key, "Z9Z 9Z9");
        assert!(fresh.cached_at.is_none());

        let at = Utc::now();
        let cached = LookupResult::from_cache(payload, at);
        assert_eq!(cached.origin, Origin::Cache);
        assert_eq!(cached.cached_at, Some(at));
    }
}
