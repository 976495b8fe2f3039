//! # PRIZM Cache
//!
//! Durable, expiring key-value store for lookup results, backed by SQLite.
//!
//! The store sits between a fast API surface and a slow, flaky
//! browser-driven fetch: every terminal lookup verdict (successes and
//! failures alike) is written through here with a caller-chosen TTL, and
//! reads never return an entry past its expiry even while the row is still
//! physically present.
//!
//! Storage faults never escape the store boundary: reads degrade to a
//! cache miss and writes report `false`, so the external lookup always
//! remains available as the fallback path.
//!
//! ## Example
//!
//! ```rust
//! use chrono::Duration;
//! use prizm_cache::SegmentCache;
//! use prizm_core::{LookupPayload, SegmentRecord};
//!
//! let cache = SegmentCache::open_in_memory().unwrap();
//! let payload = LookupPayload::success("V8A 2P4", SegmentRecord::new("62"));
//!
//! assert!(cache.put("V8A 2P4", &payload, Duration::days(90)));
//! let entry = cache.get("V8A 2P4").unwrap();
//! assert_eq!(entry.payload.segment_number(), Some("62"));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod store;

pub use store::{CacheStats, CachedEntry, SegmentCache};
