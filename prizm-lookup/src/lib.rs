//! # PRIZM Lookup
//!
//! The orchestrator that turns a raw postal-code string into a uniform
//! [`LookupResult`](prizm_core::LookupResult), composing the validator,
//! the cache store, and the external segment source:
//!
//! 1. validate the input into a canonical key,
//! 2. read the cache,
//! 3. on a miss, run one serialized, timeout-bounded fetch,
//! 4. classify the outcome and write it through with a status-dependent
//!    TTL before returning.
//!
//! Failures are results here, not faults: invalid formats and confirmed
//! negatives are cached for months, transient fetch trouble for days, so
//! repeated queries on the same key cost one browser round trip at most.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod service;

pub use service::{LookupService, TtlPolicy};
