//! Common traits for the lookup service.
//!
//! These traits define the seams between the orchestrator and its
//! collaborators, enabling mock implementations in tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FetchOutcome, PostalCode};

// ═══════════════════════════════════════════════════════════════════════════════
// SEGMENT SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Interface for fetching a segment record from the external source.
///
/// Implementations might use:
/// - A WebDriver-driven browser session (production)
/// - Canned fixtures (tests)
///
/// A source is called at most once per orchestrator invocation; retry
/// policy lives in the orchestrator's TTLs, not here. The production
/// implementation holds an exclusive browser session, so callers must
/// serialize access rather than fetch concurrently.
#[async_trait]
pub trait SegmentSource: Send + Sync {
    /// Fetches the segment record for a canonical postal code.
    ///
    /// Returns [`FetchOutcome::NotAssigned`] when the source definitively
    /// has no segment for the code, and [`FetchOutcome::Failed`] for
    /// ambiguous page-level failures. An `Err` is reserved for session
    /// faults ([`crate::PrizmError::Infrastructure`] aborts a batch).
    async fn fetch(&self, code: &PostalCode) -> Result<FetchOutcome>;
}
