//! API route handlers.
//!
//! Thin adapters only: lookups go through the orchestrator, cache admin
//! goes straight to the store's operations, and every lookup is rendered
//! through the one `LookupResponse` conversion.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use prizm_core::{normalize_key, PostalCode};

use crate::dto::*;
use crate::error::ApiError;
use crate::state::AppState;

type Result<T> = std::result::Result<T, ApiError>;

/// Normalizes an admin-surface key the same way lookups do: the canonical
/// form when the code validates, the uppercased raw string otherwise.
fn admin_key(raw: &str) -> String {
    PostalCode::parse(raw)
        .map(PostalCode::into_string)
        .unwrap_or_else(|_| normalize_key(raw))
}

/// GET /api/v1/segments/:postal_code
pub async fn lookup_segment(
    State(state): State<Arc<AppState>>,
    Path(postal_code): Path<String>,
) -> Json<LookupResponse> {
    let result = state.service.lookup(&postal_code).await;
    Json(result.into())
}

/// POST /api/v1/segments/batch
pub async fn lookup_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchLookupRequest>,
) -> Result<Json<BatchLookupResponse>> {
    if req.postal_codes.is_empty() {
        return Err(ApiError::bad_request(
            "postal_codes must be a non-empty list",
        ));
    }
    if req.postal_codes.len() > state.config.max_batch {
        return Err(ApiError::bad_request(format!(
            "Too many postal codes; maximum allowed is {}",
            state.config.max_batch
        )));
    }

    let results = state.service.lookup_batch(&req.postal_codes).await;

    info!(total = results.len(), "Batch lookup complete");

    Ok(Json(BatchLookupResponse::new(
        results.into_iter().map(Into::into).collect(),
    )))
}

/// GET /api/v1/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        stats: state.service.cache().stats(),
    })
}

/// POST /api/v1/cache/sweep
pub async fn cache_sweep(State(state): State<Arc<AppState>>) -> Json<SweepResponse> {
    let removed = state.service.cache().sweep_expired();
    Json(SweepResponse { removed })
}

/// POST /api/v1/cache/clear
pub async fn cache_clear(State(state): State<Arc<AppState>>) -> Json<ClearResponse> {
    let cleared = state.service.cache().clear();
    Json(ClearResponse { cleared })
}

/// GET /api/v1/cache/:postal_code
pub async fn cache_check(
    State(state): State<Arc<AppState>>,
    Path(postal_code): Path<String>,
) -> Json<CacheCheckResponse> {
    let key = admin_key(&postal_code);

    let response = match state.service.cache().get(&key) {
        Some(entry) => CacheCheckResponse {
            postal_code: key,
            cached: true,
            status: Some(entry.payload.status),
            cached_at: Some(entry.cached_at),
            expires_at: Some(entry.expires_at),
        },
        None => CacheCheckResponse {
            postal_code: key,
            cached: false,
            status: None,
            cached_at: None,
            expires_at: None,
        },
    };

    Json(response)
}

/// DELETE /api/v1/cache/:postal_code
pub async fn cache_delete(
    State(state): State<Arc<AppState>>,
    Path(postal_code): Path<String>,
) -> Json<CacheDeleteResponse> {
    let key = admin_key(&postal_code);
    let deleted = state.service.cache().delete(&key);

    Json(CacheDeleteResponse {
        postal_code: key,
        deleted,
    })
}

static START_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let start = START_TIME.get_or_init(Instant::now);

    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        uptime_seconds: start.elapsed().as_secs(),
        cache_entries: state.service.cache().stats().valid,
    })
}
