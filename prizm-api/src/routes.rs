//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Lookups
        .route(
            "/api/v1/segments/:postal_code",
            get(handlers::lookup_segment),
        )
        .route("/api/v1/segments/batch", post(handlers::lookup_batch))
        // Cache admin
        .route("/api/v1/cache/stats", get(handlers::cache_stats))
        .route("/api/v1/cache/sweep", post(handlers::cache_sweep))
        .route("/api/v1/cache/clear", post(handlers::cache_clear))
        .route("/api/v1/cache/:postal_code", get(handlers::cache_check))
        .route("/api/v1/cache/:postal_code", delete(handlers::cache_delete))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ApiConfig;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use prizm_cache::SegmentCache;
    use prizm_core::{FetchOutcome, PostalCode, SegmentRecord, SegmentSource};
    use prizm_lookup::LookupService;

    /// Canned site behavior, including the well-known V8A 2P4 record.
    struct FixtureSource;

    #[async_trait]
    impl SegmentSource for FixtureSource {
        async fn fetch(&self, code: &PostalCode) -> prizm_core::Result<FetchOutcome> {
            Ok(match code.as_str() {
                "V8A 2P4" => FetchOutcome::Found(SegmentRecord {
                    segment_number: "62".into(),
                    household_income: Some("$87,388".into()),
                    residency_home_type: Some(
                        "Own & Rent | Single Detached / Low Rise Apt".into(),
                    ),
                    segment_description: Some(
                        "Suburban, lower-middle-income singles and couples".into(),
                    ),
                }),
                "Z9Z 9Z9" => FetchOutcome::NotAssigned,
                _ => FetchOutcome::Failed("fixture has no entry for this code".into()),
            })
        }
    }

    fn test_app() -> Router {
        let cache = Arc::new(SegmentCache::open_in_memory().unwrap());
        let service = LookupService::new(cache, Arc::new(FixtureSource));
        let state = Arc::new(AppState::new(ApiConfig::default(), service));
        create_router(state)
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn request_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app();
        let (status, body) = get_json(&app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_lookup_success_then_cache_hit() {
        let app = test_app();

        let (status, body) = get_json(&app, "/api/v1/segments/v8a2p4").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["postal_code"], "V8A 2P4");
        assert_eq!(body["prizm_code"], "62");
        assert_eq!(body["household_income"], "$87,388");
        assert_eq!(body["status"], "success");
        assert_eq!(body["from_cache"], false);

        let (_, body) = get_json(&app, "/api/v1/segments/V8A%202P4").await;
        assert_eq!(body["from_cache"], true);
        assert!(body["cached_at"].is_string());
    }

    #[tokio::test]
    async fn test_lookup_invalid_format_is_a_result_not_an_error() {
        let app = test_app();

        let (status, body) = get_json(&app, "/api/v1/segments/12345").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "invalid_format");
        assert_eq!(body["prizm_code"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_lookup_not_found() {
        let app = test_app();

        let (status, body) = get_json(&app, "/api/v1/segments/Z9Z9Z9").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "not_found");
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let app = test_app();

        let (status, body) = request_json(
            &app,
            "POST",
            "/api/v1/segments/batch",
            Some(serde_json::json!({ "postal_codes": ["M5V 2H1", "123456"] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["results"][0]["postal_code"], "M5V 2H1");
        assert_eq!(body["results"][1]["postal_code"], "123456");
        assert_eq!(body["results"][1]["status"], "invalid_format");
    }

    #[tokio::test]
    async fn test_batch_counts_successes() {
        let app = test_app();

        let (_, body) = request_json(
            &app,
            "POST",
            "/api/v1/segments/batch",
            Some(serde_json::json!({ "postal_codes": ["V8A 2P4", "Z9Z 9Z9", "nope"] })),
        )
        .await;

        assert_eq!(body["total"], 3);
        assert_eq!(body["successful"], 1);
        assert_eq!(body["failed"], 2);
    }

    #[tokio::test]
    async fn test_batch_rejects_empty_list() {
        let app = test_app();

        let (status, body) = request_json(
            &app,
            "POST",
            "/api/v1/segments/batch",
            Some(serde_json::json!({ "postal_codes": [] })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_batch_rejects_oversized_list() {
        let app = test_app();
        let codes: Vec<String> = (0..51).map(|i| format!("A{}A 1A1", i % 10)).collect();

        let (status, _) = request_json(
            &app,
            "POST",
            "/api/v1/segments/batch",
            Some(serde_json::json!({ "postal_codes": codes })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_cache_admin_roundtrip() {
        let app = test_app();

        // Populate one entry
        get_json(&app, "/api/v1/segments/V8A2P4").await;

        let (status, body) = get_json(&app, "/api/v1/cache/stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 1);
        assert_eq!(body["valid"], 1);

        // Check accepts any spelling of the key
        let (_, body) = get_json(&app, "/api/v1/cache/v8a%202p4").await;
        assert_eq!(body["cached"], true);
        assert_eq!(body["status"], "success");

        let (_, body) = request_json(&app, "DELETE", "/api/v1/cache/V8A2P4", None).await;
        assert_eq!(body["deleted"], true);

        let (_, body) = get_json(&app, "/api/v1/cache/V8A2P4").await;
        assert_eq!(body["cached"], false);
    }

    #[tokio::test]
    async fn test_cache_delete_absent_key() {
        let app = test_app();

        let (status, body) = request_json(&app, "DELETE", "/api/v1/cache/H0H0H0", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], false);
    }

    #[tokio::test]
    async fn test_cache_sweep_and_clear() {
        let app = test_app();

        get_json(&app, "/api/v1/segments/V8A2P4").await;

        // Nothing is expired yet
        let (_, body) = request_json(&app, "POST", "/api/v1/cache/sweep", None).await;
        assert_eq!(body["removed"], 0);

        let (_, body) = request_json(&app, "POST", "/api/v1/cache/clear", None).await;
        assert_eq!(body["cleared"], true);

        let (_, body) = get_json(&app, "/api/v1/cache/stats").await;
        assert_eq!(body["total"], 0);
    }
}
