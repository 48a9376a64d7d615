//! REST routes registered by the plugin.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use rollbar_wp_engine::{Plugin, TestRequest, TEST_ROUTE};

use crate::error::ApiError;

/// Routes for everything the plugin registered, plus `/metrics`.
///
/// The test route is only mounted once the plugin has handled the
/// `RestApiInit` trigger.
pub fn router(plugin: Arc<Plugin>) -> Router {
    let mut router = Router::new().route("/metrics", get(metrics));
    if plugin.routes().contains(&TEST_ROUTE) {
        router = router.route(TEST_ROUTE.path, post(test_php_logging));
    }
    router.with_state(plugin)
}

/// POST /rollbar/v1/test-php-logging
///
/// 200 when the test message went out, 500 otherwise. The body is always
/// an empty JSON array.
pub async fn test_php_logging(
    State(plugin): State<Arc<Plugin>>,
    Json(request): Json<TestRequest>,
) -> (StatusCode, Json<Value>) {
    let result = tokio::task::spawn_blocking(move || plugin.test_php_logging(&request)).await;

    let status = match result {
        Ok(Ok(())) => StatusCode::OK,
        Ok(Err(e)) => {
            warn!(error = %e, "PHP logging test failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
        Err(e) => {
            error!(error = %e, "PHP logging test task panicked");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!([])))
}

async fn metrics(State(plugin): State<Arc<Plugin>>) -> impl IntoResponse {
    match plugin.metrics().gather_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            e.to_string(),
        ),
    }
}

/// Serves [`router`] on `addr` until the task is cancelled.
pub async fn serve(addr: SocketAddr, plugin: Arc<Plugin>) -> Result<(), ApiError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ApiError::Bind { addr, source })?;
    info!(%addr, "Listening");
    axum::serve(listener, router(plugin)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use rollbar_wp_config::EnvOverride;
    use rollbar_wp_core::backend::{Level, MemoryBackend};
    use rollbar_wp_core::store::MemoryStore;
    use rollbar_wp_engine::{Trigger, TEST_MESSAGE};

    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn plugin(backend: Arc<MemoryBackend>) -> Arc<Plugin> {
        let plugin = Plugin::builder(Arc::new(MemoryStore::new()), backend)
            .env(EnvOverride::fixed(None))
            .build()
            .unwrap();
        plugin.register_triggers();
        plugin
            .dispatch(Trigger::RestApiInit, &mut std::io::sink())
            .unwrap();
        Arc::new(plugin)
    }

    fn test_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(TEST_ROUTE.path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn empty_token_is_500_with_empty_body() {
        let backend = Arc::new(MemoryBackend::new());
        let response = router(plugin(backend.clone()))
            .oneshot(test_request(json!({
                "server_side_access_token": "",
                "environment": "production",
                "logging_level": "E_ERROR",
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"[]");
        assert!(backend.log_records().is_empty());
    }

    #[tokio::test]
    async fn valid_token_is_200_and_one_info_record() {
        let backend = Arc::new(MemoryBackend::new());
        let response = router(plugin(backend.clone()))
            .oneshot(test_request(json!({
                "server_side_access_token": TOKEN,
                "environment": "production",
                "logging_level": "E_ERROR",
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            backend.log_records(),
            vec![(Level::Info, TEST_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn missing_field_is_rejected_by_extractor() {
        let backend = Arc::new(MemoryBackend::new());
        let response = router(plugin(backend.clone()))
            .oneshot(test_request(json!({ "server_side_access_token": TOKEN })))
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert!(backend.init_calls().is_empty());
    }

    #[tokio::test]
    async fn test_route_requires_registration() {
        let plugin = Plugin::builder(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryBackend::new()),
        )
        .env(EnvOverride::fixed(None))
        .build()
        .unwrap();

        let response = router(Arc::new(plugin))
            .oneshot(test_request(json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn metrics_are_exposed() {
        let backend = Arc::new(MemoryBackend::new());
        let app = router(plugin(backend));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&body).contains("rollbar_wp_backend_init_total"));
    }
}
