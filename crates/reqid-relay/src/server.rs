//! Axum HTTP server: router, listener, graceful shutdown.

use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use reqid::{context_from_request, request_id, request_id_middleware, RequestContext};
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::forward;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RelayConfig,
    pub upstream_client: reqwest::Client,
}

/// Build the router: local endpoints, upstream fallback, request-id middleware.
pub fn router(state: AppState) -> Router {
    let request_id_config = Arc::new(state.config.request_id.clone());
    let body_limit = DefaultBodyLimit::max(state.config.server.max_body_bytes);

    Router::new()
        .route("/health", get(handle_health))
        .route("/request-id", get(handle_request_id))
        .fallback(handle_forward)
        .layer(body_limit)
        .with_state(Arc::new(state))
        .layer(axum::middleware::from_fn_with_state(
            request_id_config,
            request_id_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Build and run the HTTP server.
pub async fn run(state: AppState) -> anyhow::Result<()> {
    let listen_addr = state.config.server.listen_address.clone();
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Relay listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Relay shut down gracefully");
    Ok(())
}

/// Catch-all handler: forward the request upstream with its request ID.
///
/// Supports all HTTP methods (GET, POST, DELETE, etc.). Bodies over
/// `server.max_body_bytes` are rejected with 413 by the `Bytes` extractor.
async fn handle_forward(
    State(state): State<Arc<AppState>>,
    req_ctx: RequestContext,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = context_from_request(&req_ctx);

    let path = uri.path();
    let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
    let url = format!("{}{path}{query}", state.config.upstream.base_url);

    forward::forward(&state.upstream_client, &ctx, method, &url, &headers, body).await
}

/// Report the request ID assigned to this request.
async fn handle_request_id(req_ctx: RequestContext) -> impl IntoResponse {
    let resp = serde_json::json!({ "request_id": request_id(&req_ctx) });
    (StatusCode::OK, Json(resp))
}

/// Health check endpoint.
async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Wait for SIGINT (Ctrl+C) for graceful shutdown.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install CTRL+C signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, draining connections...");
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::extract::Request;
    use reqid::RequestIdConfig;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{ServerConfig, UpstreamConfig};

    fn state(upstream: &str) -> AppState {
        AppState {
            config: RelayConfig {
                server: ServerConfig::default(),
                upstream: UpstreamConfig {
                    base_url: upstream.to_string(),
                    timeout_secs: 5,
                },
                request_id: RequestIdConfig::default(),
                tracing: reqid_tracing::TracingConfig::default(),
            },
            upstream_client: reqwest::Client::new(),
        }
    }

    /// Upstream that answers with the request ID headers it received.
    async fn spawn_upstream() -> String {
        async fn echo_headers(headers: HeaderMap, request: Request) -> Json<serde_json::Value> {
            let get = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            Json(serde_json::json!({
                "path": request.uri().to_string(),
                "method": request.method().as_str(),
                "request_id": get("x-request-id"),
                "correlation_id": get("x-correlation-id"),
                "tenant": get("x-tenant"),
            }))
        }

        let app = Router::new().fallback(echo_headers);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state("http://127.0.0.1:1"))
            .oneshot(http::Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_request_id_endpoint_reports_inbound_id() {
        let response = router(state("http://127.0.0.1:1"))
            .oneshot(
                http::Request::get("/request-id")
                    .header("X-Request-ID", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "abc-123");
        let body = json_body(response).await;
        assert_eq!(body["request_id"], "abc-123");
    }

    #[tokio::test]
    async fn test_forward_propagates_inbound_id() {
        let upstream = spawn_upstream().await;
        let response = router(state(&upstream))
            .oneshot(
                http::Request::post("/orders/7?expand=items")
                    .header("X-Request-ID", "abc-123")
                    .header("X-Correlation-ID", "stale")
                    .header("X-Tenant", "acme")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "abc-123");

        let body = json_body(response).await;
        assert_eq!(body["path"], "/orders/7?expand=items");
        assert_eq!(body["method"], "POST");
        assert_eq!(body["request_id"], "abc-123");
        assert_eq!(body["correlation_id"], "abc-123");
        assert_eq!(body["tenant"], "acme");
    }

    #[tokio::test]
    async fn test_forward_generates_id_when_absent() {
        let upstream = spawn_upstream().await;
        let response = router(state(&upstream))
            .oneshot(http::Request::get("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let echoed = response.headers()["x-request-id"].to_str().unwrap().to_string();
        let body = json_body(response).await;

        assert!(uuid::Uuid::parse_str(&echoed).is_ok());
        assert_eq!(body["request_id"], echoed.as_str());
        assert_eq!(body["correlation_id"], echoed.as_str());
    }

    #[tokio::test]
    async fn test_forward_unreachable_upstream() {
        let response = router(state("http://127.0.0.1:1"))
            .oneshot(http::Request::get("/items").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_payload_too_large() {
        let upstream = spawn_upstream().await;
        let mut state = state(&upstream);
        state.config.server.max_body_bytes = 16;

        let response = router(state)
            .oneshot(
                http::Request::post("/orders")
                    .body(Body::from(vec![b'x'; 64]))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_body_within_limit_is_forwarded() {
        let upstream = spawn_upstream().await;
        let mut state = state(&upstream);
        state.config.server.max_body_bytes = 16;

        let response = router(state)
            .oneshot(http::Request::post("/orders").body(Body::from("{}")).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
