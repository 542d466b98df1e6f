use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};

use crate::collectors::collect_snapshot;
use crate::config::Config;
use crate::exec::CommandRunner;
use crate::snapshot::AGENT_SOURCE;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub runner: Arc<dyn CommandRunner>,
}

pub fn build_router(config: Arc<Config>, runner: Arc<dyn CommandRunner>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(AppState { config, runner })
}

fn cors() -> [(header::HeaderName, &'static str); 1] {
    [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")]
}

async fn index_handler() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": "hostprobe agent",
        "version": env!("CARGO_PKG_VERSION"),
        "platform": std::env::consts::OS,
        "endpoints": {
            "/": "API info",
            "/health": "health check",
            "/metrics": "current system snapshot",
        },
    });
    (cors(), Json(body))
}

/// Liveness only; never touches the collectors.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "service": AGENT_SOURCE,
        "platform": std::env::consts::OS,
        "port": state.config.port(),
        "timestamp": humantime::format_rfc3339_seconds(std::time::SystemTime::now()).to_string(),
    });
    (cors(), Json(body))
}

/// Full collection pass per request, independent of the periodic writer.
/// Runs on the blocking pool: collection holds a 1-second CPU sampling
/// window.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    let runner = state.runner.clone();
    match tokio::task::spawn_blocking(move || collect_snapshot(runner.as_ref())).await {
        Ok(snapshot) => (cors(), Json(snapshot)).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            cors(),
            format!("error collecting metrics: {err}"),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::testing::FakeRunner;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let config = Arc::new(Config::default());
        let runner: Arc<dyn CommandRunner> = Arc::new(FakeRunner::failing());
        build_router(config, runner)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn health_is_ok_without_any_collection() {
        let (status, body) = get_json(test_app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], AGENT_SOURCE);
        assert_eq!(body["port"], 8889);
    }

    #[tokio::test]
    async fn index_lists_endpoints() {
        let (status, body) = get_json(test_app(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["endpoints"]["/metrics"].is_string());
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn responses_allow_any_origin() {
        let response = test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .map(|v| v.to_str().unwrap()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn metrics_returns_a_full_snapshot() {
        let (status, body) = get_json(test_app(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], AGENT_SOURCE);
        assert!(body["cpu"]["usage_percent"].is_number());
        assert_eq!(body["gpu"]["status"], "unavailable");
        assert_eq!(
            body["gpu"]["count"].as_u64().unwrap() as usize,
            body["gpu"]["devices"].as_array().unwrap().len()
        );
    }
}
