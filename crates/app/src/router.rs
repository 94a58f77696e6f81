use std::io::Cursor;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{sse::Sse, Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use image::{DynamicImage, ImageOutputFormat};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use favlens_browser::icon_cache::IconCache;
use favlens_browser::tabs::TabError;
use favlens_core::types::IconRequest;

use crate::audit;
use crate::hub;
use crate::problem::ProblemResponse;
use crate::state::AppState;
use crate::telemetry;
use crate::ui;

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .route("/audit/sse", get(audit_sse))
        .route("/icon/:domain", get(icon_png))
        .route("/api/audit", post(start_audit))
        .route("/api/recover", post(recover))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(ui::GRID_PAGE)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = telemetry::render_metrics(state.metrics());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .unwrap()
}

async fn audit_sse(State(state): State<AppState>) -> impl IntoResponse {
    Sse::new(hub::audit_stream(state.hub().clone())).keep_alive(hub::audit_keep_alive())
}

/// Serves the cached icon for a domain as PNG, resolving a cache miss to
/// the placeholder bitmap like any other request.
async fn icon_png(State(state): State<AppState>, Path(domain): Path<String>) -> Response {
    let request = IconRequest::new(domain.as_str(), state.audit().icon_size_px);
    let image = state.browser().fetch_icon(&request);
    let pixels = image.pixels().await;

    let mut body = Vec::new();
    if let Err(err) =
        DynamicImage::ImageRgba8(pixels).write_to(&mut Cursor::new(&mut body), ImageOutputFormat::Png)
    {
        return ProblemResponse::internal(format!("failed to encode icon: {err}")).into_response();
    }

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/png")
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::from(body))
        .unwrap()
}

async fn start_audit(State(state): State<AppState>) -> Response {
    match state.begin_run() {
        Ok(guard) => {
            let task_state = state.clone();
            tokio::spawn(async move {
                if let Err(err) = audit::run_audit(task_state, guard).await {
                    error!(error = %err, "audit pass failed");
                }
            });
            (StatusCode::ACCEPTED, Json(json!({ "status": "started" }))).into_response()
        }
        Err(err) => ProblemResponse::conflict(err.to_string()).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct RecoverRequest {
    domain: String,
}

async fn recover(State(state): State<AppState>, Json(request): Json<RecoverRequest>) -> Response {
    let domain = request.domain.trim();
    if domain.is_empty() {
        return ProblemResponse::bad_request("domain must not be empty").into_response();
    }

    match audit::recover_domain(&state, domain).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err @ TabError::CreateRejected(_)) => {
            ProblemResponse::bad_request(err.to_string()).into_response()
        }
        Err(err) => ProblemResponse::internal(err.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn body_json(response: Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("body is json")
    }

    #[tokio::test]
    async fn healthz_answers_ok() {
        let app = app_router(test_state());
        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn index_serves_the_grid_page() {
        let app = app_router(test_state());
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let html = String::from_utf8_lossy(&bytes);
        assert!(html.contains("favlens"));
        assert!(html.contains("/audit/sse"));
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_prometheus_text() {
        let app = app_router(test_state());
        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("app_build_info"));
    }

    #[tokio::test]
    async fn icon_endpoint_serves_png() {
        let app = app_router(test_state());
        let response = app
            .oneshot(Request::get("/icon/docs.rs").body(Body::empty()).unwrap())
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn audit_start_conflicts_while_a_run_is_active() {
        let state = test_state();
        let _guard = state.begin_run().expect("slot free");

        let app = app_router(state);
        let response = app
            .oneshot(Request::post("/api/audit").body(Body::empty()).unwrap())
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("application/problem+json")
        );
    }

    #[tokio::test]
    async fn audit_start_is_accepted_when_idle() {
        let app = app_router(test_state());
        let response = app
            .oneshot(Request::post("/api/audit").body(Body::empty()).unwrap())
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_json(response).await["status"], "started");
    }

    #[tokio::test]
    async fn recover_rejects_an_empty_domain() {
        let app = app_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/recover")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{ "domain": "  " }"#))
                    .unwrap(),
            )
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn recover_returns_the_discovered_icon() {
        let app = app_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/recover")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{ "domain": "github.com" }"#))
                    .unwrap(),
            )
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["result"], "recovered");
        assert_eq!(body["icon_url"], "https://github.com/favicon.ico");
    }

    #[tokio::test]
    async fn recover_answers_empty_when_nothing_surfaces() {
        let app = app_router(test_state());
        let response = app
            .oneshot(
                Request::post("/api/recover")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{ "domain": "internals.rust-lang.org" }"#))
                    .unwrap(),
            )
            .await
            .expect("request succeeds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["result"], "empty");
    }
}
