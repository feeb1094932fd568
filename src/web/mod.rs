// Web server: Axum-based JSON API.
//
// Two routes:
//   POST /api/analyze  classify a text
//   GET  /api/health   liveness check, reports artifact load state
//
// CORS is open to every origin.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::classifier::Classifier;

pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<Classifier>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(classifier: Classifier, bind: &str, port: u16) -> Result<()> {
    let state = AppState {
        classifier: Arc::new(classifier),
    };

    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("chatguard API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(handlers::analyze::analyze_text))
        .route("/api/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api/health: always 200. Reports load state but never fails on it.
async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let classifier = &state.classifier;
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "model": if classifier.model_ready() { "ready" } else { "unavailable" },
            "denylist": if classifier.denylist_ready() { "ready" } else { "unavailable" },
            "policy": classifier.policy(),
            "denylist_words": classifier.denylist().len(),
        })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}
