//! HTTP surface.
//!
//! ```text
//! POST /api/analyze  {"url": "..."} -> {"annotations": [...]}
//! GET  /health
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};
use uiscope_engine::cache::ResultCache;
use uiscope_engine::pipeline::validate_url;
use uiscope_engine::protocol::{AnalyzeResponse, ErrorResponse};
use uiscope_engine::{AnalysisError, Analyzer};

pub struct AppState {
    pub analyzer: Analyzer,
    pub cache: Option<Arc<dyn ResultCache>>,
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/analyze", post(analyze))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("uiscope listening on http://{}", addr);
    axum::serve(listener, create_router(state)).await?;
    Ok(())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return error_response(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let Some(url) = body.get("url").and_then(Value::as_str) else {
        return error_response(StatusCode::BAD_REQUEST, "url must be a non-empty string");
    };
    let url = match validate_url(url) {
        Ok(url) => url,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    if let Some(cached) = state.cache.as_ref().and_then(|c| c.get(url)) {
        debug!("Serving {} from cache", url);
        return Json(AnalyzeResponse { annotations: cached }).into_response();
    }

    match state.analyzer.analyze(url).await {
        Ok(annotations) => {
            if let Some(cache) = &state.cache {
                cache.put(url, annotations.clone());
            }
            Json(AnalyzeResponse { annotations }).into_response()
        }
        Err(e @ AnalysisError::Validation(_)) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
