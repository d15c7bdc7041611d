use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;

use super::api;
use crate::app::SharedState;

/// Room for the non-file form fields and multipart framing on top of the logo.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

const ENDPOINTS: [&str; 8] = [
    "GET /health",
    "POST /api/qr/generate",
    "GET /api/qr/history",
    "GET /api/qr/stats",
    "DELETE /api/qr/clear-history",
    "DELETE /api/qr/{id}",
    "GET /api/qr/preview/{id}",
    "GET /",
];

/// Create the axum router with all routes.
pub fn create_router(state: SharedState) -> Router {
    let body_limit = state.config().max_logo_bytes + FORM_OVERHEAD_BYTES;

    Router::new()
        // --- Core ---
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        // --- QR ---
        .route("/api/qr/generate", post(api::qr::generate_qr))
        .route("/api/qr/history", get(api::history::get_history))
        .route("/api/qr/stats", get(api::history::get_stats))
        .route("/api/qr/clear-history", delete(api::history::clear_history))
        .route("/api/qr/preview/{id}", get(api::history::preview_qr))
        .route("/api/qr/{id}", delete(api::history::delete_qr))
        // --- Middleware ---
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn index_handler() -> Json<Value> {
    Json(json!({
        "name": "QR Studio API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ENDPOINTS,
    }))
}

/// GET /health
async fn health_handler(State(state): State<SharedState>) -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": state.config().environment,
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;

    fn test_router() -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = qr_store::Database::open_in_memory().unwrap();
        let state = SharedState::new(db, AppConfig::default(), dir.path().to_path_buf());
        (create_router(state), dir)
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _dir) = test_router();
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "OK");
        assert_eq!(json["environment"], "development");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_index_lists_endpoints() {
        let (app, _dir) = test_router();
        let resp = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let json = body_json(resp).await;
        assert_eq!(json["endpoints"].as_array().unwrap().len(), ENDPOINTS.len());
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let (app, _dir) = test_router();
        let resp = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
