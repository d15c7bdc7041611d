//! Stored QR history API.

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::Response;
use qr_engine::OutputFormat;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::app::SharedState;
use crate::services::store::{self, ADMIN_OWNER};

use super::{ApiError, INTERNAL_ERROR, NOT_FOUND, err_json, export_error};

const DEFAULT_PAGE_LIMIT: i64 = 20;
const MAX_PAGE_LIMIT: i64 = 100;

type ApiResult = Result<Json<Value>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// GET /api/qr/history?page=&limit=
pub async fn get_history(
    State(state): State<SharedState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    // Pages past the end yield an empty slice.
    let offset = (page - 1).saturating_mul(limit);

    let (records, total) = state
        .store()
        .history(ADMIN_OWNER, limit, offset)
        .await
        .map_err(|e| export_error(&e))?;

    Ok(Json(json!({
        "success": true,
        "data": records,
        "pagination": {
            "currentPage": page,
            "totalItems": total,
            "itemsPerPage": limit,
            "totalPages": (total + limit - 1) / limit,
        },
    })))
}

/// GET /api/qr/stats
pub async fn get_stats(State(state): State<SharedState>) -> ApiResult {
    let stats = state
        .store()
        .stats(ADMIN_OWNER)
        .await
        .map_err(|e| export_error(&e))?;
    Ok(Json(json!({ "success": true, "data": stats })))
}

/// DELETE /api/qr/clear-history
pub async fn clear_history(State(state): State<SharedState>) -> ApiResult {
    let report = store::clear_history(state.store(), ADMIN_OWNER)
        .await
        .map_err(|e| export_error(&e))?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Deleted {} QR codes", report.deleted),
        "deleted": report.deleted,
        "errors": report.errors,
    })))
}

/// DELETE /api/qr/{id}
pub async fn delete_qr(State(state): State<SharedState>, Path(id): Path<String>) -> ApiResult {
    let deleted = state
        .store()
        .delete(&id)
        .await
        .map_err(|e| export_error(&e))?;
    if !deleted {
        return Err(err_json(404, NOT_FOUND, &format!("QR code {id} not found")));
    }
    Ok(Json(json!({ "success": true, "message": "QR code deleted" })))
}

/// GET /api/qr/preview/{id} – Serve a stored artifact
pub async fn preview_qr(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let (record, bytes) = state
        .store()
        .fetch(&id)
        .await
        .map_err(|e| export_error(&e))?
        .ok_or_else(|| err_json(404, NOT_FOUND, &format!("QR code {id} not found")))?;

    let content_type = OutputFormat::parse(&record.format)
        .map(OutputFormat::content_type)
        .unwrap_or("application/octet-stream");

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .body(Body::from(bytes))
        .map_err(|e| err_json(500, INTERNAL_ERROR, &e.to_string()))
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::http::{Request, StatusCode};
    use qr_engine::{GenerationRequest, compose};
    use tower::ServiceExt;

    use super::*;
    use crate::config::AppConfig;
    use crate::server::router::create_router;

    async fn seeded_app(formats: &[OutputFormat]) -> (Router, SharedState, Vec<String>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = qr_store::Database::open_in_memory().unwrap();
        let state = SharedState::new(db, AppConfig::default(), dir.path().to_path_buf());

        let mut ids = Vec::new();
        for (i, format) in formats.iter().enumerate() {
            let request = GenerationRequest::new(format!("item {i}")).with_format(*format);
            let composition = compose(&request, None).unwrap();
            let staged = state
                .staging()
                .stage_render(
                    composition.artifact.bytes(),
                    format.extension(),
                    composition.metadata.created_at,
                )
                .unwrap();
            let stored = state
                .store()
                .upload(staged.path(), &composition.metadata)
                .await
                .unwrap();
            ids.push(stored.id);
        }
        (create_router(state.clone()), state, ids, dir)
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_history_pagination() {
        let formats = [OutputFormat::Png; 5];
        let (app, _state, _ids, _dir) = seeded_app(&formats).await;

        let (status, json) = call(
            app.clone(),
            Request::get("/api/qr/history?page=2&limit=2").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().unwrap().len(), 2);
        assert_eq!(json["pagination"]["currentPage"], 2);
        assert_eq!(json["pagination"]["totalItems"], 5);
        assert_eq!(json["pagination"]["itemsPerPage"], 2);
        assert_eq!(json["pagination"]["totalPages"], 3);

        let (_, json) = call(app, Request::get("/api/qr/history").body(Body::empty()).unwrap()).await;
        assert_eq!(json["pagination"]["itemsPerPage"], 20);
        assert_eq!(json["data"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_history_page_past_end_is_empty() {
        let (app, _state, _ids, _dir) = seeded_app(&[OutputFormat::Png; 3]).await;

        let (status, json) = call(
            app.clone(),
            Request::get("/api/qr/history?page=9223372036854775807&limit=20")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["data"].as_array().unwrap().is_empty());
        assert_eq!(json["pagination"]["currentPage"], i64::MAX);
        assert_eq!(json["pagination"]["totalItems"], 3);
        assert_eq!(json["pagination"]["totalPages"], 1);

        let (_, json) = call(
            app,
            Request::get("/api/qr/history?page=2&limit=20").body(Body::empty()).unwrap(),
        )
        .await;
        assert!(json["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stats() {
        let (app, _state, _ids, _dir) =
            seeded_app(&[OutputFormat::Svg, OutputFormat::Png, OutputFormat::Svg]).await;
        let (status, json) = call(app, Request::get("/api/qr/stats").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["totalQRs"], 3);
        assert_eq!(json["data"]["recentQRs"], 3);
        assert_eq!(json["data"]["formatBreakdown"][0]["value"], "svg");
        assert_eq!(json["data"]["formatBreakdown"][0]["count"], 2);
        assert!(json["data"]["lastGenerated"].is_string());
    }

    #[tokio::test]
    async fn test_preview_serves_bytes() {
        let (app, _state, ids, _dir) = seeded_app(&[OutputFormat::Svg]).await;
        let resp = app
            .oneshot(
                Request::get(format!("/api/qr/preview/{}", ids[0]))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "public, max-age=3600");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"<?xml"));
    }

    #[tokio::test]
    async fn test_preview_missing_is_404() {
        let (app, _state, _ids, _dir) = seeded_app(&[]).await;
        let (status, json) = call(
            app,
            Request::get("/api/qr/preview/unknown").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "NotFound");
    }

    #[tokio::test]
    async fn test_delete_one() {
        let (app, state, ids, _dir) = seeded_app(&[OutputFormat::Png, OutputFormat::Png]).await;
        let (status, _) = call(
            app.clone(),
            Request::delete(format!("/api/qr/{}", ids[0])).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.store().history(ADMIN_OWNER, 10, 0).await.unwrap().1, 1);

        let (status, _) = call(
            app,
            Request::delete(format!("/api/qr/{}", ids[0])).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_clear_history() {
        let (app, state, _ids, _dir) =
            seeded_app(&[OutputFormat::Png, OutputFormat::Jpg, OutputFormat::Webp]).await;
        let (status, json) = call(
            app,
            Request::delete("/api/qr/clear-history").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["deleted"], 3);
        assert_eq!(json["errors"], 0);
        assert_eq!(state.store().history(ADMIN_OWNER, 10, 0).await.unwrap().1, 0);
    }
}
