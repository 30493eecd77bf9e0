/*
 * Responsibility
 * - GET /actuator/health (疎通用)
 * - access policy の対象外ではない: 公開するには permit-all-paths に入れる
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
