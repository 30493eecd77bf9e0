/*
 * Responsibility
 * - gateway の URL 構造を定義
 * - /actuator/health 以外はすべて fallback (downstream への転送口) に流す
 * - access policy は app.rs で Router 全体 (fallback 含む) に掛ける
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::handlers::{forward::forward, health::health};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/actuator/health", get(health))
        .fallback(forward)
}
