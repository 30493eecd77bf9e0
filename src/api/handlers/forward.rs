/*
 * Responsibility
 * - access policy を通過したリクエストの受け口 (downstream への転送口)
 * - 実際の proxy / service discovery はこのサービスの対象外。ここでは通過した事実を返すだけ
 */
use axum::{
    Json,
    http::{Method, Uri},
};

use crate::api::dto::forward::ForwardedResponse;
use crate::api::extractors::AuthCtxExtractor;

pub async fn forward(
    method: Method,
    uri: Uri,
    auth: Option<AuthCtxExtractor>,
) -> Json<ForwardedResponse> {
    let (subject, authorities) = match auth {
        Some(AuthCtxExtractor(ctx)) => (ctx.subject, Some(ctx.authorities.to_strings())),
        None => (None, None),
    };

    tracing::debug!(%method, path = %uri.path(), ?subject, "request passed access policy");

    Json(ForwardedResponse {
        method: method.to_string(),
        path: uri.path().to_string(),
        authenticated: authorities.is_some(),
        subject,
        authorities: authorities.unwrap_or_default(),
    })
}
