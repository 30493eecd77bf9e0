//! access token 検証 → 認可判定 → AuthCtx を extensions に入れる
//!
//! Flow per request:
//! 1. request path を正規化 (`..`, `//`, `%2f` などは 400, policy には渡さない)
//! 2. take one `PolicyStore` snapshot (used for the whole request)
//! 3. permit-all path → pass through, no token needed
//! 4. `Authorization: Bearer <jwt>` を検証 (失敗は 401)
//! 5. realm roles → authorities, `decide` (Deny は 403, downstream には渡さない)
//! 6. Allow → `AuthCtx` を extensions に格納して next へ

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};
use serde_json::Value;

use crate::api::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::extract_authorities;
use crate::services::policy::canonical::canonicalize;
use crate::state::AppState;

/// Gate every route (and the fallback) of `router` behind the access policy.
///
/// Routes must be added before calling this; routes added afterwards are not covered.
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let path = match canonicalize(req.uri().path()) {
        Ok(path) => path,
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %req.uri().path(),
                "rejecting non-canonical request path"
            );
            return Err(AppError::BadRequestPath);
        }
    };
    let policy = state.policy.snapshot();

    if policy.is_public(&path) {
        tracing::debug!(path = %path, "permit-all path; skipping authentication");
        return Ok(next.run(req).await);
    }

    let token = bearer_token(req.headers()).ok_or_else(|| {
        tracing::debug!(path = %path, "missing bearer token");
        AppError::Unauthorized
    })?;

    let claims = match state.verifier.verify(token).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                error = %err,
                path = %path,
                "access token verification failed"
            );
            return Err(AppError::Unauthorized);
        }
    };

    let subject = claims
        .get("sub")
        .and_then(Value::as_str)
        .map(str::to_string);
    let authorities = extract_authorities(&claims);

    if !policy.decide(&path, &authorities).is_allowed() {
        tracing::warn!(
            path = %path,
            subject = ?subject,
            authorities = ?authorities.to_strings(),
            "access denied"
        );
        return Err(AppError::Forbidden);
    }

    // middleware → extractor への受け渡し
    req.extensions_mut()
        .insert(AuthCtx::new(subject, authorities));

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
