//! CORS policy for browser clients.
//!
//! Note:
//! - CORS is enforced by browsers. Native mobile apps and server-to-server calls are not
//!   restricted by CORS.
//! - This middleware should be applied at the Router level, outside the access middleware,
//!   so preflight requests are answered before any token check.
//!
//! Policy (from `security.cors`, defaults in `CorsPolicy::default`):
//! - `*` in any list reflects the request's origin / method / headers back. A literal
//!   wildcard cannot be combined with credentials, reflection can.
//! - Origin patterns may contain `*`, e.g. `https://*.example.com`.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsPolicy;
use crate::services::policy::pattern::glob_match;

const WILDCARD: &str = "*";

pub fn apply(router: Router, policy: &CorsPolicy) -> Router {
    router.layer(layer(policy))
}

pub fn layer(policy: &CorsPolicy) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allow_origin(&policy.allowed_origin_patterns))
        .allow_methods(allow_methods(&policy.allowed_methods))
        .allow_headers(allow_headers(&policy.allowed_headers))
        .allow_credentials(policy.allow_credentials)
        .max_age(Duration::from_secs(60 * 10))
}

fn allow_origin(patterns: &[String]) -> AllowOrigin {
    if patterns.iter().any(|p| p == WILDCARD) {
        return AllowOrigin::mirror_request();
    }

    let patterns = patterns.to_vec();
    AllowOrigin::predicate(move |origin: &HeaderValue, _req| {
        origin
            .to_str()
            .map(|origin| patterns.iter().any(|p| glob_match(p, origin)))
            .unwrap_or(false)
    })
}

fn allow_methods(methods: &[String]) -> AllowMethods {
    if methods.iter().any(|m| m == WILDCARD) {
        return AllowMethods::mirror_request();
    }

    let methods: Vec<Method> = methods
        .iter()
        .filter_map(|m| match Method::from_bytes(m.trim().to_ascii_uppercase().as_bytes()) {
            Ok(method) => Some(method),
            Err(_) => {
                tracing::warn!(method = %m, "ignoring invalid CORS method");
                None
            }
        })
        .collect();
    AllowMethods::list(methods)
}

fn allow_headers(headers: &[String]) -> AllowHeaders {
    if headers.iter().any(|h| h == WILDCARD) {
        return AllowHeaders::mirror_request();
    }

    let headers: Vec<HeaderName> = headers
        .iter()
        .filter_map(|h| match HeaderName::from_bytes(h.trim().as_bytes()) {
            Ok(name) => Some(name),
            Err(_) => {
                tracing::warn!(header = %h, "ignoring invalid CORS header name");
                None
            }
        })
        .collect();
    AllowHeaders::list(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        routing::get,
    };
    use tower::ServiceExt;

    fn app(policy: &CorsPolicy) -> Router {
        apply(Router::new().route("/api/x", get(|| async { "ok" })), policy)
    }

    #[tokio::test]
    async fn default_policy_reflects_origin_with_credentials() {
        let resp = app(&CorsPolicy::default())
            .oneshot(
                Request::get("/api/x")
                    .header(header::ORIGIN, "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let h = resp.headers();
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn default_policy_answers_any_preflight() {
        let resp = app(&CorsPolicy::default())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/x")
                    .header(header::ORIGIN, "https://app.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization,x-custom")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        let h = resp.headers();
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://app.example.com");
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_METHODS], "PATCH");
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_HEADERS], "authorization,x-custom");
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn origin_patterns_restrict_reflection() {
        let policy = CorsPolicy {
            allowed_origin_patterns: vec!["https://*.example.com".to_string()],
            allowed_methods: vec!["get".to_string(), "POST".to_string()],
            allowed_headers: vec!["authorization".to_string()],
            allow_credentials: false,
        };

        let send = |origin: &'static str| {
            app(&policy).oneshot(
                Request::get("/api/x")
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
        };

        let resp = send("https://shop.example.com").await.unwrap();
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://shop.example.com"
        );
        assert!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .is_none()
        );

        let resp = send("https://evil.test").await.unwrap();
        assert!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }
}
