/// Factory: build the token verifier from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::access_jwt::{AccessJwtError, JwtVerifier, TokenVerifier};

pub fn build_verifier(config: &Config) -> Result<Arc<dyn TokenVerifier>, AccessJwtError> {
    let verifier = JwtVerifier::new(
        config.access_jwt_algorithm,
        &config.access_jwt_key,
        config.auth_issuer.as_deref(),
        config.auth_audience.as_deref(),
        config.access_token_leeway_seconds,
    )?;

    tracing::info!(
        algorithm = ?config.access_jwt_algorithm,
        issuer = ?config.auth_issuer,
        audience = ?config.auth_audience,
        "access token verifier ready"
    );

    Ok(Arc::new(verifier))
}
