use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde_json::Value;
use thiserror::Error;

use crate::config::{AccessJwtKey, is_hmac};
use crate::services::auth::claims::ClaimMap;

// Errors returned by access-token verification + strict claim validation.
#[derive(Debug, Error)]
pub enum AccessJwtError {
    #[error("jwt verification failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("invalid verification key: {0}")]
    Key(String),
    #[error("empty '{0}' claim")]
    EmptyClaim(&'static str),
}

/// Turns a raw bearer token into a verified claim set.
///
/// Signature, expiry and issuer/audience checks all happen here; callers only ever
/// see claims that passed them.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<ClaimMap, AccessJwtError>;
}

/// `jsonwebtoken`-backed verifier (RS*/PS*/ES*/EdDSA with a PEM public key, HS* with a secret).
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtVerifier")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtVerifier {
    pub fn new(
        algorithm: Algorithm,
        key: &AccessJwtKey,
        issuer: Option<&str>,
        audience: Option<&str>,
        leeway_seconds: u64,
    ) -> Result<Self, AccessJwtError> {
        let decoding_key = decoding_key(algorithm, key)?;

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            // Keycloak always sends `aud`; without an expected value it cannot be checked.
            None => validation.validate_aud = false,
        }
        validation.leeway = leeway_seconds;

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verify and decode a JWT access token.
    pub fn verify_token(&self, token: &str) -> Result<ClaimMap, AccessJwtError> {
        let data = jsonwebtoken::decode::<ClaimMap>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        // `sub` is optional for service accounts, but if present it must be meaningful.
        if let Some(Value::String(sub)) = claims.get("sub") {
            if sub.trim().is_empty() {
                return Err(AccessJwtError::EmptyClaim("sub"));
            }
        }

        Ok(claims)
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<ClaimMap, AccessJwtError> {
        self.verify_token(token)
    }
}

fn decoding_key(algorithm: Algorithm, key: &AccessJwtKey) -> Result<DecodingKey, AccessJwtError> {
    let pem_err = |e: jsonwebtoken::errors::Error| AccessJwtError::Key(e.to_string());

    match (key, algorithm) {
        (AccessJwtKey::HmacSecret(secret), alg) if is_hmac(alg) => {
            if secret.is_empty() {
                return Err(AccessJwtError::Key("empty hmac secret".to_string()));
            }
            Ok(DecodingKey::from_secret(secret.as_bytes()))
        }
        (AccessJwtKey::PublicKeyPem(pem), Algorithm::RS256)
        | (AccessJwtKey::PublicKeyPem(pem), Algorithm::RS384)
        | (AccessJwtKey::PublicKeyPem(pem), Algorithm::RS512)
        | (AccessJwtKey::PublicKeyPem(pem), Algorithm::PS256)
        | (AccessJwtKey::PublicKeyPem(pem), Algorithm::PS384)
        | (AccessJwtKey::PublicKeyPem(pem), Algorithm::PS512) => {
            DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(pem_err)
        }
        (AccessJwtKey::PublicKeyPem(pem), Algorithm::ES256)
        | (AccessJwtKey::PublicKeyPem(pem), Algorithm::ES384) => {
            DecodingKey::from_ec_pem(pem.as_bytes()).map_err(pem_err)
        }
        (AccessJwtKey::PublicKeyPem(pem), Algorithm::EdDSA) => {
            DecodingKey::from_ed_pem(pem.as_bytes()).map_err(pem_err)
        }
        (_, alg) => Err(AccessJwtError::Key(format!(
            "key type does not match algorithm {alg:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &str = "test-only-hmac-secret-0123456789abcdef";

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn sign(claims: Value, secret: &str) -> String {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn verifier(issuer: Option<&str>, audience: Option<&str>) -> JwtVerifier {
        JwtVerifier::new(
            Algorithm::HS256,
            &AccessJwtKey::HmacSecret(SECRET.to_string()),
            issuer,
            audience,
            0,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn verifies_and_returns_all_claims() {
        let token = sign(
            json!({
                "sub": "user-1",
                "exp": now() + 600,
                "aud": "account",
                "realm_access": { "roles": ["ADMIN"] }
            }),
            SECRET,
        );

        let claims = verifier(None, None).verify(&token).await.unwrap();

        assert_eq!(claims["sub"], "user-1");
        assert_eq!(claims["realm_access"]["roles"][0], "ADMIN");
    }

    #[test]
    fn rejects_wrong_signature() {
        let token = sign(json!({ "sub": "u", "exp": now() + 600 }), "another-secret-entirely");
        assert!(matches!(
            verifier(None, None).verify_token(&token),
            Err(AccessJwtError::Jwt(_))
        ));
    }

    #[test]
    fn rejects_expired_token() {
        let token = sign(json!({ "sub": "u", "exp": now() - 3600 }), SECRET);
        assert!(verifier(None, None).verify_token(&token).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(verifier(None, None).verify_token("not-a-jwt").is_err());
    }

    #[test]
    fn checks_issuer_and_audience_when_configured() {
        let v = verifier(Some("https://idp/realms/finwise"), Some("gateway"));

        let good = sign(
            json!({ "sub": "u", "exp": now() + 600, "iss": "https://idp/realms/finwise", "aud": "gateway" }),
            SECRET,
        );
        assert!(v.verify_token(&good).is_ok());

        let wrong_iss = sign(
            json!({ "sub": "u", "exp": now() + 600, "iss": "https://evil", "aud": "gateway" }),
            SECRET,
        );
        assert!(v.verify_token(&wrong_iss).is_err());

        let wrong_aud = sign(
            json!({ "sub": "u", "exp": now() + 600, "iss": "https://idp/realms/finwise", "aud": "other" }),
            SECRET,
        );
        assert!(v.verify_token(&wrong_aud).is_err());
    }

    #[test]
    fn rejects_blank_subject() {
        let token = sign(json!({ "sub": "  ", "exp": now() + 600 }), SECRET);
        assert!(matches!(
            verifier(None, None).verify_token(&token),
            Err(AccessJwtError::EmptyClaim("sub"))
        ));
    }

    #[test]
    fn key_must_fit_algorithm() {
        let err = JwtVerifier::new(
            Algorithm::RS256,
            &AccessJwtKey::HmacSecret(SECRET.to_string()),
            None,
            None,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, AccessJwtError::Key(_)));

        let err = JwtVerifier::new(
            Algorithm::RS256,
            &AccessJwtKey::PublicKeyPem("not a pem".to_string()),
            None,
            None,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, AccessJwtError::Key(_)));
    }

    #[test]
    fn debug_hides_key() {
        let v = verifier(None, None);
        assert!(!format!("{v:?}").contains(SECRET));
    }
}
