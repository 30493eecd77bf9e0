/*
 * Responsibility
 * - 環境変数の読み込み (PORT, APP_ENV, SECURITY_CONFIG_PATH, Auth 設定など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - security policy file の型は security.rs
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;

use crate::middleware::http::HttpLimits;

pub mod security;

pub use security::{CorsPolicy, SecurityProperties};

const DEFAULT_SECURITY_CONFIG_PATH: &str = "config/security.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        Self::parse(&std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()))
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
}

/// Key material used to verify access tokens.
#[derive(Clone)]
pub enum AccessJwtKey {
    /// RSA / EC / Ed25519 public key, PEM encoded.
    PublicKeyPem(String),
    /// Shared secret for the HMAC algorithms.
    HmacSecret(String),
}

impl fmt::Debug for AccessJwtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print key material
        match self {
            Self::PublicKeyPem(_) => f.write_str("PublicKeyPem(..)"),
            Self::HmacSecret(_) => f.write_str("HmacSecret(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub security_config_path: PathBuf,

    pub auth_issuer: Option<String>,
    pub auth_audience: Option<String>,
    pub access_token_leeway_seconds: u64,
    pub access_jwt_algorithm: Algorithm,
    pub access_jwt_key: AccessJwtKey,

    pub http: HttpLimits,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let security_config_path = std::env::var("SECURITY_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECURITY_CONFIG_PATH));

        let auth_issuer = non_empty_var("AUTH_ISSUER");
        let auth_audience = non_empty_var("AUTH_AUDIENCE");

        let access_token_leeway_seconds = std::env::var("ACCESS_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        let access_jwt_algorithm = parse_algorithm(
            &std::env::var("ACCESS_JWT_ALGORITHM").unwrap_or_else(|_| "RS256".to_string()),
        )?;

        let access_jwt_key = if is_hmac(access_jwt_algorithm) {
            AccessJwtKey::HmacSecret(
                std::env::var("ACCESS_JWT_HMAC_SECRET")
                    .map_err(|_| ConfigError::Missing("ACCESS_JWT_HMAC_SECRET"))?,
            )
        } else {
            AccessJwtKey::PublicKeyPem(
                std::env::var("ACCESS_JWT_PUBLIC_KEY_PEM")
                    .map_err(|_| ConfigError::Missing("ACCESS_JWT_PUBLIC_KEY_PEM"))?
                    .replace("\\n", "\n"),
            )
        };

        let defaults = HttpLimits::default();
        let http = HttpLimits {
            timeout: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            body_limit: std::env::var("REQUEST_BODY_LIMIT_BYTES")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .unwrap_or(defaults.body_limit),
        };

        Ok(Self {
            addr,
            app_env,
            security_config_path,
            auth_issuer,
            auth_audience,
            access_token_leeway_seconds,
            access_jwt_algorithm,
            access_jwt_key,
            http,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(
        algorithm,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    )
}

fn parse_algorithm(value: &str) -> Result<Algorithm, ConfigError> {
    Algorithm::from_str(value.trim()).map_err(|_| ConfigError::Invalid("ACCESS_JWT_ALGORITHM"))
}
