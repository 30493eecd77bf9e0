/*
 * Responsibility
 * - Security policy file (YAML) の読み込み
 * - null / 未指定のリストは空リストとして扱う (起動時に正規化)
 * - パターンの検証は services::policy 側 (PolicyStore::from_properties)
 */
use std::path::Path;

use serde::{Deserialize, Deserializer};

use super::ConfigError;

/// Root of the security file:
///
/// ```yaml
/// security:
///   permit-all-paths: ["/actuator/**"]
///   role-based-routes:
///     - path: "/api/admin/**"
///       roles: ["ADMIN"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
struct SecurityFile {
    #[serde(default, deserialize_with = "null_as_default")]
    security: SecurityProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SecurityProperties {
    #[serde(default, deserialize_with = "null_as_default")]
    pub permit_all_paths: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub role_based_routes: Vec<RoleBasedRouteProperties>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub cors: CorsPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RoleBasedRouteProperties {
    #[serde(default, deserialize_with = "null_as_default")]
    pub path: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: Vec<String>,
}

/// Response-header CORS policy, identical for every path.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CorsPolicy {
    #[serde(deserialize_with = "null_as_default")]
    pub allowed_origin_patterns: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub allowed_methods: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
}

impl Default for CorsPolicy {
    fn default() -> Self {
        Self {
            allowed_origin_patterns: vec!["*".to_string()],
            allowed_methods: vec!["*".to_string()],
            allowed_headers: vec!["*".to_string()],
            allow_credentials: true,
        }
    }
}

impl SecurityProperties {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: SecurityFile = serde_yaml::from_str(content)?;
        Ok(file.security)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_security_file() {
        let yaml = r#"
security:
  permit-all-paths:
    - "/actuator/**"
    - "/swagger-ui/**"
    - "/v3/api-docs/**"
  role-based-routes:
    - path: "/api/admin/**"
      roles: ["ADMIN"]
    - path: "/api/user/**"
      roles: ["USER", "ADMIN"]
"#;
        let props = SecurityProperties::from_yaml(yaml).unwrap();

        assert_eq!(
            props.permit_all_paths,
            vec!["/actuator/**", "/swagger-ui/**", "/v3/api-docs/**"]
        );
        assert_eq!(props.role_based_routes.len(), 2);
        assert_eq!(props.role_based_routes[1].path, "/api/user/**");
        assert_eq!(props.role_based_routes[1].roles, vec!["USER", "ADMIN"]);
        assert_eq!(props.cors, CorsPolicy::default());
    }

    #[test]
    fn null_and_missing_lists_become_empty() {
        let yaml = r#"
security:
  permit-all-paths: ~
  role-based-routes:
    - path: "/api/any/**"
      roles: ~
    - path: "/api/other/**"
"#;
        let props = SecurityProperties::from_yaml(yaml).unwrap();

        assert!(props.permit_all_paths.is_empty());
        assert!(props.role_based_routes[0].roles.is_empty());
        assert!(props.role_based_routes[1].roles.is_empty());

        let props = SecurityProperties::from_yaml("security: ~").unwrap();
        assert_eq!(props, SecurityProperties::default());

        let props = SecurityProperties::from_yaml("").unwrap();
        assert_eq!(props, SecurityProperties::default());
    }

    #[test]
    fn cors_section_overrides_defaults() {
        let yaml = r#"
security:
  cors:
    allowed-origin-patterns: ["https://*.example.com"]
    allowed-methods: ["GET", "POST"]
    allow-credentials: false
"#;
        let cors = SecurityProperties::from_yaml(yaml).unwrap().cors;

        assert_eq!(cors.allowed_origin_patterns, vec!["https://*.example.com"]);
        assert_eq!(cors.allowed_methods, vec!["GET", "POST"]);
        // unspecified fields keep the permissive default
        assert_eq!(cors.allowed_headers, vec!["*"]);
        assert!(!cors.allow_credentials);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        assert!(SecurityProperties::from_yaml("security: [unclosed").is_err());
        assert!(SecurityProperties::from_yaml("security:\n  permit-all-paths: 3").is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = SecurityProperties::load("/definitely/not/here/security.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
