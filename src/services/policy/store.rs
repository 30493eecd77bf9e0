//! Validated, read-only access policy.
//!
//! Built once from [`SecurityProperties`]; every pattern is compiled up front so a bad
//! pattern stops startup instead of surfacing per request. The store owns copies of all
//! configured data and exposes no mutation.

use thiserror::Error;

use crate::config::SecurityProperties;
use crate::services::auth::claims::Authorities;

use super::canonical::canonicalize;
use super::decision::{self, Decision};
use super::pattern::{PathPattern, PatternError};

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("permit-all-paths[{index}]: {source}")]
    InvalidPermitAllPath { index: usize, source: PatternError },
    #[error("role-based-routes[{index}].path is empty")]
    EmptyRoutePath { index: usize },
    #[error("role-based-routes[{index}].path: {source}")]
    InvalidRoutePath { index: usize, source: PatternError },
}

/// A path pattern and the raw role names allowed through it.
#[derive(Debug, Clone)]
pub struct RoleBasedRoute {
    pattern: PathPattern,
    roles: Vec<String>,
    required: Authorities,
}

impl RoleBasedRoute {
    pub fn new(pattern: PathPattern, roles: Vec<String>) -> Self {
        let required = Authorities::from_roles(roles.iter().map(String::as_str));
        Self {
            pattern,
            roles,
            required,
        }
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// `ROLE_`-prefixed form of [`Self::roles`].
    pub fn required_authorities(&self) -> &Authorities {
        &self.required
    }

    pub fn matches(&self, path: &str) -> bool {
        self.pattern.matches(path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PolicyStore {
    permit_all: Vec<PathPattern>,
    routes: Vec<RoleBasedRoute>,
}

impl PolicyStore {
    pub fn new(permit_all: Vec<PathPattern>, routes: Vec<RoleBasedRoute>) -> Self {
        let store = Self { permit_all, routes };
        store.warn_shadowed_routes();
        store
    }

    pub fn from_properties(props: &SecurityProperties) -> Result<Self, PolicyError> {
        let permit_all = props
            .permit_all_paths
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                PathPattern::parse(raw)
                    .map_err(|source| PolicyError::InvalidPermitAllPath { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let routes = props
            .role_based_routes
            .iter()
            .enumerate()
            .map(|(index, route)| {
                if route.path.trim().is_empty() {
                    return Err(PolicyError::EmptyRoutePath { index });
                }
                let pattern = PathPattern::parse(&route.path)
                    .map_err(|source| PolicyError::InvalidRoutePath { index, source })?;
                Ok(RoleBasedRoute::new(pattern, route.roles.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(permit_all, routes))
    }

    pub fn permit_all(&self) -> &[PathPattern] {
        &self.permit_all
    }

    pub fn routes(&self) -> &[RoleBasedRoute] {
        &self.routes
    }

    /// A non-canonical `path` is never public.
    pub fn is_public(&self, path: &str) -> bool {
        let Ok(path) = canonicalize(path) else {
            return false;
        };
        self.permit_all.iter().any(|p| p.matches(&path))
    }

    /// First route in configured order whose pattern matches `path`. None for a
    /// non-canonical `path`.
    pub fn first_route(&self, path: &str) -> Option<&RoleBasedRoute> {
        let path = canonicalize(path).ok()?;
        self.routes.iter().find(|r| r.matches(&path))
    }

    pub fn decide(&self, path: &str, authorities: &Authorities) -> Decision {
        decision::decide(self, path, authorities)
    }

    /// Order is never changed; a route listed after a broader one is only reported.
    fn warn_shadowed_routes(&self) {
        for (i, route) in self.routes.iter().enumerate() {
            if let Some(public) = self.permit_all.iter().find(|p| p.covers(route.pattern())) {
                tracing::warn!(
                    route = %route.pattern(),
                    permit_all = %public,
                    "role-based route is shadowed by a permit-all path"
                );
                continue;
            }
            if let Some(earlier) = self.routes[..i]
                .iter()
                .find(|e| e.pattern().covers(route.pattern()))
            {
                tracing::warn!(
                    route = %route.pattern(),
                    shadowed_by = %earlier.pattern(),
                    "role-based route is never reached; an earlier route matches first"
                );
            }
        }
    }
}
