//! Authorization decision for one request.
//!
//! 0. non-canonical path (dot segments, `//`, encoded separators) → Deny
//! 1. permit-all match → Allow (no authority check)
//! 2. first role-based route match (configured order) → Allow iff the caller holds any of
//!    the route's authorities; a route without roles admits any authenticated caller
//! 3. nothing matched → Deny

use crate::services::auth::claims::Authorities;

use super::canonical::canonicalize;
use super::store::PolicyStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }
}

pub fn decide(store: &PolicyStore, path: &str, authorities: &Authorities) -> Decision {
    let path = match canonicalize(path) {
        Ok(path) => path,
        Err(err) => {
            tracing::debug!(path, error = %err, "non-canonical path; denying");
            return Decision::Deny;
        }
    };
    let path = path.as_str();

    if store.is_public(path) {
        tracing::debug!(path, "permit-all path");
        return Decision::Allow;
    }

    let Some(route) = store.first_route(path) else {
        tracing::debug!(path, "no rule matched; denying");
        return Decision::Deny;
    };

    let required = route.required_authorities();
    let decision = if required.is_empty() || authorities.intersects(required) {
        Decision::Allow
    } else {
        Decision::Deny
    };

    tracing::debug!(
        path,
        route = %route.pattern(),
        ?decision,
        "role-based route matched"
    );
    decision
}
