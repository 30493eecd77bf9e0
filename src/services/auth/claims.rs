//! Token claims → granted authorities.
//!
//! Roles live under the realm-level claim group:
//!
//! ```json
//! { "realm_access": { "roles": ["ADMIN", "USER"] } }
//! ```
//!
//! Each role name becomes an authority `ROLE_<name>`. Any other claim shape
//! (missing group, group not an object, `roles` missing or not an array) yields
//! no authorities. Extraction never fails.

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;

/// Claim set of an already-verified token.
pub type ClaimMap = serde_json::Map<String, Value>;

pub const ROLE_PREFIX: &str = "ROLE_";

const REALM_ACCESS_CLAIM: &str = "realm_access";
const ROLES_CLAIM: &str = "roles";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Authority(String);

impl Authority {
    pub fn from_role(role: &str) -> Self {
        Self(format!("{ROLE_PREFIX}{role}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Set of authorities held by one caller. Iterates in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Authorities(BTreeSet<Authority>);

impl Authorities {
    pub fn from_roles<'a>(roles: impl IntoIterator<Item = &'a str>) -> Self {
        roles.into_iter().map(Authority::from_role).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// At least one authority in common.
    pub fn intersects(&self, other: &Authorities) -> bool {
        !self.0.is_disjoint(&other.0)
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|a| a.as_str().to_string()).collect()
    }
}

impl FromIterator<Authority> for Authorities {
    fn from_iter<I: IntoIterator<Item = Authority>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Raw role names under `realm_access.roles`. Non-string entries are skipped.
pub fn realm_roles(claims: &ClaimMap) -> Vec<&str> {
    claims
        .get(REALM_ACCESS_CLAIM)
        .and_then(Value::as_object)
        .and_then(|realm| realm.get(ROLES_CLAIM))
        .and_then(Value::as_array)
        .map(|roles| roles.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

pub fn extract_authorities(claims: &ClaimMap) -> Authorities {
    let roles = realm_roles(claims);
    tracing::debug!(?roles, "roles extracted from token claims");
    Authorities::from_roles(roles)
}
