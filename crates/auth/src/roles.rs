use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Claims;

/// Claim keys that may carry the role indicator, in priority order.
///
/// Different issuers emit the namespaced claim, a singular `role`, or a
/// plural `roles`; the first one present wins.
pub const ROLE_CLAIM_KEYS: [&str; 3] = [
    "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
    "role",
    "roles",
];

/// Role identifier carried in session tokens.
///
/// Roles are opaque strings; the only hierarchy the client knows about is
/// the `User` < `Admin` < `SuperAdmin` convention, applied at check time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const USER: Role = Role(Cow::Borrowed("User"));
    pub const ADMIN: Role = Role(Cow::Borrowed("Admin"));
    pub const SUPER_ADMIN: Role = Role(Cow::Borrowed("SuperAdmin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::new(value.to_owned())
    }
}

/// Set of roles granted by the current session token.
///
/// Holds exactly what the token carried. Implied roles are never added;
/// use [`RoleSet::is_admin`] and friends for hierarchy checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<Role>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Role> {
        self.0.iter()
    }

    /// Literal membership, no hierarchy.
    pub fn has_role(&self, role: &str) -> bool {
        self.0.iter().any(|r| r.as_str() == role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SUPER_ADMIN.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::ADMIN.as_str()) || self.is_super_admin()
    }

    pub fn is_user(&self) -> bool {
        self.has_role(Role::USER.as_str()) || self.is_admin()
    }

    /// At least one of `required` is held literally (OR semantics).
    pub fn intersects(&self, required: &[Role]) -> bool {
        required.iter().any(|r| self.0.contains(r))
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a Role;
    type IntoIter = std::collections::btree_set::Iter<'a, Role>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Extract the role set from decoded claims.
///
/// The first key in [`ROLE_CLAIM_KEYS`] carrying a value wins, even when a
/// later key would carry more roles. A bare string becomes a one-element
/// set; non-string list entries are ignored.
pub fn extract_roles(claims: &Claims) -> RoleSet {
    let Some(value) = ROLE_CLAIM_KEYS
        .iter()
        .filter_map(|key| claims.get(key))
        .find(|value| !matches!(value, Value::String(s) if s.is_empty()))
    else {
        return RoleSet::new();
    };

    match value {
        Value::String(role) => std::iter::once(Role::from(role.as_str())).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(Role::from)
            .collect(),
        other => {
            tracing::debug!(kind = value_kind(other), "ignoring role claim of unexpected type");
            RoleSet::new()
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
