//! Navigation gates.
//!
//! Gates are plain functions over a [`NavigationContext`]. A
//! [`NavigationPipeline`] threads them in order before a navigation commits;
//! the first gate that does not allow decides the outcome. Denial is a
//! redirect value, never an error.

use serde::Serialize;

use crate::{Role, SessionView};

/// Where unauthenticated navigation is sent.
pub const SIGN_IN_ROUTE: &str = "/signin";

/// Where authenticated but under-privileged navigation is sent.
pub const HOME_ROUTE: &str = "/";

/// The navigation being attempted, with the target route's declared guards.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NavigationContext {
    pub path: String,
    /// Target lives under the authenticated shell.
    pub requires_auth: bool,
    /// Any one of these roles grants access. Empty means no role restriction.
    pub required_roles: Vec<Role>,
}

impl NavigationContext {
    pub fn public(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requires_auth: false,
            required_roles: Vec::new(),
        }
    }

    pub fn protected(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            requires_auth: true,
            required_roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.required_roles = roles.into_iter().collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "to", rename_all = "snake_case")]
pub enum GateOutcome {
    Allow,
    Redirect(String),
}

impl GateOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateOutcome::Allow)
    }

    fn redirect(to: &str) -> Self {
        GateOutcome::Redirect(to.to_owned())
    }
}

/// A pre-commit navigation stage.
pub type Gate = fn(&dyn SessionView, &NavigationContext) -> GateOutcome;

/// Allow iff the session is authenticated; otherwise send to sign-in.
///
/// Routes outside the authenticated shell pass untouched.
pub fn authentication_gate(session: &dyn SessionView, ctx: &NavigationContext) -> GateOutcome {
    if !ctx.requires_auth || session.is_authenticated() {
        return GateOutcome::Allow;
    }

    tracing::info!(path = %ctx.path, "navigation denied: not signed in");
    GateOutcome::redirect(SIGN_IN_ROUTE)
}

/// Allow iff the current roles intersect the route's required roles;
/// otherwise send home.
///
/// Matching is literal: a route requiring `Admin` does not admit a token
/// that only carries `SuperAdmin`, so routes list every role they accept.
pub fn role_gate(session: &dyn SessionView, ctx: &NavigationContext) -> GateOutcome {
    if ctx.required_roles.is_empty() {
        return GateOutcome::Allow;
    }

    let roles = session.roles();
    if roles.intersects(&ctx.required_roles) {
        return GateOutcome::Allow;
    }

    tracing::info!(
        path = %ctx.path,
        required = ?ctx.required_roles,
        held = ?roles,
        "navigation denied: missing role"
    );
    GateOutcome::redirect(HOME_ROUTE)
}

/// Ordered list of gates evaluated before a navigation commits.
#[derive(Debug, Clone, Default)]
pub struct NavigationPipeline {
    gates: Vec<Gate>,
}

impl NavigationPipeline {
    /// Empty pipeline; allows everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Authentication gate (shell level) followed by role gate (route level).
    pub fn standard() -> Self {
        Self::new().with_gate(authentication_gate).with_gate(role_gate)
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gates.push(gate);
        self
    }

    pub fn evaluate(&self, session: &dyn SessionView, ctx: &NavigationContext) -> GateOutcome {
        for gate in &self.gates {
            let outcome = gate(session, ctx);
            if !outcome.is_allowed() {
                return outcome;
            }
        }
        GateOutcome::Allow
    }
}
