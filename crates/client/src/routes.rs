//! Dashboard route table and navigator.
//!
//! Every page lives either in the public area (sign-in/sign-up) or under
//! the authenticated shell. A few shell pages additionally declare the roles
//! allowed to open them.

use std::collections::BTreeMap;

use serde::Serialize;

use capstock_auth::{GateOutcome, NavigationContext, NavigationPipeline, Role, SessionView};

const ADMINS: &[Role] = &[Role::ADMIN, Role::SUPER_ADMIN];
const SUPER_ADMINS: &[Role] = &[Role::SUPER_ADMIN];

/// Upper bound on redirects followed by [`Navigator::settle`].
pub const MAX_REDIRECTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteDef {
    /// Slash-separated pattern; `:name` segments capture a parameter.
    pub pattern: &'static str,
    pub title: &'static str,
    pub requires_auth: bool,
    #[serde(serialize_with = "serialize_roles")]
    pub roles: &'static [Role],
}

impl RouteDef {
    const fn public(pattern: &'static str, title: &'static str) -> Self {
        Self {
            pattern,
            title,
            requires_auth: false,
            roles: &[],
        }
    }

    const fn shell(pattern: &'static str, title: &'static str) -> Self {
        Self {
            pattern,
            title,
            requires_auth: true,
            roles: &[],
        }
    }

    const fn restricted(pattern: &'static str, title: &'static str, roles: &'static [Role]) -> Self {
        Self {
            pattern,
            title,
            requires_auth: true,
            roles,
        }
    }

    /// Gate context for navigating to `path` on this route.
    pub fn context(&self, path: &str) -> NavigationContext {
        NavigationContext {
            path: path.to_owned(),
            requires_auth: self.requires_auth,
            required_roles: self.roles.to_vec(),
        }
    }

    fn matches(&self, segments: &[&str]) -> Option<BTreeMap<String, String>> {
        let pattern: Vec<&str> = split(self.pattern);
        if pattern.len() != segments.len() {
            return None;
        }

        let mut params = BTreeMap::new();
        for (expected, actual) in pattern.iter().zip(segments) {
            match expected.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_owned(), (*actual).to_owned());
                }
                None if expected == actual => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn serialize_roles<S: serde::Serializer>(roles: &&'static [Role], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(roles.iter())
}

pub static ROUTES: &[RouteDef] = &[
    // Authenticated shell
    RouteDef::shell("", "Dashboard"),
    RouteDef::shell("calendar", "Calendar"),
    RouteDef::shell("profile", "Profile"),
    RouteDef::restricted("form-elements", "Form Elements", ADMINS),
    RouteDef::shell("basic-tables", "Basic Tables"),
    RouteDef::shell("blank", "Blank"),
    RouteDef::shell("invoice", "Invoice"),
    RouteDef::shell("line-chart", "Line Chart"),
    RouteDef::shell("bar-chart", "Bar Chart"),
    RouteDef::shell("alerts", "Alerts"),
    RouteDef::shell("avatars", "Avatars"),
    RouteDef::shell("badge", "Badges"),
    RouteDef::shell("buttons", "Buttons"),
    RouteDef::restricted("users", "Users Management", SUPER_ADMINS),
    RouteDef::shell("images", "Images"),
    RouteDef::shell("videos", "Videos"),
    RouteDef::shell("aturized-statuses", "Authorized Statuses"),
    RouteDef::shell("parck-display-groupes", "Park Display Groups"),
    RouteDef::shell("ewm-storage-bin-type", "Storage Bin Types"),
    RouteDef::shell("ewm-storage-bin-groupe", "Storage Bin Groups"),
    RouteDef::shell("ewm-storage-type", "Storage Types"),
    RouteDef::restricted("ewm-storage-bin-rules", "Storage Bin Rules", ADMINS),
    RouteDef::shell("storage-bins", "Storage Bins"),
    RouteDef::shell("storage-bin-details", "Storage Bin Details"),
    RouteDef::shell("handling-units", "Handling Units"),
    RouteDef::shell("stock-movements", "Stock Movements"),
    RouteDef::shell("groups", "Park Groups"),
    RouteDef::shell("group-form", "Park Group Form"),
    RouteDef::shell("group-form/:id", "Park Group Form"),
    RouteDef::shell("bins/:id", "Group Bins"),
    RouteDef::shell("bin-form/:groupId", "Add Bin"),
    RouteDef::shell("bin-form/:groupId/:binId", "Edit Bin"),
    RouteDef::shell("storage-bin-rules", "Storage Bin Rules"),
    RouteDef::shell("storage-type-rules", "Storage Type Rules"),
    RouteDef::shell("handling-unit/:id/transactions", "Handling Unit Transactions"),
    RouteDef::shell("work-centers", "Work Centers"),
    RouteDef::shell("characteristics", "Characteristics"),
    RouteDef::shell("classifications", "Classifications"),
    RouteDef::shell("control-models", "Control Models"),
    RouteDef::shell("materials", "Materials"),
    RouteDef::restricted("characteristic-assignments", "Characteristic Assignments", ADMINS),
    RouteDef::shell("event", "Events"),
    RouteDef::shell("boms", "Bills of Materials"),
    RouteDef::shell("routings", "Routings"),
    RouteDef::shell("production-versions", "Production Versions"),
    RouteDef::shell("product-orders", "Product Orders"),
    // Public
    RouteDef::public("signin", "Sign In"),
    RouteDef::public("signup", "Sign Up"),
];

/// A route matched against a concrete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteMatch {
    pub route: &'static RouteDef,
    pub params: BTreeMap<String, String>,
}

/// Resolve `path` against [`ROUTES`]. Query string and fragment are
/// ignored; the first matching route wins.
pub fn resolve(path: &str) -> Option<RouteMatch> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments = split(path);

    ROUTES.iter().find_map(|route| {
        route
            .matches(&segments)
            .map(|params| RouteMatch { route, params })
    })
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Outcome of one navigation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Navigation {
    Commit { path: String, matched: RouteMatch },
    Redirect { from: String, to: String },
    NotFound { path: String },
}

/// Evaluates navigation gates against the route table.
pub struct Navigator<S> {
    session: S,
    pipeline: NavigationPipeline,
}

impl<S: SessionView> Navigator<S> {
    /// Navigator with the standard authentication-then-role pipeline.
    pub fn new(session: S) -> Self {
        Self::with_pipeline(session, NavigationPipeline::standard())
    }

    pub fn with_pipeline(session: S, pipeline: NavigationPipeline) -> Self {
        Self { session, pipeline }
    }

    /// Decide a single navigation. Redirects are reported, not followed.
    pub fn navigate(&self, path: &str) -> Navigation {
        let Some(matched) = resolve(path) else {
            return Navigation::NotFound {
                path: path.to_owned(),
            };
        };

        let ctx = matched.route.context(path);
        match self.pipeline.evaluate(&self.session, &ctx) {
            GateOutcome::Allow => Navigation::Commit {
                path: path.to_owned(),
                matched,
            },
            GateOutcome::Redirect(to) => Navigation::Redirect {
                from: path.to_owned(),
                to,
            },
        }
    }

    /// Follow redirects until a navigation commits, fails, or
    /// [`MAX_REDIRECTS`] is reached (the last redirect is returned then).
    pub fn settle(&self, path: &str) -> Navigation {
        let mut outcome = self.navigate(path);
        for _ in 0..MAX_REDIRECTS {
            let Navigation::Redirect { to, .. } = &outcome else {
                break;
            };
            let next = self.navigate(to);
            outcome = next;
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capstock_auth::RoleSet;

    struct FakeSession {
        authenticated: bool,
        roles: Vec<&'static str>,
    }

    impl SessionView for FakeSession {
        fn token(&self) -> Option<String> {
            None
        }

        fn is_authenticated(&self) -> bool {
            self.authenticated
        }

        fn roles(&self) -> RoleSet {
            self.roles.iter().map(|r| Role::from(*r)).collect()
        }
    }

    fn navigator(authenticated: bool, roles: &[&'static str]) -> Navigator<FakeSession> {
        Navigator::new(FakeSession {
            authenticated,
            roles: roles.to_vec(),
        })
    }

    #[test]
    fn resolves_parameterized_routes() {
        let m = resolve("/bin-form/12/34?tab=rules").unwrap();
        assert_eq!(m.route.pattern, "bin-form/:groupId/:binId");
        assert_eq!(m.params.get("groupId").map(String::as_str), Some("12"));
        assert_eq!(m.params.get("binId").map(String::as_str), Some("34"));
    }

    #[test]
    fn root_resolves_to_dashboard() {
        assert_eq!(resolve("/").unwrap().route.title, "Dashboard");
        assert_eq!(resolve("").unwrap().route.title, "Dashboard");
    }

    #[test]
    fn unknown_path_is_not_found() {
        assert_eq!(
            navigator(true, &[]).navigate("/nowhere"),
            Navigation::NotFound {
                path: "/nowhere".into()
            }
        );
    }

    #[test]
    fn signed_out_user_is_sent_to_sign_in() {
        let nav = navigator(false, &[]).navigate("/stock-movements");
        assert_eq!(
            nav,
            Navigation::Redirect {
                from: "/stock-movements".into(),
                to: "/signin".into()
            }
        );
    }

    #[test]
    fn admin_cannot_open_user_management() {
        let nav = navigator(true, &["Admin"]).navigate("/users");
        assert_eq!(
            nav,
            Navigation::Redirect {
                from: "/users".into(),
                to: "/".into()
            }
        );
    }

    #[test]
    fn super_admin_opens_admin_pages() {
        let nav = navigator(true, &["SuperAdmin"]).navigate("/ewm-storage-bin-rules");
        assert!(matches!(nav, Navigation::Commit { .. }));
    }

    #[test]
    fn settle_lands_on_sign_in_page() {
        let nav = navigator(false, &[]).settle("/users");
        let Navigation::Commit { matched, .. } = nav else {
            panic!("expected commit, got {nav:?}");
        };
        assert_eq!(matched.route.pattern, "signin");
    }

    #[test]
    fn settle_lands_on_dashboard_when_under_privileged() {
        let nav = navigator(true, &["User"]).settle("/characteristic-assignments");
        let Navigation::Commit { path, matched } = nav else {
            panic!("expected commit, got {nav:?}");
        };
        assert_eq!(path, "/");
        assert_eq!(matched.route.title, "Dashboard");
    }
}
