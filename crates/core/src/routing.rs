//! Route guard: decides whether a requested view renders or redirects
//!
//! [`guard`] is the single decision function; [`default_route_for`] is the
//! only place a role is mapped to its landing page. [`RouteTable`] carries the
//! application's route map and feeds the guard with each route's roles.

use crate::identity::Role;
use crate::state::AuthState;

/// The public login view
pub const LOGIN_PATH: &str = "/login";

/// Application root; always bounces to a landing page
pub const INDEX_PATH: &str = "/";

/// What to render when the guard lets a request through
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Session not resolved yet
    Loading,
    /// The requested view
    View(String),
}

/// Outcome of a guard evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Render(RenderTarget),
    RedirectTo(String),
}

impl Decision {
    fn view(path: &str) -> Self {
        Self::Render(RenderTarget::View(path.to_string()))
    }

    fn redirect(path: &str) -> Self {
        Self::RedirectTo(path.to_string())
    }
}

/// Landing page for a role
pub const fn default_route_for(role: Role) -> &'static str {
    match role {
        Role::Director => "/director",
        Role::Administrator => "/admin",
        Role::DepartmentHead => "/department",
        Role::Professor | Role::Student => "/student",
        Role::Unknown => LOGIN_PATH,
    }
}

/// Every view except the login page needs a session
pub fn requires_auth(path: &str) -> bool {
    path != LOGIN_PATH
}

/// Evaluate the guard for one request
pub fn guard(state: &AuthState, path: &str, required_roles: Option<&[Role]>) -> Decision {
    if state.loading {
        return Decision::Render(RenderTarget::Loading);
    }

    let Some(identity) = &state.identity else {
        return if requires_auth(path) {
            Decision::redirect(LOGIN_PATH)
        } else {
            Decision::view(path)
        };
    };

    let home = default_route_for(identity.role);

    if path == LOGIN_PATH {
        // A role without a landing page stays on the login view.
        return if home == LOGIN_PATH {
            Decision::view(path)
        } else {
            Decision::redirect(home)
        };
    }

    let forbidden = requires_auth(path)
        && required_roles.is_some_and(|roles| !identity.has_any_role(roles));
    if forbidden {
        return Decision::redirect(home);
    }

    Decision::view(path)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    path: String,
    roles: Vec<Role>,
}

/// Route map of the application with the roles allowed on each view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        use Role::{Administrator, DepartmentHead, Director};

        Self::new()
            .with_route("/director", &[Director])
            .with_route("/admin", &[Director, Administrator])
            .with_route("/department", &[Director, Administrator, DepartmentHead])
            .with_route("/student", &Role::ALL)
            .with_route("/examens", &Role::ALL)
            .with_route("/salles", &[Director, Administrator])
    }
}

impl RouteTable {
    /// Empty table; every path other than `/login` and `/` is unknown
    pub const fn new() -> Self {
        Self { routes: Vec::new() }
    }

    #[must_use]
    pub fn with_route(mut self, path: impl Into<String>, roles: &[Role]) -> Self {
        let path = path.into();
        self.routes.retain(|route| route.path != path);
        self.routes.push(Route {
            path,
            roles: roles.to_vec(),
        });
        self
    }

    /// Roles allowed on `path`, or `None` if the path is not routed
    pub fn required_roles(&self, path: &str) -> Option<&[Role]> {
        let path = normalize(path);
        self.routes
            .iter()
            .find(|route| route.path == path)
            .map(|route| route.roles.as_slice())
    }

    /// Resolve a navigation request against the table
    pub fn resolve(&self, state: &AuthState, path: &str) -> Decision {
        if state.loading {
            return Decision::Render(RenderTarget::Loading);
        }

        let path = normalize(path);
        if path == LOGIN_PATH {
            return guard(state, path, None);
        }
        if path == INDEX_PATH {
            return match state.role() {
                Some(role) => Decision::redirect(default_route_for(role)),
                None => Decision::redirect(LOGIN_PATH),
            };
        }

        match self.required_roles(path) {
            Some(roles) => guard(state, path, Some(roles)),
            None => Decision::redirect(LOGIN_PATH),
        }
    }
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { INDEX_PATH } else { trimmed }
}
