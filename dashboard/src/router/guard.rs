//! Route guards

use crate::model::role::Role;

/// Session state the guards decide on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionView {
    /// Role of the active session, `None` when signed out or lapsed
    pub role: Option<Role>,
    /// The last session lapsed
    pub expired: bool,
}

impl SessionView {
    pub fn signed_in(role: Role) -> Self {
        Self {
            role: Some(role),
            expired: false,
        }
    }

    pub fn expired() -> Self {
        Self {
            role: None,
            expired: true,
        }
    }
}

/// Route being activated
#[derive(Debug, Clone, Copy)]
pub struct RouteContext<'a> {
    /// Normalized path being navigated to
    pub path: &'a str,
    /// Role the route is reserved for
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(String),
}

impl Decision {
    pub fn redirect(path: impl Into<String>) -> Self {
        Self::Redirect(path.into())
    }
}

/// Check run before a guarded route is activated
///
/// Guards are chained, the first one redirecting wins.
pub trait Guard: Send + Sync {
    fn check(&self, route: &RouteContext, session: &SessionView) -> Decision;
}

/// Requires an authenticated session, with the route role if there is one
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthGuard;

impl Guard for AuthGuard {
    fn check(&self, route: &RouteContext, session: &SessionView) -> Decision {
        let Some(role) = session.role else {
            return if session.expired {
                Decision::redirect("/session-expired")
            } else {
                Decision::redirect("/login")
            };
        };

        match route.role {
            Some(required) if required != role => Decision::redirect("/unauthorized"),
            _ => Decision::Allow,
        }
    }
}

/// Runs the guards in order returning the first redirection
pub fn run_chain(guards: &[Box<dyn Guard>], route: &RouteContext, session: &SessionView) -> Decision {
    guards
        .iter()
        .map(|guard| guard.check(route, session))
        .find(|decision| *decision != Decision::Allow)
        .unwrap_or(Decision::Allow)
}
