//! Role-gated routing
//!
//! The route table mirrors the dashboard sections. Navigating resolves the path against the
//! table, follows static redirects, runs the guard chain on every guarded route of the match
//! (parents first), and follows guard redirects until a view can be activated.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, instrument};

pub mod guard;

use guard::{AuthGuard, Decision, Guard, RouteContext, SessionView};

use crate::auth::AuthService;
use crate::model::role::Role;
use crate::state::{Subject, Subscription};

/// Maximum redirections followed by a single navigation
const MAX_HOPS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("Too many redirections navigating to {0}")]
    TooManyRedirects(String),
    #[error("No route matches {0}")]
    NoMatch(String),
    #[error("Cannot redirect to a role dashboard without a session")]
    NoSession,
}

/// Views the dashboard can show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    Login,
    InternDashboard,
    InternHome,
    InternProfile,
    InternPerformance,
    InternTraining,
    InternMessages,
    SpocDashboard,
    SpocHome,
    SpocInterns,
    SpocInternDetail,
    SpocReports,
    SpocFeedback,
    ManagerDashboard,
    ManagerHome,
    ManagerSpocs,
    ManagerInterns,
    ManagerAnalytics,
    ManagerReports,
    ManagerSystemConfig,
    SessionExpired,
    Unauthorized,
    NotFound,
}

/// What a route activates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    View(View),
    /// Redirection, relative to the parent route unless starting with `/`
    Redirect(&'static str),
    /// Redirection to the dashboard of the session role
    RoleRedirect,
}

#[derive(Debug, Clone)]
pub struct Route {
    /// Path pattern relative to the parent, `:name` segments capture parameters, `**` matches
    /// anything
    pub path: &'static str,
    pub target: Target,
    /// Role the route is reserved for
    pub role: Option<Role>,
    /// Route is checked by the guard chain
    pub guarded: bool,
    pub children: Vec<Route>,
}

impl Route {
    fn view(path: &'static str, view: View) -> Self {
        Self {
            path,
            target: Target::View(view),
            role: None,
            guarded: false,
            children: vec![],
        }
    }

    fn redirect(path: &'static str, to: &'static str) -> Self {
        Self {
            target: Target::Redirect(to),
            ..Self::view(path, View::NotFound)
        }
    }

    fn guarded(mut self, role: Option<Role>) -> Self {
        self.guarded = true;
        self.role = role;
        self
    }

    fn with_children(mut self, children: Vec<Route>) -> Self {
        self.children = children;
        self
    }

    /// Dashboard of a role, all its sections guarded with the role
    fn dashboard(
        path: &'static str,
        layout: View,
        role: Role,
        sections: &[(&'static str, View)],
    ) -> Self {
        let children = std::iter::once(Self::redirect("", "home"))
            .chain(
                sections
                    .iter()
                    .map(|&(path, view)| Self::view(path, view).guarded(Some(role))),
            )
            .collect();

        Self::view(path, layout)
            .guarded(Some(role))
            .with_children(children)
    }
}

/// Dashboard route table
pub fn routes() -> Vec<Route> {
    vec![
        Route::redirect("", "/login"),
        Route::view("login", View::Login),
        Route::dashboard(
            "intern-dashboard",
            View::InternDashboard,
            Role::Intern,
            &[
                ("home", View::InternHome),
                ("profile", View::InternProfile),
                ("performance", View::InternPerformance),
                ("training", View::InternTraining),
                ("messages", View::InternMessages),
            ],
        ),
        Route::dashboard(
            "spoc-dashboard",
            View::SpocDashboard,
            Role::Spoc,
            &[
                ("home", View::SpocHome),
                ("interns", View::SpocInterns),
                ("interns/:id", View::SpocInternDetail),
                ("reports", View::SpocReports),
                ("feedback", View::SpocFeedback),
            ],
        ),
        Route::dashboard(
            "manager-dashboard",
            View::ManagerDashboard,
            Role::Manager,
            &[
                ("home", View::ManagerHome),
                ("spocs", View::ManagerSpocs),
                ("interns", View::ManagerInterns),
                ("analytics", View::ManagerAnalytics),
                ("reports", View::ManagerReports),
                ("system-config", View::ManagerSystemConfig),
            ],
        ),
        Route {
            target: Target::RoleRedirect,
            ..Route::view("redirect", View::NotFound).guarded(None)
        },
        Route::view("session-expired", View::SessionExpired),
        Route::view("unauthorized", View::Unauthorized),
        Route::view("not-found", View::NotFound),
        Route::redirect("**", "/not-found"),
    ]
}

/// Activated route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    /// Normalized path finally activated
    pub path: String,
    pub view: View,
    /// View of the parent route, hosting `view`
    pub layout: Option<View>,
    pub params: HashMap<String, String>,
}

impl Navigation {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Splits the path into its segments, ignoring the query, fragment and empty segments
fn segments(path: &str) -> Vec<&str> {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    path[..end]
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn join(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

/// Result of matching the path against the table
struct Match<'r, 's> {
    /// Matched routes, from the top level down
    chain: Vec<&'r Route>,
    /// Segments consumed by every route of the chain
    consumed: Vec<usize>,
    params: HashMap<String, String>,
    segments: Vec<&'s str>,
}

fn match_route<'r, 's>(
    routes: &'r [Route],
    segments: &[&'s str],
    offset: usize,
    m: &mut Match<'r, 's>,
) -> bool {
    for route in routes {
        let remaining = &segments[offset..];

        if route.path == "**" {
            m.chain.push(route);
            m.consumed.push(remaining.len());
            return true;
        }

        let pattern = self::segments(route.path);
        if pattern.len() > remaining.len() {
            continue;
        }

        let mut params = HashMap::new();
        let matches = pattern.iter().zip(remaining).all(|(pattern, segment)| {
            match pattern.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_owned(), (*segment).to_owned());
                    true
                }
                None => pattern == segment,
            }
        });
        if !matches {
            continue;
        }

        let offset = offset + pattern.len();
        m.chain.push(route);
        m.consumed.push(pattern.len());

        let matched = if route.children.is_empty() {
            offset == segments.len()
        } else {
            match_route(&route.children, segments, offset, m)
        };

        if matched {
            m.params.extend(params);
            return true;
        }

        m.chain.pop();
        m.consumed.pop();
    }

    false
}

pub struct Router {
    routes: Vec<Route>,
    guards: Vec<Box<dyn Guard>>,
    auth: AuthService,
    location: Subject<Option<Navigation>>,
}

impl Router {
    /// Router over the dashboard table guarded by the `AuthGuard`
    pub fn new(auth: AuthService) -> Self {
        Self {
            routes: routes(),
            guards: vec![Box::new(AuthGuard)],
            auth,
            location: Subject::new(None),
        }
    }

    /// Appends the guard to the chain
    pub fn with_guard(mut self, guard: impl Guard + 'static) -> Self {
        self.guards.push(Box::new(guard));
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Navigates to the path with the current session
    ///
    /// The activated navigation is published to `location()` subscribers.
    #[instrument(skip(self))]
    pub async fn navigate(&self, path: &str) -> Result<Navigation, RouterError> {
        let session = self.auth.snapshot().await;
        let navigation = self.resolve(path, &session)?;
        debug!(path = %navigation.path, view = ?navigation.view, "Navigated");
        self.location.set(Some(navigation.clone())).await;
        Ok(navigation)
    }

    /// Stream of the activated navigations
    pub async fn location(&self) -> Subscription<Option<Navigation>> {
        self.location.subscribe().await
    }

    /// Resolves the path for the given session without navigating
    pub fn resolve(&self, path: &str, session: &SessionView) -> Result<Navigation, RouterError> {
        let mut path = join(&segments(path));

        for _ in 0..MAX_HOPS {
            match self.step(&path, session)? {
                Step::Activate(navigation) => return Ok(navigation),
                Step::Redirect(next) => {
                    debug!(from = %path, to = %next, "Redirecting");
                    path = next;
                }
            }
        }

        Err(RouterError::TooManyRedirects(path))
    }

    fn step(&self, path: &str, session: &SessionView) -> Result<Step, RouterError> {
        let segments = segments(path);
        let mut m = Match {
            chain: vec![],
            consumed: vec![],
            params: HashMap::new(),
            segments: segments.clone(),
        };

        if !match_route(&self.routes, &segments, 0, &mut m) {
            return Err(RouterError::NoMatch(path.to_owned()));
        }

        let leaf = m.chain.len() - 1;
        match m.chain[leaf].target {
            Target::Redirect(to) => {
                let next = if to.starts_with('/') {
                    to.to_owned()
                } else {
                    let parent: usize = m.consumed[..leaf].iter().sum();
                    let mut next = m.segments[..parent].to_vec();
                    next.push(to);
                    join(&next)
                };
                return Ok(Step::Redirect(join(&self::segments(&next))));
            }
            Target::RoleRedirect | Target::View(_) => (),
        }

        for route in m.chain.iter().filter(|route| route.guarded) {
            let context = RouteContext {
                path,
                role: route.role,
            };
            if let Decision::Redirect(to) = guard::run_chain(&self.guards, &context, session) {
                return Ok(Step::Redirect(to));
            }
        }

        let view = match m.chain[leaf].target {
            Target::View(view) => view,
            Target::RoleRedirect => {
                let role = session.role.ok_or(RouterError::NoSession)?;
                return Ok(Step::Redirect(role.dashboard().to_owned()));
            }
            Target::Redirect(_) => unreachable!("redirections are followed before guarding"),
        };

        let layout = leaf
            .checked_sub(1)
            .and_then(|parent| match m.chain[parent].target {
                Target::View(view) => Some(view),
                _ => None,
            });

        Ok(Step::Activate(Navigation {
            path: path.to_owned(),
            view,
            layout,
            params: m.params,
        }))
    }
}

enum Step {
    Activate(Navigation),
    Redirect(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(AuthService::mock())
    }

    fn resolve(path: &str, session: SessionView) -> Navigation {
        router().resolve(path, &session).unwrap()
    }

    #[test]
    fn root_goes_to_login() {
        let navigation = resolve("", SessionView::default());
        assert_eq!(navigation.path, "/login");
        assert_eq!(navigation.view, View::Login);

        let navigation = resolve("/", SessionView::signed_in(Role::Manager));
        assert_eq!(navigation.path, "/login");
    }

    #[test]
    fn unknown_paths_go_to_not_found() {
        for path in ["/nope", "/intern-dashboard/nope", "/login/extra"] {
            let navigation = resolve(path, SessionView::signed_in(Role::Intern));
            assert_eq!(navigation.path, "/not-found");
            assert_eq!(navigation.view, View::NotFound);
        }
    }

    #[test]
    fn dashboards_open_their_home() {
        for role in Role::ALL {
            let navigation = resolve(role.dashboard(), SessionView::signed_in(role));
            assert_eq!(navigation.path, format!("{}/home", role.dashboard()));
        }

        let navigation = resolve("/spoc-dashboard", SessionView::signed_in(Role::Spoc));
        assert_eq!(navigation.view, View::SpocHome);
        assert_eq!(navigation.layout, Some(View::SpocDashboard));
    }

    #[test]
    fn role_dashboard_matrix() {
        let mut allowed = 0;
        for dashboard in Role::ALL {
            for role in Role::ALL {
                let navigation = resolve(dashboard.dashboard(), SessionView::signed_in(role));
                if dashboard == role {
                    assert_ne!(navigation.view, View::Unauthorized);
                    allowed += 1;
                } else {
                    assert_eq!(navigation.path, "/unauthorized");
                    assert_eq!(navigation.view, View::Unauthorized);
                }
            }
        }
        assert_eq!(allowed, 3);
    }

    #[test]
    fn children_are_guarded() {
        let navigation = resolve("/manager-dashboard/system-config", SessionView::signed_in(Role::Spoc));
        assert_eq!(navigation.view, View::Unauthorized);

        let navigation = resolve(
            "/manager-dashboard/system-config",
            SessionView::signed_in(Role::Manager),
        );
        assert_eq!(navigation.view, View::ManagerSystemConfig);
        assert_eq!(navigation.layout, Some(View::ManagerDashboard));
    }

    #[test]
    fn signed_out_users_redirected() {
        let navigation = resolve("/intern-dashboard/profile", SessionView::default());
        assert_eq!(navigation.view, View::Login);

        let navigation = resolve("/intern-dashboard/profile", SessionView::expired());
        assert_eq!(navigation.path, "/session-expired");
        assert_eq!(navigation.view, View::SessionExpired);

        let navigation = resolve("/redirect", SessionView::default());
        assert_eq!(navigation.view, View::Login);
    }

    #[test]
    fn parameters_are_extracted() {
        let navigation = resolve(
            "/spoc-dashboard/interns/I346?tab=feedback",
            SessionView::signed_in(Role::Spoc),
        );
        assert_eq!(navigation.path, "/spoc-dashboard/interns/I346");
        assert_eq!(navigation.view, View::SpocInternDetail);
        assert_eq!(navigation.param("id"), Some("I346"));

        let navigation = resolve("//spoc-dashboard/interns/", SessionView::signed_in(Role::Spoc));
        assert_eq!(navigation.view, View::SpocInterns);
        assert!(navigation.params.is_empty());
    }

    #[test]
    fn role_redirect_opens_own_dashboard() {
        for role in Role::ALL {
            let navigation = resolve("/redirect", SessionView::signed_in(role));
            assert_eq!(navigation.path, format!("{}/home", role.dashboard()));
        }
    }

    struct Loop;

    impl Guard for Loop {
        fn check(&self, route: &RouteContext, _session: &SessionView) -> Decision {
            match route.path {
                "/redirect" => Decision::redirect("/intern-dashboard"),
                _ => Decision::redirect("/redirect"),
            }
        }
    }

    #[test]
    fn redirect_loops_are_cut() {
        let router = router().with_guard(Loop);
        let err = router
            .resolve("/intern-dashboard", &SessionView::signed_in(Role::Intern))
            .unwrap_err();
        assert!(matches!(err, RouterError::TooManyRedirects(_)));
    }

    #[tokio::test]
    async fn spoc_session_navigation() {
        let auth = AuthService::mock();
        let router = Router::new(auth.clone());
        let mut location = router.location().await;
        assert_eq!(location.next().await, Some(None));

        let navigation = router.navigate("/spoc-dashboard").await.unwrap();
        assert_eq!(navigation.view, View::Login);

        auth.login("spoc", "spoc123").await.unwrap();
        let navigation = router.navigate("/manager-dashboard").await.unwrap();
        assert_eq!(navigation.path, "/unauthorized");

        let navigation = router.navigate("/spoc-dashboard").await.unwrap();
        assert_eq!(navigation.view, View::SpocHome);

        let paths: Vec<_> = std::iter::from_fn(|| location.try_next())
            .map(|navigation| navigation.map(|navigation| navigation.path))
            .collect();
        assert_eq!(
            paths,
            vec![
                Some("/login".to_owned()),
                Some("/unauthorized".to_owned()),
                Some("/spoc-dashboard/home".to_owned()),
            ]
        );

        auth.expire().await;
        let navigation = router.navigate("/spoc-dashboard/reports").await.unwrap();
        assert_eq!(navigation.view, View::SessionExpired);
    }

    #[tokio::test]
    async fn lapsed_session_navigates_to_session_expired() {
        use chrono::TimeDelta;

        use crate::auth::tests::ShortLived;
        use crate::storage::MemoryStorage;

        let auth = AuthService::new(ShortLived(TimeDelta::milliseconds(50)), MemoryStorage::new());
        let router = Router::new(auth.clone());
        auth.login("spoc", "spoc123").await.unwrap();
        std::thread::sleep(std::time::Duration::from_millis(120));

        let navigation = router.navigate("/spoc-dashboard").await.unwrap();
        assert_eq!(navigation.path, "/session-expired");
        assert_eq!(navigation.view, View::SessionExpired);
    }
}

