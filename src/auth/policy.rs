use axum::http::Method;

use super::identity::{ADMIN, Identity};

/// Operation
///
/// The coarse classification of an HTTP method the rule table works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    /// `None` for methods that are neither (OPTIONS, TRACE, CONNECT, extensions);
    /// those only match rules that accept any operation.
    pub fn of(method: &Method) -> Option<Self> {
        match *method {
            Method::GET | Method::HEAD => Some(Operation::Read),
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE => Some(Operation::Write),
            _ => None,
        }
    }
}

/// What a rule demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Public,
    Authenticated,
    Role(&'static str),
}

/// Why a request was refused. The two kinds are surfaced differently
/// (401 vs 403) and must never be conflated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity at all.
    Unauthenticated,
    /// An identity that lacks the required role.
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

/// Rule
///
/// One row of the policy table. `pattern` segments written `{name}` match any
/// single non-empty segment; a final `{*rest}` matches whatever remains.
/// `operation: None` matches every method.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub pattern: &'static str,
    pub operation: Option<Operation>,
    pub requirement: Requirement,
}

impl Rule {
    const fn new(
        pattern: &'static str,
        operation: Option<Operation>,
        requirement: Requirement,
    ) -> Self {
        Self {
            pattern,
            operation,
            requirement,
        }
    }

    fn matches(&self, path: &str, operation: Option<Operation>) -> bool {
        if self.operation.is_some() && self.operation != operation {
            return false;
        }
        pattern_matches(self.pattern, path)
    }
}

const RESTAURANT_ROUTES: [&str; 5] = [
    "/restaurants",
    "/restaurants/search",
    "/restaurants/{id}",
    "/restaurants/{id}/dishes",
    "/restaurants/{id}/dishes/{dish_id}",
];

/// The service's access rules, evaluated top to bottom; first match wins.
/// Anything that matches no row requires an authenticated caller.
pub static RULES: &[Rule] = &[
    // Catalogue reads are public.
    Rule::new(RESTAURANT_ROUTES[0], Some(Operation::Read), Requirement::Public),
    Rule::new(RESTAURANT_ROUTES[1], Some(Operation::Read), Requirement::Public),
    Rule::new(RESTAURANT_ROUTES[2], Some(Operation::Read), Requirement::Public),
    Rule::new(RESTAURANT_ROUTES[3], Some(Operation::Read), Requirement::Public),
    Rule::new(RESTAURANT_ROUTES[4], Some(Operation::Read), Requirement::Public),
    // Catalogue writes are admin-only.
    Rule::new(RESTAURANT_ROUTES[0], Some(Operation::Write), Requirement::Role(ADMIN)),
    Rule::new(RESTAURANT_ROUTES[1], Some(Operation::Write), Requirement::Role(ADMIN)),
    Rule::new(RESTAURANT_ROUTES[2], Some(Operation::Write), Requirement::Role(ADMIN)),
    Rule::new(RESTAURANT_ROUTES[3], Some(Operation::Write), Requirement::Role(ADMIN)),
    Rule::new(RESTAURANT_ROUTES[4], Some(Operation::Write), Requirement::Role(ADMIN)),
    // Operational endpoints and API docs.
    Rule::new("/health", Some(Operation::Read), Requirement::Public),
    Rule::new("/swagger-ui", Some(Operation::Read), Requirement::Public),
    Rule::new("/swagger-ui/{*rest}", Some(Operation::Read), Requirement::Public),
    Rule::new("/api-docs/openapi.json", Some(Operation::Read), Requirement::Public),
];

/// Policy
///
/// The authorization decision point. Holds an immutable rule table; evaluation
/// is a pure lookup with no caching and no side effects, so one instance is
/// shared freely across request tasks.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    rules: &'static [Rule],
    fallback: Requirement,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            rules: RULES,
            fallback: Requirement::Authenticated,
        }
    }
}

impl Policy {
    /// Decides whether `identity` may perform `method` on `path`.
    pub fn authorize(&self, path: &str, method: &Method, identity: &Identity) -> Decision {
        let operation = Operation::of(method);
        let requirement = self
            .rules
            .iter()
            .find(|rule| rule.matches(path, operation))
            .map(|rule| rule.requirement)
            .unwrap_or(self.fallback);

        evaluate(requirement, identity)
    }
}

fn evaluate(requirement: Requirement, identity: &Identity) -> Decision {
    match requirement {
        Requirement::Public => Decision::Allow,
        Requirement::Authenticated if identity.is_authenticated() => Decision::Allow,
        Requirement::Authenticated => Decision::Deny(DenyReason::Unauthenticated),
        Requirement::Role(role) if identity.has_role(role) => Decision::Allow,
        // A missing role is Forbidden even for anonymous callers.
        Requirement::Role(_) => Decision::Deny(DenyReason::Forbidden),
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    let mut path_segments = segments(path);
    for expected in segments(pattern) {
        if expected.starts_with("{*") {
            return true;
        }
        match path_segments.next() {
            Some(actual) if expected.starts_with('{') || expected == actual => {}
            _ => return false,
        }
    }
    path_segments.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Identity {
        Identity::authenticated("root", [ADMIN])
    }

    fn user() -> Identity {
        Identity::authenticated("alice", ["USER"])
    }

    const CATALOGUE: [&str; 6] = [
        "/restaurants",
        "/restaurants/search",
        "/restaurants/5",
        "/restaurants/5/",
        "/restaurants/5/dishes",
        "/restaurants/5/dishes/7",
    ];

    #[test]
    fn pattern_matching() {
        assert!(pattern_matches("/restaurants/{id}", "/restaurants/42"));
        assert!(pattern_matches("/restaurants/{id}", "/restaurants/42/"));
        assert!(!pattern_matches("/restaurants/{id}", "/restaurants"));
        assert!(!pattern_matches("/restaurants/{id}", "/restaurants/42/dishes"));
        assert!(pattern_matches("/swagger-ui/{*rest}", "/swagger-ui/index.html"));
        assert!(pattern_matches("/swagger-ui/{*rest}", "/swagger-ui/a/b/c"));
        assert!(!pattern_matches("/health", "/healthz"));
    }

    #[test]
    fn reads_are_public_for_everyone() {
        let policy = Policy::default();
        for path in CATALOGUE {
            for identity in [Identity::anonymous(), user(), admin()] {
                assert_eq!(
                    policy.authorize(path, &Method::GET, &identity),
                    Decision::Allow,
                    "GET {path}"
                );
            }
        }
    }

    #[test]
    fn writes_require_admin() {
        let policy = Policy::default();
        for path in CATALOGUE {
            for method in [Method::POST, Method::PUT, Method::PATCH, Method::DELETE] {
                assert_eq!(policy.authorize(path, &method, &admin()), Decision::Allow);
                assert_eq!(
                    policy.authorize(path, &method, &user()),
                    Decision::Deny(DenyReason::Forbidden),
                    "{method} {path}"
                );
                assert_eq!(
                    policy.authorize(path, &method, &Identity::anonymous()),
                    Decision::Deny(DenyReason::Forbidden),
                    "anonymous {method} {path}"
                );
            }
        }
    }

    #[test]
    fn anonymous_write_is_forbidden_not_unauthenticated() {
        assert_eq!(
            Policy::default().authorize("/restaurants", &Method::POST, &Identity::anonymous()),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn ops_endpoints_are_public() {
        let policy = Policy::default();
        for path in ["/health", "/swagger-ui", "/swagger-ui/index.html", "/api-docs/openapi.json"] {
            assert_eq!(
                policy.authorize(path, &Method::GET, &Identity::anonymous()),
                Decision::Allow
            );
        }
    }

    #[test]
    fn unlisted_routes_need_any_identity() {
        let policy = Policy::default();
        for path in ["/me", "/admin", "/restaurants/1/dishes/2/extra"] {
            assert_eq!(
                policy.authorize(path, &Method::GET, &Identity::anonymous()),
                Decision::Deny(DenyReason::Unauthenticated)
            );
            assert_eq!(policy.authorize(path, &Method::GET, &user()), Decision::Allow);
        }
    }

    #[test]
    fn options_falls_through_to_authenticated() {
        let policy = Policy::default();
        assert_eq!(
            policy.authorize("/restaurants", &Method::OPTIONS, &Identity::anonymous()),
            Decision::Deny(DenyReason::Unauthenticated)
        );
        assert_eq!(
            policy.authorize("/restaurants", &Method::OPTIONS, &user()),
            Decision::Allow
        );
    }
}
