use std::{collections::BTreeSet, convert::Infallible};

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use ts_rs::TS;
use utoipa::ToSchema;

/// The role required for every write on restaurants and dishes.
pub const ADMIN: &str = "ADMIN";

/// Prefix some issuers put in front of role names (`ROLE_ADMIN`).
const ROLE_PREFIX: &str = "ROLE_";

/// Identity
///
/// The request-scoped caller identity. It is computed once per request by the
/// authenticator and passed explicitly to whatever needs it; it is never stored.
///
/// An identity without a subject is anonymous and always has an empty role set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema, TS)]
#[ts(export)]
pub struct Identity {
    /// The token subject (username). `None` for anonymous callers.
    pub subject: Option<String>,
    /// Role names, normalised without any `ROLE_` prefix.
    pub roles: BTreeSet<String>,
}

impl Identity {
    /// The identity used for requests with an absent or invalid token.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated<I, R>(subject: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<str>,
    {
        Self {
            subject: Some(subject.into()),
            roles: roles
                .into_iter()
                .map(|role| normalize_role(role.as_ref()))
                .filter(|role| !role.is_empty())
                .collect(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.subject.is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Subject for log lines; anonymous callers show as `-`.
    pub fn actor(&self) -> &str {
        self.subject.as_deref().unwrap_or("-")
    }
}

fn normalize_role(role: &str) -> String {
    let role = role.trim();
    role.strip_prefix(ROLE_PREFIX).unwrap_or(role).to_string()
}

/// Identity Extractor
///
/// Reads the identity that `access_control` placed in the request extensions.
/// Handlers that take an `Identity` argument therefore see exactly the identity
/// the policy was evaluated against. Falls back to anonymous if the middleware
/// is not installed (e.g. a handler mounted on a bare test router).
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or_else(Identity::anonymous))
    }
}
