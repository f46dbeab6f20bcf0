/// Access Control Module Index
///
/// The security core of the service, organised leaf-first:
///
/// - `token`: issues and verifies signed bearer tokens (HS256 JWT).
/// - `identity`: the request-scoped identity derived from a token, or anonymous.
/// - `authenticator`: the per-request filter that reads the `Authorization` header.
/// - `policy`: the central rule table deciding which routes need which roles.
///
/// Every request passes through `authenticator::access_control` exactly once,
/// before route dispatch. Invalid tokens never fail a request on their own;
/// they only downgrade the caller to the anonymous identity.
pub mod authenticator;
pub mod identity;
pub mod policy;
pub mod token;

pub use authenticator::{access_control, authenticate, bearer_token};
pub use identity::{ADMIN, Identity};
pub use policy::{Decision, DenyReason, Policy};
pub use token::{AuthError, Claims, SigningKey, TokenCodec, TokenError};
