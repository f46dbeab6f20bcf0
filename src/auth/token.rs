use std::{fmt, sync::Arc};

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::identity::Identity;

/// Minimum accepted length of the HMAC signing secret, in bytes (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

/// Longest accepted token lifetime: one year.
pub const MAX_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// Claims
///
/// The payload carried inside every bearer token. Nothing about a token is
/// persisted server-side: signature and claims are the single source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the username the token was issued to.
    pub sub: String,
    /// Role names granted to the subject. Parsed leniently, see `lenient_roles`.
    #[serde(default, deserialize_with = "lenient_roles")]
    pub roles: Vec<String>,
    /// Issued At (iat), seconds since the epoch.
    #[serde(default)]
    pub iat: i64,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: i64,
}

/// Reasons a presented token was not accepted.
///
/// None of these ever surfaces to a client directly: the authenticator turns
/// every one of them into the anonymous identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token is empty")]
    Empty,
    #[error("token is malformed")]
    Malformed,
    #[error("token signature does not match")]
    BadSignature,
    #[error("token has expired")]
    Expired,
}

/// Failures while building a codec or issuing a token.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("signing secret must be at least 32 bytes, got {0}")]
    WeakKey(usize),
    #[error("token ttl must be between 1 and 31536000 seconds, got {0}s")]
    InvalidTtl(i64),
    #[error("token expiry overflows for issue time {0}")]
    ExpiryOverflow(i64),
    #[error("failed to encode token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// SigningKey
///
/// The server-side HMAC secret. Construction enforces the minimum length so a
/// weak key aborts startup instead of weakening every request.
#[derive(Clone)]
pub struct SigningKey(Arc<[u8]>);

impl SigningKey {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, TokenError> {
        let secret = secret.as_ref();
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakKey(secret.len()));
        }
        Ok(Self(Arc::from(secret)))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey([REDACTED])")
    }
}

/// TokenCodec
///
/// Issues and verifies compact HS256 tokens. Immutable once built, so a single
/// instance is shared by every request task without locking.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(key: &SigningKey, ttl_secs: i64) -> Result<Self, TokenError> {
        if !(1..=MAX_TTL_SECS).contains(&ttl_secs) {
            return Err(TokenError::InvalidTtl(ttl_secs));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is compared against an explicit `now` in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding: EncodingKey::from_secret(&key.0),
            decoding: DecodingKey::from_secret(&key.0),
            validation,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issues a token for `subject` valid for the configured ttl from now.
    pub fn issue<I, R>(&self, subject: &str, roles: I) -> Result<String, TokenError>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.issue_at(subject, roles, Utc::now().timestamp())
    }

    pub fn issue_at<I, R>(&self, subject: &str, roles: I, now: i64) -> Result<String, TokenError>
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        let exp = now
            .checked_add(self.ttl_secs)
            .ok_or(TokenError::ExpiryOverflow(now))?;
        let claims = Claims {
            sub: subject.to_string(),
            roles: roles.into_iter().map(Into::into).collect(),
            iat: now,
            exp,
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verifies a token against the wall clock.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verifies structure, signature and expiry, then derives the identity.
    ///
    /// A token is expired once `now >= exp`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Identity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Empty);
        }

        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.exp <= now {
            return Err(AuthError::Expired);
        }
        if claims.sub.trim().is_empty() {
            return Err(AuthError::Malformed);
        }

        Ok(Identity::authenticated(claims.sub, claims.roles))
    }
}

/// Accepts any JSON shape for the `roles` claim. Anything other than an array
/// yields no roles, and non-string members are dropped: a bad role claim costs
/// the caller privileges, never authentication.
fn lenient_roles<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(role) => Some(role),
                _ => None,
            })
            .collect(),
        other => {
            tracing::warn!(roles = %other, "roles claim is not a list, treating as empty");
            Vec::new()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::ADMIN;

    const SECRET: &str = "unit-test-secret-that-is-long-enough-0123";
    const NOW: i64 = 1_700_000_000;

    fn codec() -> TokenCodec {
        TokenCodec::new(&SigningKey::new(SECRET).unwrap(), 3600).unwrap()
    }

    fn sign_raw(payload: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn issued_token_verifies_back_to_identity() {
        let codec = codec();
        let token = codec.issue_at("alice", [ADMIN], NOW).unwrap();

        let identity = codec.verify_at(&token, NOW + 10).unwrap();
        assert_eq!(identity, Identity::authenticated("alice", [ADMIN]));
    }

    #[test]
    fn wall_clock_round_trip() {
        let codec = codec();
        let token = codec.issue("bob", Vec::<String>::new()).unwrap();
        let identity = codec.verify(&token).unwrap();
        assert_eq!(identity.subject.as_deref(), Some("bob"));
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn short_secret_is_rejected() {
        let err = SigningKey::new("too-short").unwrap_err();
        assert!(matches!(err, TokenError::WeakKey(9)));
        assert!(SigningKey::new("x".repeat(MIN_SECRET_LEN)).is_ok());
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        let key = SigningKey::new(SECRET).unwrap();
        assert!(matches!(
            TokenCodec::new(&key, 0),
            Err(TokenError::InvalidTtl(0))
        ));
    }

    #[test]
    fn ttl_above_one_year_is_rejected() {
        let key = SigningKey::new(SECRET).unwrap();
        assert!(TokenCodec::new(&key, MAX_TTL_SECS).is_ok());
        assert!(matches!(
            TokenCodec::new(&key, MAX_TTL_SECS + 1),
            Err(TokenError::InvalidTtl(_))
        ));
        assert!(matches!(
            TokenCodec::new(&key, i64::MAX),
            Err(TokenError::InvalidTtl(i64::MAX))
        ));
    }

    #[test]
    fn overflowing_expiry_is_an_error() {
        let codec = codec();
        let now = i64::MAX - 10;
        assert!(matches!(
            codec.issue_at("alice", [ADMIN], now),
            Err(TokenError::ExpiryOverflow(n)) if n == now
        ));
    }

    #[test]
    fn signing_key_debug_is_redacted() {
        let key = SigningKey::new(SECRET).unwrap();
        assert!(!format!("{key:?}").contains(SECRET));
    }

    #[test]
    fn empty_token() {
        assert_eq!(codec().verify_at("", NOW), Err(AuthError::Empty));
        assert_eq!(codec().verify_at("   ", NOW), Err(AuthError::Empty));
    }

    #[test]
    fn garbage_is_malformed() {
        assert_eq!(codec().verify_at("not-a-token", NOW), Err(AuthError::Malformed));
        assert_eq!(codec().verify_at("a.b.c", NOW), Err(AuthError::Malformed));
    }

    #[test]
    fn token_signed_with_other_key_has_bad_signature() {
        let other = TokenCodec::new(
            &SigningKey::new("another-secret-which-is-also-long-enough").unwrap(),
            3600,
        )
        .unwrap();
        let token = other.issue_at("alice", [ADMIN], NOW).unwrap();
        assert_eq!(codec().verify_at(&token, NOW), Err(AuthError::BadSignature));
    }

    #[test]
    fn expiry_boundary() {
        let codec = codec();
        let token = codec.issue_at("alice", [ADMIN], NOW).unwrap();
        assert!(codec.verify_at(&token, NOW + 3599).is_ok());
        assert_eq!(codec.verify_at(&token, NOW + 3600), Err(AuthError::Expired));
        assert_eq!(codec.verify_at(&token, NOW + 99_999), Err(AuthError::Expired));
    }

    #[test]
    fn missing_exp_is_malformed() {
        let token = sign_raw(serde_json::json!({ "sub": "alice", "roles": [ADMIN] }), SECRET);
        assert_eq!(codec().verify_at(&token, NOW), Err(AuthError::Malformed));
    }

    #[test]
    fn missing_roles_claim_means_no_roles() {
        let token = sign_raw(serde_json::json!({ "sub": "alice", "exp": NOW + 60 }), SECRET);
        let identity = codec().verify_at(&token, NOW).unwrap();
        assert!(identity.is_authenticated());
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn malformed_roles_claim_means_no_roles() {
        let token = sign_raw(
            serde_json::json!({ "sub": "alice", "roles": "ADMIN", "exp": NOW + 60 }),
            SECRET,
        );
        let identity = codec().verify_at(&token, NOW).unwrap();
        assert_eq!(identity.subject.as_deref(), Some("alice"));
        assert!(!identity.has_role(ADMIN));
    }

    #[test]
    fn non_string_roles_are_dropped() {
        let token = sign_raw(
            serde_json::json!({ "sub": "alice", "roles": [1, "ROLE_ADMIN", null], "exp": NOW + 60 }),
            SECRET,
        );
        let identity = codec().verify_at(&token, NOW).unwrap();
        assert_eq!(identity.roles.len(), 1);
        assert!(identity.has_role(ADMIN));
    }
}
