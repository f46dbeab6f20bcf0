use std::env;

use thiserror::Error;

use crate::auth::token::{MAX_TTL_SECS, MIN_SECRET_LEN};

/// Secret used when running locally without `JWT_SECRET`. Never used in production.
pub const LOCAL_JWT_SECRET: &str = "local-development-secret-change-me-0123456789";

/// Default token lifetime: 24 hours.
pub const DEFAULT_JWT_TTL_SECS: i64 = 86_400;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// shared through the application state; the signing secret in particular is
/// read-only for the lifetime of the process.
#[derive(Clone)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and local conveniences.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // HMAC secret for signing and verifying bearer tokens.
    pub jwt_secret: String,
    // Lifetime of issued tokens, in seconds.
    pub jwt_ttl_secs: i64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("db_url", &self.db_url.as_ref().map(|_| "[REDACTED]"))
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_ttl_secs", &self.jwt_ttl_secs)
            .field("bind_addr", &self.bind_addr)
            .finish()
    }
}

/// Env
///
/// The runtime context: `Local` for development (pretty logs, fallback secret,
/// optional in-memory store) and `Production` (JSON logs, every secret explicit).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Startup configuration failures. Every one of them aborts initialization.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),

    #[error("JWT_SECRET must be at least {min} bytes, got {len}")]
    WeakSecret { len: usize, min: usize },

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl Default for AppConfig {
    /// Safe, non-failing configuration for tests and in-process scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_ttl_secs: DEFAULT_JWT_TTL_SECS,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (after `.env` has been
    /// applied by the caller).
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `APP_ENV` | `local` (`production` switches to production) |
    /// | `DATABASE_URL` | required in production; absent locally means in-memory |
    /// | `JWT_SECRET` | required in production; development secret locally |
    /// | `JWT_EXPIRATION_SECS` | `86400` |
    /// | `BIND_ADDR` | `0.0.0.0:3000` |
    ///
    /// # Errors
    /// Fails fast on a missing production secret, a secret shorter than 32 bytes
    /// or a ttl that is unparsable or outside one second to one year. The
    /// service must not start with any of these.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = non_empty_var("DATABASE_URL");
        let jwt_secret = non_empty_var("JWT_SECRET");

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                jwt_secret.ok_or(ConfigError::Missing("JWT_SECRET"))?,
            ),
            Env::Local => (
                db_url,
                jwt_secret.unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::WeakSecret {
                len: jwt_secret.len(),
                min: MIN_SECRET_LEN,
            });
        }

        let jwt_ttl_secs = match non_empty_var("JWT_EXPIRATION_SECS") {
            None => DEFAULT_JWT_TTL_SECS,
            Some(raw) => match raw.parse::<i64>() {
                Ok(secs) if (1..=MAX_TTL_SECS).contains(&secs) => secs,
                Ok(secs) => {
                    return Err(ConfigError::Invalid {
                        name: "JWT_EXPIRATION_SECS",
                        reason: format!("must be between 1 and {MAX_TTL_SECS}, got {secs}"),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: "JWT_EXPIRATION_SECS",
                        reason: e.to_string(),
                    });
                }
            },
        };

        let bind_addr =
            non_empty_var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        Ok(Self {
            env,
            db_url,
            jwt_secret,
            jwt_ttl_secs,
            bind_addr,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
