use std::env;

/// Development signing secret used when `JWT_SECRET` is unset outside production.
pub const LOCAL_JWT_SECRET: &str = "movie-catalog-local-development-secret";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// AppConfig
///
/// Holds the application's configuration, loaded once at startup and never
/// mutated afterwards. It is pulled into handlers through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store.
    pub db_url: Option<String>,
    // HMAC secret handed to the token codec at construction.
    pub jwt_secret: String,
    // Socket address the HTTP server binds.
    pub bind_addr: String,
    // Adds the `Secure` attribute to the auth cookie.
    pub cookie_secure: bool,
}

/// Env
///
/// Runtime context: `Local` allows development fallbacks, `Production`
/// demands every secret explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Non-panicking configuration for tests: local, in-memory, fixed secret.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            cookie_secure: false,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the environment (call `dotenv` first to
    /// include a `.env` file).
    ///
    /// # Panics
    /// In production, panics when `JWT_SECRET` or `DATABASE_URL` is missing,
    /// so the service never starts with a guessable secret or without its store.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let db_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        match env {
            Env::Local => Self {
                env: Env::Local,
                db_url,
                jwt_secret: env::var("JWT_SECRET")
                    .ok()
                    .filter(|secret| !secret.is_empty())
                    .unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
                bind_addr,
                cookie_secure: false,
            },
            Env::Production => {
                let jwt_secret =
                    env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production.");
                assert!(
                    !jwt_secret.is_empty(),
                    "FATAL: JWT_SECRET must not be empty in production."
                );

                Self {
                    env: Env::Production,
                    db_url: Some(
                        db_url.expect("FATAL: DATABASE_URL must be set in production."),
                    ),
                    jwt_secret,
                    bind_addr,
                    cookie_secure: true,
                }
            }
        }
    }
}
