//! Server configuration, loaded from environment variables.

use std::net::SocketAddr;

/// `development` relaxes origin checks and allows [`chess_session::DevAuthenticator`];
/// `production` refuses to start without the secrets a real deployment needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(ConfigError::InvalidValue {
                var: "CHESS_ENVIRONMENT",
                value: other.to_string(),
            }),
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// The server's resolved configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub listen_port: u16,
    pub frontend_origin: Option<String>,
    pub auth_secret: Option<String>,
    pub cookie_secret: Option<String>,
    pub durable_store_url: Option<String>,
    pub hot_store_url: Option<String>,
}

impl Config {
    /// Loads configuration from the environment.
    ///
    /// In `production`, `CHESS_FRONTEND_ORIGIN`, `CHESS_AUTH_SECRET`, and
    /// `CHESS_COOKIE_SECRET` must be set and non-empty. `CHESS_DURABLE_STORE_URL`
    /// and `CHESS_HOT_STORE_URL`, if present, are validated as well-formed
    /// URLs even though the in-memory stores this workspace ships don't use
    /// them — a production deployment wires real clients behind the same
    /// `HotStore`/`DurableStore` traits.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match std::env::var("CHESS_ENVIRONMENT") {
            Ok(raw) => Environment::parse(&raw)?,
            Err(_) => Environment::Development,
        };

        let listen_port = match std::env::var("CHESS_LISTEN_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "CHESS_LISTEN_PORT",
                value: raw,
            })?,
            Err(_) => 4000,
        };

        let frontend_origin = non_empty_var("CHESS_FRONTEND_ORIGIN");
        let auth_secret = non_empty_var("CHESS_AUTH_SECRET");
        let cookie_secret = non_empty_var("CHESS_COOKIE_SECRET");
        let durable_store_url = non_empty_var("CHESS_DURABLE_STORE_URL");
        let hot_store_url = non_empty_var("CHESS_HOT_STORE_URL");

        for (var, url) in [
            ("CHESS_DURABLE_STORE_URL", &durable_store_url),
            ("CHESS_HOT_STORE_URL", &hot_store_url),
        ] {
            if let Some(url) = url {
                if !url.contains("://") {
                    return Err(ConfigError::InvalidValue {
                        var,
                        value: url.clone(),
                    });
                }
            }
        }

        if environment.is_production() {
            if frontend_origin.is_none() {
                return Err(ConfigError::MissingInProduction("CHESS_FRONTEND_ORIGIN"));
            }
            if auth_secret.is_none() {
                return Err(ConfigError::MissingInProduction("CHESS_AUTH_SECRET"));
            }
            if cookie_secret.is_none() {
                return Err(ConfigError::MissingInProduction("CHESS_COOKIE_SECRET"));
            }
        }

        Ok(Self {
            environment,
            listen_port,
            frontend_origin,
            auth_secret,
            cookie_secret,
            durable_store_url,
            hot_store_url,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.listen_port))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is unset or empty in `production`.
    #[error("{0} must be set when CHESS_ENVIRONMENT=production")]
    MissingInProduction(&'static str),

    /// A variable was set but failed to parse or otherwise isn't valid.
    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}
