use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_minutes: i64,
    pub secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub store_timeout: Duration,
    pub jwt: JwtConfig,
    pub session: SessionConfig,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("USER_STORE")
            .unwrap_or_else(|_| "postgres".into())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "postgres" => StoreBackend::Postgres,
            other => anyhow::bail!("unknown USER_STORE backend: {other}"),
        };

        let database_url = match store {
            StoreBackend::Postgres => {
                Some(std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?)
            }
            StoreBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            ttl_hours: env_or("JWT_TTL_HOURS", 72),
        };

        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "sid".into()),
            ttl_minutes: env_or("SESSION_TTL_MINUTES", 24 * 60),
            secure: env_or("SESSION_SECURE", false),
        };

        Ok(Self {
            store,
            database_url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            store_timeout: Duration::from_secs(env_or("STORE_TIMEOUT_SECS", 10)),
            jwt,
            session,
        })
    }

    /// In-memory configuration used by tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            store: StoreBackend::Memory,
            database_url: None,
            max_connections: 1,
            store_timeout: Duration::from_secs(5),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                ttl_hours: 72,
            },
            session: SessionConfig {
                cookie_name: "sid".into(),
                ttl_minutes: 60,
                secure: false,
            },
        }
    }
}
