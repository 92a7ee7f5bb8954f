use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::auth::{jwt::JwtKeys, password::PasswordCodec};
use crate::config::{AppConfig, StoreBackend};
use crate::users::{memory::MemoryUserStore, pg::PgUserStore, repo::UserRepository, store::UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserRepository,
    pub codec: PasswordCodec,
    pub jwt: JwtKeys,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn UserStore> = match config.store {
            StoreBackend::Postgres => {
                let url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;
                let db = PgPoolOptions::new()
                    .max_connections(config.max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;

                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;

                Arc::new(PgUserStore::new(db))
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory user store; data is lost on restart");
                Arc::new(MemoryUserStore::new())
            }
        };

        Ok(Self::from_parts(config, store, PasswordCodec::default()))
    }

    pub fn from_parts(config: AppConfig, store: Arc<dyn UserStore>, codec: PasswordCodec) -> Self {
        let users = UserRepository::new(store, config.store_timeout);
        let jwt = JwtKeys::new(&config.jwt);
        Self {
            config: Arc::new(config),
            users,
            codec,
            jwt,
        }
    }

    /// Memory-backed state with a cheap hashing cost.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_parts(
            AppConfig::for_tests(),
            Arc::new(MemoryUserStore::new()),
            PasswordCodec::with_cost(4),
        )
    }
}
