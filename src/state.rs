use sqlx::PgPool;

use crate::auth::TokenService;
use crate::cache::CacheStore;
use crate::config;
use crate::database;
use crate::middleware::ResponseCache;

/// Shared application state, built once at startup and cloned into handlers
/// and middleware.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub cache: ResponseCache,
    pub tokens: TokenService,
}

impl AppState {
    /// Builds state from the environment configuration. Falls back to the
    /// in-process cache store when no Redis URL is configured.
    pub fn from_config() -> anyhow::Result<Self> {
        let db = database::pool::connect()?;

        let store = match &config::config().redis.url {
            Some(url) => {
                let cfg = deadpool_redis::Config::from_url(url);
                let pool = cfg
                    .create_pool(Some(deadpool_redis::Runtime::Tokio1))
                    .map_err(|e| anyhow::anyhow!("failed to build redis pool: {}", e))?;
                tracing::info!("response cache backed by redis");
                CacheStore::redis(pool)
            }
            None => {
                tracing::info!("response cache backed by in-process memory store");
                CacheStore::memory()
            }
        };

        Ok(Self {
            db,
            cache: ResponseCache::from_config(store),
            tokens: TokenService::from_config(),
        })
    }
}
