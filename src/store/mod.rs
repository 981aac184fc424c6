use std::{fmt::Display, sync::Arc};

use crate::{
    config::{CacheBackend, Config},
    error::AppResult,
    models::CachedRecommendationBatch,
};

pub mod file;
pub mod redis;

pub use file::FileStore;
pub use redis::RedisStore;

/// Name of the single recommendation slot
pub const RECOMMENDATIONS_KEY: &str = "homepage-recommendations";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// The home-page recommendation slot of one user
    HomepageRecommendations(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::HomepageRecommendations(user_id) => {
                write!(f, "{}:{}", RECOMMENDATIONS_KEY, user_id)
            }
        }
    }
}

/// Durable single-slot cell holding the last recommendation batch of a user.
///
/// A write replaces the whole value at once; a reader racing a write sees
/// either the old or the new batch, never a mix.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn read(&self, user_id: &str) -> AppResult<Option<CachedRecommendationBatch>>;

    async fn write(&self, user_id: &str, batch: &CachedRecommendationBatch) -> AppResult<()>;

    async fn clear(&self, user_id: &str) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Creates the store selected by `CACHE_BACKEND`
pub fn create_store(config: &Config) -> anyhow::Result<Arc<dyn RecommendationStore>> {
    let store: Arc<dyn RecommendationStore> = match config.cache_backend {
        CacheBackend::File => Arc::new(FileStore::new(config.cache_dir.clone())),
        CacheBackend::Redis => {
            let client = ::redis::Client::open(config.redis_url.as_str())?;
            Arc::new(RedisStore::new(client))
        }
    };

    tracing::info!(backend = store.name(), "Recommendation store ready");

    Ok(store)
}
