use redis::AsyncCommands;
use redis::Client;

use super::{CacheKey, RecommendationStore};
use crate::{
    error::{AppError, AppResult},
    models::CachedRecommendationBatch,
};

/// Redis backend for the recommendation slot.
///
/// Each user's batch lives under `homepage-recommendations:<user>` as a JSON
/// string. No TTL is set; freshness is decided by the staleness policy, not
/// by key expiry.
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    fn key(user_id: &str) -> String {
        format!("{}", CacheKey::HomepageRecommendations(user_id.to_string()))
    }
}

#[async_trait::async_trait]
impl RecommendationStore for RedisStore {
    async fn read(&self, user_id: &str) -> AppResult<Option<CachedRecommendationBatch>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(Self::key(user_id)).await?;

        match cached {
            Some(json) => {
                let batch: Option<CachedRecommendationBatch> = serde_json::from_str(&json)
                    .map_err(|e| {
                        AppError::Internal(format!("Cache deserialization error: {}", e))
                    })?;
                Ok(batch)
            }
            None => Ok(None),
        }
    }

    async fn write(&self, user_id: &str, batch: &CachedRecommendationBatch) -> AppResult<()> {
        let json = serde_json::to_string(batch)
            .map_err(|e| AppError::Internal(format!("Cache serialization error: {}", e)))?;

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(Self::key(user_id), json).await.map_err(|e| {
            tracing::warn!(error = %e, "Redis set failed");
            e
        })?;

        Ok(())
    }

    async fn clear(&self, user_id: &str) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(Self::key(user_id)).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
