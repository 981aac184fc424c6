use std::time::Duration;

use crate::models::CachedRecommendationBatch;

/// How long a recommendation batch is reused before it must be refetched
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Decides whether the cached recommendation batch must be refreshed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    window_ms: i64,
}

impl Default for StalenessPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_WINDOW)
    }
}

impl StalenessPolicy {
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// True when a fetch should run: forced, nothing cached, or the cached
    /// batch is at least one window old.
    pub fn should_fetch(
        &self,
        cached: Option<&CachedRecommendationBatch>,
        force: bool,
        now_ms: i64,
    ) -> bool {
        if force {
            return true;
        }

        match cached {
            None => true,
            Some(batch) => batch.age_ms(now_ms) >= self.window_ms,
        }
    }
}
