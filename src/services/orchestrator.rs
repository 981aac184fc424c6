use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::FetchError,
    models::{CachedRecommendationBatch, Notification, OwnedLibrary},
    services::providers::BookAiProvider,
    store::RecommendationStore,
};

/// Shown to the user when a refresh they asked for fails
pub const REFRESH_FAILED_MESSAGE: &str =
    "Could not fetch new recommendations. Please try again later.";

/// Default number of books kept per batch
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 4;

/// Who asked for the fetch; decides whether failures reach the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Library finished loading; failures are only logged
    Automatic,
    /// Explicit refresh; bypasses the staleness check and reports failures
    Manual,
}

impl Trigger {
    pub fn is_forced(self) -> bool {
        matches!(self, Trigger::Manual)
    }
}

/// Result of one trigger
#[derive(Debug)]
pub enum FetchOutcome {
    /// The cached batch is still fresh and was kept
    Fresh,
    /// Another fetch for this user is running; nothing was done
    InFlight,
    /// The user owns no books; the cache was cleared without a model call
    Invalidated,
    /// A new batch was fetched and stored
    Refreshed(CachedRecommendationBatch),
    /// The fetch failed and the cache was cleared
    Failed {
        error: FetchError,
        notification: Option<Notification>,
    },
}

impl FetchOutcome {
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            FetchOutcome::Failed { notification, .. } => notification.as_ref(),
            _ => None,
        }
    }
}

/// Sole writer of the recommendation store.
///
/// Runs summarize → generate → write as one linear pipeline; the first failing
/// stage ends it and the slot is cleared.
pub struct RecommendationOrchestrator {
    provider: Arc<dyn BookAiProvider>,
    store: Arc<dyn RecommendationStore>,
    max_recommendations: usize,
}

impl RecommendationOrchestrator {
    pub fn new(
        provider: Arc<dyn BookAiProvider>,
        store: Arc<dyn RecommendationStore>,
        max_recommendations: usize,
    ) -> Self {
        Self {
            provider,
            store,
            max_recommendations,
        }
    }

    /// Fetches and stores a new batch for `user_id`.
    ///
    /// Callers must hold the user's in-flight guard.
    #[tracing::instrument(skip_all, fields(user_id = %user_id, trigger = ?trigger))]
    pub async fn fetch(
        &self,
        user_id: &str,
        library: &OwnedLibrary,
        trigger: Trigger,
    ) -> FetchOutcome {
        let books = library.to_prompt_text();
        if books.trim().is_empty() {
            tracing::info!(user_id = %user_id, "Library is empty, clearing recommendations");
            self.invalidate(user_id).await;
            return FetchOutcome::Invalidated;
        }

        let start = Instant::now();
        tracing::info!(
            user_id = %user_id,
            owned_books = library.len(),
            trigger = ?trigger,
            "Fetching recommendations"
        );

        match self.refresh_slot(user_id, &books).await {
            Ok(batch) => {
                tracing::info!(
                    user_id = %user_id,
                    books = batch.books.len(),
                    processing_time_ms = start.elapsed().as_millis(),
                    "Recommendations refreshed"
                );
                FetchOutcome::Refreshed(batch)
            }
            Err(error) => {
                self.invalidate(user_id).await;

                let notification = match trigger {
                    Trigger::Manual => {
                        tracing::error!(
                            user_id = %user_id,
                            error = %error,
                            "Recommendation refresh failed"
                        );
                        Some(Notification::error(REFRESH_FAILED_MESSAGE))
                    }
                    Trigger::Automatic => {
                        tracing::warn!(
                            user_id = %user_id,
                            error = %error,
                            "Background recommendation fetch failed"
                        );
                        None
                    }
                };

                FetchOutcome::Failed {
                    error,
                    notification,
                }
            }
        }
    }

    async fn refresh_slot(
        &self,
        user_id: &str,
        books: &str,
    ) -> Result<CachedRecommendationBatch, FetchError> {
        let summary = self
            .provider
            .summarize_library(books)
            .await
            .map_err(FetchError::SummarizationFailed)?;

        if summary.is_empty() {
            return Err(FetchError::EmptySummary);
        }

        let recommendations = self
            .provider
            .generate_recommendations(&summary.summary)
            .await
            .map_err(FetchError::GenerationFailed)?;

        let batch = CachedRecommendationBatch::new(
            Utc::now().timestamp_millis(),
            recommendations,
            self.max_recommendations,
        );

        self.store
            .write(user_id, &batch)
            .await
            .map_err(FetchError::Store)?;

        Ok(batch)
    }

    async fn invalidate(&self, user_id: &str) {
        if let Err(e) = self.store.clear(user_id).await {
            tracing::error!(user_id = %user_id, error = %e, "Failed to clear recommendation cache");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{BookList, LibrarySummary, ListedBook, NotificationLevel, RecommendedBook};
    use crate::services::providers::MockBookAiProvider;
    use crate::store::MockRecommendationStore;
    use mockall::Sequence;

    fn library(books: &[(&str, &str)]) -> OwnedLibrary {
        let list = BookList::with_books(
            books
                .iter()
                .map(|(title, author)| ListedBook::new(*title, *author))
                .collect(),
        );
        OwnedLibrary::aggregate(&[list], &[])
    }

    fn sci_fi_summary() -> LibrarySummary {
        LibrarySummary {
            summary: "likes sci-fi".to_string(),
            genres: vec!["sci-fi".to_string()],
            themes: vec!["space".to_string()],
        }
    }

    fn orchestrator(
        provider: MockBookAiProvider,
        store: MockRecommendationStore,
    ) -> RecommendationOrchestrator {
        RecommendationOrchestrator::new(
            Arc::new(provider),
            Arc::new(store),
            DEFAULT_MAX_RECOMMENDATIONS,
        )
    }

    #[tokio::test]
    async fn test_fetch_stores_generated_batch() {
        let mut provider = MockBookAiProvider::new();
        let mut store = MockRecommendationStore::new();
        let mut seq = Sequence::new();

        provider
            .expect_summarize_library()
            .withf(|books| books == "Dune by Frank Herbert")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(sci_fi_summary()));
        provider
            .expect_generate_recommendations()
            .withf(|preferences| preferences == "likes sci-fi")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![RecommendedBook::new("Foundation", "Isaac Asimov")]));
        store
            .expect_write()
            .withf(|user_id, batch| {
                user_id == "alice"
                    && batch.books == vec![RecommendedBook::new("Foundation", "Isaac Asimov")]
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let before = Utc::now().timestamp_millis();
        let outcome = orchestrator(provider, store)
            .fetch("alice", &library(&[("Dune", "Frank Herbert")]), Trigger::Automatic)
            .await;
        let after = Utc::now().timestamp_millis();

        match outcome {
            FetchOutcome::Refreshed(batch) => {
                assert_eq!(batch.books.len(), 1);
                assert_eq!(batch.books[0].title, "Foundation");
                assert!(batch.timestamp >= before && batch.timestamp <= after);
            }
            other => panic!("expected Refreshed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_batch_truncated_to_cap() {
        let mut provider = MockBookAiProvider::new();
        let mut store = MockRecommendationStore::new();

        provider
            .expect_summarize_library()
            .returning(|_| Ok(sci_fi_summary()));
        provider.expect_generate_recommendations().returning(|_| {
            Ok((0..7)
                .map(|i| RecommendedBook::new(format!("Book {}", i), "Author"))
                .collect())
        });
        store
            .expect_write()
            .withf(|_, batch| batch.books.len() == 4)
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = orchestrator(provider, store)
            .fetch("alice", &library(&[("Dune", "Frank Herbert")]), Trigger::Manual)
            .await;

        assert!(matches!(outcome, FetchOutcome::Refreshed(ref batch) if batch.books.len() == 4));
    }

    #[tokio::test]
    async fn test_empty_library_clears_without_model_calls() {
        // No provider expectations: any call panics
        let provider = MockBookAiProvider::new();
        let mut store = MockRecommendationStore::new();
        store
            .expect_clear()
            .withf(|user_id| user_id == "alice")
            .times(1)
            .returning(|_| Ok(()));

        let outcome = orchestrator(provider, store)
            .fetch("alice", &OwnedLibrary::default(), Trigger::Manual)
            .await;

        assert!(matches!(outcome, FetchOutcome::Invalidated));
        assert!(outcome.notification().is_none());
    }

    #[tokio::test]
    async fn test_empty_summary_stops_before_generation() {
        let mut provider = MockBookAiProvider::new();
        let mut store = MockRecommendationStore::new();

        provider
            .expect_summarize_library()
            .times(1)
            .returning(|_| Ok(LibrarySummary::default()));
        provider.expect_generate_recommendations().never();
        store.expect_write().never();
        store.expect_clear().times(1).returning(|_| Ok(()));

        let outcome = orchestrator(provider, store)
            .fetch("alice", &library(&[("Dune", "Frank Herbert")]), Trigger::Automatic)
            .await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed {
                error: FetchError::EmptySummary,
                notification: None
            }
        ));
    }

    #[tokio::test]
    async fn test_summarization_failure_stops_pipeline() {
        let mut provider = MockBookAiProvider::new();
        let mut store = MockRecommendationStore::new();

        provider
            .expect_summarize_library()
            .returning(|_| Err(AppError::ExternalApi("quota exceeded".to_string())));
        provider.expect_generate_recommendations().never();
        store.expect_clear().times(1).returning(|_| Ok(()));

        let outcome = orchestrator(provider, store)
            .fetch("alice", &library(&[("Dune", "Frank Herbert")]), Trigger::Manual)
            .await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed {
                error: FetchError::SummarizationFailed(_),
                notification: Some(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_manual_generation_failure_notifies_user() {
        let mut provider = MockBookAiProvider::new();
        let mut store = MockRecommendationStore::new();

        provider
            .expect_summarize_library()
            .returning(|_| Ok(sci_fi_summary()));
        provider
            .expect_generate_recommendations()
            .returning(|_| Err(AppError::ExternalApi("model unavailable".to_string())));
        store.expect_write().never();
        store.expect_clear().times(1).returning(|_| Ok(()));

        let outcome = orchestrator(provider, store)
            .fetch("alice", &library(&[("Dune", "Frank Herbert")]), Trigger::Manual)
            .await;

        let notification = outcome.notification().cloned().unwrap();
        assert_eq!(notification.level, NotificationLevel::Error);
        assert_eq!(notification.message, REFRESH_FAILED_MESSAGE);
        assert!(matches!(
            outcome,
            FetchOutcome::Failed {
                error: FetchError::GenerationFailed(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_automatic_generation_failure_is_silent() {
        let mut provider = MockBookAiProvider::new();
        let mut store = MockRecommendationStore::new();

        provider
            .expect_summarize_library()
            .returning(|_| Ok(sci_fi_summary()));
        provider
            .expect_generate_recommendations()
            .returning(|_| Err(AppError::ExternalApi("model unavailable".to_string())));
        store.expect_clear().times(1).returning(|_| Ok(()));

        let outcome = orchestrator(provider, store)
            .fetch("alice", &library(&[("Dune", "Frank Herbert")]), Trigger::Automatic)
            .await;

        assert!(matches!(outcome, FetchOutcome::Failed { notification: None, .. }));
    }

    #[tokio::test]
    async fn test_store_write_failure_clears_slot() {
        let mut provider = MockBookAiProvider::new();
        let mut store = MockRecommendationStore::new();

        provider
            .expect_summarize_library()
            .returning(|_| Ok(sci_fi_summary()));
        provider
            .expect_generate_recommendations()
            .returning(|_| Ok(vec![RecommendedBook::new("Foundation", "Isaac Asimov")]));
        store
            .expect_write()
            .returning(|_, _| Err(AppError::Internal("disk full".to_string())));
        store.expect_clear().times(1).returning(|_| Ok(()));

        let outcome = orchestrator(provider, store)
            .fetch("alice", &library(&[("Dune", "Frank Herbert")]), Trigger::Automatic)
            .await;

        assert!(matches!(
            outcome,
            FetchOutcome::Failed {
                error: FetchError::Store(_),
                ..
            }
        ));
    }
}
