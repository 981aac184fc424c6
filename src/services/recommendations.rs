use chrono::Utc;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{
        BookList, CachedRecommendationBatch, ChatReply, ChatRole, ChatTurn, Notification,
        OwnedLibrary, RecommendationView,
    },
    services::{
        display_filter::visible_recommendations,
        orchestrator::{FetchOutcome, RecommendationOrchestrator, Trigger},
        providers::{BookAiProvider, RefinementContext},
        session::SessionRegistry,
        staleness::StalenessPolicy,
    },
    store::RecommendationStore,
};

/// Home-page recommendations for signed-in users.
///
/// Holds the per-user session state (owned-book snapshot, in-flight flag),
/// decides when to refetch, and renders the filtered view.
pub struct RecommendationService {
    provider: Arc<dyn BookAiProvider>,
    store: Arc<dyn RecommendationStore>,
    orchestrator: RecommendationOrchestrator,
    sessions: Arc<SessionRegistry>,
    policy: StalenessPolicy,
}

impl RecommendationService {
    pub fn new(
        provider: Arc<dyn BookAiProvider>,
        store: Arc<dyn RecommendationStore>,
        policy: StalenessPolicy,
        max_recommendations: usize,
    ) -> Self {
        let orchestrator = RecommendationOrchestrator::new(
            Arc::clone(&provider),
            Arc::clone(&store),
            max_recommendations,
        );

        Self {
            provider,
            store,
            orchestrator,
            sessions: Arc::new(SessionRegistry::new()),
            policy,
        }
    }

    /// The client finished loading the user's lists: replace the owned-book
    /// snapshot and refresh in the background if the cache is stale.
    pub async fn library_loaded(
        &self,
        user_id: &str,
        private_lists: &[BookList],
        public_lists: &[BookList],
    ) -> RecommendationView {
        let library = OwnedLibrary::aggregate(private_lists, public_lists);
        tracing::debug!(
            user_id = %user_id,
            owned_books = library.len(),
            "Library snapshot updated"
        );
        self.sessions.replace_library(user_id, library);

        let outcome = self.trigger(user_id, Trigger::Automatic).await;
        self.render(user_id, outcome.notification().cloned()).await
    }

    /// Explicit refresh requested by the user
    pub async fn refresh(&self, user_id: &str) -> RecommendationView {
        let outcome = self.trigger(user_id, Trigger::Manual).await;
        self.render(user_id, outcome.notification().cloned()).await
    }

    /// Current recommendations, filtered against the latest library snapshot
    pub async fn view(&self, user_id: &str) -> RecommendationView {
        self.render(user_id, None).await
    }

    /// Answers a recommendation chat message in the context of the user's
    /// library and current recommendations
    pub async fn chat(
        &self,
        user_id: &str,
        preferences: &str,
        history: &[ChatTurn],
        message: &str,
    ) -> AppResult<ChatReply> {
        if message.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Chat message cannot be empty".to_string(),
            ));
        }

        let session = self.sessions.snapshot(user_id);
        let cached = self.cached(user_id).await;
        let current = visible_recommendations(cached.as_ref(), &session.library);

        let context = RefinementContext {
            library: session.library.to_prompt_text(),
            preferences: preferences.to_string(),
            current_recommendations: current
                .iter()
                .map(|book| format!("{} by {}", book.title, book.author))
                .collect::<Vec<_>>()
                .join("\n"),
            chat_history: render_history(history),
            user_input: message.to_string(),
        };

        let reply = self.provider.refine_recommendations(&context).await?;

        tracing::info!(
            user_id = %user_id,
            refined = reply.refined_recommendations.is_some(),
            "Chat reply generated"
        );

        Ok(reply)
    }

    async fn trigger(&self, user_id: &str, trigger: Trigger) -> FetchOutcome {
        let Some(_guard) = self.sessions.try_begin_fetch(user_id) else {
            tracing::debug!(user_id = %user_id, trigger = ?trigger, "Fetch already in flight");
            return FetchOutcome::InFlight;
        };

        let cached = self.cached(user_id).await;
        let now = Utc::now().timestamp_millis();
        if !self
            .policy
            .should_fetch(cached.as_ref(), trigger.is_forced(), now)
        {
            tracing::debug!(user_id = %user_id, "Cached recommendations are fresh");
            return FetchOutcome::Fresh;
        }

        let library = self.sessions.snapshot(user_id).library;
        self.orchestrator.fetch(user_id, &library, trigger).await
    }

    /// Reads the user's slot; an unreadable slot counts as empty so the next
    /// fetch overwrites it
    async fn cached(&self, user_id: &str) -> Option<CachedRecommendationBatch> {
        match self.store.read(user_id).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Failed to read recommendation cache"
                );
                None
            }
        }
    }

    async fn render(
        &self,
        user_id: &str,
        notification: Option<Notification>,
    ) -> RecommendationView {
        let session = self.sessions.snapshot(user_id);
        let cached = self.cached(user_id).await;

        RecommendationView {
            books: visible_recommendations(cached.as_ref(), &session.library),
            loading: session.in_flight,
            fetched_at: cached.map(|batch| batch.timestamp),
            notification,
        }
    }
}

fn render_history(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| {
            let role = match turn.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            format!("{}: {}", role, turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LibrarySummary, ListedBook, RecommendedBook};
    use crate::services::orchestrator::{DEFAULT_MAX_RECOMMENDATIONS, REFRESH_FAILED_MESSAGE};
    use crate::services::providers::MockBookAiProvider;
    use crate::store::FileStore;
    use std::time::Duration;
    use tempfile::TempDir;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn lists(books: &[(&str, &str)]) -> Vec<BookList> {
        vec![BookList::with_books(
            books
                .iter()
                .map(|(title, author)| ListedBook::new(*title, *author))
                .collect(),
        )]
    }

    fn service(provider: MockBookAiProvider, temp_dir: &TempDir) -> RecommendationService {
        RecommendationService::new(
            Arc::new(provider),
            Arc::new(FileStore::new(temp_dir.path().to_path_buf())),
            StalenessPolicy::new(Duration::from_secs(3600)),
            DEFAULT_MAX_RECOMMENDATIONS,
        )
    }

    fn seed_library(
        service: &RecommendationService,
        private_lists: &[BookList],
        public_lists: &[BookList],
    ) {
        service.sessions.replace_library(
            "alice",
            OwnedLibrary::aggregate(private_lists, public_lists),
        );
    }

    fn store(temp_dir: &TempDir) -> FileStore {
        FileStore::new(temp_dir.path().to_path_buf())
    }

    fn succeeding_provider(times: usize) -> MockBookAiProvider {
        let mut provider = MockBookAiProvider::new();
        provider
            .expect_summarize_library()
            .times(times)
            .returning(|_| {
                Ok(LibrarySummary {
                    summary: "likes sci-fi".to_string(),
                    genres: vec!["sci-fi".to_string()],
                    themes: vec!["space".to_string()],
                })
            });
        provider
            .expect_generate_recommendations()
            .times(times)
            .returning(|_| {
                Ok(vec![
                    RecommendedBook::new("Dune", "Frank Herbert"),
                    RecommendedBook::new("Foundation", "Isaac Asimov"),
                ])
            });
        provider
    }

    #[tokio::test]
    async fn test_library_loaded_fetches_when_cache_absent() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(succeeding_provider(1), &temp_dir);

        let view = service
            .library_loaded("alice", &lists(&[("Dune", "Frank Herbert")]), &[])
            .await;

        // Dune is owned, so only Foundation is shown
        assert_eq!(view.books, vec![RecommendedBook::new("Foundation", "Isaac Asimov")]);
        assert!(!view.loading);
        assert!(view.fetched_at.is_some());
        assert!(view.notification.is_none());

        let stored = store(&temp_dir).read("alice").await.unwrap().unwrap();
        assert_eq!(stored.books.len(), 2);
    }

    #[tokio::test]
    async fn test_fresh_cache_is_reused() {
        let temp_dir = TempDir::new().unwrap();
        let fresh = CachedRecommendationBatch::new(
            Utc::now().timestamp_millis() - HOUR_MS / 2,
            vec![RecommendedBook::new("Hyperion", "Dan Simmons")],
            4,
        );
        store(&temp_dir).write("alice", &fresh).await.unwrap();

        // No expectations: a model call would panic
        let service = service(MockBookAiProvider::new(), &temp_dir);
        let view = service
            .library_loaded("alice", &lists(&[("Dune", "Frank Herbert")]), &[])
            .await;

        assert_eq!(view.books, fresh.books);
        assert_eq!(view.fetched_at, Some(fresh.timestamp));
    }

    #[tokio::test]
    async fn test_stale_cache_is_refetched() {
        let temp_dir = TempDir::new().unwrap();
        let stale = CachedRecommendationBatch::new(
            Utc::now().timestamp_millis() - 2 * HOUR_MS,
            vec![RecommendedBook::new("Hyperion", "Dan Simmons")],
            4,
        );
        store(&temp_dir).write("alice", &stale).await.unwrap();

        let service = service(succeeding_provider(1), &temp_dir);
        let view = service
            .library_loaded("alice", &lists(&[("Emma", "Jane Austen")]), &[])
            .await;

        assert_eq!(view.books.len(), 2);
        assert!(view.fetched_at.unwrap() > stale.timestamp);
    }

    #[tokio::test]
    async fn test_refresh_forces_fetch_over_fresh_cache() {
        let temp_dir = TempDir::new().unwrap();
        let fresh = CachedRecommendationBatch::new(
            Utc::now().timestamp_millis(),
            vec![RecommendedBook::new("Hyperion", "Dan Simmons")],
            4,
        );
        store(&temp_dir).write("alice", &fresh).await.unwrap();

        let service = service(succeeding_provider(1), &temp_dir);
        seed_library(&service, &lists(&[("Emma", "Jane Austen")]), &[]);

        let view = service.refresh("alice").await;

        let titles: Vec<&str> = view.books.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Foundation"]);
    }

    #[tokio::test]
    async fn test_empty_library_clears_cache() {
        let temp_dir = TempDir::new().unwrap();
        let stale = CachedRecommendationBatch::new(
            0,
            vec![RecommendedBook::new("Hyperion", "Dan Simmons")],
            4,
        );
        store(&temp_dir).write("alice", &stale).await.unwrap();

        let service = service(MockBookAiProvider::new(), &temp_dir);
        let view = service.library_loaded("alice", &[], &[]).await;

        assert!(view.books.is_empty());
        assert_eq!(view.fetched_at, None);
        assert!(view.notification.is_none());
        assert_eq!(store(&temp_dir).read("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_manual_refresh_failure_clears_and_notifies() {
        let temp_dir = TempDir::new().unwrap();
        let previous = CachedRecommendationBatch::new(
            Utc::now().timestamp_millis(),
            vec![RecommendedBook::new("Hyperion", "Dan Simmons")],
            4,
        );
        store(&temp_dir).write("alice", &previous).await.unwrap();

        let mut provider = MockBookAiProvider::new();
        provider
            .expect_summarize_library()
            .returning(|_| {
                Ok(LibrarySummary {
                    summary: "likes sci-fi".to_string(),
                    ..LibrarySummary::default()
                })
            });
        provider
            .expect_generate_recommendations()
            .returning(|_| Err(AppError::ExternalApi("model unavailable".to_string())));

        let service = service(provider, &temp_dir);
        seed_library(&service, &lists(&[("Dune", "Frank Herbert")]), &[]);

        let view = service.refresh("alice").await;

        assert!(view.books.is_empty());
        assert_eq!(view.notification.unwrap().message, REFRESH_FAILED_MESSAGE);
        assert_eq!(store(&temp_dir).read("alice").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_trigger_while_in_flight_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(MockBookAiProvider::new(), &temp_dir);
        seed_library(&service, &lists(&[("Dune", "Frank Herbert")]), &[]);

        let _guard = service.sessions.try_begin_fetch("alice").unwrap();
        let view = service.refresh("alice").await;

        assert!(view.loading);
        assert!(view.books.is_empty());
        assert!(view.notification.is_none());
    }

    #[tokio::test]
    async fn test_view_filters_against_latest_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let batch = CachedRecommendationBatch::new(
            Utc::now().timestamp_millis(),
            vec![
                RecommendedBook::new("Dune", "Frank Herbert"),
                RecommendedBook::new("Foundation", "Isaac Asimov"),
            ],
            4,
        );
        store(&temp_dir).write("alice", &batch).await.unwrap();
        let service = service(MockBookAiProvider::new(), &temp_dir);

        assert_eq!(service.view("alice").await.books.len(), 2);

        seed_library(&service, &[], &lists(&[("dune", "frank herbert")]));

        assert_eq!(
            service.view("alice").await.books,
            vec![RecommendedBook::new("Foundation", "Isaac Asimov")]
        );
        // The cache itself is untouched
        assert_eq!(store(&temp_dir).read("alice").await.unwrap(), Some(batch));
    }

    #[tokio::test]
    async fn test_chat_builds_context() {
        let temp_dir = TempDir::new().unwrap();
        let mut provider = MockBookAiProvider::new();
        provider
            .expect_refine_recommendations()
            .withf(|context| {
                context.library == "Dune by Frank Herbert"
                    && context.preferences == "space opera"
                    && context.chat_history == "user: hi\nassistant: hello!"
                    && context.user_input == "something shorter?"
            })
            .times(1)
            .returning(|_| {
                Ok(ChatReply {
                    chatbot_response: "Try these.".to_string(),
                    refined_recommendations: Some("Foundation by Isaac Asimov".to_string()),
                })
            });

        let service = service(provider, &temp_dir);
        seed_library(&service, &lists(&[("Dune", "Frank Herbert")]), &[]);

        let history = vec![
            ChatTurn {
                role: ChatRole::User,
                content: "hi".to_string(),
            },
            ChatTurn {
                role: ChatRole::Assistant,
                content: "hello!".to_string(),
            },
        ];
        let reply = service
            .chat("alice", "space opera", &history, "something shorter?")
            .await
            .unwrap();

        assert_eq!(reply.chatbot_response, "Try these.");
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_message() {
        let temp_dir = TempDir::new().unwrap();
        let service = service(MockBookAiProvider::new(), &temp_dir);

        let result = service.chat("alice", "", &[], "   ").await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
