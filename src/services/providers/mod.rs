/// Language-model provider abstraction
///
/// Every text-generation call the service makes goes through `BookAiProvider`:
/// library summarization, recommendation generation, book search, single-book
/// summaries and chat refinement. Swapping the hosted model only means adding
/// another implementation.
use crate::{
    error::AppResult,
    models::{
        BookDetails, BookSearchResult, BookSummary, ChatReply, LibrarySummary, RecommendedBook,
    },
};

pub mod gemini;

pub use gemini::GeminiProvider;

/// Everything the chatbot sees when refining recommendations, pre-rendered as text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefinementContext {
    /// `"<title> by <author>"` lines of the user's library
    pub library: String,
    /// The user's stated preferences or reading summary
    pub preferences: String,
    /// Recommendations currently displayed
    pub current_recommendations: String,
    /// Earlier conversation, one `role: content` line per turn
    pub chat_history: String,
    /// The message being answered
    pub user_input: String,
}

/// Trait for hosted language-model providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BookAiProvider: Send + Sync {
    /// Infers reading preferences from newline-separated `"<title> by <author>"` lines.
    ///
    /// Blank input yields an empty summary without contacting the model.
    async fn summarize_library(&self, books: &str) -> AppResult<LibrarySummary>;

    /// Suggests books matching a free-text description of the reader's taste
    async fn generate_recommendations(&self, preferences: &str)
        -> AppResult<Vec<RecommendedBook>>;

    /// Finds real books matching a search query
    async fn search_books(&self, query: &str) -> AppResult<Vec<BookSearchResult>>;

    /// Condenses one book's details into a quick overview
    async fn summarize_book(&self, details: &BookDetails) -> AppResult<BookSummary>;

    /// Answers a chat message, producing new recommendations only when asked for
    async fn refine_recommendations(&self, context: &RefinementContext) -> AppResult<ChatReply>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
