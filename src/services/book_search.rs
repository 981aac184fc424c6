use crate::{
    error::{AppError, AppResult},
    models::{BookDetails, BookSearchResult, BookSummary},
    services::providers::BookAiProvider,
};
use std::sync::Arc;

/// Service function for book search
///
/// Delegates to the configured BookAiProvider and caps the result count, since
/// the model does not always honor the limit stated in the prompt.
pub async fn search_books(
    provider: Arc<dyn BookAiProvider>,
    query: &str,
    limit: usize,
) -> AppResult<Vec<BookSearchResult>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput(
            "Search query cannot be empty".to_string(),
        ));
    }

    let mut books = provider.search_books(query).await?;
    books.truncate(limit);
    Ok(books)
}

/// Service function for single-book overviews
pub async fn summarize_book(
    provider: Arc<dyn BookAiProvider>,
    details: &BookDetails,
) -> AppResult<BookSummary> {
    if details.title.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Book title cannot be empty".to_string(),
        ));
    }

    provider.summarize_book(details).await
}
