/// Gemini provider
///
/// Talks to the Gemini `generateContent` REST endpoint in JSON response mode.
/// Each operation renders a prompt describing the expected JSON shape, then
/// deserializes the model's text reply into our types.
///
/// API Flow:
/// POST {api_url}/v1beta/models/{model}:generateContent
///   → candidates[0].content.parts[*].text holds the JSON document
use crate::{
    error::{AppError, AppResult},
    models::{
        BookDetails, BookSearchResult, BookSummary, ChatReply, LibrarySummary, RecommendedBook,
    },
    services::providers::{BookAiProvider, RefinementContext},
};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct GeminiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

/// Wrapper shape requested for list-valued answers
#[derive(Debug, Deserialize)]
struct BooksEnvelope {
    #[serde(default)]
    books: Vec<RecommendedBook>,
}

impl GenerateContentResponse {
    /// Joins the text parts of the first candidate
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn library_summary_prompt(books: &str) -> String {
    format!(
        r#"You are an expert literary analyst. Infer the reading preferences of a user from the books in their library.

- Write one concise sentence summarizing their overall taste.
- List the genres they most likely prefer.
- List recurring themes or topics they seem to enjoy.

User's library:
{books}

Reply with a JSON object: {{"summary": string, "genres": [string], "themes": [string]}}"#
    )
}

fn recommendations_prompt(preferences: &str) -> String {
    format!(
        r#"You are a book recommendation expert. Suggest 3-5 real books the user is likely to enjoy, based on their reading preferences.

For each book give the title, the author, a one or two sentence description explaining why it fits, and a URL of a cover image. Include averageRating, pageCount, publisher and language when known.

User preferences: {preferences}

Reply with a JSON object: {{"books": [{{"title": string, "author": string, "description": string, "imageUrl": string, "averageRating": number, "pageCount": number, "publisher": string, "language": string}}]}}"#
    )
}

fn search_prompt(query: &str) -> String {
    format!(
        r#"You are a book search engine. Return real books matching the user's query. For each book give the title, the author, a short (1-2 sentence) description and a cover image URL. Draw from a wide range of cultures, including Indian literature.

User query: {query}

Reply with a JSON object holding at most 5 books: {{"books": [{{"title": string, "author": string, "description": string, "imageUrl": string}}]}}"#
    )
}

fn book_summary_prompt(details: &BookDetails) -> String {
    format!(
        r#"Summarize the following book concisely for a reader who wants a quick overview.

Title: {}
Author: {}
Description: {}

Reply with a JSON object: {{"summary": string}}"#,
        details.title, details.author, details.description
    )
}

fn refinement_prompt(context: &RefinementContext) -> String {
    format!(
        r#"You are a friendly, expert book recommendation chatbot helping a user discover books they will love.

- User's library: {}
- User's preferences: {}
- Current recommendations: {}
- Conversation so far:
{}

The user just said: "{}"

If the user asks for different or refined recommendations, or is unhappy with the current ones, produce a new list of recommendations. If they ask about a specific book or a general question, answer it without new recommendations. If they are just chatting, reply conversationally. Keep it concise and friendly.

Reply with a JSON object: {{"chatbotResponse": string, "refinedRecommendations": string or null}}"#,
        context.library,
        context.preferences,
        context.current_recommendations,
        context.chat_history,
        context.user_input
    )
}

impl GeminiProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
        }
    }

    /// Sends a prompt and deserializes the JSON reply
    async fn generate_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        prompt: String,
    ) -> AppResult<T> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        );

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                operation,
                status = %status,
                body = %body,
                "Gemini request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let parsed: GenerateContentResponse = response.json().await?;
        let text = parsed.into_text().ok_or_else(|| {
            AppError::ExternalApi(format!("Gemini returned no content for {}", operation))
        })?;

        tracing::debug!(operation, response = %text, "Raw Gemini response");

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                operation,
                error = %e,
                response = %text,
                "Failed to parse Gemini output"
            );
            AppError::ExternalApi(format!("Failed to parse Gemini output: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl BookAiProvider for GeminiProvider {
    #[tracing::instrument(skip_all, fields(provider = "gemini"))]
    async fn summarize_library(&self, books: &str) -> AppResult<LibrarySummary> {
        if books.trim().is_empty() {
            return Ok(LibrarySummary::default());
        }

        let summary: LibrarySummary = self
            .generate_json("summarize_library", library_summary_prompt(books))
            .await?;

        tracing::info!(
            genres = summary.genres.len(),
            themes = summary.themes.len(),
            provider = "gemini",
            "Library summarized"
        );

        Ok(summary)
    }

    #[tracing::instrument(skip(self), fields(provider = "gemini"))]
    async fn generate_recommendations(
        &self,
        preferences: &str,
    ) -> AppResult<Vec<RecommendedBook>> {
        let envelope: BooksEnvelope = self
            .generate_json("generate_recommendations", recommendations_prompt(preferences))
            .await?;

        tracing::info!(
            results = envelope.books.len(),
            provider = "gemini",
            "Recommendations generated"
        );

        Ok(envelope.books)
    }

    #[tracing::instrument(skip(self), fields(provider = "gemini"))]
    async fn search_books(&self, query: &str) -> AppResult<Vec<BookSearchResult>> {
        let envelope: BooksEnvelope = self
            .generate_json("search_books", search_prompt(query))
            .await?;

        tracing::info!(
            query = %query,
            results = envelope.books.len(),
            provider = "gemini",
            "Book search completed"
        );

        Ok(envelope.books)
    }

    #[tracing::instrument(skip_all, fields(provider = "gemini", title = %details.title))]
    async fn summarize_book(&self, details: &BookDetails) -> AppResult<BookSummary> {
        self.generate_json("summarize_book", book_summary_prompt(details))
            .await
    }

    #[tracing::instrument(skip_all, fields(provider = "gemini"))]
    async fn refine_recommendations(&self, context: &RefinementContext) -> AppResult<ChatReply> {
        self.generate_json("refine_recommendations", refinement_prompt(context))
            .await
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
