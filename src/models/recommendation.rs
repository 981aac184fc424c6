use serde::{Deserialize, Serialize};

use super::RecommendedBook;

/// The last successfully fetched set of recommendations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedRecommendationBatch {
    /// Fetch time, epoch milliseconds
    pub timestamp: i64,
    pub books: Vec<RecommendedBook>,
}

impl CachedRecommendationBatch {
    /// Builds a batch keeping at most `cap` books, in order
    pub fn new(timestamp: i64, mut books: Vec<RecommendedBook>, cap: usize) -> Self {
        books.truncate(cap);
        Self { timestamp, books }
    }

    /// Age relative to `now_ms`; negative when the timestamp lies in the future
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }
}

/// What the summarization model inferred from the user's library
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LibrarySummary {
    pub summary: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
}

impl LibrarySummary {
    pub fn is_empty(&self) -> bool {
        self.summary.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Error,
}

/// A user-visible message, shown by the client as a toast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Home-page recommendation state returned to the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    /// Cached recommendations minus the books the user already owns
    pub books: Vec<RecommendedBook>,
    /// True while a fetch is outstanding; the refresh control should be disabled
    pub loading: bool,
    /// Timestamp of the cached batch, if any
    pub fetched_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,
}

/// Short overview of a single book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookSummary {
    pub summary: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of a recommendation chat
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Chatbot answer; new recommendations only when the user asked for them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub chatbot_response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refined_recommendations: Option<String>,
}
