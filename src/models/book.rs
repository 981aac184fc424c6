use serde::{Deserialize, Serialize};

/// A book suggested by the language model, either as a recommendation or as a
/// search hit. Not owned by any list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Search results share the recommendation shape
pub type BookSearchResult = RecommendedBook;

impl RecommendedBook {
    /// Creates a book with only the required fields filled in
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            description: String::new(),
            image_url: String::new(),
            average_rating: None,
            page_count: None,
            publisher: None,
            language: None,
        }
    }
}

/// A book record stored inside one of the user's lists
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListedBook {
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ListedBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            description: None,
            image_url: None,
        }
    }
}

/// Input for a single-book overview
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookDetails {
    pub title: String,
    pub author: String,
    pub description: String,
}

/// A private or public book list document as loaded by the client
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookList {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub books: Vec<ListedBook>,
}

impl BookList {
    pub fn with_books(books: Vec<ListedBook>) -> Self {
        Self {
            books,
            ..Self::default()
        }
    }
}
