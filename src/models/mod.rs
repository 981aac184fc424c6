mod book;
mod library;
mod recommendation;

pub use book::{BookDetails, BookList, BookSearchResult, ListedBook, RecommendedBook};
pub use library::{OwnedBookKey, OwnedLibrary};
pub use recommendation::{
    BookSummary, CachedRecommendationBatch, ChatReply, ChatRole, ChatTurn, LibrarySummary,
    Notification, NotificationLevel, RecommendationView,
};
