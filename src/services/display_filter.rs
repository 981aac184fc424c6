use crate::models::{CachedRecommendationBatch, OwnedBookKey, OwnedLibrary, RecommendedBook};

/// Recommendations to show: the cached batch, in order, minus owned books.
///
/// Runs against the latest library snapshot on every read; the cached batch
/// itself is never modified.
pub fn visible_recommendations(
    batch: Option<&CachedRecommendationBatch>,
    library: &OwnedLibrary,
) -> Vec<RecommendedBook> {
    let Some(batch) = batch else {
        return Vec::new();
    };

    batch
        .books
        .iter()
        .filter(|book| !library.contains(&OwnedBookKey::new(&book.title, &book.author)))
        .cloned()
        .collect()
}
