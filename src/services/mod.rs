pub mod book_search;
pub mod display_filter;
pub mod orchestrator;
pub mod providers;
pub mod recommendations;
pub mod session;
pub mod staleness;

pub use recommendations::RecommendationService;
