//! State module for tracking crawl progress
//!
//! - `CrawlPhase`: the phase of the traversal loop (fetching a listing,
//!   extracting items, fetching details, resolving the next page, done)

mod crawl_phase;

pub use crawl_phase::CrawlPhase;
