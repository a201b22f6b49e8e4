//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the traversal loop:
//! - Fetch the listing page under the cursor
//! - Extract its item links; an empty listing ends the catalog
//! - Fetch and extract every item detail page, in document order
//! - Advance the cursor through the "next" control until it disappears
//!
//! Fetches are strictly sequential. A listing fetch failure ends the run with
//! the records gathered so far; item failures follow the configured
//! [`ItemFailurePolicy`].

use crate::config::{Config, ItemFailurePolicy};
use crate::crawler::detail::{extract_book, BookRecord};
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::parser::parse_listing;
use crate::state::CrawlPhase;
use crate::HarvestError;
use std::collections::HashSet;
use std::fmt;
use std::time::{Duration, Instant};
use url::Url;

/// Why a crawl run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The last listing page had no "next" control
    Exhausted,

    /// A listing page yielded no item links
    EmptyListing { url: String },

    /// The "next" control pointed at a listing page already visited
    PaginationCycle { url: String },

    /// A listing page could not be fetched
    ListingFailed { url: String, message: String },

    /// An item failed under [`ItemFailurePolicy::Abort`]
    ItemFailed { url: String, message: String },
}

impl Termination {
    /// Returns true if the run ended because of an error
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::ListingFailed { .. } | Self::ItemFailed { .. })
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => write!(f, "pagination exhausted"),
            Self::EmptyListing { url } => write!(f, "no items on listing page {}", url),
            Self::PaginationCycle { url } => write!(f, "pagination loops back to {}", url),
            Self::ListingFailed { url, message } => {
                write!(f, "listing page {} failed: {}", url, message)
            }
            Self::ItemFailed { url, message } => write!(f, "item {} failed: {}", url, message),
        }
    }
}

/// Result of one crawl run
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// Extracted records in visitation order
    pub records: Vec<BookRecord>,

    /// Number of listing pages fetched successfully
    pub listing_pages: usize,

    /// Item URLs skipped under [`ItemFailurePolicy::Skip`]
    pub skipped_items: Vec<String>,

    /// Why the run stopped
    pub termination: Termination,
}

/// Main crawler coordinator structure
///
/// One coordinator drives one crawl run over a single logical cursor.
pub struct Coordinator {
    fetcher: PageFetcher,
    base_url: Url,
    start_url: Url,
    request_delay: Duration,
    policy: ItemFailurePolicy,
    phase: CrawlPhase,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(HarvestError)` - Bad catalog URL or HTTP client construction failed
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = PageFetcher::new(&config.user_agent)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a coordinator around an existing fetcher
    pub fn with_fetcher(config: &Config, fetcher: PageFetcher) -> Result<Self, HarvestError> {
        Ok(Self {
            fetcher,
            base_url: config.base_url()?,
            start_url: config.first_listing_url()?,
            request_delay: Duration::from_millis(config.catalog.request_delay_ms),
            policy: config.catalog.item_failure_policy,
            phase: CrawlPhase::Init,
        })
    }

    /// Current phase of the loop
    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    /// Runs the traversal loop to completion
    ///
    /// Network and extraction failures never surface as `Err`; they end or
    /// shape the returned [`CrawlOutcome`].
    pub async fn run(&mut self) -> Result<CrawlOutcome, HarvestError> {
        self.phase = CrawlPhase::Init;
        tracing::info!(
            "Starting crawl at {} (item failure policy: {})",
            self.start_url,
            self.policy
        );

        let start_time = Instant::now();
        let mut records: Vec<BookRecord> = Vec::new();
        let mut skipped_items: Vec<String> = Vec::new();
        let mut visited: HashSet<Url> = HashSet::new();
        let mut listing_pages = 0;
        let mut cursor = self.start_url.clone();

        let termination = 'crawl: loop {
            self.transition(CrawlPhase::FetchingListing)?;
            visited.insert(cursor.clone());
            tracing::info!("Scraping listing page: {}", cursor);

            let body = match self.fetcher.fetch(&cursor).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::error!("Stopping crawl, listing page {} failed: {}", cursor, e);
                    break 'crawl Termination::ListingFailed {
                        url: cursor.to_string(),
                        message: e.to_string(),
                    };
                }
            };
            listing_pages += 1;
            self.pause().await;

            self.transition(CrawlPhase::ExtractingItems)?;
            let listing = parse_listing(&body, &cursor, &self.base_url);
            if listing.item_links.is_empty() {
                tracing::info!("No items found on {}, treating as end of catalog", cursor);
                break 'crawl Termination::EmptyListing {
                    url: cursor.to_string(),
                };
            }
            tracing::debug!("Found {} items on {}", listing.item_links.len(), cursor);

            self.transition(CrawlPhase::FetchingDetail)?;
            for item_url in &listing.item_links {
                tracing::debug!("Fetching item: {}", item_url);
                match self.fetch_item(item_url).await {
                    Ok(record) => records.push(record),
                    Err(e) => match self.policy {
                        ItemFailurePolicy::Skip => {
                            tracing::warn!("Skipping item {}: {}", item_url, e);
                            skipped_items.push(item_url.to_string());
                        }
                        ItemFailurePolicy::Abort => {
                            tracing::error!("Stopping crawl, item {} failed: {}", item_url, e);
                            break 'crawl Termination::ItemFailed {
                                url: item_url.to_string(),
                                message: e.to_string(),
                            };
                        }
                    },
                }
            }

            self.transition(CrawlPhase::ResolvingNext)?;
            match listing.next_page {
                Some(next) if visited.contains(&next) => {
                    tracing::warn!("Next page {} was already visited, stopping", next);
                    break 'crawl Termination::PaginationCycle {
                        url: next.to_string(),
                    };
                }
                Some(next) => cursor = next,
                None => {
                    tracing::info!("No next page after {}, pagination finished", cursor);
                    break 'crawl Termination::Exhausted;
                }
            }
        };

        self.transition(CrawlPhase::Done)?;

        tracing::info!(
            "Crawl finished ({}): {} records from {} listing pages, {} items skipped in {:?}",
            termination,
            records.len(),
            listing_pages,
            skipped_items.len(),
            start_time.elapsed()
        );

        Ok(CrawlOutcome {
            records,
            listing_pages,
            skipped_items,
            termination,
        })
    }

    /// Fetches and extracts one detail page
    async fn fetch_item(&self, url: &Url) -> Result<BookRecord, HarvestError> {
        let body = self.fetcher.fetch(url).await?;
        extract_book(&body, url)
    }

    async fn pause(&self) {
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<(), HarvestError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::trace!("Crawl phase {} -> {}", self.phase, next);
        self.phase = next;
        Ok(())
    }
}
