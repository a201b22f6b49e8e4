/// Phases of a single crawl run
///
/// The coordinator walks these phases in order for every listing page and
/// checks each step with [`CrawlPhase::can_transition_to`].
use std::fmt;

/// Current phase of the crawl loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Cursor set to the first listing page, accumulator empty
    Init,

    /// Fetching the listing page under the cursor
    FetchingListing,

    /// Collecting item detail links from the listing page
    ExtractingItems,

    /// Fetching and extracting item detail pages, in document order
    FetchingDetail,

    /// Looking for the next listing page
    ResolvingNext,

    /// Terminal: the accumulated records are returned
    Done,
}

impl CrawlPhase {
    /// Returns true once the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if the loop may move from `self` to `next`
    ///
    /// Every non-terminal phase may end the run. `Done` accepts nothing.
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == Self::Done {
            return true;
        }

        matches!(
            (self, next),
            (Self::Init, Self::FetchingListing)
                | (Self::FetchingListing, Self::ExtractingItems)
                | (Self::ExtractingItems, Self::FetchingDetail)
                | (Self::FetchingDetail, Self::ResolvingNext)
                | (Self::ResolvingNext, Self::FetchingListing)
        )
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::FetchingListing => "fetching_listing",
            Self::ExtractingItems => "extracting_items",
            Self::FetchingDetail => "fetching_detail",
            Self::ResolvingNext => "resolving_next",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
