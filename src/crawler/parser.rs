//! Listing page parsing
//!
//! This module handles parsing catalog listing pages to extract:
//! - Item detail links (one per listing entry, in document order)
//! - The "next page" link that advances the crawl cursor

use scraper::{Html, Selector};
use url::Url;

/// Selector for one listing entry
const ITEM_SELECTOR: &str = "article.product_pod";

/// Selector for the detail link inside a listing entry
const ITEM_LINK_SELECTOR: &str = "h3 a[href]";

/// Selector for the pagination "next" control
const NEXT_SELECTOR: &str = "li.next a[href]";

/// Extracted information from a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// Absolute detail page URLs, in document order
    pub item_links: Vec<Url>,

    /// Absolute URL of the next listing page, if any
    pub next_page: Option<Url>,
}

/// Parses a listing page
///
/// # Arguments
///
/// * `html` - The listing page body
/// * `page_url` - URL of this listing page; item links are resolved against it
/// * `base_url` - Catalog base URL; the next-page link is resolved against it
///
/// # Example
///
/// ```
/// use catalog_harvest::crawler::parse_listing;
/// use url::Url;
///
/// let html = r#"<article class="product_pod"><h3><a href="olio_984/index.html">Olio</a></h3></article>
///               <ul class="pager"><li class="next"><a href="page-2.html">next</a></li></ul>"#;
/// let base = Url::parse("https://books.toscrape.com/catalogue/").unwrap();
/// let page = base.join("page-1.html").unwrap();
/// let listing = parse_listing(html, &page, &base);
/// assert_eq!(listing.item_links[0].as_str(), "https://books.toscrape.com/catalogue/olio_984/index.html");
/// assert_eq!(listing.next_page.unwrap().as_str(), "https://books.toscrape.com/catalogue/page-2.html");
/// ```
pub fn parse_listing(html: &str, page_url: &Url, base_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);

    ListingPage {
        item_links: extract_item_links(&document, page_url),
        next_page: resolve_next_page(&document, base_url),
    }
}

/// Collects the detail link of every listing entry
///
/// Entries without a usable link are skipped.
pub fn extract_item_links(document: &Html, page_url: &Url) -> Vec<Url> {
    let (Ok(item_selector), Ok(link_selector)) = (
        Selector::parse(ITEM_SELECTOR),
        Selector::parse(ITEM_LINK_SELECTOR),
    ) else {
        return Vec::new();
    };

    document
        .select(&item_selector)
        .filter_map(|item| {
            let href = item.select(&link_selector).next()?.value().attr("href")?;
            let resolved = resolve_link(href, page_url);
            if resolved.is_none() {
                tracing::debug!("Ignoring unusable item link '{}' on {}", href, page_url);
            }
            resolved
        })
        .collect()
}

/// Finds the next listing page
///
/// Returns `None` when the page has no "next" control, which ends the crawl.
pub fn resolve_next_page(document: &Html, base_url: &Url) -> Option<Url> {
    let selector = Selector::parse(NEXT_SELECTOR).ok()?;
    let href = document.select(&selector).next()?.value().attr("href")?;
    resolve_link(href, base_url)
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel:, data: schemes
/// - Fragment-only links
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" {
        Some(absolute_url)
    } else {
        None
    }
}
