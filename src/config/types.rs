use serde::Deserialize;
use std::fmt;

/// Main configuration structure for Catalog-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Target catalog and traversal behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the catalog; next-page links are resolved against it
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// First listing page, relative to the base URL
    #[serde(rename = "first-page", default = "default_first_page")]
    pub first_page: String,

    /// Pause after each listing page fetch (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay_ms")]
    pub request_delay_ms: u64,

    /// What to do when a single item page cannot be fetched or extracted
    #[serde(rename = "item-failure-policy", default)]
    pub item_failure_policy: ItemFailurePolicy,
}

/// Handling of a per-item fetch or extraction failure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemFailurePolicy {
    /// Log the item URL, record it as skipped and continue with the next item
    #[default]
    Skip,

    /// End the run; records accumulated before the failure are kept
    Abort,
}

impl fmt::Display for ItemFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Optional CSV export written after each successful run
    #[serde(rename = "csv-path", default)]
    pub csv_path: Option<String>,
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Socket address to listen on
    #[serde(rename = "bind-address", default = "default_bind_address")]
    pub bind_address: String,

    /// HS256 secret used to verify bearer JWTs on the crawl trigger
    #[serde(rename = "jwt-secret", default)]
    pub jwt_secret: Option<String>,

    /// Run the pipeline in the background when the server starts
    #[serde(rename = "crawl-on-startup", default)]
    pub crawl_on_startup: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            jwt_secret: None,
            crawl_on_startup: false,
        }
    }
}

fn default_first_page() -> String {
    "page-1.html".to_string()
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}
