//! Configuration module for Catalog-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is built once at startup and passed by reference to
//! the fetcher, the crawl coordinator and the storage layer.
//!
//! # Example
//!
//! ```no_run
//! use catalog_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Crawling catalog at: {}", config.catalog.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, CatalogConfig, Config, ItemFailurePolicy, OutputConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;

use url::Url;

impl Config {
    /// Parsed catalog base URL
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.catalog.base_url)
    }

    /// Absolute URL of the first listing page
    pub fn first_listing_url(&self) -> Result<Url, url::ParseError> {
        self.base_url()?.join(&self.catalog.first_page)
    }
}
