//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building one HTTP client per crawl run with a proper user agent string
//! - GET requests for listing and detail pages
//! - Classifying transport and status failures as network errors
//!
//! There is no retry: a failed fetch is reported to the coordinator, which
//! decides whether the run continues.

use crate::config::UserAgentConfig;
use crate::HarvestError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use url::Url;

/// Formats the user agent: `CrawlerName/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::config::UserAgentConfig;
/// use catalog_harvest::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "CatalogHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Page fetcher sharing one connection pool across a crawl run
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// Creates a fetcher with a freshly built client
    pub fn new(config: &UserAgentConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Fetches a page body
    ///
    /// # Failure Classification
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | HTTP 2xx | body text |
    /// | HTTP 4xx / 5xx | `Network` with the status line |
    /// | Timeout | `Network` "request timeout" |
    /// | Connection refused / DNS / TLS | `Network` "connection failed" |
    /// | Body read failure | `Network` with the reader error |
    pub async fn fetch(&self, url: &Url) -> Result<String, HarvestError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| network_error(url, classify_transport_error(&e)))?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(network_error(url, format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| network_error(url, format!("failed to read body: {}", e)))
    }
}

fn classify_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        format!("connection failed: {}", error)
    } else if error.is_redirect() {
        format!("redirect error: {}", error)
    } else {
        error.to_string()
    }
}

fn network_error(url: &Url, message: String) -> HarvestError {
    HarvestError::Network {
        url: url.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&create_test_config()).is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        assert_eq!(
            user_agent_string(&create_test_config()),
            "TestCrawler/1.0 (+https://example.com/about; admin@example.com)"
        );
    }

    #[tokio::test]
    async fn test_fetch_success_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page-1.html"))
            .and(header(
                "user-agent",
                "TestCrawler/1.0 (+https://example.com/about; admin@example.com)",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(&create_test_config()).unwrap();
        let url = Url::parse(&format!("{}/page-1.html", server.uri())).unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.html"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/broken.html"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(&create_test_config()).unwrap();
        for (page, code) in [("missing.html", "404"), ("broken.html", "503")] {
            let url = Url::parse(&format!("{}/{}", server.uri(), page)).unwrap();
            match fetcher.fetch(&url).await.unwrap_err() {
                HarvestError::Network { url: failed, message } => {
                    assert_eq!(failed, url.to_string());
                    assert!(message.contains(code), "{}", message);
                }
                other => panic!("unexpected error: {}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let fetcher = PageFetcher::new(&create_test_config()).unwrap();
        // Port 9 (discard) is closed on test hosts
        let url = Url::parse("http://127.0.0.1:9/page-1.html").unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, HarvestError::Network { .. }), "{}", err);
    }
}
