//! Fetch gateway.
//!
//! [`FetchGateway`] is the seam between sources and the network. The
//! production implementation, [`HttpFetcher`], downloads feeds with reqwest
//! and parses RSS/Atom/JSON feeds with feed-rs.

use std::future::Future;
use std::time::Duration;

use feed_rs::parser;
use reqwest::Client;
use tracing::debug;

use crate::config::FetchConfig;
use crate::feed::types::{FetchedFeed, RawEntry};
use crate::{FeederError, Result};

/// Retrieves and parses a feed URL.
pub trait FetchGateway {
    /// Fetch `url`.
    ///
    /// A response with a non-success status is returned as a
    /// [`FetchedFeed`] carrying that status and no entries. Transport,
    /// size and parse failures are errors.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedFeed>> + Send;
}

/// Checks whether a URL can be reached before it is added to the registry.
pub trait ReachabilityCheck {
    fn is_reachable(&self, url: &str) -> impl Future<Output = bool> + Send;
}

/// HTTP implementation of [`FetchGateway`] and [`ReachabilityCheck`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_feed_size: u64,
}

impl HttpFetcher {
    /// Build a fetcher from the fetch settings.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FeederError::Fetch(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    async fn fetch_inner(&self, url: &str) -> Result<FetchedFeed> {
        validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeederError::Fetch(format!("failed to fetch feed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            debug!("'{}' answered {}", url, status);
            return Ok(FetchedFeed::with_status(status.as_u16()));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FeederError::Fetch(format!(
                    "feed too large: {} bytes (max {} bytes)",
                    content_length, self.max_feed_size
                )));
            }
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FeederError::Fetch(format!("failed to read response: {}", e)))?;

        if bytes.len() as u64 > self.max_feed_size {
            return Err(FeederError::Fetch(format!(
                "feed too large: {} bytes (max {} bytes)",
                bytes.len(),
                self.max_feed_size
            )));
        }

        let mut feed = parse_feed(&bytes)?;
        feed.status = status.as_u16();
        Ok(feed)
    }

    async fn check_reachable(&self, url: &str) -> bool {
        if let Err(e) = validate_url(url) {
            debug!("'{}' rejected: {}", url, e);
            return false;
        }

        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("'{}' unreachable: {}", url, e);
                false
            }
        }
    }
}

impl FetchGateway for HttpFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedFeed>> + Send {
        self.fetch_inner(url)
    }
}

impl ReachabilityCheck for HttpFetcher {
    fn is_reachable(&self, url: &str) -> impl Future<Output = bool> + Send {
        self.check_reachable(url)
    }
}

/// Validate that a URL is an absolute http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<()> {
    let parsed =
        url::Url::parse(url).map_err(|e| FeederError::Validation(format!("invalid URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FeederError::Validation(format!(
                "unsupported URL scheme: {}",
                scheme
            )));
        }
    }

    match parsed.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(FeederError::Validation("URL has no host".to_string())),
    }
}

/// Parse feed bytes into a [`FetchedFeed`] with status 200.
///
/// Summaries are passed through untouched; markup is stripped during
/// normalization.
pub fn parse_feed(bytes: &[u8]) -> Result<FetchedFeed> {
    let feed = parser::parse(bytes)
        .map_err(|e| FeederError::Fetch(format!("failed to parse feed: {}", e)))?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| RawEntry {
            title: entry.title.map(|t| t.content),
            link: entry.links.first().map(|l| l.href.clone()),
            summary: entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body)),
            updated: entry.updated,
            published: entry.published,
        })
        .collect();

    Ok(FetchedFeed {
        status: 200,
        title: feed.title.map(|t| t.content),
        updated: feed.updated,
        published: feed.published,
        entries,
    })
}
