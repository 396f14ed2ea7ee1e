//! A single feed source: its endpoint, articles and freshness metadata.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::datetime::format_optional;
use crate::feed::article::{normalize, Article};
use crate::feed::fetcher::FetchGateway;
use crate::feed::store::ArticleStore;
use crate::feed::types::{FetchedFeed, FILENAME_MIN_LEN, SOURCE_FILE_EXTENSION};
use crate::Result;

/// Flat, persistable description of a source (one row of the source list).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceDescriptor {
    pub url: String,
    pub name: String,
    pub subname: String,
    /// Article file path; empty means "derive it".
    pub filename: String,
    /// Last known freshness time.
    pub updated: Option<DateTime<Utc>>,
}

/// One configured feed endpoint.
#[derive(Debug, Clone)]
pub struct Source {
    url: String,
    name: String,
    subname: String,
    filename: PathBuf,
    file_time: Option<DateTime<Utc>>,

    title: String,
    status: Option<u16>,
    valid: bool,
    store: ArticleStore,

    feed_time: Option<DateTime<Utc>>,
    article_time: Option<DateTime<Utc>>,
    time: Option<DateTime<Utc>>,
}

impl Source {
    /// Create a source whose article file lives in `data_dir`.
    pub fn new(
        url: impl AsRef<str>,
        name: impl Into<String>,
        subname: impl Into<String>,
        data_dir: &Path,
    ) -> Self {
        Self::from_descriptor(
            SourceDescriptor {
                url: url.as_ref().to_string(),
                name: name.into(),
                subname: subname.into(),
                ..Default::default()
            },
            data_dir,
        )
    }

    /// Rebuild a source from a persisted descriptor.
    ///
    /// A stored filename is kept as-is; an empty one is derived.
    pub fn from_descriptor(descriptor: SourceDescriptor, data_dir: &Path) -> Self {
        let url = normalize_url(&descriptor.url);
        let filename = if descriptor.filename.trim().is_empty() {
            derive_filename(&descriptor.name, &descriptor.subname, &url, data_dir)
        } else {
            PathBuf::from(descriptor.filename)
        };

        Self {
            url,
            name: descriptor.name,
            subname: descriptor.subname,
            filename,
            file_time: descriptor.updated,
            title: String::new(),
            status: None,
            valid: false,
            store: ArticleStore::new(),
            feed_time: None,
            article_time: None,
            time: None,
        }
    }

    /// Descriptor for persistence, recomputed from current state.
    pub fn descriptor(&self) -> SourceDescriptor {
        SourceDescriptor {
            url: self.url.clone(),
            name: self.name.clone(),
            subname: self.subname.clone(),
            filename: self.filename.to_string_lossy().into_owned(),
            updated: self.time.or(self.file_time),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subname(&self) -> &str {
        &self.subname
    }

    /// `name - subname`, or just `name` when there is no subname.
    pub fn display_name(&self) -> String {
        if self.subname.is_empty() {
            self.name.clone()
        } else {
            format!("{} - {}", self.name, self.subname)
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Feed title from the last successful fetch.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// HTTP status of the last fetch; `None` before any fetch or on transport failure.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn articles(&self) -> &[Article] {
        self.store.articles()
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    pub fn feed_time(&self) -> Option<&DateTime<Utc>> {
        self.feed_time.as_ref()
    }

    pub fn article_time(&self) -> Option<&DateTime<Utc>> {
        self.article_time.as_ref()
    }

    /// Freshness: feed-declared time when present, else newest article time.
    pub fn time(&self) -> Option<&DateTime<Utc>> {
        self.time.as_ref()
    }

    /// Freshness time loaded from the source list.
    pub fn file_time(&self) -> Option<&DateTime<Utc>> {
        self.file_time.as_ref()
    }

    pub fn time_str(&self) -> String {
        format_optional(self.time())
    }

    pub fn feed_time_str(&self) -> String {
        format_optional(self.feed_time())
    }

    pub fn article_time_str(&self) -> String {
        format_optional(self.article_time())
    }

    pub fn file_time_str(&self) -> String {
        format_optional(self.file_time())
    }

    /// `"<title> - <time>"`.
    pub fn display_line(&self) -> String {
        format!("{} - {}", self.title, self.time_str())
    }

    /// Fetch the feed through `gateway` and apply the result.
    pub async fn refresh<G: FetchGateway>(&mut self, gateway: &G) -> bool {
        debug!("Refreshing '{}'", self.url);
        let outcome = gateway.fetch(&self.url).await;
        self.apply_fetch(outcome)
    }

    /// Apply one fetch outcome in a single step.
    ///
    /// Returns the new validity: true only for a success status, a feed
    /// title and at least one valid article.
    pub fn apply_fetch(&mut self, outcome: Result<FetchedFeed>) -> bool {
        self.valid = false;

        let feed = match outcome {
            Ok(feed) => feed,
            Err(e) => {
                warn!("Fetching '{}' failed: {}", self.url, e);
                self.status = None;
                return false;
            }
        };

        self.status = Some(feed.status);
        if !feed.is_success() {
            warn!("'{}' returned status {}", self.url, feed.status);
            return false;
        }
        let title = match feed.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => {
                warn!("'{}' has no feed title", self.url);
                return false;
            }
        };

        self.title = title;
        self.feed_time = feed.declared_time();

        let mut articles = Vec::with_capacity(feed.entries.len());
        for entry in &feed.entries {
            match normalize(entry) {
                Ok(article) => articles.push(article),
                Err(e) => debug!("Skipping entry from '{}': {}", self.url, e),
            }
        }
        self.store = ArticleStore::from_articles(articles);
        self.article_time = self.store.most_recent();
        self.time = self.feed_time.or(self.article_time);

        if self.store.is_empty() {
            warn!("'{}' produced no valid articles", self.url);
            return false;
        }

        self.valid = true;

        info!(
            "'{}' refreshed: {} article(s), time '{}'",
            self.url,
            self.store.len(),
            self.time_str()
        );
        true
    }

    /// Merge the article file into memory; returns the number of articles added.
    pub fn load_articles(&mut self) -> usize {
        let on_disk = ArticleStore::load_from_file(&self.filename);
        self.store.merge_new(on_disk)
    }

    /// Persist in-memory articles, merging with the existing article file.
    pub fn save_articles(&self) -> Result<usize> {
        self.store.save_to_file(&self.filename)
    }
}

/// Article file path for a (name, subname, url) triple inside `data_dir`.
pub fn derive_filename(name: &str, subname: &str, url: &str, data_dir: &Path) -> PathBuf {
    let stem = derive_file_stem(name, subname, url);
    data_dir.join(format!("{stem}.{SOURCE_FILE_EXTENSION}"))
}

/// File stem for a source: `name_subname[__host]`.
///
/// The host is appended when `name_subname` is too short to be
/// distinctive. Only alphanumeric characters and underscores survive.
pub fn derive_file_stem(name: &str, subname: &str, url: &str) -> String {
    let mut stem = format!("{}_{}", name.trim(), subname.trim());
    if stem.chars().count() <= FILENAME_MIN_LEN {
        stem.push_str("__");
        stem.push_str(&url_host(url));
    }

    stem.chars()
        .filter(|ch| ch.is_alphanumeric() || *ch == '_')
        .collect()
}

/// Host of a URL with any leading `www.` removed; path and port are dropped.
fn url_host(url: &str) -> String {
    let url = url.trim();
    let host = match url::Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_string(),
            None => String::new(),
        },
        Err(_) => {
            let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
            rest.split('/').next().unwrap_or_default().to_string()
        }
    };

    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

/// Trim a URL and lower-case its scheme and host, leaving the path alone.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    let split_at = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(split_at);
    format!(
        "{}://{}{}",
        scheme.to_lowercase(),
        authority.to_lowercase(),
        tail
    )
}
