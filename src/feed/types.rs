//! Feed types shared by the fetch gateway, the normalizer and sources.

use chrono::{DateTime, Utc};

/// Maximum characters kept from an article title in one-line listings.
pub const TITLE_DISPLAY_WIDTH: usize = 60;

/// Maximum characters kept from a timestamp in one-line listings.
pub const TIME_DISPLAY_WIDTH: usize = 24;

/// Name + subname shorter than or equal to this get the URL host appended
/// when deriving a source file name.
pub const FILENAME_MIN_LEN: usize = 8;

/// Extension of per-source article files.
pub const SOURCE_FILE_EXTENSION: &str = "json";

/// Raw entry as delivered by the fetch gateway, before normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    /// Entry title.
    pub title: Option<String>,
    /// Link to the original article.
    pub link: Option<String>,
    /// Summary, possibly containing markup.
    pub summary: Option<String>,
    /// When the entry was last updated.
    pub updated: Option<DateTime<Utc>>,
    /// When the entry was published.
    pub published: Option<DateTime<Utc>>,
}

impl RawEntry {
    /// Create an entry with the three required text fields.
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            link: Some(link.into()),
            summary: Some(summary.into()),
            updated: None,
            published: None,
        }
    }

    /// Set the updated time.
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    /// Set the published time.
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }
}

/// Result of one fetch through the gateway.
///
/// A non-success HTTP status still produces a `FetchedFeed`; only transport
/// failures are reported as errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedFeed {
    /// HTTP status code of the response.
    pub status: u16,
    /// Feed-level title.
    pub title: Option<String>,
    /// Feed-level updated time.
    pub updated: Option<DateTime<Utc>>,
    /// Feed-level published time.
    pub published: Option<DateTime<Utc>>,
    /// Entries in document order.
    pub entries: Vec<RawEntry>,
}

impl FetchedFeed {
    /// Create a successful (200) feed with a title and no entries.
    pub fn ok(title: impl Into<String>) -> Self {
        Self {
            status: 200,
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Create a feed response carrying only a status code.
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Set the feed-level updated time.
    pub fn with_updated(mut self, updated: DateTime<Utc>) -> Self {
        self.updated = Some(updated);
        self
    }

    /// Set the feed-level published time.
    pub fn with_published(mut self, published: DateTime<Utc>) -> Self {
        self.published = Some(published);
        self
    }

    /// Append an entry.
    pub fn with_entry(mut self, entry: RawEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Feed-declared time, updated preferred over published.
    pub fn declared_time(&self) -> Option<DateTime<Utc>> {
        self.updated.or(self.published)
    }
}
