//! Entry normalization.
//!
//! Turns raw gateway entries into [`Article`]s and converts articles to and
//! from their on-disk [`ArticleRecord`] form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::datetime::{format_optional, from_optional_epoch_string, to_epoch_string};
use crate::feed::types::{RawEntry, TIME_DISPLAY_WIDTH, TITLE_DISPLAY_WIDTH};
use crate::Result;

/// Why a raw entry could not become an article.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    #[error("entry has no title")]
    MissingTitle,
    #[error("entry has no link")]
    MissingLink,
    #[error("entry has no summary")]
    MissingSummary,
}

/// One normalized feed entry.
///
/// Only complete articles exist: an entry lacking a title, link or summary
/// is rejected by [`normalize`] instead of producing a partial value.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    title: String,
    link: String,
    summary: String,
    time_updated: Option<DateTime<Utc>>,
    time_published: Option<DateTime<Utc>>,
}

impl Article {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn link(&self) -> &str {
        &self.link
    }

    /// Plain-text summary.
    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn time_updated(&self) -> Option<&DateTime<Utc>> {
        self.time_updated.as_ref()
    }

    pub fn time_published(&self) -> Option<&DateTime<Utc>> {
        self.time_published.as_ref()
    }

    /// Updated time if known, otherwise published time.
    pub fn time(&self) -> Option<&DateTime<Utc>> {
        self.time_updated.as_ref().or(self.time_published.as_ref())
    }

    /// Fixed-width `"<title> - <time>"` line for listings.
    pub fn display_line(&self) -> String {
        format!(
            "{:<tw$.tw$} - {:<ww$.ww$}",
            self.title,
            format_optional(self.time()),
            tw = TITLE_DISPLAY_WIDTH,
            ww = TIME_DISPLAY_WIDTH,
        )
    }

    /// Convert into the on-disk record form.
    pub fn to_record(&self) -> ArticleRecord {
        ArticleRecord {
            title: self.title.clone(),
            link: self.link.clone(),
            summary: self.summary.clone(),
            time_updated: self.time_updated.as_ref().map(to_epoch_string).unwrap_or_default(),
            time_published: self
                .time_published
                .as_ref()
                .map(to_epoch_string)
                .unwrap_or_default(),
        }
    }

    /// Rebuild an article from its on-disk record form.
    pub fn from_record(record: &ArticleRecord) -> Result<Self> {
        Ok(Self {
            title: record.title.clone(),
            link: record.link.clone(),
            summary: record.summary.clone(),
            time_updated: from_optional_epoch_string(&record.time_updated)?,
            time_published: from_optional_epoch_string(&record.time_published)?,
        })
    }
}

/// Serialized article. Times are epoch-second strings, empty when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    pub summary: String,
    #[serde(default)]
    pub time_updated: String,
    #[serde(default)]
    pub time_published: String,
}

/// Normalize a raw entry into an article.
pub fn normalize(entry: &RawEntry) -> std::result::Result<Article, EntryError> {
    let title = entry
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(EntryError::MissingTitle)?;
    let link = entry
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or(EntryError::MissingLink)?;
    let summary = entry.summary.as_deref().ok_or(EntryError::MissingSummary)?;

    Ok(Article {
        title: title.to_string(),
        link: link.to_string(),
        summary: strip_html(summary),
        time_updated: entry.updated,
        time_published: entry.published,
    })
}

/// Strip HTML tags and decode common entities, collapsing whitespace.
pub fn strip_html(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;
    let mut in_entity = false;
    let mut entity = String::new();

    for ch in html.chars() {
        match ch {
            '<' if !in_entity => {
                in_tag = true;
                // Tags separate words: "<p>a</p><p>b</p>" reads as "a b".
                result.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            '&' if !in_entity => {
                in_entity = true;
                entity.clear();
            }
            ';' if in_entity => {
                in_entity = false;
                match decode_entity(&entity) {
                    Some(c) => result.push(c),
                    None => {
                        result.push('&');
                        result.push_str(&entity);
                        result.push(';');
                    }
                }
            }
            _ if in_entity => {
                if ch.is_whitespace() || entity.len() > 10 {
                    // Bare ampersand, not an entity.
                    in_entity = false;
                    result.push('&');
                    result.push_str(&entity);
                    result.push(ch);
                } else {
                    entity.push(ch);
                }
            }
            _ => result.push(ch),
        }
    }
    if in_entity {
        result.push('&');
        result.push_str(&entity);
    }

    result.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => parse_numeric_entity(entity).and_then(char::from_u32),
    }
}

/// Parse a numeric HTML entity (e.g., "#123" or "#x7B").
fn parse_numeric_entity(entity: &str) -> Option<u32> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse().ok()
    } else {
        None
    }
}
