//! Article store.
//!
//! Ordered articles of one source, with title-based merging and a JSON file
//! representation (a list of [`ArticleRecord`]s).

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use crate::feed::article::{Article, ArticleRecord};
use crate::registry::persist::write_atomic;
use crate::Result;

/// Ordered collection of articles belonging to one source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleStore {
    articles: Vec<Article>,
}

impl ArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from already normalized articles, keeping their order.
    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Latest article time, ignoring articles without one.
    pub fn most_recent(&self) -> Option<DateTime<Utc>> {
        self.articles.iter().filter_map(Article::time).max().copied()
    }

    /// Append candidates whose title is not stored yet.
    ///
    /// Title comparison is exact and case-sensitive. Duplicates inside the
    /// candidate list itself are also added only once. Returns the number
    /// of articles added.
    pub fn merge_new<I>(&mut self, candidates: I) -> usize
    where
        I: IntoIterator<Item = Article>,
    {
        let mut titles: HashSet<String> =
            self.articles.iter().map(|a| a.title().to_string()).collect();
        let before = self.articles.len();

        for article in candidates {
            if titles.insert(article.title().to_string()) {
                self.articles.push(article);
            }
        }

        self.articles.len() - before
    }

    /// Read articles from an article file.
    ///
    /// Never fails: a missing or unreadable file yields an empty list, and
    /// individual records with bad timestamps are skipped.
    pub fn load_from_file(path: &Path) -> Vec<Article> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if path.exists() {
                    error!("Failed to read article file '{}': {}", path.display(), e);
                } else {
                    debug!("Article file '{}' does not exist", path.display());
                }
                return Vec::new();
            }
        };

        let records: Vec<ArticleRecord> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                error!("Failed to parse article file '{}': {}", path.display(), e);
                return Vec::new();
            }
        };

        records
            .iter()
            .filter_map(|record| match Article::from_record(record) {
                Ok(article) => Some(article),
                Err(e) => {
                    warn!(
                        "Skipping article '{}' in '{}': {}",
                        record.title,
                        path.display(),
                        e
                    );
                    None
                }
            })
            .collect()
    }

    /// Write the union of the file's existing articles and this store.
    ///
    /// Articles already on disk stay first and keep their order; in-memory
    /// articles with new titles follow. Returns the number of articles that
    /// were not on disk before.
    pub fn save_to_file(&self, path: &Path) -> Result<usize> {
        let mut merged = ArticleStore::from_articles(Self::load_from_file(path));
        let added = merged.merge_new(self.articles.iter().cloned());

        let records: Vec<ArticleRecord> = merged.articles.iter().map(Article::to_record).collect();
        let content = serde_json::to_string_pretty(&records)?;
        write_atomic(path, content.as_bytes())?;

        debug!(
            "Saved {} article(s) to '{}' ({} new)",
            records.len(),
            path.display(),
            added
        );
        Ok(added)
    }
}
