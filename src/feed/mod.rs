//! Feed module for feeder.
//!
//! This module provides feed fetching, entry normalization, per-source
//! article storage and the `Source` type itself.

pub mod article;
pub mod fetcher;
pub mod source;
pub mod store;
pub mod types;

pub use article::{normalize, strip_html, Article, ArticleRecord, EntryError};
pub use fetcher::{parse_feed, validate_url, FetchGateway, HttpFetcher, ReachabilityCheck};
pub use source::{derive_file_stem, derive_filename, normalize_url, Source, SourceDescriptor};
pub use store::ArticleStore;
pub use types::{
    FetchedFeed, RawEntry, FILENAME_MIN_LEN, SOURCE_FILE_EXTENSION, TIME_DISPLAY_WIDTH,
    TITLE_DISPLAY_WIDTH,
};
