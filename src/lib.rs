//! feeder - RSS/Atom feed aggregator
//!
//! Keeps a persistent, versioned registry of feed sources and refreshes them
//! into per-source article files.

pub mod config;
pub mod datetime;
pub mod error;
pub mod feed;
pub mod logging;
pub mod registry;

pub use config::Config;
pub use error::{FeederError, Result};
pub use feed::{
    normalize, Article, ArticleStore, FetchGateway, FetchedFeed, HttpFetcher, RawEntry,
    ReachabilityCheck, Source, SourceDescriptor,
};
pub use registry::{
    AddSources, AlwaysConfirm, Confirm, NeverConfirm, RefreshSummary, RegistryState, Selection,
    SourceRegistry,
};
