//! Test helpers for integration tests.
//!
//! Provides an in-memory `FetchGateway` and helpers for building feeds and
//! configurations in temporary directories.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use feeder::config::{Config, DataConfig};
use feeder::{FeederError, FetchGateway, FetchedFeed, RawEntry, Result};

/// How the fake gateway answers one URL.
#[derive(Debug, Clone)]
pub enum Route {
    Feed(FetchedFeed),
    Delayed(Duration, FetchedFeed),
    Fail(String),
    /// Never completes.
    Hang,
}

/// In-memory gateway; unknown URLs fail like an unreachable host.
#[derive(Debug, Default)]
pub struct FakeGateway {
    routes: HashMap<String, Route>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, route: Route) -> Self {
        self.routes.insert(url.to_string(), route);
        self
    }

    pub fn feed(self, url: &str, feed: FetchedFeed) -> Self {
        self.route(url, Route::Feed(feed))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches that were running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl FetchGateway for FakeGateway {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedFeed>> + Send {
        let route = self.routes.get(url).cloned();
        let url = url.to_string();
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            let _guard = InFlight(&self.in_flight);

            match route {
                Some(Route::Feed(feed)) => Ok(feed),
                Some(Route::Delayed(delay, feed)) => {
                    tokio::time::sleep(delay).await;
                    Ok(feed)
                }
                Some(Route::Fail(reason)) => Err(FeederError::Fetch(reason)),
                Some(Route::Hang) => std::future::pending().await,
                None => Err(FeederError::Fetch(format!("no route to {}", url))),
            }
        }
    }
}

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
}

/// A titled feed with one entry per title; entry `i` is updated on day `i + 1`.
pub fn feed_with(title: &str, entries: &[&str]) -> FetchedFeed {
    entries
        .iter()
        .enumerate()
        .fold(FetchedFeed::ok(title), |feed, (i, entry)| {
            feed.with_entry(
                RawEntry::new(
                    *entry,
                    format!("https://example.com/{}", entry),
                    format!("<p>{}</p>", entry),
                )
                .with_updated(at(i as u32 + 1)),
            )
        })
}

/// Configuration rooted in `dir`.
pub fn test_config(dir: &Path) -> Config {
    Config {
        data: DataConfig {
            dir: dir.to_string_lossy().into_owned(),
            ..Default::default()
        },
        ..Default::default()
    }
}
