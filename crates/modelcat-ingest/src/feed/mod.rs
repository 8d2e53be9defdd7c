//! Feed sources for the batch path
//!
//! - [`JsonFileFeed`]: a local file of items, as a JSON array or JSON lines
//! - [`RssFeed`]: an RSS 2.0 or Atom document fetched over HTTP
//! - [`StaticFeed`]: a fixed list, for embedding and tests

mod json;
mod rss;

pub use json::JsonFileFeed;
pub use rss::{parse_feed_document, RssFeed};

use crate::FeedError;
use async_trait::async_trait;
use modelcat_domain::traits::FeedSource;
use modelcat_domain::FeedItem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which kind of feed to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Local JSON or JSON lines file
    JsonFile,
    /// RSS or Atom over HTTP
    Rss,
}

/// Feed source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed kind
    pub kind: FeedKind,

    /// File path for `json_file`
    pub path: Option<PathBuf>,

    /// Document URL for `rss`
    pub url: Option<String>,

    /// HTTP timeout for `rss`
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            kind: FeedKind::JsonFile,
            path: None,
            url: None,
            timeout_secs: 30,
        }
    }
}

impl FeedConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            FeedKind::JsonFile if self.path.is_none() => {
                Err("json_file feed requires a path".to_string())
            }
            FeedKind::Rss if self.url.as_deref().map_or(true, |u| u.trim().is_empty()) => {
                Err("rss feed requires a url".to_string())
            }
            FeedKind::Rss if self.timeout_secs == 0 => {
                Err("timeout_secs must be at least 1".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Build the configured source
    pub fn build(&self) -> Result<ConfiguredFeed, FeedError> {
        self.validate().map_err(FeedError::Config)?;
        match self.kind {
            FeedKind::JsonFile => {
                let path = self
                    .path
                    .clone()
                    .ok_or_else(|| FeedError::Config("missing path".to_string()))?;
                Ok(ConfiguredFeed::Json(JsonFileFeed::new(path)))
            }
            FeedKind::Rss => {
                let url = self
                    .url
                    .clone()
                    .ok_or_else(|| FeedError::Config("missing url".to_string()))?;
                let feed = RssFeed::new(url, Duration::from_secs(self.timeout_secs))?;
                Ok(ConfiguredFeed::Rss(feed))
            }
        }
    }
}

/// A feed chosen at runtime from [`FeedConfig`]
#[derive(Debug)]
pub enum ConfiguredFeed {
    /// Local file
    Json(JsonFileFeed),
    /// HTTP document
    Rss(RssFeed),
}

#[async_trait]
impl FeedSource for ConfiguredFeed {
    type Error = FeedError;

    async fn fetch_pending(&self) -> Result<Vec<FeedItem>, FeedError> {
        match self {
            ConfiguredFeed::Json(feed) => feed.fetch_pending().await,
            ConfiguredFeed::Rss(feed) => feed.fetch_pending().await,
        }
    }
}

/// Fixed list of items, returned on every fetch
#[derive(Debug, Clone, Default)]
pub struct StaticFeed {
    items: Vec<FeedItem>,
}

impl StaticFeed {
    /// Create a feed over the given items
    pub fn new(items: Vec<FeedItem>) -> Self {
        Self { items }
    }
}

#[async_trait]
impl FeedSource for StaticFeed {
    type Error = FeedError;

    async fn fetch_pending(&self) -> Result<Vec<FeedItem>, FeedError> {
        Ok(self.items.clone())
    }
}
