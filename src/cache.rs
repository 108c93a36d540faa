//! TTL-guarded cache of the most recently decoded feed per endpoint.
//!
//! The mutex only guards the map. Fetching and decoding happen with the
//! lock released, so two requests that both observe a stale entry may both
//! fetch; the later write simply replaces the earlier one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::Result;
use crate::fetch::{HttpClient, fetch_bytes};
use crate::gtfs_rt::FeedMessage;
use crate::parser::parse_feed;

/// Default staleness threshold.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10);

struct CacheEntry {
    feed: Arc<FeedMessage>,
    fetched_at: Instant,
}

pub struct LiveCache {
    client: Arc<dyn HttpClient>,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl LiveCache {
    pub fn new(client: Arc<dyn HttpClient>, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached feed for `url` if it is younger than the TTL,
    /// otherwise fetches, decodes and stores a fresh one.
    ///
    /// A failed fetch or decode leaves any existing entry untouched.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_refresh(&self, url: &str) -> Result<Arc<FeedMessage>> {
        let requested_at = Instant::now();

        if let Some(feed) = self.fresh(url, requested_at) {
            debug!("Serving feed from cache");
            return Ok(feed);
        }

        let bytes = fetch_bytes(self.client.as_ref(), url).await?;
        let feed = Arc::new(parse_feed(&bytes)?);

        self.entries.lock().insert(
            url.to_string(),
            CacheEntry {
                feed: Arc::clone(&feed),
                fetched_at: requested_at,
            },
        );
        info!(
            bytes = bytes.len(),
            entities = feed.entity.len(),
            "Feed cache refreshed"
        );

        Ok(feed)
    }

    /// The stored feed for `url` regardless of age.
    pub fn cached(&self, url: &str) -> Option<Arc<FeedMessage>> {
        self.entries.lock().get(url).map(|e| Arc::clone(&e.feed))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn fresh(&self, url: &str, now: Instant) -> Option<Arc<FeedMessage>> {
        let entries = self.entries.lock();
        entries
            .get(url)
            .filter(|e| now.saturating_duration_since(e.fetched_at) < self.ttl)
            .map(|e| Arc::clone(&e.feed))
    }
}
