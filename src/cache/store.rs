//! Storage for cached home timeline pages.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use crate::application::pagination::PageNumber;

use super::clock::Clock;
use super::config::CacheConfig;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "yatube::cache::store";

/// A rendered response captured byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

#[derive(Debug, Clone)]
struct Entry {
    stored_at: Instant,
    response: CachedResponse,
}

/// LRU of rendered pages keyed by page number, each valid for a fixed TTL.
///
/// An entry stored at `t` is served while `now < t + ttl` and dropped on the
/// first lookup at or after `t + ttl`.
pub struct PageCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<LruCache<PageNumber, Entry>>,
}

impl PageCache {
    pub fn new(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl: config.home_ttl,
            clock,
            entries: RwLock::new(LruCache::new(config.capacity_non_zero())),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the fresh entry for `page`, evicting it when expired.
    pub fn get(&self, page: PageNumber) -> Option<CachedResponse> {
        let now = self.clock.now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let fresh = entries
            .get(&page)
            .map(|entry| now.saturating_duration_since(entry.stored_at) < self.ttl)?;
        if fresh {
            entries.get(&page).map(|entry| entry.response.clone())
        } else {
            entries.pop(&page);
            None
        }
    }

    /// Store `response` for `page`, returning the page number evicted to make
    /// room, if any.
    pub fn insert(&self, page: PageNumber, response: CachedResponse) -> Option<PageNumber> {
        let entry = Entry {
            stored_at: self.clock.now(),
            response,
        };
        rw_write(&self.entries, SOURCE, "insert")
            .push(page, entry)
            .filter(|(evicted, _)| *evicted != page)
            .map(|(evicted, _)| evicted)
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
