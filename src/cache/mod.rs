//! Time-based response cache for the home timeline.
//!
//! Rendered pages are stored for a fixed TTL measured by an injected
//! [`Clock`]. Writes to posts never invalidate entries: a post created or
//! deleted inside the window becomes visible once the entry expires.
//!
//! ```toml
//! [cache]
//! enabled = true
//! home_ttl_seconds = 20
//! capacity = 16
//! ```

mod clock;
mod config;
mod lock;
mod middleware;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use middleware::{
    HOME_CACHE_EVICT_TOTAL, HOME_CACHE_HIT_TOTAL, HOME_CACHE_MISS_TOTAL, ServedPage,
    home_cache_layer,
};
pub use store::{CachedResponse, PageCache};
