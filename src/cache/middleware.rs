//! Home timeline cache middleware.
//!
//! Serves `GET /` from [`PageCache`] while an entry is fresh and stores
//! successful renders otherwise. Entries are keyed by page number only, so the
//! wrapped handler must render viewer-independent output.
//!
//! A handler that clamps an out-of-range request reports the page it actually
//! rendered through [`ServedPage`]. The render is stored under that page, and
//! a fresh entry for it wins over the new render.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Method, Request, StatusCode, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, instrument, warn};

use crate::application::pagination::PageNumber;

use super::store::{CachedResponse, PageCache};

pub const HOME_CACHE_HIT_TOTAL: &str = "yatube_home_cache_hit_total";
pub const HOME_CACHE_MISS_TOTAL: &str = "yatube_home_cache_miss_total";
pub const HOME_CACHE_EVICT_TOTAL: &str = "yatube_home_cache_evict_total";

const MAX_CACHED_BODY_BYTES: usize = 1024 * 1024;

/// Response extension naming the page a handler rendered after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServedPage(pub PageNumber);

#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn home_cache_layer(
    State(cache): State<Arc<PageCache>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let page = page_from_query(request.uri().query());

    if let Some(cached) = cache.get(page) {
        counter!(HOME_CACHE_HIT_TOTAL).increment(1);
        debug!(page = page.get(), outcome = "hit", "serving cached home page");
        return build_response(cached);
    }

    counter!(HOME_CACHE_MISS_TOTAL).increment(1);
    debug!(page = page.get(), outcome = "miss", "rendering home page");

    let response = next.run(request).await;
    if !should_store_response(&response) {
        return response;
    }

    let served = response
        .extensions()
        .get::<ServedPage>()
        .map_or(page, |served| served.0);
    if served != page
        && let Some(cached) = cache.get(served)
    {
        counter!(HOME_CACHE_HIT_TOTAL).increment(1);
        debug!(
            page = page.get(),
            served = served.get(),
            outcome = "hit",
            "serving cached clamped home page"
        );
        return build_response(cached);
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_CACHED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer home page body");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let cached = CachedResponse {
        status: parts.status.as_u16(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect(),
        body: bytes.clone(),
    };
    if let Some(evicted) = cache.insert(served, cached) {
        counter!(HOME_CACHE_EVICT_TOTAL).increment(1);
        debug!(evicted = evicted.get(), "evicted cached home page");
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// Only plain successful pages are shared between clients.
fn should_store_response(response: &Response) -> bool {
    response.status() == StatusCode::OK && !response.headers().contains_key(SET_COOKIE)
}

fn page_from_query(query: Option<&str>) -> PageNumber {
    let raw = query.and_then(|query| {
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned())
    });
    PageNumber::parse(raw.as_deref())
}

fn build_response(cached: CachedResponse) -> Response {
    let mut builder = Response::builder().status(cached.status);

    for (name, value) in cached.headers {
        if let Ok(header_value) = HeaderValue::from_str(&value) {
            builder = builder.header(name, header_value);
        }
    }

    builder
        .body(Body::from(cached.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use axum::{Router, extract::Query, middleware, routing::get};
    use tower::ServiceExt;

    use super::*;
    use crate::cache::{CacheConfig, ManualClock};

    const LAST_PAGE: u32 = 2;

    struct Harness {
        router: Router,
        clock: Arc<ManualClock>,
        renders: Arc<AtomicUsize>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(PageCache::new(&CacheConfig::default(), clock.clone()));
        let renders = Arc::new(AtomicUsize::new(0));
        let counter = renders.clone();
        let router = Router::new()
            .route(
                "/",
                get(move |Query(params): Query<HashMap<String, String>>| {
                    let counter = counter.clone();
                    async move {
                        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        let requested = PageNumber::parse(params.get("page").map(String::as_str));
                        let served = PageNumber::new(requested.get().min(LAST_PAGE));
                        let mut response = format!("render {n}").into_response();
                        response.extensions_mut().insert(ServedPage(served));
                        response
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(cache, home_cache_layer));
        Harness {
            router,
            clock,
            renders,
        }
    }

    async fn body_of(router: &Router, uri: &str) -> String {
        let response = router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn responses_are_identical_within_ttl() {
        let h = harness();

        let first = body_of(&h.router, "/").await;
        h.clock.advance(Duration::from_secs(19));
        let second = body_of(&h.router, "/").await;

        assert_eq!(first, "render 1");
        assert_eq!(second, first);
        assert_eq!(h.renders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_rendered_again() {
        let h = harness();

        body_of(&h.router, "/").await;
        h.clock.advance(Duration::from_secs(20));
        let fresh = body_of(&h.router, "/").await;

        assert_eq!(fresh, "render 2");
    }

    #[tokio::test]
    async fn page_numbers_are_normalised_into_keys() {
        let h = harness();

        let first = body_of(&h.router, "/?page=abc").await;
        assert_eq!(body_of(&h.router, "/").await, first);
        assert_eq!(body_of(&h.router, "/?page=1").await, first);
        assert_eq!(body_of(&h.router, "/?page=-3").await, first);

        let second = body_of(&h.router, "/?page=2").await;
        assert_ne!(second, first);
        assert_eq!(h.renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn pages_past_the_end_share_the_last_page_entry() {
        let h = harness();

        let last = body_of(&h.router, "/?page=2").await;
        let beyond = body_of(&h.router, "/?page=99").await;
        assert_eq!(beyond, last);

        let again = body_of(&h.router, "/?page=2").await;
        assert_eq!(again, last);
        assert_eq!(h.renders.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clamped_render_is_stored_under_the_served_page() {
        let h = harness();

        let beyond = body_of(&h.router, "/?page=99").await;
        let last = body_of(&h.router, "/?page=2").await;

        assert_eq!(last, beyond);
        assert_eq!(h.renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn responses_with_cookies_or_errors_are_not_stored() {
        let mut with_cookie = StatusCode::OK.into_response();
        with_cookie
            .headers_mut()
            .insert(SET_COOKIE, HeaderValue::from_static("session=1"));
        assert!(!should_store_response(&with_cookie));
        assert!(!should_store_response(
            &StatusCode::INTERNAL_SERVER_ERROR.into_response()
        ));
        assert!(should_store_response(&StatusCode::OK.into_response()));
    }
}
