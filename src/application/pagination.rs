//! Offset pagination shared by every post listing.

use std::num::NonZeroU32;

use serde::Serialize;

/// Number of posts per page unless configured otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// A 1-based page number requested by a client.
///
/// Parsing never fails: missing, non-numeric and non-positive inputs all map
/// to the first page. Clamping beyond the last page happens in
/// [`Paginator::window`] once the total is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageNumber(u32);

impl PageNumber {
    pub const FIRST: PageNumber = PageNumber(1);

    pub fn new(value: u32) -> Self {
        Self(value.max(1))
    }

    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|value| value.trim().parse::<i64>().ok())
            .map(|value| Self(value.clamp(1, i64::from(u32::MAX)) as u32))
            .unwrap_or(Self::FIRST)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Offset window resolved against a known total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub offset: u64,
    pub limit: u32,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: NonZeroU32,
}

impl Paginator {
    pub fn new(page_size: NonZeroU32) -> Self {
        Self { page_size }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.get()
    }

    /// Resolve `requested` against `total` items, clamping to the last page.
    /// An empty collection still has exactly one page.
    pub fn window(&self, total: u64, requested: PageNumber) -> PageWindow {
        let size = u64::from(self.page_size.get());
        let num_pages = total.div_ceil(size).max(1);
        let num_pages = u32::try_from(num_pages).unwrap_or(u32::MAX);
        let number = requested.get().min(num_pages);
        PageWindow {
            number,
            num_pages,
            offset: u64::from(number - 1) * size,
            limit: self.page_size.get(),
            total,
        }
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(NonZeroU32::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU32::MIN))
    }
}

/// One page of results along with its position in the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Self {
            items,
            number: window.number,
            num_pages: window.num_pages,
            total: window.total,
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            number: 1,
            num_pages: 1,
            total: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            total: self.total,
        }
    }
}
