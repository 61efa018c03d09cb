//! Filtering, sorting and pagination over the catalog

use std::cmp::Reverse;
use std::fmt;

use shared::models::{MediaAsset, MediaType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeFilter {
    #[default]
    All,
    Only(MediaType),
}

impl TypeFilter {
    /// `all`, `image` or `video`; anything else means all
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => TypeFilter::Only(MediaType::Image),
            "video" => TypeFilter::Only(MediaType::Video),
            _ => TypeFilter::All,
        }
    }

    fn matches(&self, asset: &MediaAsset) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(t) => asset.media_type == *t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    Name,
    /// Largest first
    Size,
}

impl SortBy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "newest" => Some(SortBy::Newest),
            "oldest" => Some(SortBy::Oldest),
            "name" => Some(SortBy::Name),
            "size" => Some(SortBy::Size),
            _ => None,
        }
    }
}

/// Search, type filter, then a stable sort
pub(crate) fn filter_and_sort(
    catalog: &[MediaAsset],
    search: &str,
    type_filter: TypeFilter,
    sort: SortBy,
) -> Vec<MediaAsset> {
    let term = search.to_lowercase();
    let mut view: Vec<MediaAsset> = catalog
        .iter()
        .filter(|a| term.is_empty() || a.name.to_lowercase().contains(&term))
        .filter(|a| type_filter.matches(a))
        .cloned()
        .collect();

    match sort {
        SortBy::Newest => view.sort_by_key(|a| Reverse(a.created_millis())),
        SortBy::Oldest => view.sort_by_key(|a| a.created_millis()),
        SortBy::Name => view.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        }),
        SortBy::Size => view.sort_by_key(|a| Reverse(a.size)),
    }
    view
}

pub(crate) fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size.max(1))
}

/// 1-based page slice; out of range pages are empty
pub(crate) fn page_slice(items: &[MediaAsset], page: usize, page_size: usize) -> &[MediaAsset] {
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// Position within the filtered view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSummary {
    /// 1-based index of the first visible item, 0 when empty
    pub start: usize,
    pub end: usize,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

impl PageSummary {
    pub(crate) fn new(total: usize, page: usize, page_size: usize) -> Self {
        let pages = total_pages(total, page_size);
        if total == 0 {
            return Self {
                start: 0,
                end: 0,
                total,
                page,
                total_pages: pages,
            };
        }
        Self {
            start: page.saturating_sub(1) * page_size + 1,
            end: (page * page_size).min(total),
            total,
            page,
            total_pages: pages,
        }
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

impl fmt::Display for PageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_pages <= 1 {
            write!(f, "Showing {} items", self.total)
        } else {
            write!(f, "Showing {}-{} of {} items", self.start, self.end, self.total)
        }
    }
}
