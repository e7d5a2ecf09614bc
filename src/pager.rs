//! Stable pagination over ordered results

use serde::Serialize;
use std::num::NonZeroUsize;

/// One page of an ordered sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_next: bool,
    pub has_prev: bool,
    /// Length of the whole sequence
    pub total_count: usize,
    /// 0-based index of this page
    pub page_index: usize,
    /// Number of non-empty pages (at least 1)
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Human 1-based page number
    pub fn number(&self) -> usize {
        self.page_index.saturating_add(1)
    }
}

/// Slice page `page_index` of `items`
///
/// An index past the end yields an empty page with `has_next = false`;
/// it is not an error.
pub fn page<T: Clone>(items: &[T], page_size: NonZeroUsize, page_index: usize) -> Page<T> {
    let size = page_size.get();
    let total_count = items.len();
    let total_pages = total_count.div_ceil(size).max(1);

    let start = page_index.saturating_mul(size).min(total_count);
    let end = start.saturating_add(size).min(total_count);

    Page {
        items: items[start..end].to_vec(),
        has_next: end < total_count,
        has_prev: page_index > 0 && total_count > 0,
        total_count,
        page_index,
        total_pages,
    }
}
