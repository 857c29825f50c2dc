//! Offset/limit windowing over already-fetched collections.

use serde::Serialize;

/// Default page size for tools that window results client-side.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page a caller may request. Tools clamp `limit` to this before
/// windowing.
pub const MAX_PAGE_SIZE: usize = 100;

/// Return `items[offset..offset + limit]`, truncated to the collection.
///
/// An offset past the end yields an empty slice rather than an error.
pub fn paginate<T>(items: &[T], limit: usize, offset: usize) -> &[T] {
    let start = offset.min(items.len());
    let end = start.saturating_add(limit).min(items.len());
    &items[start..end]
}

/// Page metadata derived from a collection size and an offset/limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_prev_page: bool,
    /// 1-based.
    pub current_page: usize,
    /// Never less than 1, even for an empty collection.
    pub total_pages: usize,
}

impl PageInfo {
    pub fn new(total_items: usize, limit: usize, offset: usize) -> Self {
        let per_page = limit.max(1);
        Self {
            has_next_page: offset.saturating_add(limit) < total_items,
            has_prev_page: offset > 0,
            current_page: offset / per_page + 1,
            total_pages: total_items.div_ceil(per_page).max(1),
        }
    }
}
