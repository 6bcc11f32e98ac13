//! Fixed-size slicing of in-memory collections.

pub const PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_pages: u32,
}

/// Slices `collection` into the 1-based `page` of `page_size` items.
///
/// A page past the end (or page 0) yields no items; `total_pages` is never below 1.
pub fn paginate<T: Clone>(collection: &[T], page: u32, page_size: usize) -> Paginated<T> {
    let page_size = page_size.max(1);
    let total_pages = collection.len().div_ceil(page_size).max(1);
    let items = match (page as usize).checked_sub(1) {
        Some(index) => collection
            .iter()
            .skip(index.saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    Paginated {
        items,
        total_pages: u32::try_from(total_pages).unwrap_or(u32::MAX),
    }
}
