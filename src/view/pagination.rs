use serde::Serialize;

/// Number of pages for `len` items; an empty collection still has one (empty) page.
pub fn page_count(len: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    len.div_ceil(page_size).max(1)
}

pub fn clamp_page(page_number: usize, len: usize, page_size: usize) -> usize {
    page_number.clamp(1, page_count(len, page_size))
}

/// One page of `items`, 1-based. Out-of-range page numbers clamp; a page size
/// of 0 is treated as 1.
pub fn page<T>(items: &[T], page_number: usize, page_size: usize) -> &[T] {
    let page_size = page_size.max(1);
    let page_number = clamp_page(page_number, items.len(), page_size);
    let start = (page_number - 1) * page_size;
    let end = (start + page_size).min(items.len());
    &items[start.min(items.len())..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub total: usize,
}

/// Current page of a filtered table. Goes back to page 1 whenever the filter
/// generation it was last synced with changes.
#[derive(Debug, Clone)]
pub struct Paginator {
    page: usize,
    page_size: usize,
    synced_generation: u64,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            synced_generation: 0,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn go_to(&mut self, page_number: usize, len: usize) {
        self.page = clamp_page(page_number, len, self.page_size);
    }

    pub fn next(&mut self, len: usize) {
        self.go_to(self.page + 1, len);
    }

    pub fn previous(&mut self, len: usize) {
        self.go_to(self.page.saturating_sub(1), len);
    }

    /// Reset to page 1 if the filter moved on; otherwise just re-clamp.
    pub fn sync(&mut self, filter_generation: u64, len: usize) {
        if filter_generation != self.synced_generation {
            self.synced_generation = filter_generation;
            self.page = 1;
        } else {
            self.page = clamp_page(self.page, len, self.page_size);
        }
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        page(items, self.page, self.page_size)
    }

    pub fn info(&self, len: usize) -> PageInfo {
        PageInfo {
            page: clamp_page(self.page, len, self.page_size),
            page_size: self.page_size,
            page_count: page_count(len, self.page_size),
            total: len,
        }
    }
}
