use serde::Serialize;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

impl<T> Page<T> {
    /// Cuts page `page` (1-based) of `limit` items out of `all`.
    pub fn slice(all: Vec<T>, page: usize, limit: usize) -> Self {
        let page = page.max(1);
        let limit = limit.max(1);
        let total = all.len();
        let items = all.into_iter().skip((page - 1) * limit).take(limit).collect();
        Self {
            items,
            total,
            page,
            limit,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.limit)
    }

    pub fn has_more(&self) -> bool {
        (self.page - 1) * self.limit + self.items.len() < self.total
    }
}
