//! Filtering and pagination for product listings.

use common::{CategoryId, Money};
use serde::{Deserialize, Serialize};

/// Default number of products per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound a client may request for the page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Sort key for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductOrder {
    #[default]
    Name,
    Price,
    Inventory,
}

/// Filter, ordering, and pagination options for listing products.
///
/// Built with chained setters:
///
/// ```
/// use store::ProductFilter;
///
/// let filter = ProductFilter::new().search("shirt").page(2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<CategoryId>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    pub order_by: ProductOrder,
    pub descending: bool,
    page: u32,
    page_size: u32,
}

impl ProductFilter {
    /// Creates an empty filter: first page, default page size, ordered by
    /// name ascending.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, id: CategoryId) -> Self {
        self.category_id = Some(id);
        self
    }

    pub fn min_price(mut self, price: Money) -> Self {
        self.min_price = Some(price);
        self
    }

    pub fn max_price(mut self, price: Money) -> Self {
        self.max_price = Some(price);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn order_by(mut self, order: ProductOrder) -> Self {
        self.order_by = order;
        self
    }

    pub fn descending(mut self, descending: bool) -> Self {
        self.descending = descending;
        self
    }

    /// Sets the 1-based page number. Zero is treated as the first page.
    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// The effective 1-based page number.
    pub fn page_number(&self) -> u32 {
        self.page.max(1)
    }

    /// The effective page size.
    pub fn effective_page_size(&self) -> u32 {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    /// Row offset for the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number() - 1) * u64::from(self.effective_page_size())
    }
}

/// One page of a listing, with the total row count for the whole filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let filter = ProductFilter::new();
        assert_eq!(filter.page_number(), 1);
        assert_eq!(filter.effective_page_size(), DEFAULT_PAGE_SIZE);
        assert_eq!(filter.offset(), 0);
        assert_eq!(filter.order_by, ProductOrder::Name);
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(ProductFilter::new().page_size(0).effective_page_size(), 1);
        assert_eq!(
            ProductFilter::new().page_size(999).effective_page_size(),
            MAX_PAGE_SIZE
        );
    }

    #[test]
    fn offset_for_later_pages() {
        let filter = ProductFilter::new().page(3).page_size(25);
        assert_eq!(filter.offset(), 50);
    }

    #[test]
    fn page_zero_is_first_page() {
        assert_eq!(ProductFilter::new().page(0).offset(), 0);
    }
}
