use shared::{
    domain::ProductCategory,
    error::MarketError,
    protocol::Product,
};

use crate::handoff::HandoffChannel;

/// Active catalog filter: either everything or a single category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(ProductCategory),
}

impl CategoryFilter {
    /// Case-insensitive parse of a filter key (`"all"` or a category key).
    pub fn parse(key: &str) -> Option<Self> {
        if key.eq_ignore_ascii_case("all") {
            return Some(CategoryFilter::All);
        }
        ProductCategory::from_key(key).map(CategoryFilter::Category)
    }

    pub fn key(&self) -> &'static str {
        match self {
            CategoryFilter::All => "all",
            CategoryFilter::Category(category) => category.key(),
        }
    }

    fn matches(&self, product: &Product) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(category) => product.category == *category,
        }
    }
}

/// Holds the full fetched product set and derives the displayed subset from
/// the active filter. Filtering never reorders: the displayed set preserves
/// the relative order of the full set.
#[derive(Default)]
pub struct CatalogFilterEngine {
    products: Vec<Product>,
    active: CategoryFilter,
}

impl CatalogFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the full product set. A pending handoff selection takes
    /// precedence; otherwise the currently active filter is kept, so a data
    /// refresh does not reset the view to `all`.
    pub fn load(&mut self, products: Vec<Product>, handoff: &HandoffChannel) {
        self.products = products;
        if let Some(category) = handoff.consume() {
            self.active = CategoryFilter::Category(category);
        }
    }

    /// Switches the active filter. Unknown keys are rejected rather than
    /// silently showing an empty catalog.
    pub fn select_category(&mut self, key: &str) -> Result<(), MarketError> {
        let filter = CategoryFilter::parse(key)
            .ok_or_else(|| MarketError::invalid_input(format!("unknown category '{key}'")))?;
        self.active = filter;
        Ok(())
    }

    pub fn select(&mut self, filter: CategoryFilter) {
        self.active = filter;
    }

    pub fn active(&self) -> CategoryFilter {
        self.active
    }

    pub fn full_set(&self) -> &[Product] {
        &self.products
    }

    /// The currently displayed subset, in original order. Empty when the
    /// full set is empty or nothing matches.
    pub fn displayed(&self) -> Vec<&Product> {
        self.products
            .iter()
            .filter(|product| self.active.matches(product))
            .collect()
    }
}
