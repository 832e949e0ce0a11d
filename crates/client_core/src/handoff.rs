use std::sync::Mutex;

use shared::domain::ProductCategory;

/// Single-slot channel carrying a category selection from the category
/// browser to the catalog view. `publish` overwrites any unconsumed prior
/// value; `consume` takes the value and clears the slot so a later unrelated
/// catalog visit does not reapply a stale filter.
#[derive(Default)]
pub struct HandoffChannel {
    slot: Mutex<Option<ProductCategory>>,
}

impl HandoffChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last write wins.
    pub fn publish(&self, category: ProductCategory) {
        *self.slot.lock().expect("handoff lock poisoned") = Some(category);
    }

    /// Returns the pending selection and atomically clears the slot. A
    /// second call before the next `publish` returns `None`.
    pub fn consume(&self) -> Option<ProductCategory> {
        self.slot.lock().expect("handoff lock poisoned").take()
    }
}
