use std::collections::BTreeMap;

/// Stock check consulted before an order intent mutates the cart.
pub trait AvailabilityService: Send + Sync {
    fn is_available(&self, item_id: &str) -> bool;
}

/// Fixed stock table; an item is available while its count is above zero.
/// Items missing from the table count as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticInventory {
    stock: BTreeMap<String, u32>,
}

impl StaticInventory {
    pub fn new(stock: BTreeMap<String, u32>) -> Self {
        Self { stock }
    }

    pub fn units(&self, item_id: &str) -> u32 {
        self.stock.get(item_id).copied().unwrap_or(0)
    }
}

impl AvailabilityService for StaticInventory {
    fn is_available(&self, item_id: &str) -> bool {
        self.units(item_id) > 0
    }
}
