use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::menu::ItemId;
use crate::errors::DomainError;
use crate::ordering::catalog::MenuCatalog;
use crate::ordering::pricing::{format_money, price_lines, OrderTotals};

/// One cart line. Name and unit price are captured when the line is created so
/// later catalog changes do not reprice an in-progress order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub item_id: ItemId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerChange {
    Added { item_id: ItemId, quantity: u32 },
    Updated { item_id: ItemId, quantity: u32 },
    Removed { item_id: ItemId },
    Unchanged,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedOrder {
    pub order_id: String,
    pub lines: Vec<OrderLine>,
    pub totals: OrderTotals,
    pub placed_at: DateTime<Utc>,
}

impl PlacedOrder {
    pub fn confirmation_message(&self) -> String {
        format!(
            "Thank you for your order! You've ordered: {}. Your total is {}. Your order has been sent to the kitchen. Enjoy your meal! 🥳",
            summarize(&self.lines),
            format_money(self.totals.grand_total)
        )
    }
}

/// The in-progress cart. At most one line per item id; every stored line has
/// quantity >= 1.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLedger {
    lines: Vec<OrderLine>,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn line(&self, item_id: &str) -> Option<&OrderLine> {
        self.lines.iter().find(|line| line.item_id.as_str() == item_id)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.line(item_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn add_or_increment(
        &mut self,
        catalog: &MenuCatalog,
        item_id: &str,
        delta: i64,
    ) -> Result<LedgerChange, DomainError> {
        let item = catalog.lookup(item_id).ok_or_else(|| DomainError::ItemUnknown(item_id.to_string()))?;

        if let Some(position) = self.position(item_id) {
            let current = i64::from(self.lines[position].quantity);
            return Ok(self.store_quantity(position, current.saturating_add(delta)));
        }

        if delta <= 0 {
            return Ok(LedgerChange::Unchanged);
        }

        let quantity = clamp_quantity(delta);
        self.lines.push(OrderLine {
            item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price: item.price,
            quantity,
        });
        Ok(LedgerChange::Added { item_id: item.id.clone(), quantity })
    }

    /// Absolute set. Unknown lines are left alone; a non-positive quantity
    /// removes the line.
    pub fn set_quantity(&mut self, item_id: &str, new_quantity: i64) -> LedgerChange {
        match self.position(item_id) {
            Some(position) => self.store_quantity(position, new_quantity),
            None => LedgerChange::Unchanged,
        }
    }

    pub fn remove(&mut self, item_id: &str) -> LedgerChange {
        match self.position(item_id) {
            Some(position) => {
                let line = self.lines.remove(position);
                LedgerChange::Removed { item_id: line.item_id }
            }
            None => LedgerChange::Unchanged,
        }
    }

    pub fn totals(&self) -> OrderTotals {
        price_lines(&self.lines)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Snapshots the cart as a placed order and empties it. Nothing is placed
    /// for an empty cart.
    pub fn place_order(&mut self) -> Option<PlacedOrder> {
        if self.lines.is_empty() {
            return None;
        }

        let placed = PlacedOrder {
            order_id: Uuid::new_v4().to_string(),
            totals: self.totals(),
            lines: std::mem::take(&mut self.lines),
            placed_at: Utc::now(),
        };
        Some(placed)
    }

    pub fn summary_line(&self) -> String {
        summarize(&self.lines)
    }

    fn position(&self, item_id: &str) -> Option<usize> {
        self.lines.iter().position(|line| line.item_id.as_str() == item_id)
    }

    fn store_quantity(&mut self, position: usize, quantity: i64) -> LedgerChange {
        if quantity <= 0 {
            let line = self.lines.remove(position);
            return LedgerChange::Removed { item_id: line.item_id };
        }

        let line = &mut self.lines[position];
        line.quantity = clamp_quantity(quantity);
        LedgerChange::Updated { item_id: line.item_id.clone(), quantity: line.quantity }
    }
}

fn clamp_quantity(quantity: i64) -> u32 {
    u32::try_from(quantity).unwrap_or(u32::MAX)
}

fn summarize(lines: &[OrderLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{} x {}", line.quantity, line.name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::menu::{ItemId, MenuDocument};
    use crate::errors::DomainError;
    use crate::ordering::catalog::MenuCatalog;

    use super::{LedgerChange, OrderLedger};

    fn catalog() -> MenuCatalog {
        MenuCatalog::from_document(MenuDocument::builtin().expect("builtin menu"))
            .expect("builtin catalog")
    }

    #[test]
    fn repeated_adds_accumulate_on_a_single_line() {
        let catalog = catalog();
        let mut ledger = OrderLedger::new();

        for delta in [2, 3, -1, 4] {
            ledger.add_or_increment(&catalog, "beef_burger", delta).expect("known item");
        }

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.line("beef_burger").map(|line| line.quantity), Some(8));
    }

    #[test]
    fn running_total_at_or_below_zero_removes_the_line() {
        let catalog = catalog();
        let mut ledger = OrderLedger::new();

        ledger.add_or_increment(&catalog, "golden_fries", 2).expect("known item");
        let change = ledger.add_or_increment(&catalog, "golden_fries", -5).expect("known item");

        assert_eq!(change, LedgerChange::Removed { item_id: ItemId::from("golden_fries") });
        assert!(ledger.is_empty());

        let change = ledger.add_or_increment(&catalog, "golden_fries", -1).expect("known item");
        assert_eq!(change, LedgerChange::Unchanged);
        assert!(ledger.is_empty());
    }

    #[test]
    fn unknown_item_leaves_ledger_untouched() {
        let catalog = catalog();
        let mut ledger = OrderLedger::new();
        ledger.add_or_increment(&catalog, "garden_salad", 1).expect("known item");
        let before = ledger.clone();

        let error = ledger.add_or_increment(&catalog, "lobster_roll", 1).expect_err("unknown");

        assert_eq!(error, DomainError::ItemUnknown("lobster_roll".to_string()));
        assert_eq!(ledger, before);
    }

    #[test]
    fn set_quantity_is_absolute_and_removes_at_zero() {
        let catalog = catalog();
        let mut ledger = OrderLedger::new();
        ledger.add_or_increment(&catalog, "chicken_wings", 1).expect("known item");

        ledger.set_quantity("chicken_wings", 6);
        assert_eq!(ledger.line("chicken_wings").map(|line| line.quantity), Some(6));

        let change = ledger.set_quantity("chicken_wings", 0);
        assert!(matches!(change, LedgerChange::Removed { .. }));
        assert!(ledger.is_empty());

        assert_eq!(ledger.set_quantity("chicken_wings", 3), LedgerChange::Unchanged);
        assert!(ledger.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let catalog = catalog();
        let mut ledger = OrderLedger::new();
        ledger.add_or_increment(&catalog, "beef_burger", 1).expect("known item");
        ledger.add_or_increment(&catalog, "pepperoni_pizza", 1).expect("known item");

        ledger.remove("margherita_pizza");
        let once = ledger.clone();
        ledger.remove("margherita_pizza");
        assert_eq!(ledger, once);

        ledger.remove("beef_burger");
        let once = ledger.clone();
        assert_eq!(ledger.remove("beef_burger"), LedgerChange::Unchanged);
        assert_eq!(ledger, once);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn lines_snapshot_price_at_add_time() {
        let mut document = MenuDocument::builtin().expect("builtin menu");
        let catalog = MenuCatalog::from_document(document.clone()).expect("catalog");
        let mut ledger = OrderLedger::new();
        ledger.add_or_increment(&catalog, "beef_burger", 1).expect("known item");

        document.categories[0].items[0].price = Decimal::new(1999, 2);
        let repriced = MenuCatalog::from_document(document).expect("catalog");
        ledger.add_or_increment(&repriced, "beef_burger", 1).expect("known item");

        let line = ledger.line("beef_burger").expect("line");
        assert_eq!(line.unit_price, Decimal::new(1299, 2));
        assert_eq!(line.quantity, 2);
    }

    #[test]
    fn two_cheeseburgers_total_matches_menu_pricing() {
        let catalog = catalog();
        let mut ledger = OrderLedger::new();
        ledger.add_or_increment(&catalog, "beef_burger", 2).expect("known item");

        let totals = ledger.totals();
        assert_eq!(totals.subtotal, Decimal::new(2598, 2));
        assert_eq!(totals.tax, Decimal::new(20784, 4));
        assert_eq!(totals.grand_total, Decimal::new(280584, 4));
    }

    #[test]
    fn place_order_snapshots_and_clears_once() {
        let catalog = catalog();
        let mut ledger = OrderLedger::new();
        ledger.add_or_increment(&catalog, "beef_burger", 2).expect("known item");
        ledger.add_or_increment(&catalog, "golden_fries", 1).expect("known item");

        let placed = ledger.place_order().expect("non-empty cart places");

        assert!(ledger.is_empty());
        assert_eq!(placed.lines.len(), 2);
        assert_eq!(
            placed.confirmation_message(),
            "Thank you for your order! You've ordered: 2 x Classic Cheeseburger, 1 x Golden Fries. Your total is $32.38. Your order has been sent to the kitchen. Enjoy your meal! 🥳"
        );
        assert!(ledger.place_order().is_none());
    }
}
