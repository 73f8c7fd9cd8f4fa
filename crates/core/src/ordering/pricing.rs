use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::OrderLine;

/// Flat sales tax applied to every order (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// Currency precision used when totals are presented.
pub const CURRENCY_DP: u32 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
}

impl OrderTotals {
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: self.subtotal.round_dp(CURRENCY_DP),
            tax: self.tax.round_dp(CURRENCY_DP),
            grand_total: self.grand_total.round_dp(CURRENCY_DP),
        }
    }
}

pub fn line_total(line: &OrderLine) -> Decimal {
    line.unit_price * Decimal::from(line.quantity)
}

pub fn price_lines(lines: &[OrderLine]) -> OrderTotals {
    let subtotal: Decimal = lines.iter().map(line_total).sum();
    let tax = subtotal * TAX_RATE;

    OrderTotals { subtotal, tax, grand_total: subtotal + tax }
}

pub fn format_money(amount: Decimal) -> String {
    format!("${:.2}", amount.round_dp(CURRENCY_DP))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::menu::ItemId;
    use crate::domain::order::OrderLine;

    use super::{format_money, price_lines, TAX_RATE};

    fn line(id: &str, cents: i64, quantity: u32) -> OrderLine {
        OrderLine {
            item_id: ItemId::from(id),
            name: id.to_string(),
            unit_price: Decimal::new(cents, 2),
            quantity,
        }
    }

    #[test]
    fn tax_rate_is_eight_percent() {
        assert_eq!(TAX_RATE, Decimal::new(8, 2));
    }

    #[test]
    fn totals_keep_full_precision_until_rounded() {
        let totals = price_lines(&[line("beef_burger", 1299, 2)]);

        assert_eq!(totals.subtotal, Decimal::new(2598, 2));
        assert_eq!(totals.tax, Decimal::new(20784, 4));
        assert_eq!(totals.grand_total, Decimal::new(280584, 4));

        let rounded = totals.rounded();
        assert_eq!(rounded.tax, Decimal::new(208, 2));
        assert_eq!(rounded.grand_total, Decimal::new(2806, 2));
    }

    #[test]
    fn grand_total_is_subtotal_plus_tax_for_mixed_lines() {
        let lines = [line("a", 1299, 3), line("b", 400, 1), line("c", 850, 7), line("d", 1, 11)];
        let totals = price_lines(&lines);

        assert_eq!(totals.grand_total, totals.subtotal + totals.subtotal * Decimal::new(8, 2));
        assert_eq!(
            totals.rounded().grand_total,
            (totals.subtotal * Decimal::new(108, 2)).round_dp(2)
        );
    }

    #[test]
    fn empty_order_totals_are_zero() {
        let totals = price_lines(&[]);
        assert!(totals.subtotal.is_zero());
        assert!(totals.grand_total.is_zero());
    }

    #[test]
    fn money_formats_to_cents() {
        assert_eq!(format_money(Decimal::new(280584, 4)), "$28.06");
        assert_eq!(format_money(Decimal::new(4, 0)), "$4.00");
    }
}
