use crate::domain::order::OrderLedger;

pub const DEFAULT_ANCHOR_ITEM: &str = "beef_burger";
pub const DEFAULT_COMPLEMENT_ITEM: &str = "golden_fries";

/// Proposes at most one upsell for the current cart.
pub trait RecommendationService: Send + Sync {
    fn suggest(&self, order: &OrderLedger) -> Option<String>;
}

/// Suggests `complement` whenever `anchor` is in the cart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorRecommendation {
    anchor: String,
    complement: String,
}

impl AnchorRecommendation {
    pub fn new(anchor: impl Into<String>, complement: impl Into<String>) -> Self {
        Self { anchor: anchor.into(), complement: complement.into() }
    }
}

impl Default for AnchorRecommendation {
    fn default() -> Self {
        Self::new(DEFAULT_ANCHOR_ITEM, DEFAULT_COMPLEMENT_ITEM)
    }
}

impl RecommendationService for AnchorRecommendation {
    fn suggest(&self, order: &OrderLedger) -> Option<String> {
        order.contains(&self.anchor).then(|| self.complement.clone())
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::menu::MenuDocument;
    use crate::domain::order::OrderLedger;
    use crate::ordering::catalog::MenuCatalog;

    use super::{AnchorRecommendation, RecommendationService};

    #[test]
    fn burger_in_cart_suggests_fries() {
        let catalog = MenuCatalog::from_document(MenuDocument::builtin().expect("builtin menu"))
            .expect("catalog");
        let recommender = AnchorRecommendation::default();
        let mut order = OrderLedger::new();

        assert_eq!(recommender.suggest(&order), None);

        order.add_or_increment(&catalog, "margherita_pizza", 1).expect("known item");
        assert_eq!(recommender.suggest(&order), None);

        order.add_or_increment(&catalog, "beef_burger", 1).expect("known item");
        assert_eq!(recommender.suggest(&order).as_deref(), Some("golden_fries"));
    }
}
