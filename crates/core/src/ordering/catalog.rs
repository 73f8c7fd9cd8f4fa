use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use crate::domain::menu::{MenuCategory, MenuDocument, MenuItem, Promotion};
use crate::errors::DomainError;

/// Immutable menu with a flat id index built once at load time.
#[derive(Clone, Debug, Default)]
pub struct MenuCatalog {
    categories: Vec<MenuCategory>,
    promotions: Vec<Promotion>,
    index: HashMap<String, (usize, usize)>,
}

impl MenuCatalog {
    pub fn new(
        categories: Vec<MenuCategory>,
        promotions: Vec<Promotion>,
    ) -> Result<Self, DomainError> {
        let mut index = HashMap::new();

        for (category_index, category) in categories.iter().enumerate() {
            for (item_index, item) in category.items.iter().enumerate() {
                validate_item(item)?;
                if index.insert(item.id.0.clone(), (category_index, item_index)).is_some() {
                    return Err(DomainError::DuplicateMenuItem(item.id.0.clone()));
                }
            }
        }

        Ok(Self { categories, promotions, index })
    }

    pub fn from_document(document: MenuDocument) -> Result<Self, DomainError> {
        Self::new(document.categories, document.promotions)
    }

    pub fn lookup(&self, item_id: &str) -> Option<&MenuItem> {
        let (category_index, item_index) = *self.index.get(item_id)?;
        self.categories.get(category_index)?.items.get(item_index)
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.index.contains_key(item_id)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &[MenuItem])> {
        self.categories.iter().map(|category| (category.name.as_str(), category.items.as_slice()))
    }

    pub fn promotions(&self) -> &[Promotion] {
        &self.promotions
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Menu keyed by category, in the shape the assistant prompt embeds.
    pub fn menu_json(&self) -> Value {
        let mut menu = serde_json::Map::new();
        for category in &self.categories {
            let items = category.items.iter().map(item_json).collect::<Vec<_>>();
            menu.insert(category.name.clone(), Value::Array(items));
        }
        Value::Object(menu)
    }

    pub fn promotions_json(&self) -> Value {
        Value::Array(
            self.promotions
                .iter()
                .map(|promotion| {
                    json!({
                        "name": promotion.name,
                        "description": promotion.description,
                        "items": promotion.items,
                        "discount": decimal_json(promotion.discount),
                    })
                })
                .collect(),
        )
    }
}

fn validate_item(item: &MenuItem) -> Result<(), DomainError> {
    if item.id.0.trim().is_empty() {
        return Err(DomainError::InvalidMenuItem {
            item_id: item.name.clone(),
            reason: "id must not be empty".to_string(),
        });
    }
    if item.price.is_sign_negative() && !item.price.is_zero() {
        return Err(DomainError::InvalidMenuItem {
            item_id: item.id.0.clone(),
            reason: format!("price {} must not be negative", item.price),
        });
    }
    Ok(())
}

fn item_json(item: &MenuItem) -> Value {
    json!({
        "id": item.id,
        "name": item.name,
        "price": decimal_json(item.price),
        "description": item.description,
        "upsell": item.upsell,
        "dietary": item.dietary,
    })
}

pub(crate) fn decimal_json(value: Decimal) -> Value {
    value.to_f64().map(Value::from).unwrap_or_else(|| Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::menu::{ItemId, MenuCategory, MenuDocument, MenuItem};
    use crate::errors::DomainError;

    use super::MenuCatalog;

    fn item(id: &str, price: Decimal) -> MenuItem {
        MenuItem {
            id: ItemId::from(id),
            name: id.replace('_', " "),
            price,
            description: String::new(),
            upsell: Vec::new(),
            dietary: Vec::new(),
        }
    }

    fn builtin() -> MenuCatalog {
        MenuCatalog::from_document(MenuDocument::builtin().expect("builtin menu"))
            .expect("builtin catalog")
    }

    #[test]
    fn lookup_resolves_items_across_categories() {
        let catalog = builtin();

        let burger = catalog.lookup("beef_burger").expect("burger");
        assert_eq!(burger.name, "Classic Cheeseburger");
        let salad = catalog.lookup("garden_salad").expect("salad");
        assert_eq!(salad.price, Decimal::new(550, 2));
        assert_eq!(catalog.len(), 7);
    }

    #[test]
    fn lookup_miss_is_none_not_error() {
        let catalog = builtin();
        assert!(catalog.lookup("coke").is_none());
        assert!(!catalog.contains("fries_upgrade"));
    }

    #[test]
    fn categories_preserve_configured_order() {
        let catalog = builtin();
        let order: Vec<&str> = catalog.categories().map(|(name, _)| name).collect();
        assert_eq!(order, vec!["burgers", "pizza", "appetizers", "salads"]);
    }

    #[test]
    fn duplicate_ids_across_categories_fail_loudly() {
        let result = MenuCatalog::new(
            vec![
                MenuCategory { name: "mains".into(), items: vec![item("wrap", Decimal::ONE)] },
                MenuCategory { name: "specials".into(), items: vec![item("wrap", Decimal::new(2, 0))] },
            ],
            Vec::new(),
        );

        assert_eq!(result.err(), Some(DomainError::DuplicateMenuItem("wrap".to_string())));
    }

    #[test]
    fn negative_price_is_rejected() {
        let result = MenuCatalog::new(
            vec![MenuCategory {
                name: "mains".into(),
                items: vec![item("refund", Decimal::new(-100, 2))],
            }],
            Vec::new(),
        );

        assert!(matches!(result, Err(DomainError::InvalidMenuItem { ref item_id, .. }) if item_id == "refund"));
    }

    #[test]
    fn menu_json_groups_items_by_category_with_numeric_prices() {
        let catalog = builtin();
        let menu = catalog.menu_json();

        assert_eq!(menu["burgers"][0]["id"], "beef_burger");
        let price = menu["burgers"][0]["price"].as_f64().expect("numeric price");
        assert!((price - 12.99).abs() < 1e-9);
        assert_eq!(menu["pizza"][0]["dietary"][0], "vegetarian");
        assert_eq!(catalog.promotions_json()[0]["name"], "Combo Deal");
    }
}
