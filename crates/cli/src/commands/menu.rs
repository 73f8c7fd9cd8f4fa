use foodie_core::config::LoadOptions;
use foodie_core::ordering::availability::StaticInventory;
use foodie_core::ordering::catalog::MenuCatalog;
use foodie_core::ordering::pricing::format_money;
use serde::Serialize;
use serde_json::Value;

use crate::commands::{bootstrap, CommandResult};

#[derive(Debug, Serialize)]
struct MenuPayload {
    command: &'static str,
    status: &'static str,
    item_count: usize,
    menu: Value,
    promotions: Value,
    stock: Value,
}

pub fn run(options: &LoadOptions, json_output: bool) -> CommandResult {
    let bootstrap = match bootstrap(options) {
        Ok(bootstrap) => bootstrap,
        Err(error) => return CommandResult::from_application_error("menu", &error),
    };
    let catalog = &bootstrap.storefront.catalog;
    let inventory = &bootstrap.storefront.inventory;

    if json_output {
        let stock = catalog
            .categories()
            .flat_map(|(_, items)| items)
            .map(|item| (item.id.to_string(), Value::from(inventory.units(item.id.as_str()))))
            .collect::<serde_json::Map<_, _>>();

        return CommandResult::payload(
            0,
            &MenuPayload {
                command: "menu",
                status: "ok",
                item_count: catalog.len(),
                menu: catalog.menu_json(),
                promotions: catalog.promotions_json(),
                stock: Value::Object(stock),
            },
        );
    }

    CommandResult { exit_code: 0, output: render_human(catalog, inventory) }
}

pub fn render_human(catalog: &MenuCatalog, inventory: &StaticInventory) -> String {
    let mut lines = Vec::new();

    for (category, items) in catalog.categories() {
        lines.push(format!("## {}", title_case(category)));
        for item in items {
            let mut line = format!("- {} ({}) {}", item.name, item.id, format_money(item.price));
            let badges = item.dietary.iter().map(|tag| tag.badge()).collect::<Vec<_>>();
            if !badges.is_empty() {
                line.push_str(&format!(" [{}]", badges.join(", ")));
            }
            if inventory.units(item.id.as_str()) == 0 {
                line.push_str(" (out of stock)");
            }
            lines.push(line);
            lines.push(format!("    {}", item.description));
        }
    }

    if !catalog.promotions().is_empty() {
        lines.push("## Promotions".to_string());
        for promotion in catalog.promotions() {
            lines.push(format!(
                "- {}: {} (save {})",
                promotion.name,
                promotion.description,
                format_money(promotion.discount)
            ));
        }
    }

    lines.join("\n")
}

fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
