pub mod availability;
pub mod catalog;
pub mod pricing;
pub mod recommendation;

use crate::domain::menu::MenuDocument;
use crate::errors::DomainError;

use self::{availability::StaticInventory, catalog::MenuCatalog};

/// Catalog and stock table built from one menu document.
#[derive(Clone, Debug)]
pub struct Storefront {
    pub catalog: MenuCatalog,
    pub inventory: StaticInventory,
}

impl Storefront {
    pub fn from_document(document: MenuDocument) -> Result<Self, DomainError> {
        let inventory = StaticInventory::new(document.stock.clone());
        let catalog = MenuCatalog::from_document(document)?;
        Ok(Self { catalog, inventory })
    }
}
